//! Random conformant records for tests and benches.
//!
//! Every generator produces a record that validates cleanly under every
//! origin. Pass a seeded [`fastrand::Rng`] for reproducible output.
//!
//! ```
//! use data::fixtures;
//!
//! let mut rng = fastrand::Rng::with_seed(7);
//! let documents = fixtures::documents(&mut rng, 16);
//! assert_eq!(documents.len(), 16);
//! ```
use chrono::{DateTime, Duration, TimeZone, Utc};
use fastrand::Rng;
use serde_json::Value;

use crate::base::{
    Base, CLOCK_DRIFT_OFFSET_MAXIMUM, DEVICE_ID_LENGTH_MAXIMUM, ID_LENGTH_MAXIMUM,
    TIMEZONE_OFFSET_MAXIMUM, UPLOAD_ID_LENGTH_MAXIMUM,
};
use crate::types::application::{self, ApplicationSettings};
use crate::types::bolus::normal::{self, Normal};
use crate::types::bolus::pen::{self, Pen};
use crate::types::bolus::{self, NORMAL_MAXIMUM};
use crate::types::calculator::{self, BolusReference, Calculator};
use crate::types::cbg::{self, Continuous};
use crate::types::pump_settings::{self, PumpSettings, ScheduleEntry};
use crate::Datum;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn string(rng: &mut Rng, min: usize, max: usize) -> String {
    let length = rng.usize(min..=max);
    (0..length)
        .map(|_| char::from(ALPHANUMERIC[rng.usize(..ALPHANUMERIC.len())]))
        .collect()
}

/// Whole seconds within 2015..2030, so documents round-trip exactly.
pub fn time(rng: &mut Rng) -> DateTime<Utc> {
    let start = Utc
        .with_ymd_and_hms(2015, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    start + Duration::seconds(rng.i64(0..15 * 365 * 24 * 60 * 60))
}

/// Uniform in `[min, max]`, rounded to two decimals.
pub fn float(rng: &mut Rng, min: f64, max: f64) -> f64 {
    let value = min + rng.f64() * (max - min);
    ((value * 100.0).round() / 100.0).clamp(min, max)
}

pub fn base(rng: &mut Rng, type_: &str, sub_type: Option<&str>) -> Base {
    Base {
        id: Some(string(rng, 1, ID_LENGTH_MAXIMUM)),
        time: Some(time(rng)),
        device_id: rng
            .bool()
            .then(|| string(rng, 1, DEVICE_ID_LENGTH_MAXIMUM.min(64))),
        upload_id: Some(string(rng, 1, UPLOAD_ID_LENGTH_MAXIMUM)),
        timezone_offset: Some(rng.i64(-TIMEZONE_OFFSET_MAXIMUM..=TIMEZONE_OFFSET_MAXIMUM)),
        clock_drift_offset: rng
            .bool()
            .then(|| rng.i64(-CLOCK_DRIFT_OFFSET_MAXIMUM..=CLOCK_DRIFT_OFFSET_MAXIMUM)),
        ..Base::new(type_, sub_type)
    }
}

pub fn normal(rng: &mut Rng) -> Normal {
    let delivered = float(rng, 0.0, NORMAL_MAXIMUM);
    Normal {
        base: base(rng, bolus::TYPE, Some(normal::SUB_TYPE)),
        normal: Some(delivered),
        expected_normal: rng
            .bool()
            .then(|| float(rng, delivered, NORMAL_MAXIMUM)),
    }
}

pub fn pen(rng: &mut Rng) -> Pen {
    Pen {
        base: base(rng, bolus::TYPE, Some(pen::SUB_TYPE)),
        normal: Some(float(rng, 0.0, NORMAL_MAXIMUM)),
        prescriptor: Some(pen::PRESCRIPTORS[rng.usize(..pen::PRESCRIPTORS.len())].to_owned()),
        insulin_on_board: rng
            .bool()
            .then(|| float(rng, 0.0, pen::INSULIN_ON_BOARD_MAXIMUM)),
    }
}

pub fn continuous(rng: &mut Rng) -> Continuous {
    let units = cbg::UNITS[rng.usize(..cbg::UNITS.len())];
    let maximum = cbg::value_maximum(units).unwrap_or(cbg::MMOL_L_MAXIMUM);
    Continuous {
        base: base(rng, cbg::TYPE, None),
        units: Some(units.to_owned()),
        value: Some(float(rng, cbg::VALUE_MINIMUM, maximum)),
    }
}

pub fn application_settings(rng: &mut Rng) -> ApplicationSettings {
    ApplicationSettings {
        base: base(rng, application::TYPE, None),
        name: Some(string(rng, 1, 40)),
        version: Some(format!("{}.{}.{}", rng.u8(..10), rng.u8(..20), rng.u8(..50))),
        build: rng
            .bool()
            .then(|| string(rng, 1, application::BUILD_LENGTH_MAXIMUM)),
    }
}

pub fn pump_settings(rng: &mut Rng) -> PumpSettings {
    let count = rng.usize(1..=24);
    let step = (pump_settings::START_MAXIMUM + 1) / count as i64;
    let schedule = (0..count)
        .map(|index| ScheduleEntry {
            start: Some(index as i64 * step),
            rate: Some(float(rng, 0.0, 5.0)),
        })
        .collect();
    PumpSettings {
        base: base(rng, pump_settings::TYPE, None),
        active_schedule: Some(string(rng, 1, 20)),
        basal_schedule: Some(schedule),
    }
}

/// A calculator record referring to its bolus by id.
pub fn calculator(rng: &mut Rng) -> Calculator {
    Calculator {
        base: base(rng, calculator::TYPE, None),
        bolus: Some(BolusReference::Id(string(rng, 1, ID_LENGTH_MAXIMUM))),
        carb_input: Some(float(rng, 0.0, 200.0)),
        insulin_on_board: Some(float(rng, 0.0, calculator::INSULIN_ON_BOARD_MAXIMUM)),
        units: Some(calculator::UNITS[rng.usize(..calculator::UNITS.len())].to_owned()),
    }
}

/// A calculator record carrying a conformant bolus inline.
pub fn calculator_with_embedded_bolus(rng: &mut Rng) -> Calculator {
    let mut record = calculator(rng);
    let embedded = match rng.bool() {
        true => normal(rng).to_document(),
        false => pen(rng).to_document(),
    };
    if let Ok(Value::Object(document)) = embedded {
        record.bolus = Some(BolusReference::Embedded(document));
    }
    record
}

/// One random record of any built-in type.
pub fn datum(rng: &mut Rng) -> Box<dyn Datum> {
    match rng.usize(..6) {
        0 => Box::new(normal(rng)),
        1 => Box::new(pen(rng)),
        2 => Box::new(continuous(rng)),
        3 => Box::new(application_settings(rng)),
        4 => Box::new(pump_settings(rng)),
        _ => Box::new(calculator(rng)),
    }
}

/// `count` random documents, as a client would submit them.
pub fn documents(rng: &mut Rng, count: usize) -> Vec<Value> {
    (0..count)
        .filter_map(|_| datum(rng).to_document().ok())
        .collect()
}
