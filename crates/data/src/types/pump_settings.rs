//! Insulin pump configuration snapshot.
use serde::Serialize;
use serde_json::Value;
use structure::{Meta, Normalizable, Normalizer, ObjectParser, Parsable, Validatable, Validator};

use crate::{Base, Datum};

pub const TYPE: &str = "pumpSettings";

pub const ACTIVE_SCHEDULE_LENGTH_MAXIMUM: usize = 100;
/// One entry every five minutes of a day.
pub const BASAL_SCHEDULE_LENGTH_MAXIMUM: usize = 288;
/// Milliseconds since midnight.
pub const START_MAXIMUM: i64 = 86_400_000 - 1;
pub const RATE_MAXIMUM: f64 = 100.0;

/// One segment of a basal schedule: a rate starting at an offset into the day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

impl Parsable for ScheduleEntry {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        self.start = parser.int("start");
        self.rate = parser.float64("rate");
    }
}

impl Validatable for ScheduleEntry {
    fn validate(&self, validator: &mut Validator<'_>) {
        validator
            .int("start", self.start)
            .exists()
            .in_range(0, START_MAXIMUM);
        validator
            .float64("rate", self.rate)
            .exists()
            .in_range(0.0, RATE_MAXIMUM);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpSettings {
    #[serde(flatten)]
    pub base: Base,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basal_schedule: Option<Vec<ScheduleEntry>>,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            base: Base::new(TYPE, None),
            active_schedule: None,
            basal_schedule: None,
        }
    }
}

pub fn construct() -> Box<dyn Datum> {
    Box::new(PumpSettings::default())
}

impl Parsable for PumpSettings {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        self.base.parse(parser);
        self.active_schedule = parser.string("activeSchedule");
        self.basal_schedule = parser.parse_objects("basalSchedule");
    }
}

impl Validatable for PumpSettings {
    fn validate(&self, validator: &mut Validator<'_>) {
        self.base.validate(validator);
        self.base.validate_discriminator(validator, TYPE, None);

        validator
            .string("activeSchedule", self.active_schedule.as_deref())
            .length_in_range(1, ACTIVE_SCHEDULE_LENGTH_MAXIMUM);
        validator
            .length("basalSchedule", self.basal_schedule.as_ref().map(Vec::len))
            .exists()
            .length_in_range(1, BASAL_SCHEDULE_LENGTH_MAXIMUM);
        validator.validate_objects("basalSchedule", self.basal_schedule.as_deref());
    }
}

impl Normalizable for PumpSettings {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
        self.base.normalize(normalizer);
    }
}

impl Datum for PumpSettings {
    fn meta(&self) -> Meta {
        self.base.meta()
    }

    fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use structure::ErrorKind;

    use super::*;
    use crate::types::test_support::{codes, parse, validate};

    fn settings(schedule: Value) -> (PumpSettings, structure::Errors) {
        let mut record = PumpSettings::default();
        let errors = parse(
            &mut record,
            &json!({
                "type": "pumpSettings",
                "time": "2024-04-01T00:00:00Z",
                "activeSchedule": "weekday",
                "basalSchedule": schedule
            }),
        );
        (record, errors)
    }

    #[test]
    fn schedule_entries_are_parsed_in_order() {
        let (record, errors) = settings(json!([
            {"start": 0, "rate": 0.8},
            {"start": 21_600_000, "rate": 1.1}
        ]));
        assert!(errors.is_empty());
        assert!(validate(&record).is_empty());
        assert_eq!(
            record.basal_schedule,
            Some(vec![
                ScheduleEntry {
                    start: Some(0),
                    rate: Some(0.8)
                },
                ScheduleEntry {
                    start: Some(21_600_000),
                    rate: Some(1.1)
                },
            ])
        );
    }

    #[test]
    fn entry_errors_point_into_the_schedule() {
        let (record, errors) = settings(json!([
            {"start": 0, "rate": 0.8},
            {"start": 86_400_000, "rate": 1.0},
            {"rate": 101.0}
        ]));
        assert!(errors.is_empty());
        assert_eq!(
            codes(&validate(&record)),
            [
                ("/basalSchedule/1/start".to_string(), "value-not-in-range"),
                ("/basalSchedule/2/start".to_string(), "value-not-exists"),
                ("/basalSchedule/2/rate".to_string(), "value-not-in-range"),
            ]
        );
    }

    #[test]
    fn schedule_is_required_and_bounded() {
        let (record, _) = settings(json!([]));
        let errors = validate(&record);
        assert_eq!(
            errors.as_slice()[0].kind,
            ErrorKind::LengthNotInRange {
                got: 0,
                min: 1,
                max: 288
            }
        );

        let mut record = record;
        record.basal_schedule = None;
        assert_eq!(
            codes(&validate(&record)),
            [("/basalSchedule".to_string(), "value-not-exists")]
        );
    }

    #[test]
    fn malformed_entries_keep_their_index() {
        let (record, errors) = settings(json!([{"start": 0, "rate": 1.0}, 7]));
        assert_eq!(codes(&errors), [("/basalSchedule/1".to_string(), "type-not-object")]);
        assert_eq!(record.basal_schedule.map(|entries| entries.len()), Some(2));
    }

    #[test]
    fn document_nests_schedule() {
        let (record, _) = settings(json!([{"start": 0, "rate": 0.5}]));
        let document = record.to_document().unwrap();
        assert_eq!(document["basalSchedule"], json!([{"start": 0, "rate": 0.5}]));
        assert_eq!(document["activeSchedule"], json!("weekday"));
    }
}
