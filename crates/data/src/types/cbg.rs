//! Continuous glucose monitor reading.
use serde::Serialize;
use serde_json::Value;
use structure::{Meta, Normalizable, Normalizer, ObjectParser, Parsable, Validatable, Validator};

use crate::{Base, Datum};

pub const TYPE: &str = "cbg";

pub const MMOL_L: &str = "mmol/L";
pub const MMOL_L_LOWER: &str = "mmol/l";
pub const MG_DL: &str = "mg/dL";
pub const MG_DL_LOWER: &str = "mg/dl";
pub const UNITS: [&str; 4] = [MMOL_L, MMOL_L_LOWER, MG_DL, MG_DL_LOWER];

pub const MMOL_L_MAXIMUM: f64 = 55.0;
pub const MG_DL_MAXIMUM: f64 = 1000.0;
pub const VALUE_MINIMUM: f64 = 0.0;

/// Upper bound for a glucose value in `units`; `None` for unknown units.
pub fn value_maximum(units: &str) -> Option<f64> {
    match units {
        MMOL_L | MMOL_L_LOWER => Some(MMOL_L_MAXIMUM),
        MG_DL | MG_DL_LOWER => Some(MG_DL_MAXIMUM),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuous {
    #[serde(flatten)]
    pub base: Base,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Default for Continuous {
    fn default() -> Self {
        Self {
            base: Base::new(TYPE, None),
            units: None,
            value: None,
        }
    }
}

pub fn construct() -> Box<dyn Datum> {
    Box::new(Continuous::default())
}

impl Parsable for Continuous {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        self.base.parse(parser);
        self.units = parser.string("units");
        self.value = parser.float64("value");
    }
}

impl Validatable for Continuous {
    fn validate(&self, validator: &mut Validator<'_>) {
        self.base.validate(validator);
        self.base.validate_discriminator(validator, TYPE, None);

        validator
            .string("units", self.units.as_deref())
            .exists()
            .one_of(&UNITS);

        let value = validator.float64("value", self.value).exists();
        if let Some(maximum) = self.units.as_deref().and_then(value_maximum) {
            value.in_range(VALUE_MINIMUM, maximum);
        }
    }
}

impl Normalizable for Continuous {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
        self.base.normalize(normalizer);
    }
}

impl Datum for Continuous {
    fn meta(&self) -> Meta {
        self.base.meta()
    }

    fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
