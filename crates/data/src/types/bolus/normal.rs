//! Immediate ("normal") bolus delivered by a pump.
use serde::Serialize;
use serde_json::Value;
use structure::{Meta, Normalizable, Normalizer, ObjectParser, Parsable, Validatable, Validator};

use super::{NORMAL_MAXIMUM, NORMAL_MINIMUM, TYPE};
use crate::{Base, Datum};

pub const SUB_TYPE: &str = "normal";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Normal {
    #[serde(flatten)]
    pub base: Base,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal: Option<f64>,
    /// Programmed amount when delivery was interrupted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_normal: Option<f64>,
}

impl Default for Normal {
    fn default() -> Self {
        Self {
            base: Base::new(TYPE, Some(SUB_TYPE)),
            normal: None,
            expected_normal: None,
        }
    }
}

pub fn construct() -> Box<dyn Datum> {
    Box::new(Normal::default())
}

impl Parsable for Normal {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        self.base.parse(parser);
        self.normal = parser.float64("normal");
        self.expected_normal = parser.float64("expectedNormal");
    }
}

impl Validatable for Normal {
    fn validate(&self, validator: &mut Validator<'_>) {
        self.base.validate(validator);
        self.base
            .validate_discriminator(validator, TYPE, Some(SUB_TYPE));

        validator
            .float64("normal", self.normal)
            .exists()
            .in_range(NORMAL_MINIMUM, NORMAL_MAXIMUM);

        let expected_minimum = self
            .normal
            .filter(|normal| (NORMAL_MINIMUM..=NORMAL_MAXIMUM).contains(normal))
            .unwrap_or(NORMAL_MINIMUM);
        validator
            .float64("expectedNormal", self.expected_normal)
            .in_range(expected_minimum, NORMAL_MAXIMUM);
    }
}

impl Normalizable for Normal {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
        self.base.normalize(normalizer);
    }
}

impl Datum for Normal {
    fn meta(&self) -> Meta {
        self.base.meta()
    }

    fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
