//! Insulin pen dose.
use serde::Serialize;
use serde_json::Value;
use structure::{Meta, Normalizable, Normalizer, ObjectParser, Parsable, Validatable, Validator};

use super::{NORMAL_MAXIMUM, NORMAL_MINIMUM, TYPE};
use crate::types::is_stored;
use crate::{Base, Datum};

pub const SUB_TYPE: &str = "pen";

pub const PRESCRIPTOR_AUTO: &str = "auto";
pub const PRESCRIPTOR_MANUAL: &str = "manual";
pub const PRESCRIPTOR_HYBRID: &str = "hybrid";
pub const PRESCRIPTORS: [&str; 3] = [PRESCRIPTOR_AUTO, PRESCRIPTOR_MANUAL, PRESCRIPTOR_HYBRID];

pub const INSULIN_ON_BOARD_MINIMUM: f64 = 0.0;
pub const INSULIN_ON_BOARD_MAXIMUM: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pen {
    #[serde(flatten)]
    pub base: Base,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescriptor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insulin_on_board: Option<f64>,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            base: Base::new(TYPE, Some(SUB_TYPE)),
            normal: None,
            prescriptor: None,
            insulin_on_board: None,
        }
    }
}

pub fn construct() -> Box<dyn Datum> {
    Box::new(Pen::default())
}

impl Parsable for Pen {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        self.base.parse(parser);
        self.normal = parser.float64("normal");
        self.prescriptor = parser.string("prescriptor");
        self.insulin_on_board = parser.float64("insulinOnBoard");
    }
}

impl Validatable for Pen {
    fn validate(&self, validator: &mut Validator<'_>) {
        self.base.validate(validator);
        self.base
            .validate_discriminator(validator, TYPE, Some(SUB_TYPE));

        validator
            .float64("normal", self.normal)
            .exists()
            .in_range(NORMAL_MINIMUM, NORMAL_MAXIMUM);
        validator
            .string("prescriptor", self.prescriptor.as_deref())
            .one_of(&PRESCRIPTORS);
        validator
            .float64("insulinOnBoard", self.insulin_on_board)
            .in_range(INSULIN_ON_BOARD_MINIMUM, INSULIN_ON_BOARD_MAXIMUM);
    }
}

impl Normalizable for Pen {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
        self.base.normalize(normalizer);

        // A manually prescribed dose has no device-computed insulin on board.
        if is_stored(normalizer.origin())
            && self.prescriptor.as_deref() == Some(PRESCRIPTOR_MANUAL)
        {
            self.insulin_on_board = None;
        }
    }
}

impl Datum for Pen {
    fn meta(&self) -> Meta {
        self.base.meta()
    }

    fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
