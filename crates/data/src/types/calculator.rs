//! Bolus calculator ("wizard") record.
//!
//! A calculator record refers to the bolus it recommended. Clients may submit
//! that bolus inline; on submission it is split out into its own record and
//! the reference is replaced by the embedded record's `id`.
use serde::Serialize;
use serde_json::{Map, Value};
use structure::{
    ErrorKind, Meta, NormalizeError, Normalizable, Normalizer, ObjectParser, Origin, Parsable,
    Validatable, Validator, ValueKind,
};

use crate::base::ID_LENGTH_MAXIMUM;
use crate::types::bolus;
use crate::{Base, Datum};

pub const TYPE: &str = "wizard";

pub const CARB_INPUT_MAXIMUM: f64 = 1000.0;
pub const INSULIN_ON_BOARD_MAXIMUM: f64 = 250.0;
pub const UNITS: [&str; 2] = ["mmol/L", "mg/dL"];

/// The recommended bolus, by id or inline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BolusReference {
    Id(String),
    Embedded(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculator {
    #[serde(flatten)]
    pub base: Base,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bolus: Option<BolusReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carb_input: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insulin_on_board: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl Default for Calculator {
    fn default() -> Self {
        Self {
            base: Base::new(TYPE, None),
            bolus: None,
            carb_input: None,
            insulin_on_board: None,
            units: None,
        }
    }
}

pub fn construct() -> Box<dyn Datum> {
    Box::new(Calculator::default())
}

impl Parsable for Calculator {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        self.base.parse(parser);
        self.bolus = match parser.raw("bolus") {
            None => None,
            Some(Value::String(id)) => Some(BolusReference::Id(id.clone())),
            Some(Value::Object(document)) => Some(BolusReference::Embedded(document.clone())),
            Some(other) => {
                let actual = ValueKind::of(other);
                parser.report(
                    "bolus",
                    ErrorKind::TypeMismatch {
                        expected: ValueKind::String,
                        actual,
                    },
                );
                None
            }
        };
        self.carb_input = parser.float64("carbInput");
        self.insulin_on_board = parser.float64("insulinOnBoard");
        self.units = parser.string("units");
    }
}

impl Validatable for Calculator {
    fn validate(&self, validator: &mut Validator<'_>) {
        self.base.validate(validator);
        self.base.validate_discriminator(validator, TYPE, None);

        // Embedded documents get their own pass once split out; only their
        // kind is checked here.
        match &self.bolus {
            Some(BolusReference::Id(id)) => {
                validator
                    .string("bolus", Some(id.as_str()))
                    .length_in_range(1, ID_LENGTH_MAXIMUM);
            }
            Some(BolusReference::Embedded(document)) => {
                validator
                    .with_reference("bolus")
                    .string("type", document.get("type").and_then(Value::as_str))
                    .exists()
                    .equal_to(bolus::TYPE);
            }
            None => {}
        }
        validator
            .float64("carbInput", self.carb_input)
            .in_range(0.0, CARB_INPUT_MAXIMUM);
        validator
            .float64("insulinOnBoard", self.insulin_on_board)
            .in_range(0.0, INSULIN_ON_BOARD_MAXIMUM);
        validator
            .string("units", self.units.as_deref())
            .one_of(&UNITS);
    }
}

impl Normalizable for Calculator {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
        self.base.normalize(normalizer);

        if normalizer.origin() != Origin::User {
            return;
        }
        let Some(BolusReference::Embedded(document)) = &self.bolus else {
            return;
        };
        if document.get("type").and_then(Value::as_str) != Some(bolus::TYPE) {
            let pointer = normalizer.frame().pointer_to("bolus");
            normalizer.report_error(NormalizeError::EmbeddedDocumentMalformed {
                pointer,
                reason: "embedded document is not a bolus".into(),
            });
            return;
        }
        match document.get("id").and_then(Value::as_str) {
            Some(id) => {
                let id = id.to_owned();
                normalizer.add_data("bolus", Value::Object(document.clone()));
                self.bolus = Some(BolusReference::Id(id));
            }
            None => {
                let pointer = normalizer.frame().pointer_to("bolus");
                normalizer.report_error(NormalizeError::EmbeddedDocumentMalformed {
                    pointer,
                    reason: "embedded bolus has no string id".into(),
                });
            }
        }
    }
}

impl Datum for Calculator {
    fn meta(&self) -> Meta {
        self.base.meta()
    }

    fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
