//! Error model shared by the parser and the validator.
//!
//! Every problem found in a record becomes a [`ValidationError`]: a pointer
//! to the offending value, the [`Meta`] snapshot active when the problem was
//! detected, and an [`ErrorKind`] describing what went wrong. Errors are
//! accumulated into an [`Errors`] list in the order they were found; nothing
//! in this crate stops at the first failure.
//!
//! # Error Categories
//!
//! | Category | Kinds | Raised by |
//! |----------|-------|-----------|
//! | Structural | `TypeMismatch`, `TimeNotParsable`, `NotParsed`, `TypeNotRecognized` | parser, registry |
//! | Presence | `ValueNotExists`, `ValueExists`, `ValueEmpty` | validator |
//! | Equality | `ValueNotEqualTo` | validator |
//! | Range | `ValueNotInRange`, `TimeNotInRange` | validator |
//! | Length | `LengthNotInRange` | validator |
//! | Enum | `ValueNotOneOf` | validator |
//!
//! # Wire Shape
//!
//! ```json
//! {
//!   "pointer": "/normal",
//!   "meta": { "type": "bolus", "subType": "pen" },
//!   "code": "value-not-in-range",
//!   "title": "value is not in range",
//!   "detail": "value -0.1 is not between 0 and 100",
//!   "value": -0.1,
//!   "bounds": [0.0, 100.0]
//! }
//! ```
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::frame::{Meta, Pointer};

/// Broad classification of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The document could not be read as the expected shape.
    Structural,
    Presence,
    Equality,
    Range,
    Length,
    Enum,
}

/// JSON kind of a value, as seen by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Integer,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// What went wrong with a single value.
///
/// The `Display` text is the human-readable `detail` of the reported error.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("type is not {expected}, but {actual}")]
    TypeMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("value {value:?} is not a parsable RFC3339 time")]
    TimeNotParsable { value: String },

    /// A field the record shape does not declare.
    #[error("value is not parsed")]
    NotParsed,

    #[error("type {type_:?} with sub type {sub_type:?} is not recognized")]
    TypeNotRecognized {
        type_: String,
        sub_type: Option<String>,
    },

    #[error("value does not exist")]
    ValueNotExists,

    #[error("value exists")]
    ValueExists,

    #[error("value is empty")]
    ValueEmpty,

    #[error("value {got} is not equal to {want}")]
    ValueNotEqualTo { got: Value, want: Value },

    #[error("value {got} is not between {min} and {max}")]
    ValueNotInRange { got: f64, min: f64, max: f64 },

    #[error("value {} is not between {} and {}", rfc3339(.got), rfc3339(.min), rfc3339(.max))]
    TimeNotInRange {
        got: DateTime<Utc>,
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    },

    #[error("length {got} is not between {min} and {max}")]
    LengthNotInRange { got: usize, min: usize, max: usize },

    #[error("value {got:?} is not one of {allowed:?}")]
    ValueNotOneOf { got: String, allowed: Vec<String> },
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::TypeMismatch { .. }
            | ErrorKind::TimeNotParsable { .. }
            | ErrorKind::NotParsed
            | ErrorKind::TypeNotRecognized { .. } => ErrorCategory::Structural,
            ErrorKind::ValueNotExists | ErrorKind::ValueExists | ErrorKind::ValueEmpty => {
                ErrorCategory::Presence
            }
            ErrorKind::ValueNotEqualTo { .. } => ErrorCategory::Equality,
            ErrorKind::ValueNotInRange { .. } | ErrorKind::TimeNotInRange { .. } => {
                ErrorCategory::Range
            }
            ErrorKind::LengthNotInRange { .. } => ErrorCategory::Length,
            ErrorKind::ValueNotOneOf { .. } => ErrorCategory::Enum,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch { expected, .. } => match expected {
                ValueKind::Null => "type-not-null",
                ValueKind::Boolean => "type-not-boolean",
                ValueKind::Integer => "type-not-integer",
                ValueKind::Number => "type-not-number",
                ValueKind::String => "type-not-string",
                ValueKind::Array => "type-not-array",
                ValueKind::Object => "type-not-object",
            },
            ErrorKind::TimeNotParsable { .. } => "value-time-not-parsable",
            ErrorKind::NotParsed => "not-parsed",
            ErrorKind::TypeNotRecognized { .. } => "type-not-recognized",
            ErrorKind::ValueNotExists => "value-not-exists",
            ErrorKind::ValueExists => "value-exists",
            ErrorKind::ValueEmpty => "value-empty",
            ErrorKind::ValueNotEqualTo { .. } => "value-not-equal-to",
            ErrorKind::ValueNotInRange { .. } | ErrorKind::TimeNotInRange { .. } => {
                "value-not-in-range"
            }
            ErrorKind::LengthNotInRange { .. } => "length-not-in-range",
            ErrorKind::ValueNotOneOf { .. } => "value-not-one-of",
        }
    }

    /// Short human-readable summary.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch { .. } => "type is not expected",
            ErrorKind::TimeNotParsable { .. } => "value is not a parsable time",
            ErrorKind::NotParsed => "not parsed",
            ErrorKind::TypeNotRecognized { .. } => "type is not recognized",
            ErrorKind::ValueNotExists => "value does not exist",
            ErrorKind::ValueExists => "value exists",
            ErrorKind::ValueEmpty => "value is empty",
            ErrorKind::ValueNotEqualTo { .. } => "value is not equal to",
            ErrorKind::ValueNotInRange { .. } | ErrorKind::TimeNotInRange { .. } => {
                "value is not in range"
            }
            ErrorKind::LengthNotInRange { .. } => "length is not in range",
            ErrorKind::ValueNotOneOf { .. } => "value is not one of the allowed values",
        }
    }

    pub fn detail(&self) -> String {
        self.to_string()
    }

    /// The value that was rejected, when the kind carries one.
    pub fn offending_value(&self) -> Option<Value> {
        match self {
            ErrorKind::TimeNotParsable { value } => Some(Value::String(value.clone())),
            ErrorKind::ValueNotEqualTo { got, .. } => Some(got.clone()),
            ErrorKind::ValueNotInRange { got, .. } => Some(Value::from(*got)),
            ErrorKind::TimeNotInRange { got, .. } => Some(Value::String(rfc3339(got))),
            ErrorKind::LengthNotInRange { got, .. } => Some(Value::from(*got)),
            ErrorKind::ValueNotOneOf { got, .. } => Some(Value::String(got.clone())),
            _ => None,
        }
    }

    /// Inclusive `(min, max)` bounds for range and length kinds.
    pub fn bounds(&self) -> Option<(Value, Value)> {
        match self {
            ErrorKind::ValueNotInRange { min, max, .. } => {
                Some((Value::from(*min), Value::from(*max)))
            }
            ErrorKind::TimeNotInRange { min, max, .. } => Some((
                Value::String(rfc3339(min)),
                Value::String(rfc3339(max)),
            )),
            ErrorKind::LengthNotInRange { min, max, .. } => {
                Some((Value::from(*min), Value::from(*max)))
            }
            _ => None,
        }
    }
}

/// A single violation, located and attributed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{pointer}: {kind}")]
pub struct ValidationError {
    pub pointer: Pointer,
    pub meta: Option<Meta>,
    pub kind: ErrorKind,
}

impl ValidationError {
    pub fn new(pointer: Pointer, meta: Option<Meta>, kind: ErrorKind) -> Self {
        Self {
            pointer,
            meta,
            kind,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.kind.offending_value();
        let bounds = self.kind.bounds();
        let mut len = 4;
        len += usize::from(self.meta.is_some());
        len += usize::from(value.is_some());
        len += usize::from(bounds.is_some());

        let mut state = serializer.serialize_struct("ValidationError", len)?;
        state.serialize_field("pointer", &self.pointer)?;
        if let Some(meta) = &self.meta {
            state.serialize_field("meta", meta)?;
        }
        state.serialize_field("code", self.kind.code())?;
        state.serialize_field("title", self.kind.title())?;
        state.serialize_field("detail", &self.kind.detail())?;
        if let Some(value) = &value {
            state.serialize_field("value", value)?;
        }
        if let Some(bounds) = &bounds {
            state.serialize_field("bounds", bounds)?;
        }
        state.end()
    }
}

/// Ordered accumulator of [`ValidationError`]s for one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Errors(Vec<ValidationError>);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: Errors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ValidationError] {
        &self.0
    }

    /// True once any structural problem was recorded; normalization is skipped then.
    pub fn has_structural(&self) -> bool {
        self.0
            .iter()
            .any(|error| error.category() == ErrorCategory::Structural)
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl From<ValidationError> for Errors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for Errors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'e> IntoIterator for &'e Errors {
    type Item = &'e ValidationError;
    type IntoIter = std::slice::Iter<'e, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
