//! Typed extraction from untyped documents.
//!
//! [`ObjectParser`] wraps one JSON object and hands out typed values field by
//! field. Every accessor marks its field as consumed, so once a record has
//! pulled everything it knows about, [`ObjectParser::finish`] can report the
//! fields nobody asked for according to the configured
//! [`UnexpectedFieldPolicy`].
//!
//! # Parsing Rules
//!
//! | Situation | Result | Error |
//! |-----------|--------|-------|
//! | field absent | `None` | none |
//! | field is `null` | `None` | none |
//! | field present, right kind | `Some(value)` | none |
//! | field present, wrong kind | `None` | `type-not-<kind>` |
//! | time string not RFC3339 | `None` | `value-time-not-parsable` |
//!
//! A wrong kind never aborts the record: parsing continues with the next field
//! so the caller sees every structural problem at once. Presence is not
//! checked here; that is the validator's job.
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use structure::{Errors, Frame, ObjectParser, UnexpectedFieldPolicy};
//!
//! let document = json!({"normal": 1.5, "prescriptor": 7});
//! let object = document.as_object().unwrap();
//! let mut errors = Errors::new();
//!
//! let mut parser =
//!     ObjectParser::new(object, Frame::root(), &mut errors, UnexpectedFieldPolicy::Reject);
//! assert_eq!(parser.float64("normal"), Some(1.5));
//! assert_eq!(parser.string("prescriptor"), None);
//! assert_eq!(parser.string("absent"), None);
//! parser.finish();
//!
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.as_slice()[0].pointer.as_str(), "/prescriptor");
//! assert_eq!(errors.as_slice()[0].code(), "type-not-string");
//! ```
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ErrorKind, Errors, ValidationError, ValueKind};
use crate::frame::{Frame, Segment};

/// Something that can populate itself from an [`ObjectParser`].
pub trait Parsable {
    fn parse(&mut self, parser: &mut ObjectParser<'_>);
}

/// What to do with object members no accessor consumed.
///
/// This is a per-deployment choice; see `PipelineConfig::unexpected_fields`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnexpectedFieldPolicy {
    /// Silently accept extra members.
    Ignore,
    /// Accept extra members but emit a `warn` event for each.
    Warn,
    /// Report a `not-parsed` structural error for each extra member.
    #[default]
    Reject,
}

fn kind_matches(value: &Value, expected: ValueKind) -> bool {
    match expected {
        ValueKind::Number | ValueKind::Integer => matches!(value, Value::Number(_)),
        other => ValueKind::of(value) == other,
    }
}

fn report_to(errors: &mut Errors, frame: &Frame, reference: Segment, kind: ErrorKind) {
    errors.push(ValidationError::new(
        frame.pointer_to(reference),
        frame.meta().cloned(),
        kind,
    ));
}

fn mismatch(expected: ValueKind, value: &Value) -> ErrorKind {
    ErrorKind::TypeMismatch {
        expected,
        actual: ValueKind::of(value),
    }
}

fn as_int(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(int) = number.as_i64() {
        return Some(int);
    }
    // 2^63 as f64; the cast below saturates otherwise.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 && float >= -LIMIT && float < LIMIT => {
            Some(float as i64)
        }
        _ => None,
    }
}

fn as_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Field-consuming view over one JSON object.
pub struct ObjectParser<'p> {
    object: &'p Map<String, Value>,
    frame: Frame,
    errors: &'p mut Errors,
    policy: UnexpectedFieldPolicy,
    consumed: HashSet<&'p str>,
}

impl<'p> ObjectParser<'p> {
    pub fn new(
        object: &'p Map<String, Value>,
        frame: Frame,
        errors: &'p mut Errors,
        policy: UnexpectedFieldPolicy,
    ) -> Self {
        Self {
            object,
            frame,
            errors,
            policy,
            consumed: HashSet::new(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn policy(&self) -> UnexpectedFieldPolicy {
        self.policy
    }

    /// Appends an error located at `reference` within this object.
    pub fn report(&mut self, reference: impl Into<Segment>, kind: ErrorKind) {
        report_to(self.errors, &self.frame, reference.into(), kind);
    }

    /// Marks `field` consumed and returns its value; `null` reads as absent.
    fn lookup(&mut self, field: &str) -> Option<&'p Value> {
        let object = self.object;
        let (key, value) = object.get_key_value(field)?;
        self.consumed.insert(key.as_str());
        (!value.is_null()).then_some(value)
    }

    fn typed<T>(
        &mut self,
        field: &str,
        expected: ValueKind,
        extract: impl FnOnce(&'p Value) -> Option<T>,
    ) -> Option<T> {
        let value = self.lookup(field)?;
        let extracted = if kind_matches(value, expected) {
            extract(value)
        } else {
            None
        };
        if extracted.is_none() {
            self.report(field, mismatch(expected, value));
        }
        extracted
    }

    /// The raw member, consumed, without any kind check.
    pub fn raw(&mut self, field: &str) -> Option<&'p Value> {
        self.lookup(field)
    }

    pub fn string(&mut self, field: &str) -> Option<String> {
        self.typed(field, ValueKind::String, |value| {
            value.as_str().map(str::to_owned)
        })
    }

    pub fn float64(&mut self, field: &str) -> Option<f64> {
        self.typed(field, ValueKind::Number, Value::as_f64)
    }

    /// Integral numbers only; `5.0` is accepted, `5.5` is a type mismatch.
    pub fn int(&mut self, field: &str) -> Option<i64> {
        self.typed(field, ValueKind::Integer, as_int)
    }

    pub fn bool(&mut self, field: &str) -> Option<bool> {
        self.typed(field, ValueKind::Boolean, Value::as_bool)
    }

    /// RFC3339 time string, normalized to UTC.
    pub fn time(&mut self, field: &str) -> Option<DateTime<Utc>> {
        let text = self.string(field)?;
        let parsed = as_time(&text);
        if parsed.is_none() {
            self.report(field, ErrorKind::TimeNotParsable { value: text });
        }
        parsed
    }

    /// Child parser for a nested object, scoped one path segment deeper.
    pub fn object(&mut self, field: &str) -> Option<ObjectParser<'_>> {
        let value = self.lookup(field)?;
        match value {
            Value::Object(object) => Some(ObjectParser::new(
                object,
                self.frame.with_path_segment(field),
                &mut *self.errors,
                self.policy,
            )),
            other => {
                self.report(field, mismatch(ValueKind::Object, other));
                None
            }
        }
    }

    /// Index-addressed view over a nested array.
    pub fn array(&mut self, field: &str) -> Option<ArrayParser<'_>> {
        let value = self.lookup(field)?;
        match value {
            Value::Array(array) => Some(ArrayParser {
                array,
                frame: self.frame.with_path_segment(field),
                errors: &mut *self.errors,
                policy: self.policy,
            }),
            other => {
                self.report(field, mismatch(ValueKind::Array, other));
                None
            }
        }
    }

    /// Parses a nested sub-record and applies the unexpected-field policy to it.
    pub fn parse_object<T: Parsable + Default>(&mut self, field: &str) -> Option<T> {
        let mut parser = self.object(field)?;
        let mut value = T::default();
        value.parse(&mut parser);
        parser.finish();
        Some(value)
    }

    /// Parses an array of sub-records; see [`ArrayParser::parse_objects`].
    pub fn parse_objects<T: Parsable + Default>(&mut self, field: &str) -> Option<Vec<T>> {
        let mut array = self.array(field)?;
        Some(array.parse_objects())
    }

    pub fn string_array(&mut self, field: &str) -> Option<Vec<String>> {
        let mut array = self.array(field)?;
        Some((0..array.len()).filter_map(|index| array.string(index)).collect())
    }

    /// Applies the unexpected-field policy to every member not consumed so far.
    pub fn finish(self) {
        let object = self.object;
        for key in object.keys() {
            if self.consumed.contains(key.as_str()) {
                continue;
            }
            match self.policy {
                UnexpectedFieldPolicy::Ignore => {}
                UnexpectedFieldPolicy::Warn => {
                    warn!(
                        pointer = %self.frame.pointer_to(key.as_str()),
                        meta = ?self.frame.meta(),
                        "unexpected_field"
                    );
                }
                UnexpectedFieldPolicy::Reject => {
                    report_to(
                        &mut *self.errors,
                        &self.frame,
                        Segment::from(key.as_str()),
                        ErrorKind::NotParsed,
                    );
                }
            }
        }
    }
}

/// Lazy, index-addressed view over one JSON array.
///
/// Elements are only inspected when asked for, each through its own
/// short-lived parser, so errors land at `/<field>/<index>`.
pub struct ArrayParser<'p> {
    array: &'p [Value],
    frame: Frame,
    errors: &'p mut Errors,
    policy: UnexpectedFieldPolicy,
}

impl<'p> ArrayParser<'p> {
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    fn element(&self, index: usize) -> Option<&'p Value> {
        let array = self.array;
        array.get(index).filter(|value| !value.is_null())
    }

    fn report(&mut self, index: usize, kind: ErrorKind) {
        report_to(self.errors, &self.frame, Segment::Index(index), kind);
    }

    pub fn string(&mut self, index: usize) -> Option<String> {
        let value = self.element(index)?;
        match value {
            Value::String(text) => Some(text.clone()),
            other => {
                self.report(index, mismatch(ValueKind::String, other));
                None
            }
        }
    }

    pub fn float64(&mut self, index: usize) -> Option<f64> {
        let value = self.element(index)?;
        match value.as_f64() {
            Some(number) => Some(number),
            None => {
                self.report(index, mismatch(ValueKind::Number, value));
                None
            }
        }
    }

    pub fn object(&mut self, index: usize) -> Option<ObjectParser<'_>> {
        let value = self.element(index)?;
        match value {
            Value::Object(object) => Some(ObjectParser::new(
                object,
                self.frame.with_path_segment(index),
                &mut *self.errors,
                self.policy,
            )),
            other => {
                self.report(index, mismatch(ValueKind::Object, other));
                None
            }
        }
    }

    /// Parses every element as a sub-record.
    ///
    /// Elements that are not objects are reported and stand in as
    /// `T::default()`, so the result stays index-aligned with the document.
    pub fn parse_objects<T: Parsable + Default>(&mut self) -> Vec<T> {
        let mut parsed = Vec::with_capacity(self.len());
        for index in 0..self.len() {
            let mut value = T::default();
            if let Some(mut parser) = self.object(index) {
                value.parse(&mut parser);
                parser.finish();
            }
            parsed.push(value);
        }
        parsed
    }
}
