//! Declarative, chainable constraint checks over parsed values.
//!
//! A [`Validator`] is a [`Frame`] plus a borrowed [`Errors`] list. Each typed
//! accessor (`string`, `float64`, `int`, `bool`, `time`, `length`) returns a
//! [`ValueValidator`] whose combinators can be chained; every failing check
//! appends its own error and never suppresses the checks after it.
//!
//! Checks other than `exists` only look at present values: an absent value
//! never fails `in_range`, `equal_to`, `one_of` or `length_in_range`.
//!
//! # Examples
//!
//! ```rust
//! use structure::{Errors, Frame, Meta, Validator};
//!
//! let mut errors = Errors::new();
//! let mut validator = Validator::new(Frame::root(), &mut errors);
//! let mut validator = validator.with_meta(Meta::new("bolus", Some("pen")));
//!
//! validator.float64("normal", Some(-0.1)).exists().in_range(0.0, 100.0);
//! validator.string("prescriptor", None).one_of(&["auto", "manual"]);
//! validator.string("name", None).exists().length_in_range(1, 1000);
//!
//! let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
//! assert_eq!(codes, ["value-not-in-range", "value-not-exists"]);
//! ```
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{ErrorKind, Errors, ValidationError};
use crate::frame::{Frame, Meta, Segment};

/// Something that can check itself against a [`Validator`] without mutation.
pub trait Validatable {
    fn validate(&self, validator: &mut Validator<'_>);
}

/// Length of a string or sequence under validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length(pub usize);

/// Frame-scoped check runner.
pub struct Validator<'v> {
    frame: Frame,
    errors: &'v mut Errors,
}

impl<'v> Validator<'v> {
    pub fn new(frame: Frame, errors: &'v mut Errors) -> Self {
        Self { frame, errors }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn has_meta(&self) -> bool {
        self.frame.has_meta()
    }

    /// Child validator attributing its errors to `meta`.
    pub fn with_meta(&mut self, meta: Meta) -> Validator<'_> {
        Validator {
            frame: self.frame.with_meta(meta),
            errors: &mut *self.errors,
        }
    }

    /// Child validator scoped one path segment deeper.
    pub fn with_reference(&mut self, reference: impl Into<Segment>) -> Validator<'_> {
        Validator {
            frame: self.frame.with_path_segment(reference),
            errors: &mut *self.errors,
        }
    }

    pub fn report(&mut self, reference: impl Into<Segment>, kind: ErrorKind) {
        self.errors.push(ValidationError::new(
            self.frame.pointer_to(reference),
            self.frame.meta().cloned(),
            kind,
        ));
    }

    fn value<T>(&mut self, reference: impl Into<Segment>, value: Option<T>) -> ValueValidator<'_, T> {
        ValueValidator {
            frame: &self.frame,
            errors: &mut *self.errors,
            reference: reference.into(),
            value,
        }
    }

    pub fn string<'s>(
        &mut self,
        reference: impl Into<Segment>,
        value: Option<&'s str>,
    ) -> ValueValidator<'_, &'s str> {
        self.value(reference, value)
    }

    pub fn float64(
        &mut self,
        reference: impl Into<Segment>,
        value: Option<f64>,
    ) -> ValueValidator<'_, f64> {
        self.value(reference, value)
    }

    pub fn int(
        &mut self,
        reference: impl Into<Segment>,
        value: Option<i64>,
    ) -> ValueValidator<'_, i64> {
        self.value(reference, value)
    }

    pub fn bool(
        &mut self,
        reference: impl Into<Segment>,
        value: Option<bool>,
    ) -> ValueValidator<'_, bool> {
        self.value(reference, value)
    }

    pub fn time(
        &mut self,
        reference: impl Into<Segment>,
        value: Option<DateTime<Utc>>,
    ) -> ValueValidator<'_, DateTime<Utc>> {
        self.value(reference, value)
    }

    /// Validates the length of a sequence, e.g. `values.map(<[T]>::len)`.
    pub fn length(
        &mut self,
        reference: impl Into<Segment>,
        value: Option<usize>,
    ) -> ValueValidator<'_, Length> {
        self.value(reference, value.map(Length))
    }

    /// Runs a nested sub-record's checks one path segment deeper.
    pub fn validate_object<T: Validatable>(
        &mut self,
        reference: impl Into<Segment>,
        value: Option<&T>,
    ) {
        if let Some(value) = value {
            value.validate(&mut self.with_reference(reference));
        }
    }

    /// Runs each element's checks at `/<reference>/<index>`.
    pub fn validate_objects<T: Validatable>(
        &mut self,
        reference: impl Into<Segment>,
        values: Option<&[T]>,
    ) {
        let Some(values) = values else {
            return;
        };
        let mut sequence = self.with_reference(reference);
        for (index, value) in values.iter().enumerate() {
            value.validate(&mut sequence.with_reference(index));
        }
    }
}

/// Chainable checks over one optional value.
pub struct ValueValidator<'v, T> {
    frame: &'v Frame,
    errors: &'v mut Errors,
    reference: Segment,
    value: Option<T>,
}

impl<T> ValueValidator<'_, T> {
    fn report(&mut self, kind: ErrorKind) {
        self.errors.push(ValidationError::new(
            self.frame.pointer_to(self.reference.clone()),
            self.frame.meta().cloned(),
            kind,
        ));
    }

    /// Fails with `value-not-exists` when absent.
    pub fn exists(mut self) -> Self {
        if self.value.is_none() {
            self.report(ErrorKind::ValueNotExists);
        }
        self
    }

    /// Fails with `value-exists` when present.
    pub fn not_exists(mut self) -> Self {
        if self.value.is_some() {
            self.report(ErrorKind::ValueExists);
        }
        self
    }
}

impl<'s> ValueValidator<'_, &'s str> {
    pub fn not_empty(mut self) -> Self {
        if self.value == Some("") {
            self.report(ErrorKind::ValueEmpty);
        }
        self
    }

    pub fn equal_to(mut self, want: &str) -> Self {
        if let Some(got) = self.value {
            if got != want {
                self.report(ErrorKind::ValueNotEqualTo {
                    got: Value::from(got),
                    want: Value::from(want),
                });
            }
        }
        self
    }

    pub fn one_of(mut self, allowed: &[&str]) -> Self {
        if let Some(got) = self.value {
            if !allowed.contains(&got) {
                self.report(ErrorKind::ValueNotOneOf {
                    got: got.to_owned(),
                    allowed: allowed.iter().map(|value| (*value).to_owned()).collect(),
                });
            }
        }
        self
    }

    /// Inclusive bounds on the number of characters.
    pub fn length_in_range(mut self, min: usize, max: usize) -> Self {
        if let Some(got) = self.value {
            let got = got.chars().count();
            if got < min || got > max {
                self.report(ErrorKind::LengthNotInRange { got, min, max });
            }
        }
        self
    }
}

impl ValueValidator<'_, f64> {
    pub fn equal_to(mut self, want: f64) -> Self {
        if let Some(got) = self.value {
            if got != want {
                self.report(ErrorKind::ValueNotEqualTo {
                    got: Value::from(got),
                    want: Value::from(want),
                });
            }
        }
        self
    }

    /// Inclusive at both ends.
    pub fn in_range(mut self, min: f64, max: f64) -> Self {
        if let Some(got) = self.value {
            if !(min..=max).contains(&got) {
                self.report(ErrorKind::ValueNotInRange { got, min, max });
            }
        }
        self
    }
}

impl ValueValidator<'_, i64> {
    pub fn equal_to(mut self, want: i64) -> Self {
        if let Some(got) = self.value {
            if got != want {
                self.report(ErrorKind::ValueNotEqualTo {
                    got: Value::from(got),
                    want: Value::from(want),
                });
            }
        }
        self
    }

    /// Inclusive at both ends.
    pub fn in_range(mut self, min: i64, max: i64) -> Self {
        if let Some(got) = self.value {
            if !(min..=max).contains(&got) {
                self.report(ErrorKind::ValueNotInRange {
                    got: got as f64,
                    min: min as f64,
                    max: max as f64,
                });
            }
        }
        self
    }
}

impl ValueValidator<'_, bool> {
    pub fn equal_to(mut self, want: bool) -> Self {
        if let Some(got) = self.value {
            if got != want {
                self.report(ErrorKind::ValueNotEqualTo {
                    got: Value::from(got),
                    want: Value::from(want),
                });
            }
        }
        self
    }
}

impl ValueValidator<'_, DateTime<Utc>> {
    /// Inclusive at both ends.
    pub fn in_range(mut self, min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        if let Some(got) = self.value {
            if got < min || got > max {
                self.report(ErrorKind::TimeNotInRange { got, min, max });
            }
        }
        self
    }
}

impl ValueValidator<'_, Length> {
    /// Inclusive bounds on the number of elements.
    pub fn length_in_range(mut self, min: usize, max: usize) -> Self {
        if let Some(Length(got)) = self.value {
            if got < min || got > max {
                self.report(ErrorKind::LengthNotInRange { got, min, max });
            }
        }
        self
    }
}
