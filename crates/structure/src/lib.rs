//! Datum Structure Layer
//!
//! The engine every record type is built on. Untyped documents come in, get
//! pulled apart field by field, checked, and then have their derived fields
//! computed, all while keeping track of exactly where each problem lives.
//!
//! ## What we do here
//!
//! - **Scope** - [`Frame`] carries a JSON pointer prefix and a [`Meta`]
//!   snapshot through every recursive call. Frames are values; nothing shares one.
//! - **Parse** - [`ObjectParser`] hands out typed values, tracks consumed
//!   fields, and reports wrong kinds as structural errors without stopping.
//! - **Validate** - [`Validator`] runs chainable checks (`exists`, `in_range`,
//!   `one_of`, ...) and accumulates every failure.
//! - **Normalize** - [`Normalizer`] lets a record compute or clear derived
//!   fields according to its [`Origin`], and hand nested documents back for
//!   another pass.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use structure::{
//!     Errors, Frame, Meta, ObjectParser, Parsable, UnexpectedFieldPolicy, Validatable, Validator,
//! };
//!
//! #[derive(Default)]
//! struct Reading {
//!     value: Option<f64>,
//! }
//!
//! impl Parsable for Reading {
//!     fn parse(&mut self, parser: &mut ObjectParser<'_>) {
//!         self.value = parser.float64("value");
//!     }
//! }
//!
//! impl Validatable for Reading {
//!     fn validate(&self, validator: &mut Validator<'_>) {
//!         validator.float64("value", self.value).exists().in_range(0.0, 55.0);
//!     }
//! }
//!
//! let document = json!({"value": 60.0});
//! let mut errors = Errors::new();
//! let mut reading = Reading::default();
//!
//! let frame = Frame::root().with_meta(Meta::new("cbg", None));
//! let mut parser = ObjectParser::new(
//!     document.as_object().unwrap(),
//!     frame.clone(),
//!     &mut errors,
//!     UnexpectedFieldPolicy::Reject,
//! );
//! reading.parse(&mut parser);
//! parser.finish();
//! reading.validate(&mut Validator::new(frame, &mut errors));
//!
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.as_slice()[0].pointer.as_str(), "/value");
//! assert_eq!(errors.as_slice()[0].code(), "value-not-in-range");
//! ```

pub mod error;
pub mod frame;
pub mod normalizer;
pub mod parser;
pub mod validator;

pub use crate::error::{ErrorCategory, ErrorKind, Errors, ValidationError, ValueKind};
pub use crate::frame::{Frame, Meta, Pointer, Segment};
pub use crate::normalizer::{
    Discovered, Normalizable, NormalizeError, NormalizeState, Normalizer, Origin,
};
pub use crate::parser::{ArrayParser, ObjectParser, Parsable, UnexpectedFieldPolicy};
pub use crate::validator::{Length, Validatable, ValueValidator, Validator};
