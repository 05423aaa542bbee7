//! Datum Data Layer
//!
//! Concrete record types and the registry that picks one for each incoming
//! document.
//!
//! ## What we do here
//!
//! - **Envelope** - [`Base`] holds the fields every record carries (`id`,
//!   `type`, `subType`, `time`, device and upload ids, offsets, store times).
//! - **Dispatch** - [`Registry`] maps a `(type, subType)` [`Discriminator`] to a
//!   constructor. It is built once, frozen, and shared read-only.
//! - **Record types** - dosing events, CGM readings, device settings and
//!   calculator records, each declaring its own parse, validate and normalize
//!   rules next to its fields.
//!
//! ## Example
//!
//! ```
//! use data::{Discriminator, Registry};
//!
//! let registry = Registry::builtin().unwrap();
//! let construct = registry
//!     .resolve(&Discriminator::new("bolus", Some("pen")))
//!     .unwrap();
//! let datum = construct();
//! assert_eq!(datum.meta().sub_type.as_deref(), Some("pen"));
//! ```
use std::fmt::Debug;

use serde_json::Value;
use structure::{Meta, Normalizable, Parsable, Validatable};

mod base;
mod registry;
pub mod types;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use crate::base::{
    Base, CLOCK_DRIFT_OFFSET_MAXIMUM, DEVICE_ID_LENGTH_MAXIMUM, ID_LENGTH_MAXIMUM,
    TIMEZONE_OFFSET_MAXIMUM, UPLOAD_ID_LENGTH_MAXIMUM,
};
pub use crate::registry::{Constructor, Discriminator, Registry, RegistryBuilder, RegistryError};

/// One polymorphic record: parse, validate, normalize, and hand back out.
pub trait Datum: Parsable + Validatable + Normalizable + Debug + Send + Sync {
    /// Discriminator currently present on the record, for error attribution.
    fn meta(&self) -> Meta;

    /// The record in its stored document shape.
    fn to_document(&self) -> Result<Value, serde_json::Error>;
}
