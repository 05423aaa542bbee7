//! `(type, subType)` dispatch.
//!
//! Registration happens once at startup through a [`RegistryBuilder`]; the
//! built [`Registry`] is immutable, so any number of workers can resolve
//! against it without locking.
//!
//! # Resolution Rules
//!
//! - lookup is exact: `("bolus", Some("pen"))` never matches `("bolus", None)`
//! - a type registered without a sub type cannot also have sub type entries,
//!   and the other way around; the builder rejects the second registration
use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use structure::{ErrorKind, Frame, Meta, ValidationError, ValueKind};
use thiserror::Error;
use tracing::debug;

use crate::types::{application, bolus, calculator, cbg, pump_settings};
use crate::Datum;

/// Builds a fresh, empty record ready to be parsed.
pub type Constructor = fn() -> Box<dyn Datum>;

/// The `(type, subType)` pair selecting a record's concrete shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Discriminator {
    pub type_: String,
    pub sub_type: Option<String>,
}

impl Discriminator {
    pub fn new(type_: impl Into<String>, sub_type: Option<&str>) -> Self {
        Self {
            type_: type_.into(),
            sub_type: sub_type.map(str::to_owned),
        }
    }

    /// Reads the discriminator members of `object`.
    ///
    /// `type` must be present and a string. `subType` is optional but must be
    /// a string when present. The returned error is located within `frame`.
    pub fn extract(object: &Map<String, Value>, frame: &Frame) -> Result<Self, ValidationError> {
        let fail = |field: &str, kind: ErrorKind| {
            // Nothing about the record is known yet; attribute to an empty meta.
            let meta = frame.meta().cloned().unwrap_or_default();
            ValidationError::new(frame.pointer_to(field), Some(meta), kind)
        };
        let type_ = match object.get("type") {
            None | Some(Value::Null) => return Err(fail("type", ErrorKind::ValueNotExists)),
            Some(Value::String(type_)) => type_.clone(),
            Some(other) => {
                return Err(fail(
                    "type",
                    ErrorKind::TypeMismatch {
                        expected: ValueKind::String,
                        actual: ValueKind::of(other),
                    },
                ))
            }
        };
        let sub_type = match object.get("subType") {
            None | Some(Value::Null) => None,
            Some(Value::String(sub_type)) => Some(sub_type.clone()),
            Some(other) => {
                return Err(fail(
                    "subType",
                    ErrorKind::TypeMismatch {
                        expected: ValueKind::String,
                        actual: ValueKind::of(other),
                    },
                ))
            }
        };
        Ok(Self { type_, sub_type })
    }

    pub fn meta(&self) -> Meta {
        Meta::new(self.type_.clone(), self.sub_type.as_deref())
    }

    /// The structural error reported for a pair nothing is registered under.
    pub fn not_recognized(&self, frame: &Frame) -> ValidationError {
        ValidationError::new(
            frame.pointer(),
            Some(self.meta()),
            ErrorKind::TypeNotRecognized {
                type_: self.type_.clone(),
                sub_type: self.sub_type.clone(),
            },
        )
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_type {
            Some(sub_type) => write!(f, "{}/{}", self.type_, sub_type),
            None => f.write_str(&self.type_),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("record type {0} is already registered")]
    Duplicate(Discriminator),

    #[error("record type {type_:?} cannot be registered both with and without a sub type")]
    AmbiguousSubType { type_: String },

    #[error("record type {0} is not registered")]
    NotFound(Discriminator),
}

/// Mutable registration phase; call [`RegistryBuilder::build`] to freeze.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<Discriminator, Constructor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        type_: &str,
        sub_type: Option<&str>,
        constructor: Constructor,
    ) -> Result<&mut Self, RegistryError> {
        let discriminator = Discriminator::new(type_, sub_type);
        if self.entries.contains_key(&discriminator) {
            return Err(RegistryError::Duplicate(discriminator));
        }
        let conflicting = self
            .entries
            .keys()
            .any(|key| key.type_ == type_ && key.sub_type.is_some() != sub_type.is_some());
        if conflicting {
            return Err(RegistryError::AmbiguousSubType {
                type_: type_.to_owned(),
            });
        }
        self.entries.insert(discriminator, constructor);
        Ok(self)
    }

    /// Registers every built-in record type.
    pub fn register_builtin(&mut self) -> Result<&mut Self, RegistryError> {
        self.register(bolus::TYPE, Some(bolus::normal::SUB_TYPE), bolus::normal::construct)?
            .register(bolus::TYPE, Some(bolus::pen::SUB_TYPE), bolus::pen::construct)?
            .register(cbg::TYPE, None, cbg::construct)?
            .register(application::TYPE, None, application::construct)?
            .register(pump_settings::TYPE, None, pump_settings::construct)?
            .register(calculator::TYPE, None, calculator::construct)
    }

    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }
}

/// Frozen, read-only dispatch table.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: BTreeMap<Discriminator, Constructor>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry holding every built-in record type.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::new();
        builder.register_builtin()?;
        Ok(builder.build())
    }

    pub fn resolve(&self, discriminator: &Discriminator) -> Result<Constructor, RegistryError> {
        let resolved = self.entries.get(discriminator).copied();
        debug!(
            discriminator = %discriminator,
            found = resolved.is_some(),
            "registry_resolve"
        );
        resolved.ok_or_else(|| RegistryError::NotFound(discriminator.clone()))
    }

    /// Registered discriminators in sorted order.
    pub fn entries(&self) -> impl Iterator<Item = &Discriminator> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: &Value) -> &Map<String, Value> {
        value.as_object().unwrap()
    }

    #[test]
    fn builtin_resolves_every_variant() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.len(), 6);

        for discriminator in registry.entries() {
            let construct = registry.resolve(discriminator).unwrap();
            let meta = construct().meta();
            assert_eq!(meta.type_, discriminator.type_);
            assert_eq!(meta.sub_type, discriminator.sub_type);
        }
    }

    #[test]
    fn resolution_is_exact() {
        let registry = Registry::builtin().unwrap();
        let missing = Discriminator::new("bolus", None);
        assert_eq!(
            registry.resolve(&missing).unwrap_err(),
            RegistryError::NotFound(missing)
        );
        assert!(registry
            .resolve(&Discriminator::new("cbg", Some("extra")))
            .is_err());
        assert!(registry
            .resolve(&Discriminator::new("invalidType", None))
            .is_err());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register("cbg", None, cbg::construct).unwrap();
        assert_eq!(
            builder.register("cbg", None, cbg::construct).unwrap_err(),
            RegistryError::Duplicate(Discriminator::new("cbg", None))
        );
    }

    #[test]
    fn mixing_bare_and_sub_typed_entries_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("bolus", Some("pen"), bolus::pen::construct)
            .unwrap();
        assert!(matches!(
            builder.register("bolus", None, bolus::pen::construct),
            Err(RegistryError::AmbiguousSubType { .. })
        ));

        let mut builder = RegistryBuilder::new();
        builder.register("cbg", None, cbg::construct).unwrap();
        assert!(matches!(
            builder.register("cbg", Some("other"), cbg::construct),
            Err(RegistryError::AmbiguousSubType { .. })
        ));
    }

    #[test]
    fn extract_reads_discriminators() {
        let frame = Frame::root();
        let document = json!({"type": "bolus", "subType": "pen"});
        assert_eq!(
            Discriminator::extract(object(&document), &frame).unwrap(),
            Discriminator::new("bolus", Some("pen"))
        );

        let document = json!({"type": "cbg", "subType": null});
        assert_eq!(
            Discriminator::extract(object(&document), &frame).unwrap(),
            Discriminator::new("cbg", None)
        );
    }

    #[test]
    fn extract_failures_are_single_structural_errors() {
        let frame = Frame::root();

        let error = Discriminator::extract(object(&json!({"value": 1})), &frame).unwrap_err();
        assert_eq!(error.pointer, "/type");
        assert_eq!(error.code(), "value-not-exists");

        let error = Discriminator::extract(object(&json!({"type": 7})), &frame).unwrap_err();
        assert_eq!(error.code(), "type-not-string");

        let error = Discriminator::extract(object(&json!({"type": "bolus", "subType": []})), &frame)
            .unwrap_err();
        assert_eq!(error.pointer, "/subType");
    }

    #[test]
    fn extract_failures_carry_a_meta() {
        let error = Discriminator::extract(object(&json!({})), &Frame::root()).unwrap_err();
        assert_eq!(error.meta, Some(Meta::default()));

        let outer = Frame::root().with_meta(Meta::new("wizard", None));
        let error = Discriminator::extract(object(&json!({})), &outer.with_path_segment("bolus"))
            .unwrap_err();
        assert_eq!(error.meta, Some(Meta::new("wizard", None)));
    }

    #[test]
    fn not_recognized_points_at_the_record() {
        let frame = Frame::root().with_path_segment("bolus");
        let error = Discriminator::new("invalidType", None).not_recognized(&frame);
        assert_eq!(error.pointer, "/bolus");
        assert_eq!(error.code(), "type-not-recognized");
        assert_eq!(error.meta, Some(Meta::new("invalidType", None)));
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
