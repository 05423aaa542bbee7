//! Origin-aware computation of derived fields.
//!
//! Normalization runs after validation and is the only phase allowed to
//! mutate a record. Rules are declared by each record type and keyed on the
//! [`Origin`] supplied by the caller. A rule may also hand a nested document
//! back to the caller through [`Normalizer::add_data`] so that it gets its
//! own pass through the pipeline.
//!
//! Rules must be idempotent: they read the currently present fields and the
//! origin, never whether they already ran.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::frame::{Frame, Meta, Pointer, Segment};

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Origin {
    /// Re-read from storage.
    Store,
    /// Freshly submitted by a client.
    User,
    /// Generated server-side. Built-in rules treat it like `Store`.
    Internal,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Store => "store",
            Origin::User => "user",
            Origin::Internal => "internal",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hard failure surfaced by a normalization rule.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum NormalizeError {
    #[error("embedded document at {pointer:?} is malformed: {reason}")]
    EmbeddedDocumentMalformed { pointer: Pointer, reason: String },
}

/// A nested document found during normalization, with the frame it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovered {
    pub frame: Frame,
    pub document: Value,
}

/// Output collected across one normalization walk.
#[derive(Debug, Default)]
pub struct NormalizeState {
    data: Vec<Discovered>,
    error: Option<NormalizeError>,
}

impl NormalizeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents discovered so far, in discovery order.
    pub fn data(&self) -> &[Discovered] {
        &self.data
    }

    /// First hard failure, if any.
    pub fn error(&self) -> Option<&NormalizeError> {
        self.error.as_ref()
    }

    pub fn into_parts(self) -> (Vec<Discovered>, Option<NormalizeError>) {
        (self.data, self.error)
    }
}

/// Mutating walk over a record, scoped by frame and origin.
pub struct Normalizer<'n> {
    state: &'n mut NormalizeState,
    frame: Frame,
    origin: Origin,
}

impl<'n> Normalizer<'n> {
    pub fn new(state: &'n mut NormalizeState, frame: Frame, origin: Origin) -> Self {
        Self {
            state,
            frame,
            origin,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Child normalizer fixed to `origin` for the rest of its walk.
    pub fn with_origin(&mut self, origin: Origin) -> Normalizer<'_> {
        Normalizer {
            state: &mut *self.state,
            frame: self.frame.clone(),
            origin,
        }
    }

    pub fn with_meta(&mut self, meta: Meta) -> Normalizer<'_> {
        Normalizer {
            state: &mut *self.state,
            frame: self.frame.with_meta(meta),
            origin: self.origin,
        }
    }

    pub fn with_reference(&mut self, reference: impl Into<Segment>) -> Normalizer<'_> {
        Normalizer {
            state: &mut *self.state,
            frame: self.frame.with_path_segment(reference),
            origin: self.origin,
        }
    }

    /// Queues `document`, found at `reference`, for a further pipeline pass.
    pub fn add_data(&mut self, reference: impl Into<Segment>, document: Value) {
        let frame = self.frame.with_path_segment(reference);
        debug!(pointer = %frame.pointer(), "embedded_document_discovered");
        self.state.data.push(Discovered { frame, document });
    }

    /// Records a hard failure. Only the first one is kept.
    pub fn report_error(&mut self, error: NormalizeError) {
        if self.state.error.is_none() {
            self.state.error = Some(error);
        } else {
            debug!(%error, "normalize_error_dropped");
        }
    }

    pub fn normalize_object<T: Normalizable>(
        &mut self,
        reference: impl Into<Segment>,
        value: Option<&mut T>,
    ) {
        if let Some(value) = value {
            value.normalize(&mut self.with_reference(reference));
        }
    }

    pub fn normalize_objects<T: Normalizable>(
        &mut self,
        reference: impl Into<Segment>,
        values: Option<&mut [T]>,
    ) {
        let Some(values) = values else {
            return;
        };
        let mut sequence = self.with_reference(reference);
        for (index, value) in values.iter_mut().enumerate() {
            value.normalize(&mut sequence.with_reference(index));
        }
    }
}

/// Something whose derived fields can be computed or cleared in place.
pub trait Normalizable {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Dose {
        manual: bool,
        on_board: Option<f64>,
    }

    impl Normalizable for Dose {
        fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
            if normalizer.origin() == Origin::Store && self.manual {
                self.on_board = None;
            }
        }
    }

    #[test]
    fn clean_run_has_no_data_or_error() {
        let mut state = NormalizeState::new();
        let mut dose = Dose {
            manual: false,
            on_board: Some(1.0),
        };
        dose.normalize(&mut Normalizer::new(&mut state, Frame::root(), Origin::Store));

        assert!(state.data().is_empty());
        assert!(state.error().is_none());
        assert_eq!(dose.on_board, Some(1.0));
    }

    #[test]
    fn rules_are_keyed_on_origin() {
        let mut state = NormalizeState::new();
        let mut normalizer = Normalizer::new(&mut state, Frame::root(), Origin::User);

        let mut user = Dose {
            manual: true,
            on_board: Some(2.0),
        };
        user.normalize(&mut normalizer);
        assert_eq!(user.on_board, Some(2.0));

        let mut store = Dose {
            manual: true,
            on_board: Some(2.0),
        };
        store.normalize(&mut normalizer.with_origin(Origin::Store));
        assert_eq!(store.on_board, None);
        assert_eq!(normalizer.origin(), Origin::User);

        store.normalize(&mut normalizer.with_origin(Origin::Store));
        assert_eq!(store.on_board, None);
    }

    #[test]
    fn discovered_documents_carry_their_frame() {
        let mut state = NormalizeState::new();
        let mut normalizer = Normalizer::new(&mut state, Frame::root(), Origin::User);
        let mut scoped = normalizer.with_meta(Meta::new("wizard", None));
        scoped.add_data("bolus", json!({"type": "bolus"}));

        let (data, error) = state.into_parts();
        assert!(error.is_none());
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].frame.pointer(), "/bolus");
        assert_eq!(data[0].frame.meta(), Some(&Meta::new("wizard", None)));
        assert_eq!(data[0].document, json!({"type": "bolus"}));
    }

    #[test]
    fn only_first_error_is_kept() {
        let mut state = NormalizeState::new();
        let mut normalizer = Normalizer::new(&mut state, Frame::root(), Origin::User);
        for reason in ["first", "second"] {
            let pointer = normalizer.frame().pointer_to("bolus");
            normalizer.report_error(NormalizeError::EmbeddedDocumentMalformed {
                pointer,
                reason: reason.into(),
            });
        }

        assert_eq!(
            state.error(),
            Some(&NormalizeError::EmbeddedDocumentMalformed {
                pointer: Frame::root().pointer_to("bolus"),
                reason: "first".into()
            })
        );
    }

    #[test]
    fn nested_sequences_are_walked_in_place() {
        let mut state = NormalizeState::new();
        let mut normalizer = Normalizer::new(&mut state, Frame::root(), Origin::Store);
        let mut doses = vec![
            Dose {
                manual: true,
                on_board: Some(1.0),
            },
            Dose {
                manual: false,
                on_board: Some(1.0),
            },
        ];
        normalizer.normalize_objects("doses", Some(doses.as_mut_slice()));

        assert_eq!(doses[0].on_board, None);
        assert_eq!(doses[1].on_board, Some(1.0));
    }

    #[test]
    fn origin_serializes_snake_case() {
        assert_eq!(serde_json::to_value(Origin::Store).unwrap(), json!("store"));
        let origin: Origin = serde_json::from_value(json!("internal")).unwrap();
        assert_eq!(origin, Origin::Internal);
        assert_eq!(Origin::User.to_string(), "user");
    }
}
