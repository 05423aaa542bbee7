//! Workspace umbrella crate for the Datum record pipeline.
//!
//! This crate stitches the structure engine and the built-in record types into
//! a single entry point: hand [`Pipeline::process`] one decoded document and an
//! [`Origin`], get back either the normalized record(s) or the complete list of
//! violations.
//!
//! ## Pipeline Stages
//!
//! ```text
//! document ──► discriminator ──► registry ──► parse ──► validate ──► normalize
//!                  │                 │          │                       │
//!                  ▼                 ▼          ▼                       ▼
//!            single error      single error  structural?           discovered
//!                                            (skip normalize)      documents ──► (same stages,
//!                                                                                 nested frame)
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use datum::{Origin, Pipeline, PipelineConfig, Registry};
//! use serde_json::json;
//!
//! let registry = Arc::new(Registry::builtin().unwrap());
//! let pipeline = Pipeline::new(registry, PipelineConfig::default()).unwrap();
//!
//! let processed = pipeline
//!     .process(
//!         &json!({"type": "cbg", "time": "2024-01-01T00:00:00Z", "units": "mg/dL", "value": 120}),
//!         Origin::User,
//!     )
//!     .unwrap();
//! assert_eq!(processed.primary().document["value"], json!(120.0));
//!
//! let rejected = pipeline
//!     .process(&json!({"type": "cbg", "time": "2024-01-01T00:00:00Z"}), Origin::User)
//!     .unwrap_err();
//! assert_eq!(rejected.errors().map(|errors| errors.len()), Some(2));
//! ```

pub mod config;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, info_span, warn};

pub use crate::config::{ConfigError, ConfigLoadError, PipelineConfig};
pub use data::{Base, Datum, Discriminator, Registry, RegistryBuilder, RegistryError};
pub use structure::{
    ErrorCategory, ErrorKind, Errors, Frame, Meta, NormalizeError, Origin, Pointer,
    UnexpectedFieldPolicy, ValidationError, ValueKind,
};

use structure::{Discovered, NormalizeState, Normalizer, ObjectParser, Validator};

/// Errors that can occur while processing a document through the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document, or a document discovered from it, has violations.
    #[error("record rejected with {} violation(s)", .0.len())]
    Rejected(Errors),

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("embedded document at {pointer:?} is nested deeper than {limit} levels")]
    ExpansionDepthExceeded { pointer: Pointer, limit: usize },

    #[error("failed to serialize normalized record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("batch deadline passed before the record was started")]
    DeadlineExceeded,
}

impl PipelineError {
    /// The violation list of a rejected record.
    pub fn errors(&self) -> Option<&Errors> {
        match self {
            PipelineError::Rejected(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_validation(&self, latency: Duration, error_count: usize);
    fn record_normalization(&self, latency: Duration, ok: bool);
}

struct MetricsSpan<'m> {
    recorder: &'m dyn PipelineMetrics,
    start: Instant,
}

impl<'m> MetricsSpan<'m> {
    fn start(recorder: Option<&'m Arc<dyn PipelineMetrics>>) -> Option<Self> {
        recorder.map(|recorder| Self {
            recorder: recorder.as_ref(),
            start: Instant::now(),
        })
    }

    fn record_validation(self, error_count: usize) {
        self.recorder
            .record_validation(self.start.elapsed(), error_count);
    }

    fn record_normalization(self, ok: bool) {
        self.recorder.record_normalization(self.start.elapsed(), ok);
    }
}

/// One accepted record.
#[derive(Debug)]
pub struct ProcessedRecord {
    /// Where the record was found; empty for the submitted document itself.
    pub pointer: Pointer,
    pub meta: Meta,
    /// Normalized document, ready to be stored verbatim.
    pub document: Value,
    pub datum: Box<dyn Datum>,
}

/// Every record produced from one submitted document, the submitted one first.
#[derive(Debug)]
pub struct Processed {
    primary: ProcessedRecord,
    discovered: Vec<ProcessedRecord>,
}

impl Processed {
    pub fn primary(&self) -> &ProcessedRecord {
        &self.primary
    }

    /// Records split out of the primary one during normalization, breadth first.
    pub fn discovered(&self) -> &[ProcessedRecord] {
        &self.discovered
    }

    pub fn records(&self) -> impl Iterator<Item = &ProcessedRecord> {
        std::iter::once(&self.primary).chain(&self.discovered)
    }

    pub fn len(&self) -> usize {
        1 + self.discovered.len()
    }

    /// Always `false`: the primary record is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_records(self) -> Vec<ProcessedRecord> {
        let mut records = Vec::with_capacity(self.len());
        records.push(self.primary);
        records.extend(self.discovered);
        records
    }
}

/// Violations already collected take precedence over a later normalize
/// failure, so the caller always sees the full list.
fn surface(error: PipelineError, errors: Errors) -> PipelineError {
    match error {
        PipelineError::Normalize(_) if !errors.is_empty() => PipelineError::Rejected(errors),
        other => other,
    }
}

struct Pending {
    discovered: Discovered,
    depth: usize,
}

/// Parse → validate → normalize over a frozen registry.
///
/// A pipeline holds no per-record state, so one instance can serve any
/// number of threads.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<Registry>,
    config: PipelineConfig,
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl Pipeline {
    pub fn new(registry: Arc<Registry>, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry,
            config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one document, and everything it embeds, through every stage.
    ///
    /// Violations from the document and from discovered documents are
    /// collected into a single [`PipelineError::Rejected`] list.
    pub fn process(&self, document: &Value, origin: Origin) -> Result<Processed, PipelineError> {
        let start = Instant::now();
        let mut errors = Errors::new();
        let mut pending = VecDeque::new();

        let primary = match self.process_one(Frame::root(), document, origin, &mut errors) {
            Ok(primary) => primary,
            Err(error) => return Err(surface(error, errors)),
        };
        let primary = primary.map(|(record, discovered)| {
            pending.extend(discovered.into_iter().map(|discovered| Pending {
                discovered,
                depth: 1,
            }));
            record
        });

        let mut records = Vec::new();
        while let Some(Pending { discovered, depth }) = pending.pop_front() {
            if depth > self.config.max_expansion_depth {
                return Err(PipelineError::ExpansionDepthExceeded {
                    pointer: discovered.frame.pointer(),
                    limit: self.config.max_expansion_depth,
                });
            }
            let Discovered { frame, document } = discovered;
            let outcome = match self.process_one(frame, &document, origin, &mut errors) {
                Ok(outcome) => outcome,
                Err(error) => return Err(surface(error, errors)),
            };
            if let Some((record, nested)) = outcome {
                records.push(record);
                pending.extend(nested.into_iter().map(|discovered| Pending {
                    discovered,
                    depth: depth + 1,
                }));
            }
        }

        let elapsed_micros = start.elapsed().as_micros();
        match primary {
            Some(primary) if errors.is_empty() => {
                info!(
                    datum_type = %primary.meta.type_,
                    record_count = 1 + records.len(),
                    %origin,
                    elapsed_micros,
                    "datum_accepted"
                );
                Ok(Processed {
                    primary,
                    discovered: records,
                })
            }
            _ => {
                warn!(
                    error_count = errors.len(),
                    %origin,
                    elapsed_micros,
                    "datum_rejected"
                );
                Err(PipelineError::Rejected(errors))
            }
        }
    }

    /// Processes documents in parallel; results line up with the input.
    pub fn process_batch(
        &self,
        documents: &[Value],
        origin: Origin,
    ) -> Vec<Result<Processed, PipelineError>> {
        documents
            .par_iter()
            .map(|document| self.process(document, origin))
            .collect()
    }

    /// Like [`Pipeline::process_batch`], but documents not started by
    /// `deadline` fail with [`PipelineError::DeadlineExceeded`].
    pub fn process_batch_until(
        &self,
        documents: &[Value],
        origin: Origin,
        deadline: Instant,
    ) -> Vec<Result<Processed, PipelineError>> {
        documents
            .par_iter()
            .map(|document| {
                if Instant::now() >= deadline {
                    return Err(PipelineError::DeadlineExceeded);
                }
                self.process(document, origin)
            })
            .collect()
    }

    /// One document at `frame`. `None` means it was rejected before or during
    /// parsing; the reasons are in `errors`.
    fn process_one(
        &self,
        frame: Frame,
        document: &Value,
        origin: Origin,
        errors: &mut Errors,
    ) -> Result<Option<(ProcessedRecord, Vec<Discovered>)>, PipelineError> {
        let Some(object) = document.as_object() else {
            errors.push(ValidationError::new(
                frame.pointer(),
                Some(frame.meta().cloned().unwrap_or_default()),
                ErrorKind::TypeMismatch {
                    expected: ValueKind::Object,
                    actual: ValueKind::of(document),
                },
            ));
            return Ok(None);
        };

        let discriminator = match Discriminator::extract(object, &frame) {
            Ok(discriminator) => discriminator,
            Err(error) => {
                errors.push(error);
                return Ok(None);
            }
        };
        let Ok(construct) = self.registry.resolve(&discriminator) else {
            errors.push(discriminator.not_recognized(&frame));
            return Ok(None);
        };

        let span = info_span!(
            "datum.record",
            datum_type = %discriminator.type_,
            datum_sub_type = ?discriminator.sub_type,
            %origin,
            pointer = %frame.pointer(),
        );
        let _guard = span.enter();

        let meta = discriminator.meta();
        let frame = frame.with_meta(meta.clone());
        let mut datum = construct();

        let validation_metrics = MetricsSpan::start(self.metrics.as_ref());
        let before = errors.len();
        let mut parser = ObjectParser::new(
            object,
            frame.clone(),
            errors,
            self.config.unexpected_fields,
        );
        datum.parse(&mut parser);
        parser.finish();
        datum.validate(&mut Validator::new(frame.clone(), errors));

        let found = &errors.as_slice()[before..];
        if let Some(span) = validation_metrics {
            span.record_validation(found.len());
        }
        // A rejected record is never stored, so there is nothing to normalize.
        if !found.is_empty() {
            return Ok(None);
        }

        let normalization_metrics = MetricsSpan::start(self.metrics.as_ref());
        let mut state = NormalizeState::new();
        datum.normalize(&mut Normalizer::new(&mut state, frame.clone(), origin));
        let (discovered, error) = state.into_parts();
        if let Some(span) = normalization_metrics {
            span.record_normalization(error.is_none());
        }
        if let Some(error) = error {
            return Err(PipelineError::Normalize(error));
        }

        let document = datum.to_document()?;
        Ok(Some((
            ProcessedRecord {
                pointer: frame.pointer(),
                meta,
                document,
                datum,
            },
            discovered,
        )))
    }
}
