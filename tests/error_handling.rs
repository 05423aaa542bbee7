//! Error accumulation, attribution, and hard-failure behavior.

use std::sync::Arc;

use datum::{
    Datum, ErrorCategory, Meta, Origin, Pipeline, PipelineConfig, PipelineError, Registry,
};
use serde_json::{Map, Value, json};
use structure::{Normalizable, Normalizer, ObjectParser, Parsable, Validatable, Validator};

fn pipeline_with(config: PipelineConfig) -> Pipeline {
    let registry = Arc::new(Registry::builtin().expect("builtin registry"));
    Pipeline::new(registry, config).expect("valid config")
}

fn pipeline() -> Pipeline {
    pipeline_with(PipelineConfig::default())
}

const ENVELOPE: &str = "envelope";

/// Carries whole records under `items`, each handed back for its own pass.
#[derive(Debug, Default)]
struct Envelope {
    id: Option<String>,
    items: Vec<Map<String, Value>>,
}

impl Parsable for Envelope {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        parser.string("type");
        self.id = parser.string("id");
        if let Some(Value::Array(items)) = parser.raw("items") {
            self.items = items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect();
        }
    }
}

impl Validatable for Envelope {
    fn validate(&self, validator: &mut Validator<'_>) {
        validator.string("id", self.id.as_deref()).exists();
    }
}

impl Normalizable for Envelope {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
        let mut items = normalizer.with_reference("items");
        for (index, item) in self.items.drain(..).enumerate() {
            items.add_data(index, Value::Object(item));
        }
    }
}

impl Datum for Envelope {
    fn meta(&self) -> Meta {
        Meta::new(ENVELOPE, None)
    }

    fn to_document(&self) -> Result<Value, serde_json::Error> {
        Ok(json!({"type": ENVELOPE, "id": self.id}))
    }
}

fn construct_envelope() -> Box<dyn Datum> {
    Box::new(Envelope::default())
}

fn envelope(id: &str, items: Vec<Value>) -> Value {
    json!({"type": ENVELOPE, "id": id, "items": items})
}

fn envelope_pipeline(max_expansion_depth: usize) -> Pipeline {
    let mut builder = Registry::builder();
    builder
        .register_builtin()
        .and_then(|builder| builder.register(ENVELOPE, None, construct_envelope))
        .expect("envelope registers next to the built-ins");
    let config = PipelineConfig::default().with_max_expansion_depth(max_expansion_depth);
    Pipeline::new(Arc::new(builder.build()), config).expect("valid config")
}

#[test]
fn structural_errors_are_all_reported_at_once() {
    let document = json!({
        "type": "bolus",
        "subType": "pen",
        "time": "yesterday",
        "normal": "lots",
        "prescriptor": 3,
        "insulinOnBoard": [1]
    });
    let error = pipeline().process(&document, Origin::User).unwrap_err();
    let errors = error.errors().unwrap();

    let codes: Vec<_> = errors.iter().map(|error| error.code()).collect();
    assert_eq!(
        codes,
        [
            "value-time-not-parsable",
            "type-not-number",
            "type-not-string",
            "type-not-number",
            // validation still runs over what parsed
            "value-not-exists",
            "value-not-exists",
        ]
    );
    assert!(errors.has_structural());
}

#[test]
fn validation_does_not_stop_at_first_failure() {
    let document = json!({
        "type": "cbg",
        "time": "2024-07-01T00:00:00Z",
        "id": "",
        "timezoneOffset": 20000,
        "units": "bananas",
        "value": -5
    });
    let error = pipeline().process(&document, Origin::User).unwrap_err();
    let pointers: Vec<_> = error
        .errors()
        .unwrap()
        .iter()
        .map(|error| error.pointer.to_string())
        .collect();
    assert_eq!(pointers, ["/id", "/timezoneOffset", "/units"]);
}

#[test]
fn non_object_documents_are_rejected_whole() {
    for document in [json!(null), json!("cbg"), json!(12), json!([{"type": "cbg"}])] {
        let error = pipeline().process(&document, Origin::User).unwrap_err();
        let errors = error.errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.as_slice()[0].code(), "type-not-object");
        assert_eq!(errors.as_slice()[0].pointer, "");
    }
}

#[test]
fn wrong_discriminator_kind_is_structural() {
    let error = pipeline()
        .process(&json!({"type": ["bolus"]}), Origin::User)
        .unwrap_err();
    let errors = error.errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.as_slice()[0].code(), "type-not-string");
    assert_eq!(errors.as_slice()[0].category(), ErrorCategory::Structural);
}

#[test]
fn violations_win_over_a_normalize_failure() {
    let document = json!({
        "id": "wizard-1",
        "type": "wizard",
        "time": "2024-07-01T09:30:00Z",
        "bolus": {"type": "bolus", "subType": "normal", "normal": 1.0},
        "carbInput": 5000,
        "units": "furlongs"
    });
    let error = pipeline().process(&document, Origin::User).unwrap_err();
    let pointers: Vec<_> = error
        .errors()
        .expect("violations are reported")
        .iter()
        .map(|error| (error.pointer.to_string(), error.code()))
        .collect();
    assert_eq!(
        pointers,
        [
            ("/carbInput".to_string(), "value-not-in-range"),
            ("/units".to_string(), "value-not-one-of"),
        ]
    );
}

#[test]
fn earlier_violations_win_over_a_later_normalize_failure() {
    let wizard = json!({
        "id": "wizard-1",
        "type": "wizard",
        "time": "2024-07-01T09:30:00Z",
        "bolus": {"type": "bolus", "subType": "normal", "normal": 1.0}
    });
    let broken_reading = json!({
        "id": "cbg-1",
        "type": "cbg",
        "time": "2024-07-01T09:30:00Z",
        "units": "mg/dL"
    });

    let alone = envelope("outer", vec![wizard.clone()]);
    assert!(matches!(
        envelope_pipeline(4).process(&alone, Origin::User),
        Err(PipelineError::Normalize(_))
    ));

    let both = envelope("outer", vec![broken_reading, wizard]);
    let error = envelope_pipeline(4)
        .process(&both, Origin::User)
        .unwrap_err();
    let errors = error.errors().expect("violations are reported");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.as_slice()[0].pointer, "/items/0/value");
}

#[test]
fn expansion_depth_is_enforced() {
    let reading = json!({
        "id": "cbg-1",
        "type": "cbg",
        "time": "2024-07-01T09:30:00Z",
        "units": "mg/dL",
        "value": 90
    });
    let outer = envelope("outer", vec![envelope("inner", vec![reading])]);

    let processed = envelope_pipeline(4).process(&outer, Origin::User).unwrap();
    let pointers: Vec<_> = processed
        .records()
        .map(|record| record.pointer.to_string())
        .collect();
    assert_eq!(pointers, ["", "/items/0", "/items/0/items/0"]);
    assert_eq!(processed.discovered()[1].meta, Meta::new("cbg", None));

    match envelope_pipeline(1).process(&outer, Origin::User) {
        Err(PipelineError::ExpansionDepthExceeded { pointer, limit }) => {
            assert_eq!(pointer, "/items/0/items/0");
            assert_eq!(limit, 1);
        }
        other => panic!("expected depth failure, got {other:?}"),
    }
}

#[test]
fn pipeline_errors_display_their_cause() {
    let error = pipeline().process(&json!(1), Origin::User).unwrap_err();
    assert_eq!(error.to_string(), "record rejected with 1 violation(s)");
    assert_eq!(
        PipelineError::DeadlineExceeded.to_string(),
        "batch deadline passed before the record was started"
    );
}
