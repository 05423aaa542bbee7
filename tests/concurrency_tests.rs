//! A pipeline shared across threads behaves exactly like a sequential one.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use data::fixtures;
use datum::{Origin, Pipeline, PipelineConfig, PipelineError, Registry};
use serde_json::{Value, json};

fn pipeline() -> Pipeline {
    let registry = Arc::new(Registry::builtin().expect("builtin registry"));
    Pipeline::new(registry, PipelineConfig::default()).expect("valid config")
}

/// Documents with a rejected one mixed in every tenth slot.
fn mixed_documents(seed: u64, count: usize) -> Vec<Value> {
    let mut documents = fixtures::documents(&mut fastrand::Rng::with_seed(seed), count);
    for document in documents.iter_mut().step_by(10) {
        *document = json!({"type": "bolus", "subType": "pen", "normal": -1.0});
    }
    documents
}

fn summarize(result: &Result<datum::Processed, PipelineError>) -> Result<Value, Option<String>> {
    match result {
        Ok(processed) => Ok(processed.primary().document.clone()),
        Err(error) => Err(error
            .errors()
            .map(|errors| serde_json::to_string(errors).unwrap_or_default())),
    }
}

#[test]
fn batch_results_line_up_with_sequential_processing() {
    let pipeline = pipeline();
    let documents = mixed_documents(1, 300);

    let batch = pipeline.process_batch(&documents, Origin::User);
    assert_eq!(batch.len(), documents.len());
    for (document, result) in documents.iter().zip(&batch) {
        let sequential = pipeline.process(document, Origin::User);
        assert_eq!(summarize(result), summarize(&sequential));
    }
    assert_eq!(batch.iter().filter(|result| result.is_err()).count(), 30);
}

#[test]
fn threads_share_one_pipeline() {
    let pipeline = Arc::new(pipeline());
    let documents = Arc::new(mixed_documents(2, 100));
    let expected: Vec<_> = documents
        .iter()
        .map(|document| summarize(&pipeline.process(document, Origin::Store)))
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            let documents = Arc::clone(&documents);
            thread::spawn(move || {
                documents
                    .iter()
                    .map(|document| summarize(&pipeline.process(document, Origin::Store)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("worker panicked"), expected);
    }
}

#[test]
fn passed_deadline_fails_every_record() {
    let pipeline = pipeline();
    let documents = mixed_documents(3, 20);
    let deadline = Instant::now();

    let results = pipeline.process_batch_until(&documents, Origin::User, deadline);
    assert_eq!(results.len(), documents.len());
    assert!(
        results
            .iter()
            .all(|result| matches!(result, Err(PipelineError::DeadlineExceeded)))
    );
}

#[test]
fn distant_deadline_processes_every_record() {
    let pipeline = pipeline();
    let documents = mixed_documents(4, 50);
    let deadline = Instant::now() + Duration::from_secs(3600);

    let results = pipeline.process_batch_until(&documents, Origin::User, deadline);
    assert!(
        !results
            .iter()
            .any(|result| matches!(result, Err(PipelineError::DeadlineExceeded)))
    );
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 45);
}
