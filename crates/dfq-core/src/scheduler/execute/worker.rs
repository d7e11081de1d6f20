//! One sub-queue worker: sequential transformation of its assigned units.

use std::sync::Arc;

use crate::document::{WorkResult, WorkUnit};
use crate::metrics::ProgressTracker;
use crate::transform::UnitTransformer;

/// Process one sub-queue on the current (blocking) thread.
///
/// Every unit yields exactly one WorkResult and bumps the processed counter,
/// success or failure; a failed unit records the error and keeps its original
/// text so reassembly never drops a span.
pub(super) fn process_subqueue(
    queue_id: usize,
    doc_id: String,
    units: Vec<WorkUnit>,
    transformer: Arc<dyn UnitTransformer>,
    tracker: Arc<ProgressTracker>,
) -> Vec<WorkResult> {
    tracing::debug!(queue_id, doc_id = %doc_id, units = units.len(), "sub-queue worker started");
    let mut results = Vec::with_capacity(units.len());

    for unit in units {
        let result = match transformer.transform_unit(&unit.text) {
            Ok(formatted) => WorkResult {
                index: unit.index,
                span_id: unit.span_id,
                original: unit.text,
                formatted: Some(formatted),
                error: None,
            },
            Err(e) => {
                tracing::warn!(
                    queue_id,
                    doc_id = %doc_id,
                    index = unit.index,
                    error = %e,
                    "unit transformation failed, keeping original text"
                );
                WorkResult {
                    index: unit.index,
                    span_id: unit.span_id,
                    original: unit.text,
                    formatted: None,
                    error: Some(e.to_string()),
                }
            }
        };
        tracker.unit_completed(&doc_id);
        results.push(result);
    }

    tracing::debug!(queue_id, doc_id = %doc_id, "sub-queue worker finished");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::split_units;
    use crate::transform::{fallback_unit, FormattedUnit, TransformError};

    struct FailOdd;

    impl UnitTransformer for FailOdd {
        fn transform_unit(&self, text: &str) -> Result<FormattedUnit, TransformError> {
            if text.len() % 2 == 1 {
                Err(TransformError::Timeout)
            } else {
                Ok(fallback_unit(text))
            }
        }
    }

    #[test]
    fn every_unit_yields_a_result_and_is_counted() {
        let tracker = Arc::new(ProgressTracker::new());
        tracker.begin_job("doc", 4);
        let units = split_units("aa\nb\ncc\nd");

        let results = process_subqueue(
            0,
            "doc".to_string(),
            units,
            Arc::new(FailOdd),
            Arc::clone(&tracker),
        );

        assert_eq!(results.len(), 4);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert_eq!(results[1].original, "b");
        assert!(results[1].error.as_deref().unwrap().contains("timeout"));
        assert!(results[2].is_success());
        assert!(!results[3].is_success());

        // Failures count toward progress too.
        let progress = tracker.status_of("doc").unwrap();
        assert_eq!(progress.processed_units, 4);
    }
}
