//! Document splitting and reassembly.
//!
//! A document is modeled as an ordered sequence of paragraph-equivalent spans
//! (one per line). Splitting keeps empty spans so every structural position
//! survives the round trip; reassembly renders spans back in ordinal order.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::transform::{FormattedUnit, SpanKind};

/// Flat average span count used as the estimate floor when only the byte size
/// is known (measured over the original corpus).
const DEFAULT_UNIT_ESTIMATE: usize = 22;

/// Assumed bytes per span for the size-based estimate.
const EST_BYTES_PER_UNIT: u64 = 512;

/// One atomic piece of a job's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Zero-based ordinal; dense and unique within a job, defines output order.
    pub index: usize,
    /// Raw span text; may be empty.
    pub text: String,
    /// Span id (`span_<i>`) for re-association with the source structure.
    pub span_id: String,
}

/// Outcome of processing one WorkUnit.
#[derive(Debug, Clone)]
pub struct WorkResult {
    pub index: usize,
    pub span_id: String,
    /// Original span text, kept so a failed unit still renders in place.
    pub original: String,
    /// Transformed payload on success.
    pub formatted: Option<FormattedUnit>,
    /// Error detail on failure.
    pub error: Option<String>,
}

impl WorkResult {
    pub fn is_success(&self) -> bool {
        self.formatted.is_some()
    }
}

/// Content-derived document id: sha256 of the file bytes, first 16 hex chars.
pub fn doc_id_for_file(path: &Path) -> Result<String> {
    let data = std::fs::read(path)
        .with_context(|| format!("read document: {}", path.display()))?;
    let digest = Sha256::digest(&data);
    Ok(hex::encode(&digest[..8]))
}

/// Split raw document text into ordered WorkUnits, one per line.
/// Empty lines become empty units so structural positions are preserved.
pub fn split_units(text: &str) -> Vec<WorkUnit> {
    text.lines()
        .enumerate()
        .map(|(i, line)| WorkUnit {
            index: i,
            text: line.to_string(),
            span_id: format!("span_{}", i),
        })
        .collect()
}

/// Pre-split unit estimate from the byte size. Only a display heuristic; the
/// authoritative count is fixed once splitting completes.
pub fn estimate_units(size_bytes: u64) -> usize {
    ((size_bytes / EST_BYTES_PER_UNIT) as usize).max(DEFAULT_UNIT_ESTIMATE)
}

/// Render ordered WorkResults back into an output document.
///
/// `results` must already be sorted by ordinal index. Successful spans render
/// their transformed text (headings underlined, list items bulleted); failed
/// or empty spans render the original text so no position is ever dropped.
pub fn assemble_output(results: &[WorkResult]) -> String {
    let mut out = String::new();
    for r in results {
        let line = match &r.formatted {
            Some(f) => render_span(f),
            None => r.original.clone(),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn render_span(f: &FormattedUnit) -> String {
    match f.kind {
        SpanKind::Header => {
            if f.text.is_empty() {
                f.text.clone()
            } else {
                format!("{}\n{}", f.text, "=".repeat(f.text.chars().count()))
            }
        }
        SpanKind::List => {
            let trimmed = f.text.trim_start();
            if trimmed.starts_with('-') || trimmed.starts_with('•') || trimmed.starts_with('*') {
                f.text.clone()
            } else {
                format!("- {}", f.text)
            }
        }
        SpanKind::Paragraph => f.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Alignment, FontStyle};

    fn ok_result(index: usize, text: &str) -> WorkResult {
        WorkResult {
            index,
            span_id: format!("span_{}", index),
            original: text.to_string(),
            formatted: Some(FormattedUnit {
                text: text.to_string(),
                kind: SpanKind::Paragraph,
                font_style: FontStyle::Normal,
                font_size: 14,
                alignment: Alignment::Justify,
            }),
            error: None,
        }
    }

    #[test]
    fn split_keeps_empty_spans_and_dense_ordinals() {
        let units = split_units("intro\n\nbody one\nbody two\n");
        assert_eq!(units.len(), 4);
        for (i, u) in units.iter().enumerate() {
            assert_eq!(u.index, i);
            assert_eq!(u.span_id, format!("span_{}", i));
        }
        assert_eq!(units[1].text, "");
        assert_eq!(units[3].text, "body two");
    }

    #[test]
    fn split_empty_document_yields_no_units() {
        assert!(split_units("").is_empty());
    }

    #[test]
    fn estimate_has_flat_floor_and_scales_with_size() {
        assert_eq!(estimate_units(0), 22);
        assert_eq!(estimate_units(10 * 1024), 22);
        assert!(estimate_units(5 * 1024 * 1024) > 22);
    }

    #[test]
    fn assemble_preserves_order_and_failed_spans() {
        let mut results = vec![
            ok_result(0, "first"),
            WorkResult {
                index: 1,
                span_id: "span_1".to_string(),
                original: "second (unprocessed)".to_string(),
                formatted: None,
                error: Some("service timeout".to_string()),
            },
            ok_result(2, "third"),
        ];
        results.sort_by_key(|r| r.index);
        let out = assemble_output(&results);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["first", "second (unprocessed)", "third"]);
    }

    #[test]
    fn assemble_renders_headers_and_lists() {
        let mut header = ok_result(0, "Title");
        header.formatted.as_mut().unwrap().kind = SpanKind::Header;
        let mut item = ok_result(1, "point one");
        item.formatted.as_mut().unwrap().kind = SpanKind::List;
        let out = assemble_output(&[header, item]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["Title", "=====", "- point one"]);
    }

    #[test]
    fn doc_id_is_stable_and_content_derived() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "same body").unwrap();
        std::fs::write(&b, "same body").unwrap();
        let id_a = doc_id_for_file(&a).unwrap();
        let id_b = doc_id_for_file(&b).unwrap();
        assert_eq!(id_a, id_b);
        assert_eq!(id_a.len(), 16);

        std::fs::write(&b, "different body").unwrap();
        assert_ne!(doc_id_for_file(&b).unwrap(), id_a);
    }
}
