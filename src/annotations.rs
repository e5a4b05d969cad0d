//! Annotation aggregation: collect the free-text fragments of one note
//! field across an admission, deduplicate them, and render a capped text
//! block plus the audit trail backing it.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::AnnotationRecord;
use crate::store::{RecordStore, StoreError};
use crate::window::{in_window, DateWindow};

/// Hard cap on the rendered text, in characters.
pub const RENDERED_TEXT_CAP: usize = 1500;

/// Rendered text plus the deduplicated fragments it was built from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotationAggregate {
    pub rendered_text: String,
    pub audit: Vec<String>,
}

/// Fetch the admission's annotations and aggregate one note field over an
/// optional date window.
pub fn aggregate_section(
    store: &dyn RecordStore,
    admission_number: i64,
    note_field: &str,
    window: DateWindow,
) -> Result<AnnotationAggregate, StoreError> {
    let records = store.list_annotations(admission_number)?;
    Ok(aggregate_fragments(&records, note_field, window))
}

/// Aggregate already-fetched records (ascending timestamp order expected).
///
/// Fragments are deduplicated by exact text equality across the whole
/// window; the audit list keeps first-occurrence order and the rendered
/// text joins it with ". ", truncated to [`RENDERED_TEXT_CAP`] characters.
pub fn aggregate_fragments(
    records: &[AnnotationRecord],
    note_field: &str,
    window: DateWindow,
) -> AnnotationAggregate {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut audit: Vec<String> = Vec::new();

    for record in records {
        if !in_window(window, record.noted_at) {
            continue;
        }
        for fragment in record.fragments(note_field) {
            if seen.insert(fragment) {
                audit.push(fragment.clone());
            }
        }
    }

    let rendered_text = truncate_chars(audit.join(". "), RENDERED_TEXT_CAP);
    AnnotationAggregate { rendered_text, audit }
}

/// Truncate to at most `cap` characters without splitting a char.
fn truncate_chars(mut text: String, cap: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(cap) {
        text.truncate(idx);
    }
    text
}
