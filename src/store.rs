//! Record store gateway: the read-only interface the engine consumes its
//! clinical records through. The shipped implementation is
//! [`crate::db::SqliteRecordStore`]; anything that can answer these seven
//! queries can back a summary.

use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SectionConfig;
use crate::models::{Admission, AnnotationRecord, ExamResult, MedicationOrder, Patient};

/// A gateway fetch failed. Propagated to the caller unchanged; the engine
/// has no retry policy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
    #[error("record store backend error: {0}")]
    Backend(String),
}

/// Read-only source of the records one summary is built from.
pub trait RecordStore {
    fn get_admission(&self, admission_number: i64) -> Result<Option<Admission>, StoreError>;

    fn get_patient(&self, admission_number: i64) -> Result<Option<Patient>, StoreError>;

    /// Annotations of the admission, ascending timestamp.
    fn list_annotations(&self, admission_number: i64)
        -> Result<Vec<AnnotationRecord>, StoreError>;

    /// Latest out-of-range result per exam type, sorted by exam code.
    fn list_abnormal_exams(&self, patient_id: &Uuid) -> Result<Vec<ExamResult>, StoreError>;

    /// Medication orders of the admission, ascending sequence number.
    fn list_medication_orders(
        &self,
        admission_number: i64,
    ) -> Result<Vec<MedicationOrder>, StoreError>;

    /// Timestamp of the most recent aggregated prescription, if any.
    fn last_aggregated_prescription_date(
        &self,
        admission_number: i64,
    ) -> Result<Option<NaiveDateTime>, StoreError>;

    /// The externally managed section configuration.
    fn section_config(&self) -> Result<Vec<SectionConfig>, StoreError>;
}

/// Reduce raw exam results to the latest abnormal result per exam type.
///
/// Explicit group-by-code / reduce-by-max-date; store implementations use
/// this instead of leaning on query ordering.
pub fn latest_abnormal(results: Vec<ExamResult>) -> Vec<ExamResult> {
    use std::collections::hash_map::Entry;
    use std::collections::HashMap;

    let mut latest: HashMap<String, ExamResult> = HashMap::new();
    for exam in results.into_iter().filter(ExamResult::is_abnormal) {
        match latest.entry(exam.exam_code.clone()) {
            Entry::Occupied(mut slot) => {
                if exam.collected_at > slot.get().collected_at {
                    slot.insert(exam);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(exam);
            }
        }
    }

    let mut out: Vec<ExamResult> = latest.into_values().collect();
    out.sort_by(|a, b| a.exam_code.cmp(&b.exam_code));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam(code: &str, result: f64, collected_at: &str) -> ExamResult {
        ExamResult {
            patient_id: Uuid::nil(),
            exam_code: code.into(),
            result,
            unit: None,
            collected_at: collected_at.parse().unwrap(),
            ref_min: 1.0,
            ref_max: 2.0,
        }
    }

    #[test]
    fn keeps_only_the_latest_abnormal_result_per_type() {
        let reduced = latest_abnormal(vec![
            exam("CREAT", 3.0, "2024-05-01T08:00:00"),
            exam("CREAT", 4.0, "2024-05-03T08:00:00"),
            exam("K", 0.5, "2024-05-02T08:00:00"),
        ]);
        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced[0].exam_code, "CREAT");
        assert_eq!(reduced[0].result, 4.0);
        assert_eq!(reduced[1].exam_code, "K");
    }

    #[test]
    fn in_range_results_are_dropped_entirely() {
        let reduced = latest_abnormal(vec![
            // Most recent CREAT is back in range, but the older abnormal one
            // is still the latest *abnormal* observation.
            exam("CREAT", 3.0, "2024-05-01T08:00:00"),
            exam("CREAT", 1.5, "2024-05-05T08:00:00"),
        ]);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].result, 3.0);
    }

    #[test]
    fn all_normal_reduces_to_nothing() {
        assert!(latest_abnormal(vec![exam("NA", 1.2, "2024-05-01T08:00:00")]).is_empty());
    }
}
