use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A timestamped clinical note, structured into named fields each holding
/// a list of free-text fragments. Append-only; a field may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub admission_number: i64,
    pub noted_at: NaiveDateTime,
    pub fields: HashMap<String, Vec<String>>,
}

impl AnnotationRecord {
    /// Fragments recorded under `field`, empty when the field is absent.
    pub fn fragments(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}
