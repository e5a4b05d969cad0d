use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A numeric lab result together with the reference range configured for
/// its exam type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResult {
    pub patient_id: Uuid,
    pub exam_code: String,
    pub result: f64,
    pub unit: Option<String>,
    pub collected_at: NaiveDateTime,
    pub ref_min: f64,
    pub ref_max: f64,
}

impl ExamResult {
    /// A result is abnormal when it falls strictly outside [ref_min, ref_max].
    pub fn is_abnormal(&self) -> bool {
        self.result < self.ref_min || self.result > self.ref_max
    }
}
