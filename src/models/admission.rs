use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One hospitalization episode. Immutable once recorded except the
/// discharge timestamp, which is filled in when the patient leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    pub admission_number: i64,
    pub patient_id: Uuid,
    pub admission_date: NaiveDateTime,
    pub discharge_date: Option<NaiveDateTime>,
}
