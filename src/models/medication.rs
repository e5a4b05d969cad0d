use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::OrderOrigin;

/// One medication order within an admission. `sequence` increases
/// monotonically per admission and is the recency proxy the supersession
/// rule compares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationOrder {
    pub admission_number: i64,
    pub sequence: i64,
    pub substance: String,
    pub dose: f64,
    pub unit: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
    /// Start of the validity interval (the prescription timestamp).
    pub valid_from: NaiveDateTime,
    /// Last day the order is valid, inclusive.
    pub valid_until: NaiveDate,
    pub suspended_at: Option<NaiveDateTime>,
    pub origin: OrderOrigin,
}

impl MedicationOrder {
    /// Whether the validity interval contains `day` (date granularity,
    /// inclusive on both ends).
    pub fn valid_on(&self, day: NaiveDate) -> bool {
        self.valid_from.date() <= day && day <= self.valid_until
    }
}
