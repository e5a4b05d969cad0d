use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient demographics, owned by the record store and read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<String>,
    /// Weight in kilograms.
    pub weight: Option<f64>,
    /// Height in centimeters.
    pub height: Option<f64>,
    pub skin_color: Option<String>,
}
