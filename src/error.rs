//! Top-level error taxonomy for summary assembly. Documents are
//! all-or-nothing: any of these aborts the whole request.

use thiserror::Error;

use crate::medications::DataAnomaly;
use crate::prompt::TemplateError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SummaryError {
    /// Requester holds none of the roles allowed to generate summaries.
    #[error("requester is not authorized to generate discharge summaries")]
    Unauthorized,

    /// The admission does not resolve to a known patient.
    #[error("admission {0} does not resolve to a known record")]
    InvalidRecord(i64),

    /// A section template broke during substitution. Deterministic for the
    /// same inputs, so never retried.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Medication orders contradict the per-admission sequence invariant.
    #[error(transparent)]
    DataAnomaly(#[from] DataAnomaly),

    /// Gateway fetch failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}
