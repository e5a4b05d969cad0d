//! Epicrisis: a discharge-summary aggregation engine.
//!
//! Assembles a structured discharge summary for a hospitalized patient by
//! aggregating the admission's clinical annotations, abnormal lab results
//! and medication-order history into a fixed set of named sections, each
//! paired with a deduplicated audit trail and a prompt ready for
//! downstream narrative generation.
//!
//! The engine is read-only and synchronous: everything is computed from
//! the records a [`store::RecordStore`] answers with. The shipped store is
//! SQLite-backed ([`db::SqliteRecordStore`]); HTTP transport,
//! authentication and persistence design live outside this crate.

pub mod annotations;
pub mod authorization;
pub mod config;
pub mod db;
pub mod error;
pub mod medications;
pub mod models;
pub mod prompt;
pub mod store;
pub mod summary;
pub mod window;

pub use authorization::{Requester, Role};
pub use config::{SectionConfig, SummarySettings};
pub use error::SummaryError;
pub use store::{RecordStore, StoreError};
pub use summary::{SummaryAssembler, SummaryDocument};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedders that do not bring their own
/// subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
