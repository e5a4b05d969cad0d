//! Engine configuration: per-section aggregation settings and the
//! assembler-level settings that replace ambient process state.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::window::{NoteAnchor, WindowPolicy};

/// Default `tracing` filter for embedders.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Settings passed to the assembler at construction. Timestamp rendering
/// uses the configured zone explicitly instead of mutating the process
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySettings {
    pub timezone: chrono_tz::Tz,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Sao_Paulo,
        }
    }
}

/// Aggregation and prompt configuration of one summary section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Section key in the output document (e.g. "reason").
    pub key: String,
    /// Field name inside annotation records (e.g. "motivo").
    pub note_field: String,
    pub anchor: Option<NoteAnchor>,
    pub window: WindowPolicy,
    /// JSON prompt template holding the single substitution placeholder.
    pub template: Value,
}

fn section_template(instruction: &str) -> Value {
    json!({
        "system": "You are a clinical scribe drafting one section of a hospital \
                   discharge summary. Use only the annotations provided.",
        "user": format!("{instruction}: :replace_text"),
    })
}

/// The seven stock sections with their anchors and windows.
pub fn default_sections() -> Vec<SectionConfig> {
    vec![
        SectionConfig {
            key: "reason".into(),
            note_field: "motivo".into(),
            anchor: Some(NoteAnchor::FirstNote),
            window: WindowPolicy::Forward { days: 4 },
            template: section_template("Summarize the reason for this admission"),
        },
        SectionConfig {
            key: "previousDrugs".into(),
            note_field: "medprevio".into(),
            anchor: Some(NoteAnchor::FirstNote),
            window: WindowPolicy::Forward { days: 1 },
            template: section_template("List the medications the patient used before admission"),
        },
        SectionConfig {
            key: "diagnosis".into(),
            note_field: "diagnostico".into(),
            anchor: None,
            window: WindowPolicy::Unbounded,
            template: section_template("Summarize the diagnoses established during this admission"),
        },
        SectionConfig {
            key: "dischargeCondition".into(),
            note_field: "condicaoalta".into(),
            anchor: Some(NoteAnchor::LastNote),
            window: WindowPolicy::Backward { days: 1 },
            template: section_template("Describe the patient's condition at discharge"),
        },
        SectionConfig {
            key: "dischargePlan".into(),
            note_field: "planoalta".into(),
            anchor: Some(NoteAnchor::LastNote),
            window: WindowPolicy::Backward { days: 1 },
            template: section_template("Describe the discharge plan and follow-up"),
        },
        SectionConfig {
            key: "procedures".into(),
            note_field: "procedimentos".into(),
            anchor: None,
            window: WindowPolicy::Unbounded,
            template: section_template("List the procedures performed during this admission"),
        },
        SectionConfig {
            key: "exams".into(),
            note_field: "exames".into(),
            anchor: None,
            window: WindowPolicy::Unbounded,
            template: section_template("Summarize the relevant exam findings"),
        },
    ]
}
