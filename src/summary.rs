//! Summary orchestration: compose patient demographics, abnormal exams,
//! medication history and the per-section prompts into one document.
//!
//! Documents are all-or-nothing; a failing section aborts the whole
//! request. The assembler performs no writes and keeps no per-request
//! state, so requests for different admissions can run fully in parallel.

use std::collections::BTreeMap;

use chrono::offset::LocalResult;
use chrono::{NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::annotations::aggregate_fragments;
use crate::authorization::{require_any_role, Requester, SUMMARY_ROLES};
use crate::config::SummarySettings;
use crate::error::SummaryError;
use crate::medications::{resolve_history, ReceiptEntry};
use crate::models::{Admission, ExamResult, Patient};
use crate::prompt::assemble_prompt;
use crate::store::RecordStore;
use crate::window::{select_window, NoteAnchor};

// ═══════════════════════════════════════════
// Document types
// ═══════════════════════════════════════════

/// Patient demographics block of the document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientBlock {
    pub id_patient: Uuid,
    pub admission_number: i64,
    pub admission_date: String,
    pub discharge_date: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    /// kg/m², rounded to 2 decimals; absent when weight or height is.
    pub bmi: Option<f64>,
    pub color: Option<String>,
}

/// One abnormal exam observation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamEntry {
    pub name: String,
    pub date: String,
    pub result: f64,
    pub measure_unit: Option<String>,
}

/// One configured section: the assembled prompt and its audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct SummarySection {
    pub prompt: Value,
    pub audit: Vec<String>,
}

/// The full structured discharge summary. In-memory only; serialization
/// is the caller's concern.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDocument {
    pub patient: PatientBlock,
    pub exams: Vec<ExamEntry>,
    pub drugs_used: Vec<String>,
    pub drugs_suspended: Vec<String>,
    pub receipt: Vec<ReceiptEntry>,
    pub summary_config: BTreeMap<String, SummarySection>,
}

// ═══════════════════════════════════════════
// Assembler
// ═══════════════════════════════════════════

/// Stateless orchestrator; construct once with settings, reuse across
/// requests.
#[derive(Debug, Clone, Default)]
pub struct SummaryAssembler {
    settings: SummarySettings,
}

impl SummaryAssembler {
    pub fn new(settings: SummarySettings) -> Self {
        Self { settings }
    }

    /// Assemble the discharge summary of one admission.
    pub fn assemble(
        &self,
        store: &dyn RecordStore,
        admission_number: i64,
        requester: &Requester,
    ) -> Result<SummaryDocument, SummaryError> {
        require_any_role(requester, SUMMARY_ROLES)?;

        let admission = store
            .get_admission(admission_number)?
            .ok_or(SummaryError::InvalidRecord(admission_number))?;
        let patient = store
            .get_patient(admission_number)?
            .ok_or(SummaryError::InvalidRecord(admission_number))?;

        tracing::debug!(admission_number, "assembling discharge summary");

        let history = resolve_history(store, admission_number)?;
        let exams = store
            .list_abnormal_exams(&patient.id)?
            .into_iter()
            .map(|e| self.exam_entry(e))
            .collect();

        let annotations = store.list_annotations(admission_number)?;
        let first_note = annotations.first().map(|r| r.noted_at);
        let last_note = annotations.last().map(|r| r.noted_at);

        let mut sections = BTreeMap::new();
        for section in store.section_config()? {
            let anchor = match section.anchor {
                Some(NoteAnchor::FirstNote) => first_note,
                Some(NoteAnchor::LastNote) => last_note,
                None => None,
            };
            let window = select_window(anchor, section.window);
            let aggregate = aggregate_fragments(&annotations, &section.note_field, window);
            let prompt = assemble_prompt(&section.key, &section.template, &aggregate.rendered_text)?;
            sections.insert(
                section.key,
                SummarySection {
                    prompt,
                    audit: aggregate.audit,
                },
            );
        }

        tracing::info!(
            admission_number,
            sections = sections.len(),
            "discharge summary assembled"
        );

        Ok(SummaryDocument {
            patient: self.patient_block(&admission, &patient),
            exams,
            drugs_used: history.drugs_used,
            drugs_suspended: history.drugs_suspended,
            receipt: history.receipt,
            summary_config: sections,
        })
    }

    fn patient_block(&self, admission: &Admission, patient: &Patient) -> PatientBlock {
        PatientBlock {
            id_patient: patient.id,
            admission_number: admission.admission_number,
            admission_date: self.format_local(admission.admission_date),
            discharge_date: admission.discharge_date.map(|d| self.format_local(d)),
            birthdate: patient.birthdate,
            gender: patient.gender.clone(),
            weight: patient.weight,
            height: patient.height,
            bmi: body_mass_index(patient.weight, patient.height),
            color: patient.skin_color.clone(),
        }
    }

    fn exam_entry(&self, exam: ExamResult) -> ExamEntry {
        ExamEntry {
            name: exam.exam_code,
            date: self.format_local(exam.collected_at),
            result: exam.result,
            measure_unit: exam.unit,
        }
    }

    /// Render a stored wall-clock timestamp in the configured zone.
    fn format_local(&self, when: NaiveDateTime) -> String {
        match self.settings.timezone.from_local_datetime(&when) {
            LocalResult::Single(zoned) | LocalResult::Ambiguous(zoned, _) => zoned.to_rfc3339(),
            // A local time skipped by a DST jump; fall back to the naive form.
            LocalResult::None => when.to_string(),
        }
    }
}

/// BMI = weight / (height/100)², rounded to 2 decimals. `None` when either
/// measurement is missing.
fn body_mass_index(weight: Option<f64>, height: Option<f64>) -> Option<f64> {
    let (weight, height) = (weight?, height?);
    let bmi = weight / (height / 100.0).powi(2);
    Some((bmi * 100.0).round() / 100.0)
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::Role;
    use crate::db::{
        insert_admission, insert_aggregated_prescription, insert_annotation, insert_exam_result,
        insert_medication_order, insert_patient, SqliteRecordStore,
    };
    use crate::models::enums::OrderOrigin;
    use crate::models::{AnnotationRecord, MedicationOrder};
    use std::collections::HashMap;

    fn doctor() -> Requester {
        Requester::new("dr-lima", [Role::Doctor])
    }

    fn seeded_store(admission_number: i64) -> (SqliteRecordStore, Patient) {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let patient = Patient {
            id: Uuid::new_v4(),
            birthdate: Some("1961-03-15".parse().unwrap()),
            gender: Some("F".into()),
            weight: Some(70.0),
            height: Some(175.0),
            skin_color: Some("parda".into()),
        };
        insert_patient(store.connection(), &patient).unwrap();
        insert_admission(
            store.connection(),
            &Admission {
                admission_number,
                patient_id: patient.id,
                admission_date: "2024-05-01T10:00:00".parse().unwrap(),
                discharge_date: Some("2024-05-10T16:00:00".parse().unwrap()),
            },
        )
        .unwrap();
        (store, patient)
    }

    fn note(admission_number: i64, noted_at: &str, field: &str, fragments: &[&str]) -> AnnotationRecord {
        AnnotationRecord {
            admission_number,
            noted_at: noted_at.parse().unwrap(),
            fields: HashMap::from([(
                field.to_string(),
                fragments.iter().map(|s| s.to_string()).collect(),
            )]),
        }
    }

    fn order(admission_number: i64, sequence: i64, substance: &str, suspended: bool) -> MedicationOrder {
        MedicationOrder {
            admission_number,
            sequence,
            substance: substance.into(),
            dose: 500.0,
            unit: Some("mg".into()),
            frequency: Some("12/12h".into()),
            route: Some("oral".into()),
            valid_from: "2024-05-01T10:00:00".parse().unwrap(),
            valid_until: "2024-05-30".parse().unwrap(),
            suspended_at: suspended.then(|| "2024-05-03T10:00:00".parse().unwrap()),
            origin: OrderOrigin::Medication,
        }
    }

    #[test]
    fn assembles_the_full_document() {
        let (store, _) = seeded_store(99);
        let conn = store.connection();

        insert_annotation(conn, &note(99, "2024-05-01T09:00:00", "motivo", &["A", "B"])).unwrap();
        insert_annotation(conn, &note(99, "2024-05-04T09:00:00", "motivo", &["B", "C"])).unwrap();

        insert_medication_order(conn, &order(99, 1, "Omeprazole", false)).unwrap();
        insert_medication_order(conn, &order(99, 2, "Amoxicillin", true)).unwrap();
        insert_aggregated_prescription(conn, 99, "2024-05-05T08:00:00".parse().unwrap()).unwrap();

        let doc = SummaryAssembler::default()
            .assemble(&store, 99, &doctor())
            .unwrap();

        // Reason section: forward 4-day window from the first note.
        let reason = &doc.summary_config["reason"];
        assert_eq!(reason.audit, ["A", "B", "C"]);
        assert!(reason.prompt["user"].as_str().unwrap().contains("A. B. C"));

        // All seven sections are present even when empty.
        assert_eq!(doc.summary_config.len(), 7);
        assert!(doc.summary_config["diagnosis"].audit.is_empty());

        assert_eq!(doc.drugs_used, ["Amoxicillin", "Omeprazole"]);
        assert_eq!(doc.drugs_suspended, ["Amoxicillin"]);
        assert_eq!(doc.receipt.len(), 1);
        assert_eq!(doc.receipt[0].name, "Omeprazole");

        assert_eq!(doc.patient.bmi, Some(22.86));
        assert_eq!(doc.patient.admission_date, "2024-05-01T10:00:00-03:00");
        assert_eq!(
            doc.patient.discharge_date.as_deref(),
            Some("2024-05-10T16:00:00-03:00")
        );
    }

    #[test]
    fn requester_without_roles_is_rejected() {
        let (store, _) = seeded_store(99);
        let err = SummaryAssembler::default()
            .assemble(&store, 99, &Requester::new("clerk", []))
            .unwrap_err();
        assert!(matches!(err, SummaryError::Unauthorized));
    }

    #[test]
    fn unknown_admission_is_an_invalid_record() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let err = SummaryAssembler::default()
            .assemble(&store, 404, &doctor())
            .unwrap_err();
        assert!(matches!(err, SummaryError::InvalidRecord(404)));
    }

    #[test]
    fn a_broken_section_template_fails_the_whole_request() {
        let (store, _) = seeded_store(99);
        // An unescaped quote in a fragment breaks the JSON template.
        insert_annotation(
            store.connection(),
            &note(99, "2024-05-01T09:00:00", "motivo", &["noted \"stable\""]),
        )
        .unwrap();

        let err = SummaryAssembler::default()
            .assemble(&store, 99, &doctor())
            .unwrap_err();
        assert!(matches!(err, SummaryError::Template(_)));
    }

    #[test]
    fn backward_sections_anchor_on_the_last_note() {
        let (store, _) = seeded_store(99);
        let conn = store.connection();

        // Stale note far before discharge, fresh note on the last day.
        insert_annotation(conn, &note(99, "2024-05-02T09:00:00", "condicaoalta", &["stale"])).unwrap();
        insert_annotation(conn, &note(99, "2024-05-09T09:00:00", "planoalta", &["return in 30d"])).unwrap();
        insert_annotation(conn, &note(99, "2024-05-10T09:00:00", "condicaoalta", &["stable at discharge"]))
            .unwrap();

        let doc = SummaryAssembler::default()
            .assemble(&store, 99, &doctor())
            .unwrap();

        assert_eq!(
            doc.summary_config["dischargeCondition"].audit,
            ["stable at discharge"]
        );
        assert_eq!(doc.summary_config["dischargePlan"].audit, ["return in 30d"]);
    }

    #[test]
    fn no_annotations_yields_empty_sections_not_errors() {
        let (store, _) = seeded_store(99);
        let doc = SummaryAssembler::default()
            .assemble(&store, 99, &doctor())
            .unwrap();
        for (key, section) in &doc.summary_config {
            assert!(section.audit.is_empty(), "section {key}");
        }
        assert!(doc.drugs_used.is_empty());
        assert!(doc.receipt.is_empty());
    }

    #[test]
    fn abnormal_exams_land_in_the_exam_block() {
        let (store, patient) = seeded_store(99);
        insert_exam_result(
            store.connection(),
            &ExamResult {
                patient_id: patient.id,
                exam_code: "CREAT".into(),
                result: 3.2,
                unit: Some("mg/dL".into()),
                collected_at: "2024-05-02T08:00:00".parse().unwrap(),
                ref_min: 0.7,
                ref_max: 1.3,
            },
        )
        .unwrap();

        let doc = SummaryAssembler::default()
            .assemble(&store, 99, &doctor())
            .unwrap();
        assert_eq!(doc.exams.len(), 1);
        assert_eq!(doc.exams[0].name, "CREAT");
        assert_eq!(doc.exams[0].result, 3.2);
        assert_eq!(doc.exams[0].date, "2024-05-02T08:00:00-03:00");
    }

    #[test]
    fn document_serializes_with_the_expected_field_names() {
        let (store, _) = seeded_store(99);
        let doc = SummaryAssembler::default()
            .assemble(&store, 99, &doctor())
            .unwrap();

        let value = serde_json::to_value(&doc).unwrap();
        assert!(value["patient"]["idPatient"].is_string());
        assert!(value["patient"]["admissionNumber"].is_number());
        assert!(value["drugsUsed"].is_array());
        assert!(value["drugsSuspended"].is_array());
        assert!(value["summaryConfig"]["reason"]["prompt"].is_object());
        assert!(value["summaryConfig"]["reason"]["audit"].is_array());
    }

    #[test]
    fn bmi_rounds_to_two_decimals_and_requires_both_measurements() {
        assert_eq!(body_mass_index(Some(70.0), Some(175.0)), Some(22.86));
        assert_eq!(body_mass_index(None, Some(175.0)), None);
        assert_eq!(body_mass_index(Some(70.0), None), None);
    }
}
