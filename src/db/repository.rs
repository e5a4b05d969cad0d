//! Repository functions over the record schema, plus the SQLite-backed
//! implementation of the [`RecordStore`] gateway.
//!
//! Writes exist only to load records (integrations, test fixtures); the
//! summary engine itself never mutates anything.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::config::{default_sections, SectionConfig};
use crate::models::enums::OrderOrigin;
use crate::models::{Admission, AnnotationRecord, ExamResult, MedicationOrder, Patient};
use crate::store::{latest_abnormal, RecordStore, StoreError};
use crate::window::{NoteAnchor, WindowPolicy};

// ═══════════════════════════════════════════
// Inserts
// ═══════════════════════════════════════════

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, birthdate, gender, weight, height, skin_color)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            patient.id.to_string(),
            patient.birthdate,
            patient.gender,
            patient.weight,
            patient.height,
            patient.skin_color,
        ],
    )?;
    Ok(())
}

pub fn insert_admission(conn: &Connection, admission: &Admission) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO admissions (admission_number, patient_id, admission_date, discharge_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            admission.admission_number,
            admission.patient_id.to_string(),
            admission.admission_date,
            admission.discharge_date,
        ],
    )?;
    Ok(())
}

pub fn insert_annotation(conn: &Connection, record: &AnnotationRecord) -> Result<(), DatabaseError> {
    let fields = serde_json::to_string(&record.fields).map_err(|e| DatabaseError::Malformed {
        column: "fields".into(),
        reason: e.to_string(),
    })?;
    conn.execute(
        "INSERT INTO clinical_annotations (admission_number, noted_at, fields)
         VALUES (?1, ?2, ?3)",
        params![record.admission_number, record.noted_at, fields],
    )?;
    Ok(())
}

pub fn insert_exam_result(conn: &Connection, exam: &ExamResult) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO exam_results (patient_id, exam_code, result, unit, collected_at, ref_min, ref_max)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            exam.patient_id.to_string(),
            exam.exam_code,
            exam.result,
            exam.unit,
            exam.collected_at,
            exam.ref_min,
            exam.ref_max,
        ],
    )?;
    Ok(())
}

pub fn insert_medication_order(
    conn: &Connection,
    order: &MedicationOrder,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medication_orders (admission_number, sequence, substance, dose, unit,
         frequency, route, valid_from, valid_until, suspended_at, origin)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            order.admission_number,
            order.sequence,
            order.substance,
            order.dose,
            order.unit,
            order.frequency,
            order.route,
            order.valid_from,
            order.valid_until,
            order.suspended_at,
            order.origin.as_str(),
        ],
    )?;
    Ok(())
}

pub fn insert_aggregated_prescription(
    conn: &Connection,
    admission_number: i64,
    aggregated_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO aggregated_prescriptions (admission_number, aggregated_at) VALUES (?1, ?2)",
        params![admission_number, aggregated_at],
    )?;
    Ok(())
}

pub fn upsert_section_config(conn: &Connection, section: &SectionConfig) -> Result<(), DatabaseError> {
    let (direction, interval_days) = window_to_columns(section.window);
    conn.execute(
        "INSERT OR REPLACE INTO summary_sections (key, note_field, anchor, direction, interval_days, template)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            section.key,
            section.note_field,
            section.anchor.map(anchor_to_str),
            direction,
            interval_days,
            section.template.to_string(),
        ],
    )?;
    Ok(())
}

/// Seed the stock section configuration when the table is empty.
pub fn seed_default_sections(conn: &Connection) -> Result<(), DatabaseError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM summary_sections", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }
    tracing::info!("Seeding default summary section configuration");
    for section in default_sections() {
        upsert_section_config(conn, &section)?;
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Fetches
// ═══════════════════════════════════════════

pub fn fetch_admission(
    conn: &Connection,
    admission_number: i64,
) -> Result<Option<Admission>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT admission_number, patient_id, admission_date, discharge_date
             FROM admissions WHERE admission_number = ?1",
            params![admission_number],
            |row| {
                Ok(Admission {
                    admission_number: row.get(0)?,
                    patient_id: parse_uuid(1, row.get(1)?)?,
                    admission_date: row.get(2)?,
                    discharge_date: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn fetch_patient_by_admission(
    conn: &Connection,
    admission_number: i64,
) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT p.id, p.birthdate, p.gender, p.weight, p.height, p.skin_color
             FROM patients p
             INNER JOIN admissions a ON a.patient_id = p.id
             WHERE a.admission_number = ?1",
            params![admission_number],
            |row| {
                Ok(Patient {
                    id: parse_uuid(0, row.get(0)?)?,
                    birthdate: row.get(1)?,
                    gender: row.get(2)?,
                    weight: row.get(3)?,
                    height: row.get(4)?,
                    skin_color: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Annotations of an admission, ascending timestamp.
pub fn fetch_annotations(
    conn: &Connection,
    admission_number: i64,
) -> Result<Vec<AnnotationRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT admission_number, noted_at, fields
         FROM clinical_annotations
         WHERE admission_number = ?1
         ORDER BY noted_at ASC",
    )?;
    let records = stmt
        .query_map(params![admission_number], |row| {
            let raw: String = row.get(2)?;
            let fields: HashMap<String, Vec<String>> = serde_json::from_str(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
            Ok(AnnotationRecord {
                admission_number: row.get(0)?,
                noted_at: row.get(1)?,
                fields,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// All exam results of a patient, with their reference ranges.
pub fn fetch_exam_results(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<ExamResult>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, exam_code, result, unit, collected_at, ref_min, ref_max
         FROM exam_results
         WHERE patient_id = ?1",
    )?;
    let exams = stmt
        .query_map(params![patient_id.to_string()], |row| {
            Ok(ExamResult {
                patient_id: parse_uuid(0, row.get(0)?)?,
                exam_code: row.get(1)?,
                result: row.get(2)?,
                unit: row.get(3)?,
                collected_at: row.get(4)?,
                ref_min: row.get(5)?,
                ref_max: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(exams)
}

/// Medication orders of an admission, ascending sequence number.
pub fn fetch_medication_orders(
    conn: &Connection,
    admission_number: i64,
) -> Result<Vec<MedicationOrder>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT admission_number, sequence, substance, dose, unit, frequency, route,
                valid_from, valid_until, suspended_at, origin
         FROM medication_orders
         WHERE admission_number = ?1
         ORDER BY sequence ASC",
    )?;
    let orders = stmt
        .query_map(params![admission_number], |row| {
            let origin: String = row.get(10)?;
            let origin = OrderOrigin::from_str(&origin)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;
            Ok(MedicationOrder {
                admission_number: row.get(0)?,
                sequence: row.get(1)?,
                substance: row.get(2)?,
                dose: row.get(3)?,
                unit: row.get(4)?,
                frequency: row.get(5)?,
                route: row.get(6)?,
                valid_from: row.get(7)?,
                valid_until: row.get(8)?,
                suspended_at: row.get(9)?,
                origin,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(orders)
}

pub fn fetch_last_aggregated_at(
    conn: &Connection,
    admission_number: i64,
) -> Result<Option<NaiveDateTime>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT aggregated_at FROM aggregated_prescriptions
             WHERE admission_number = ?1
             ORDER BY aggregated_at DESC
             LIMIT 1",
            params![admission_number],
            |row| row.get(0),
        )
        .optional()?;
    Ok(row)
}

pub fn fetch_section_configs(conn: &Connection) -> Result<Vec<SectionConfig>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT key, note_field, anchor, direction, interval_days, template
         FROM summary_sections
         ORDER BY key ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(key, note_field, anchor, direction, interval_days, template)| {
            Ok(SectionConfig {
                key,
                note_field,
                anchor: anchor.as_deref().map(anchor_from_str).transpose()?,
                window: window_from_columns(direction.as_deref(), interval_days)?,
                template: serde_json::from_str(&template).map_err(|e| DatabaseError::Malformed {
                    column: "template".into(),
                    reason: e.to_string(),
                })?,
            })
        })
        .collect()
}

// ═══════════════════════════════════════════
// Column mappings
// ═══════════════════════════════════════════

fn anchor_to_str(anchor: NoteAnchor) -> &'static str {
    match anchor {
        NoteAnchor::FirstNote => "first",
        NoteAnchor::LastNote => "last",
    }
}

fn anchor_from_str(s: &str) -> Result<NoteAnchor, DatabaseError> {
    match s {
        "first" => Ok(NoteAnchor::FirstNote),
        "last" => Ok(NoteAnchor::LastNote),
        _ => Err(DatabaseError::InvalidEnum {
            field: "anchor".into(),
            value: s.into(),
        }),
    }
}

fn window_to_columns(window: WindowPolicy) -> (Option<&'static str>, Option<i64>) {
    match window {
        WindowPolicy::Unbounded => (None, None),
        WindowPolicy::Forward { days } => (Some("forward"), Some(days)),
        WindowPolicy::Backward { days } => (Some("backward"), Some(days)),
    }
}

fn window_from_columns(
    direction: Option<&str>,
    interval_days: Option<i64>,
) -> Result<WindowPolicy, DatabaseError> {
    match (direction, interval_days) {
        (None, _) => Ok(WindowPolicy::Unbounded),
        (Some("forward"), Some(days)) => Ok(WindowPolicy::Forward { days }),
        (Some("backward"), Some(days)) => Ok(WindowPolicy::Backward { days }),
        (Some(other), _) => Err(DatabaseError::InvalidEnum {
            field: "direction".into(),
            value: other.into(),
        }),
    }
}

fn parse_uuid(idx: usize, s: String) -> rusqlite::Result<Uuid> {
    s.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ═══════════════════════════════════════════
// SQLite-backed record store
// ═══════════════════════════════════════════

/// The crate's shipped [`RecordStore`]: a SQLite database holding the
/// admission's records.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_memory_database()?,
        })
    }

    /// Direct access for loading records.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for SqliteRecordStore {
    fn get_admission(&self, admission_number: i64) -> Result<Option<Admission>, StoreError> {
        Ok(fetch_admission(&self.conn, admission_number)?)
    }

    fn get_patient(&self, admission_number: i64) -> Result<Option<Patient>, StoreError> {
        Ok(fetch_patient_by_admission(&self.conn, admission_number)?)
    }

    fn list_annotations(
        &self,
        admission_number: i64,
    ) -> Result<Vec<AnnotationRecord>, StoreError> {
        Ok(fetch_annotations(&self.conn, admission_number)?)
    }

    fn list_abnormal_exams(&self, patient_id: &Uuid) -> Result<Vec<ExamResult>, StoreError> {
        Ok(latest_abnormal(fetch_exam_results(&self.conn, patient_id)?))
    }

    fn list_medication_orders(
        &self,
        admission_number: i64,
    ) -> Result<Vec<MedicationOrder>, StoreError> {
        Ok(fetch_medication_orders(&self.conn, admission_number)?)
    }

    fn last_aggregated_prescription_date(
        &self,
        admission_number: i64,
    ) -> Result<Option<NaiveDateTime>, StoreError> {
        Ok(fetch_last_aggregated_at(&self.conn, admission_number)?)
    }

    fn section_config(&self) -> Result<Vec<SectionConfig>, StoreError> {
        Ok(fetch_section_configs(&self.conn)?)
    }
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
