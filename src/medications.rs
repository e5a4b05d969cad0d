//! Medication history resolution for an admission: substances in use,
//! substances definitively suspended, and the point-in-time receipt of
//! active prescriptions.
//!
//! The resolver is a set of pure reductions over the admission's ordered
//! medication orders. Dietary orders never count as medication. Absence of
//! data is a valid terminal state, never an error.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::error::SummaryError;
use crate::models::MedicationOrder;
use crate::store::RecordStore;

// ═══════════════════════════════════════════
// Types
// ═══════════════════════════════════════════

/// One line of the active-prescription receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptEntry {
    pub name: String,
    pub dose: f64,
    pub measure_unit: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
}

/// The three medication views of one admission.
#[derive(Debug, Clone, Serialize)]
pub struct MedicationHistory {
    pub drugs_used: Vec<String>,
    pub drugs_suspended: Vec<String>,
    pub receipt: Vec<ReceiptEntry>,
}

/// Two orders for the same substance share a sequence number, so the
/// supersession rule has no recency proxy to compare. The history is
/// unresolvable until the source data is corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("medication orders for '{substance}' share sequence number {sequence}")]
pub struct DataAnomaly {
    pub substance: String,
    pub sequence: i64,
}

// ═══════════════════════════════════════════
// Resolution
// ═══════════════════════════════════════════

/// Resolve the full medication history of an admission from the store.
pub fn resolve_history(
    store: &dyn RecordStore,
    admission_number: i64,
) -> Result<MedicationHistory, SummaryError> {
    let orders = store.list_medication_orders(admission_number)?;
    let reference = store.last_aggregated_prescription_date(admission_number)?;
    Ok(MedicationHistory {
        drugs_used: drugs_used(&orders),
        drugs_suspended: drugs_suspended(&orders)?,
        receipt: receipt(&orders, reference),
    })
}

/// Distinct non-dietary substances administered, alphabetical.
pub fn drugs_used(orders: &[MedicationOrder]) -> Vec<String> {
    let mut names: Vec<String> = orders
        .iter()
        .filter(|o| !o.origin.is_dietary())
        .map(|o| o.substance.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Distinct substances definitively suspended, alphabetical.
///
/// A substance qualifies when some suspended order for it is not
/// superseded: no order for the same substance with a strictly greater
/// sequence number has a null suspension date. A later un-suspended
/// re-order revives the substance and removes it from this set.
pub fn drugs_suspended(orders: &[MedicationOrder]) -> Result<Vec<String>, DataAnomaly> {
    detect_sequence_anomalies(orders)?;

    let mut names: Vec<String> = orders
        .iter()
        .filter(|o| !o.origin.is_dietary() && o.suspended_at.is_some())
        .filter(|o| {
            let revived = orders.iter().any(|later| {
                later.substance == o.substance
                    && later.sequence > o.sequence
                    && later.suspended_at.is_none()
            });
            !revived
        })
        .map(|o| o.substance.clone())
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Active-prescription snapshot at the latest aggregated-prescription
/// timestamp. No aggregated prescription → empty receipt.
///
/// Orders are grouped by (substance, frequency, dose, unit, route) and
/// each group reduced to the row with the latest validity start — an
/// explicit reduction, not an ordering side effect.
pub fn receipt(orders: &[MedicationOrder], reference: Option<NaiveDateTime>) -> Vec<ReceiptEntry> {
    let Some(reference) = reference else {
        return Vec::new();
    };
    let day = reference.date();

    let mut latest: HashMap<ReceiptKey, &MedicationOrder> = HashMap::new();
    for order in orders
        .iter()
        .filter(|o| !o.origin.is_dietary() && o.suspended_at.is_none() && o.valid_on(day))
    {
        match latest.entry(ReceiptKey::of(order)) {
            Entry::Occupied(mut slot) => {
                if order.valid_from > slot.get().valid_from {
                    slot.insert(order);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(order);
            }
        }
    }

    let mut entries: Vec<ReceiptEntry> = latest
        .into_values()
        .map(|o| ReceiptEntry {
            name: o.substance.clone(),
            dose: o.dose,
            measure_unit: o.unit.clone(),
            frequency: o.frequency.clone(),
            route: o.route.clone(),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Composite dedup key for receipt rows. Dose participates bitwise, which
/// is exact for values read back from storage.
#[derive(PartialEq, Eq, Hash)]
struct ReceiptKey {
    name: String,
    frequency: Option<String>,
    dose_bits: u64,
    unit: Option<String>,
    route: Option<String>,
}

impl ReceiptKey {
    fn of(order: &MedicationOrder) -> Self {
        Self {
            name: order.substance.clone(),
            frequency: order.frequency.clone(),
            dose_bits: order.dose.to_bits(),
            unit: order.unit.clone(),
            route: order.route.clone(),
        }
    }
}

fn detect_sequence_anomalies(orders: &[MedicationOrder]) -> Result<(), DataAnomaly> {
    let mut seen: HashSet<(&str, i64)> = HashSet::new();
    for order in orders {
        if !seen.insert((order.substance.as_str(), order.sequence)) {
            return Err(DataAnomaly {
                substance: order.substance.clone(),
                sequence: order.sequence,
            });
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
