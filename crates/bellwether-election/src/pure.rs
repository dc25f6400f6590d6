//! Pure election status derivation.
//!
//! Deterministic and side-effect free; the engine applies this rule after
//! every observation of the leader record.

use crate::types::ElectionStatus;

/// Derive the status from an observation of the leader record.
///
/// `leader_id` is the payload of an observed record, or `None` when the
/// record is absent. Vacancy handling (contending for an absent record) is
/// the engine's job; observation of a vacancy derives to `Watching`.
///
/// ```text
/// record == self            -> Leading
/// record != self, contending -> Waiting
/// otherwise                  -> Watching
/// ```
pub fn derive_status(wants_to_lead: bool, my_id: Option<&str>, leader_id: Option<&str>) -> ElectionStatus {
    match leader_id {
        Some(leader) if my_id == Some(leader) => ElectionStatus::Leading,
        Some(_) if wants_to_lead => ElectionStatus::Waiting,
        _ => ElectionStatus::Watching,
    }
}
