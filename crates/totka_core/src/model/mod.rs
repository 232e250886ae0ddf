//! Domain model for medicines, adherence history and alert payloads.
//!
//! # Invariants
//! - Every medicine carries at least one valid, normalized `DoseTime`.
//! - History entries keep the medicine name as recorded, never a live link.

pub mod alert;
pub mod history;
pub mod medicine;
