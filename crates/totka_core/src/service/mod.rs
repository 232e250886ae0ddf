//! Core use-case services.
//!
//! # Responsibility
//! - Turn load → mutate → save cycles over the documents into use-cases.
//! - Compose registry, adherence log and scheduler for host callers.
//!
//! # Invariants
//! - Validation happens before any document is written.
//! - Services never hold document state between calls; every operation
//!   re-reads the store.

pub mod adherence_service;
pub mod history_service;
pub mod registry_service;
pub mod reminder_service;
