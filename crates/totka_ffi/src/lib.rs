//! Host bridge for the Totka core.

pub mod api;
