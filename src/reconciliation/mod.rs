//! # Reconciliation
//!
//! Detects statements that were handed to the executor but did not land, and
//! regenerates them for another pass.

mod discrepancy;
mod snapshot;

pub use discrepancy::{lookup_query, DiscrepancyFinder, ReconciliationReport};
pub use snapshot::{AuthoritativeReader, StillEmptySnapshot};
