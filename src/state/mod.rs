//! Verification State Module
//!
//! Handles persistence and tracking of feature verification, including:
//! - File fingerprints for drift detection
//! - Manual and checklist-derived verification
//! - Invalidation sweeps
//! - Atomic persistence of the verification document

mod error;
pub mod fingerprint;
mod store;
pub mod transitions;

pub use error::{StoreError, TransitionError};
pub use fingerprint::fingerprint;
pub use store::Store;
pub use transitions::{drift, is_affected, ChecklistOutcome, DriftStatus, StateMachine};

