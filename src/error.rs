//! Error taxonomy for the gamification core.
//!
//! - `Validation`: malformed or out-of-range input to a public operation.
//! - `NotInitialized`: the student has no level state yet. Callers treat this
//!   as a valid "fresh student" answer, not a failure.
//! - `Computation`: an unexpected failure inside one formula. These are caught
//!   per achievement / per challenge and never abort the rest of a pass.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GamifyError {
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("no gamification state for this student yet")]
  NotInitialized,

  #[error("computation failed: {0}")]
  Computation(String),
}

pub type Result<T> = std::result::Result<T, GamifyError>;
