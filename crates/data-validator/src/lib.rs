//! Data Validation and Range Evaluation
//!
//! Provides physical plausibility checks for raw sensor values and the pure
//! evaluator that compares a reading against a storage range profile.

mod error;
mod evaluator;
mod validator;

pub use error::ValidationError;
pub use evaluator::evaluate;
pub use validator::{ValidationConfig, ValidationResult, Validator};
