//! Data Validation
//!
//! Provides input validation, range checking, and dirty-input parsing for
//! vehicle speed and following-distance samples.

mod error;
mod quality;
mod validator;

pub use error::ValidationError;
pub use quality::{QualityGate, QualityReport};
pub use validator::{ValidationConfig, ValidationResult, Validator};
