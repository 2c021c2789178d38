//! Error types for the numa_core library.

use crate::wizard::Step;
use crate::{AgeGroup, DayPreference, TimePreference};
use std::io;
use std::path::PathBuf;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for numa_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reference data validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Date of birth could not be parsed or is in the future
    #[error("Invalid date of birth '{input}': {reason}")]
    InvalidDate { input: String, reason: String },

    /// A field value was rejected (unknown city, unknown slot, ...)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The current step's requirements are not met yet
    #[error("Step '{0}' is not complete")]
    StepIncomplete(Step),

    /// No clinician in the roster satisfies the preferences
    #[error(
        "No clinician currently available for {day:?}/{time:?} ({age:?}), try different preferences"
    )]
    NoMatchingClinician {
        day: DayPreference,
        time: TimePreference,
        age: Option<AgeGroup>,
    },

    /// Writing the draft file failed
    #[error("Failed to save draft to {path:?}: {source}")]
    DraftWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Checkout/payment error
    #[error("Payment error: {0}")]
    Payment(String),

    /// The wizard already exited and accepts no further changes
    #[error("Wizard has already exited")]
    WizardClosed,
}
