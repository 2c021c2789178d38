#![forbid(unsafe_code)]

//! Core domain model and business logic for the NUMA onboarding wizard.
//!
//! This crate provides:
//! - Domain types (form record, clinicians, slots, packages)
//! - Reference data (cities, languages, issues, roster)
//! - Clinician matching and slot generation
//! - The step wizard with draft persistence
//! - The payment gateway seam and its simulator

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod age;
pub mod matcher;
pub mod slots;
pub mod draft;
pub mod exit;
pub mod payment;
pub mod wizard;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_reference, get_default_reference};
pub use config::Config;
pub use age::infer_age_group;
pub use matcher::{assign_doctor, eligible_clinicians};
pub use slots::generate_slots;
pub use draft::DraftStore;
pub use exit::{exit_url, ExitHandler, ExitReason};
pub use payment::{PaymentGateway, SimulatedGateway};
pub use wizard::{can_advance, Step, Wizard, WizardSettings};
