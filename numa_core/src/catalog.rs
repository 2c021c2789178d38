//! Built-in reference data: cities, languages, issue tags, packages and the
//! clinician roster.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default reference data - built once and reused
static DEFAULT_REFERENCE: Lazy<ReferenceData> = Lazy::new(build_default_reference_internal);

/// Get a reference to the cached default reference data
pub fn get_default_reference() -> &'static ReferenceData {
    &DEFAULT_REFERENCE
}

/// Builds the default reference data
///
/// **Note**: prefer `get_default_reference()` unless the result needs to be
/// extended (e.g. with clinicians from the config file).
pub fn build_default_reference() -> ReferenceData {
    build_default_reference_internal()
}

fn build_default_reference_internal() -> ReferenceData {
    let cities = [
        "Bengaluru",
        "Mumbai",
        "Delhi",
        "Hyderabad",
        "Chennai",
        "Pune",
        "Kolkata",
        "Other",
    ];

    let languages = [
        "English", "Hindi", "Kannada", "Tamil", "Telugu", "Marathi", "Bengali",
    ];

    let issues = [
        "Anxiety",
        "Depression",
        "Stress",
        "Sleep",
        "Relationships",
        "Trauma",
        "ADHD",
        "Addiction",
        "Grief",
        "Other",
    ];

    // ========================================================================
    // Packages
    // ========================================================================

    let packages = vec![
        Package {
            id: PackageId::SingleSession,
            name: "Single Session".into(),
            sessions: 1,
            price_inr: 1_500,
        },
        Package {
            id: PackageId::StarterPack,
            name: "Starter Pack (3 sessions)".into(),
            sessions: 3,
            price_inr: 4_000,
        },
        Package {
            id: PackageId::CarePlan,
            name: "Care Plan (6 sessions)".into(),
            sessions: 6,
            price_inr: 7_500,
        },
        Package {
            id: PackageId::IntensivePlan,
            name: "Intensive Plan (12 sessions)".into(),
            sessions: 12,
            price_inr: 14_000,
        },
    ];

    // ========================================================================
    // Clinician roster (order matters: the matcher takes the first fit)
    // ========================================================================

    let clinicians = vec![
        Clinician {
            id: "dr_a".into(),
            name: "Dr. Ananya Rao".into(),
            role: ClinicianRole::Psychiatrist,
            bio: "Psychiatrist focusing on mood and anxiety disorders in adults.".into(),
            weekday: true,
            weekend: true,
            morning: true,
            evening: false,
            accepts_child: false,
        },
        Clinician {
            id: "dr_b".into(),
            name: "Dr. Vikram Mehta".into(),
            role: ClinicianRole::Psychologist,
            bio: "Clinical psychologist working with children, teens and families.".into(),
            weekday: true,
            weekend: false,
            morning: true,
            evening: true,
            accepts_child: true,
        },
        Clinician {
            id: "dr_c".into(),
            name: "Dr. Sara Thomas".into(),
            role: ClinicianRole::Psychologist,
            bio: "Counselling psychologist for stress, grief and relationships.".into(),
            weekday: false,
            weekend: true,
            morning: true,
            evening: true,
            accepts_child: true,
        },
    ];

    ReferenceData {
        cities: cities.iter().map(|s| s.to_string()).collect(),
        languages: languages.iter().map(|s| s.to_string()).collect(),
        issues: issues.iter().map(|s| s.to_string()).collect(),
        packages,
        clinicians,
    }
}

impl ReferenceData {
    /// Look up a clinician by id
    pub fn clinician(&self, id: &str) -> Option<&Clinician> {
        self.clinicians.iter().find(|c| c.id == id)
    }

    /// Look up a package by id
    pub fn package(&self, id: PackageId) -> Option<&Package> {
        self.packages.iter().find(|p| p.id == id)
    }

    /// Append clinicians declared in the config file after the built-in roster
    pub fn with_custom_clinicians(mut self, custom: &[Clinician]) -> Self {
        for entry in custom {
            tracing::debug!("Adding custom clinician {}", entry.id);
            self.clinicians.push(entry.clone());
        }
        self
    }

    /// Validate the reference data for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (label, list) in [
            ("city", &self.cities),
            ("language", &self.languages),
            ("issue", &self.issues),
        ] {
            if list.is_empty() {
                errors.push(format!("No {} options defined", label));
            }
            let mut seen = HashSet::new();
            for value in list {
                if value.trim().is_empty() {
                    errors.push(format!("Empty {} option", label));
                }
                if !seen.insert(value.to_lowercase()) {
                    errors.push(format!("Duplicate {} option '{}'", label, value));
                }
            }
        }

        let mut package_ids = HashSet::new();
        for package in &self.packages {
            if !package_ids.insert(package.id) {
                errors.push(format!("Duplicate package {:?}", package.id));
            }
            if package.sessions == 0 {
                errors.push(format!("Package {:?} has no sessions", package.id));
            }
        }
        if package_ids.len() != 4 {
            errors.push(format!(
                "Expected 4 packages, found {}",
                package_ids.len()
            ));
        }

        if self.clinicians.is_empty() {
            errors.push("Clinician roster is empty".to_string());
        }

        let mut clinician_ids = HashSet::new();
        for clinician in &self.clinicians {
            if clinician.id.is_empty() {
                errors.push("Clinician has empty ID".to_string());
            } else if clinician.id.contains(char::is_whitespace) {
                errors.push(format!(
                    "Clinician ID '{}' contains whitespace",
                    clinician.id
                ));
            }
            if !clinician_ids.insert(clinician.id.as_str()) {
                errors.push(format!("Duplicate clinician ID '{}'", clinician.id));
            }
            if clinician.name.is_empty() {
                errors.push(format!("Clinician '{}' has empty name", clinician.id));
            }
            if !clinician.weekday && !clinician.weekend {
                errors.push(format!("Clinician '{}' works no days", clinician.id));
            }
            if !clinician.morning && !clinician.evening {
                errors.push(format!("Clinician '{}' has no hours", clinician.id));
            }
        }

        errors
    }
}
