//! Core domain types for the NUMA onboarding wizard.
//!
//! This module defines the fundamental types used throughout the system:
//! - Profile enums (age group, scheduling preferences)
//! - Clinicians, slots and packages
//! - The accumulated form record and its draft envelope

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Profile Types
// ============================================================================

/// Age classification derived from the date of birth
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    Child,
    Adult,
}

/// Which days of the week the user can attend
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DayPreference {
    Weekdays,
    Weekends,
    #[default]
    Flexible,
}

/// Which part of the day the user can attend
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimePreference {
    Morning,
    Evening,
    #[default]
    Flexible,
}

impl FromStr for DayPreference {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekdays" | "weekday" => Ok(Self::Weekdays),
            "weekends" | "weekend" => Ok(Self::Weekends),
            "flexible" | "" => Ok(Self::Flexible),
            other => Err(crate::Error::Validation(format!(
                "Unknown day preference '{}'",
                other
            ))),
        }
    }
}

impl FromStr for TimePreference {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "evening" => Ok(Self::Evening),
            "flexible" | "" => Ok(Self::Flexible),
            other => Err(crate::Error::Validation(format!(
                "Unknown time preference '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DayPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weekdays => "Weekdays",
            Self::Weekends => "Weekends",
            Self::Flexible => "Flexible",
        })
    }
}

impl fmt::Display for TimePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Morning => "Morning",
            Self::Evening => "Evening",
            Self::Flexible => "Flexible",
        })
    }
}

// ============================================================================
// Clinician and Slot Types
// ============================================================================

/// Professional role of a clinician
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClinicianRole {
    Psychiatrist,
    Psychologist,
}

/// A roster entry with availability and eligibility flags
///
/// Omitted flags deserialize as `false`, so a config entry only lists what
/// the clinician offers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clinician {
    pub id: String,
    pub name: String,
    pub role: ClinicianRole,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub weekday: bool,
    #[serde(default)]
    pub weekend: bool,
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub evening: bool,
    #[serde(default)]
    pub accepts_child: bool,
}

/// A bookable first-session slot. Derived on demand, never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

// ============================================================================
// Packages and Payment
// ============================================================================

/// The four fixed care plans
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PackageId {
    SingleSession,
    StarterPack,
    CarePlan,
    IntensivePlan,
}

impl FromStr for PackageId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single_session" => Ok(Self::SingleSession),
            "starter_pack" => Ok(Self::StarterPack),
            "care_plan" => Ok(Self::CarePlan),
            "intensive_plan" => Ok(Self::IntensivePlan),
            other => Err(crate::Error::Validation(format!("Unknown package '{}'", other))),
        }
    }
}

/// A purchasable plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub sessions: u32,
    pub price_inr: u32,
}

/// Checkout progress for the booking
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Init,
    Processing,
    Success,
}

// ============================================================================
// Form Record
// ============================================================================

/// Everything the wizard has collected so far
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FormData {
    pub name: String,
    pub dob: String,
    pub age_group: Option<AgeGroup>,
    pub gender: Option<String>,
    pub city: String,
    pub language: String,
    pub issues: BTreeSet<String>,
    pub day_pref: DayPreference,
    pub time_pref: TimePreference,
    pub doctor: Option<String>,
    pub package: Option<PackageId>,
    pub slot_id: Option<String>,
    pub booking_temp_id: Option<Uuid>,
    pub payment_status: PaymentStatus,
    pub meeting_link: String,
}

/// A saved in-progress onboarding, written on "finish later"
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Draft {
    pub saved_at: DateTime<Utc>,
    pub step: usize,
    pub form: FormData,
}

// ============================================================================
// Reference Data Type
// ============================================================================

/// Static lists consumed by the wizard: selectable values and the roster
#[derive(Clone, Debug)]
pub struct ReferenceData {
    pub cities: Vec<String>,
    pub languages: Vec<String>,
    pub issues: Vec<String>,
    pub packages: Vec<Package>,
    pub clinicians: Vec<Clinician>,
}
