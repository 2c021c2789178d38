//! Rule-based clinician matching.
//!
//! A clinician is eligible when every stated preference is covered by the
//! clinician's flags:
//! - Weekdays / Weekends need `weekday` / `weekend`
//! - Morning / Evening need `morning` / `evening`
//! - A child needs `accepts_child`
//!
//! Flexible preferences and an unknown age group impose nothing. The first
//! eligible clinician in roster order wins.

use crate::{AgeGroup, Clinician, DayPreference, TimePreference};

/// Check a single clinician against the preferences
pub fn is_eligible(
    clinician: &Clinician,
    day_pref: DayPreference,
    time_pref: TimePreference,
    age_group: Option<AgeGroup>,
) -> bool {
    let day_ok = match day_pref {
        DayPreference::Weekdays => clinician.weekday,
        DayPreference::Weekends => clinician.weekend,
        DayPreference::Flexible => true,
    };
    let time_ok = match time_pref {
        TimePreference::Morning => clinician.morning,
        TimePreference::Evening => clinician.evening,
        TimePreference::Flexible => true,
    };
    let age_ok = age_group != Some(AgeGroup::Child) || clinician.accepts_child;

    day_ok && time_ok && age_ok
}

/// All eligible clinicians, in roster order
pub fn eligible_clinicians(
    roster: &[Clinician],
    day_pref: DayPreference,
    time_pref: TimePreference,
    age_group: Option<AgeGroup>,
) -> Vec<&Clinician> {
    roster
        .iter()
        .filter(|c| is_eligible(c, day_pref, time_pref, age_group))
        .collect()
}

/// Pick the first eligible clinician, or None when nobody fits
pub fn assign_doctor(
    roster: &[Clinician],
    day_pref: DayPreference,
    time_pref: TimePreference,
    age_group: Option<AgeGroup>,
) -> Option<&Clinician> {
    let assigned = roster
        .iter()
        .find(|c| is_eligible(c, day_pref, time_pref, age_group));

    match assigned {
        Some(clinician) => tracing::info!(
            "Assigned {} for {}/{} ({:?})",
            clinician.id,
            day_pref,
            time_pref,
            age_group
        ),
        None => tracing::warn!(
            "No clinician available for {}/{} ({:?})",
            day_pref,
            time_pref,
            age_group
        ),
    }

    assigned
}
