//! Age group inference from a date of birth.

use crate::{AgeGroup, Error, Result};
use chrono::{Datelike, NaiveDate};

/// Age at which a user is treated as an adult
pub const ADULT_AGE: u32 = 18;

/// Parse an ISO `YYYY-MM-DD` date of birth
pub fn parse_dob(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|e| Error::InvalidDate {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Age in whole years on `today`, or None if `dob` is after `today`
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> Option<u32> {
    if dob > today {
        return None;
    }
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Classify a date of birth as child (< 18 whole years) or adult
pub fn infer_age_group(dob: &str, today: NaiveDate) -> Result<AgeGroup> {
    let date = parse_dob(dob)?;
    let age = age_on(date, today).ok_or_else(|| Error::InvalidDate {
        input: dob.to_string(),
        reason: "date of birth is in the future".into(),
    })?;

    Ok(if age < ADULT_AGE {
        AgeGroup::Child
    } else {
        AgeGroup::Adult
    })
}
