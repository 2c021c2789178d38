//! First-session slot generation.
//!
//! Every clinician is offered the same three times on each of the next
//! 14 days. Nothing is reserved, so every generated slot is available.

use crate::Slot;
use chrono::{Duration, NaiveDate, NaiveTime};

/// Number of days offered, starting today
pub const SLOT_DAYS: i64 = 14;

/// Fixed local session times as (hour, minute)
pub const SLOT_TIMES: [(u32, u32); 3] = [(9, 30), (14, 30), (19, 0)];

/// Generate the slots for a clinician starting at `start` (inclusive)
///
/// Returns `SLOT_DAYS * SLOT_TIMES.len()` slots ordered by date then time.
pub fn generate_slots(clinician_id: &str, start: NaiveDate) -> Vec<Slot> {
    let times: Vec<NaiveTime> = SLOT_TIMES
        .iter()
        .filter_map(|&(h, m)| NaiveTime::from_hms_opt(h, m, 0))
        .collect();

    let mut slots = Vec::with_capacity(SLOT_DAYS as usize * times.len());
    for offset in 0..SLOT_DAYS {
        let date = start + Duration::days(offset);
        for &time in &times {
            slots.push(Slot {
                id: slot_id(clinician_id, date, time),
                doctor_id: clinician_id.to_string(),
                date,
                time,
            });
        }
    }

    tracing::debug!("Generated {} slots for {}", slots.len(), clinician_id);
    slots
}

/// Composite slot id: clinician, ISO date, HH:MM
pub fn slot_id(clinician_id: &str, date: NaiveDate, time: NaiveTime) -> String {
    format!(
        "{}-{}-{}",
        clinician_id,
        date.format("%Y-%m-%d"),
        time.format("%H:%M")
    )
}

/// Find a slot by id
pub fn find_slot<'a>(slots: &'a [Slot], id: &str) -> Option<&'a Slot> {
    slots.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_generates_42_unique_slots() {
        let slots = generate_slots("dr_a", start());
        assert_eq!(slots.len(), 42);

        let ids: HashSet<_> = slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), 42);
        assert!(slots.iter().all(|s| s.id.contains("dr_a")));
        assert!(slots.iter().all(|s| s.doctor_id == "dr_a"));
    }

    #[test]
    fn test_covers_fourteen_days_from_start() {
        let slots = generate_slots("dr_b", start());
        let first = slots.first().unwrap();
        let last = slots.last().unwrap();

        assert_eq!(first.date, start());
        assert_eq!(first.time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2026, 10, 31).unwrap());
        assert_eq!(last.time, NaiveTime::from_hms_opt(19, 0, 0).unwrap());
    }

    #[test]
    fn test_slot_id_format() {
        let slots = generate_slots("dr_c", start());
        assert_eq!(slots[0].id, "dr_c-2026-10-18-09:30");
        assert_eq!(slots[1].id, "dr_c-2026-10-18-14:30");
        assert_eq!(slots[2].id, "dr_c-2026-10-18-19:00");
    }

    #[test]
    fn test_deterministic_for_same_start() {
        assert_eq!(generate_slots("dr_a", start()), generate_slots("dr_a", start()));
    }

    #[test]
    fn test_different_clinicians_never_share_ids() {
        let a: HashSet<_> = generate_slots("dr_a", start())
            .into_iter()
            .map(|s| s.id)
            .collect();
        let b: HashSet<_> = generate_slots("dr_b", start())
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert!(a.is_disjoint(&b));
    }

    #[test]
    fn test_find_slot() {
        let slots = generate_slots("dr_a", start());
        assert!(find_slot(&slots, "dr_a-2026-10-20-14:30").is_some());
        assert!(find_slot(&slots, "dr_b-2026-10-20-14:30").is_none());
    }
}
