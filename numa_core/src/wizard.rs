//! The onboarding wizard state machine.
//!
//! The wizard walks an ordered list of step definitions. Each definition
//! carries the predicate that gates "Next" and an optional hook that runs
//! when the step is left forwards:
//!
//! - leaving the time-preference step assigns a clinician and regenerates
//!   that clinician's slots
//! - leaving the slot step allocates the temporary booking id
//!
//! The last step is the checkout; payment completion synthesizes the
//! meeting link and exits the wizard through the injected `ExitHandler`.

use crate::age::infer_age_group;
use crate::exit::{ExitHandler, ExitReason};
use crate::matcher::assign_doctor;
use crate::payment::{PaymentGateway, PaymentHandle, PaymentPoll, PaymentRequest};
use crate::slots::{find_slot, generate_slots};
use crate::{
    AgeGroup, Clinician, Config, DayPreference, Draft, DraftStore, Error, FormData, PackageId,
    PaymentStatus, ReferenceData, Result, Slot, TimePreference,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Step Definitions
// ============================================================================

/// Wizard steps, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    Welcome,
    Name,
    DateOfBirth,
    Gender,
    City,
    Language,
    Issues,
    DayPreference,
    TimePreference,
    Package,
    Slot,
    Payment,
}

impl Step {
    /// Position of the step in the wizard
    pub fn index(self) -> usize {
        self as usize
    }

    /// Step at a position, if any
    pub fn from_index(index: usize) -> Option<Step> {
        STEPS.get(index).map(|def| def.step)
    }

    pub fn id(self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::Name => "name",
            Step::DateOfBirth => "date_of_birth",
            Step::Gender => "gender",
            Step::City => "city",
            Step::Language => "language",
            Step::Issues => "issues",
            Step::DayPreference => "day_preference",
            Step::TimePreference => "time_preference",
            Step::Package => "package",
            Step::Slot => "slot",
            Step::Payment => "payment",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Side effect run when a step is left forwards
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceHook {
    AssignClinician,
    PrepareBooking,
}

/// One entry of the step table
pub struct StepDef {
    pub step: Step,
    pub prompt: &'static str,
    pub is_complete: fn(&FormData) -> bool,
    pub on_advance: Option<AdvanceHook>,
}

fn always(_: &FormData) -> bool {
    true
}

fn has_name(form: &FormData) -> bool {
    form.name.trim().chars().count() > 1
}

fn has_age_group(form: &FormData) -> bool {
    form.age_group.is_some()
}

fn has_gender(form: &FormData) -> bool {
    form.gender.as_deref().is_some_and(|g| !g.trim().is_empty())
}

fn has_city(form: &FormData) -> bool {
    !form.city.is_empty()
}

fn has_language(form: &FormData) -> bool {
    !form.language.is_empty()
}

fn has_issues(form: &FormData) -> bool {
    !form.issues.is_empty()
}

fn has_package(form: &FormData) -> bool {
    form.package.is_some()
}

fn has_slot(form: &FormData) -> bool {
    form.slot_id.is_some()
}

pub const TOTAL_STEPS: usize = 12;
pub const LAST_STEP: usize = TOTAL_STEPS - 1;

/// The step table
pub static STEPS: [StepDef; TOTAL_STEPS] = [
    StepDef {
        step: Step::Welcome,
        prompt: "Welcome to NUMA. Let's personalize your care journey.",
        is_complete: always,
        on_advance: None,
    },
    StepDef {
        step: Step::Name,
        prompt: "What's your name?",
        is_complete: has_name,
        on_advance: None,
    },
    StepDef {
        step: Step::DateOfBirth,
        prompt: "What's your date of birth? (YYYY-MM-DD)",
        is_complete: has_age_group,
        on_advance: None,
    },
    StepDef {
        step: Step::Gender,
        prompt: "How do you identify?",
        is_complete: has_gender,
        on_advance: None,
    },
    StepDef {
        step: Step::City,
        prompt: "Which city are you in?",
        is_complete: has_city,
        on_advance: None,
    },
    StepDef {
        step: Step::Language,
        prompt: "Which language would you like your sessions in?",
        is_complete: has_language,
        on_advance: None,
    },
    StepDef {
        step: Step::Issues,
        prompt: "What would you like support with?",
        is_complete: has_issues,
        on_advance: None,
    },
    StepDef {
        step: Step::DayPreference,
        prompt: "Which days suit you?",
        is_complete: always,
        on_advance: None,
    },
    StepDef {
        step: Step::TimePreference,
        prompt: "What time of day suits you?",
        is_complete: always,
        on_advance: Some(AdvanceHook::AssignClinician),
    },
    StepDef {
        step: Step::Package,
        prompt: "Choose a package",
        is_complete: has_package,
        on_advance: None,
    },
    StepDef {
        step: Step::Slot,
        prompt: "Pick a time for your first session",
        is_complete: has_slot,
        on_advance: Some(AdvanceHook::PrepareBooking),
    },
    StepDef {
        step: Step::Payment,
        prompt: "Confirm and pay",
        is_complete: always,
        on_advance: None,
    },
];

/// Whether "Next" is allowed at `step` for the given form
///
/// Out-of-range steps are never advanceable.
pub fn can_advance(step: usize, form: &FormData) -> bool {
    STEPS
        .get(step)
        .map(|def| (def.is_complete)(form))
        .unwrap_or(false)
}

// ============================================================================
// Wizard
// ============================================================================

/// Values the wizard needs from the configuration
#[derive(Clone, Debug)]
pub struct WizardSettings {
    pub exit_destination: String,
    pub meeting_base_url: String,
}

impl WizardSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            exit_destination: config.navigation.exit_destination.clone(),
            meeting_base_url: config.booking.meeting_base_url.clone(),
        }
    }
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A single onboarding run
pub struct Wizard {
    step: usize,
    form: FormData,
    reference: ReferenceData,
    today: NaiveDate,
    slots: Vec<Slot>,
    settings: WizardSettings,
    exit: Box<dyn ExitHandler>,
    pending_payment: Option<PaymentHandle>,
    exited: Option<ExitReason>,
}

impl fmt::Debug for Wizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wizard")
            .field("step", &self.step)
            .field("form", &self.form)
            .field("today", &self.today)
            .field("slots", &self.slots.len())
            .field("exited", &self.exited)
            .finish_non_exhaustive()
    }
}

impl Wizard {
    /// Start an empty wizard
    pub fn new(
        reference: ReferenceData,
        settings: WizardSettings,
        exit: Box<dyn ExitHandler>,
        today: NaiveDate,
    ) -> Self {
        Self {
            step: 0,
            form: FormData::default(),
            reference,
            today,
            slots: Vec::new(),
            settings,
            exit,
            pending_payment: None,
            exited: None,
        }
    }

    /// Continue from a saved draft
    ///
    /// Derived state is rebuilt rather than trusted: the age group is
    /// recomputed from the date of birth, slots are regenerated for the saved
    /// clinician, and a slot that is no longer offered is dropped. The step is
    /// moved back to the first step whose requirements are not met.
    pub fn resume(
        draft: Draft,
        reference: ReferenceData,
        settings: WizardSettings,
        exit: Box<dyn ExitHandler>,
        today: NaiveDate,
    ) -> Self {
        let mut wizard = Self::new(reference, settings, exit, today);
        let mut form = draft.form;

        form.age_group = infer_age_group(&form.dob, today).ok();
        if form.payment_status != PaymentStatus::Init {
            form.payment_status = PaymentStatus::Init;
            form.meeting_link.clear();
        }

        let doctor_known = form
            .doctor
            .as_deref()
            .is_some_and(|id| wizard.reference.clinician(id).is_some());
        if doctor_known {
            if let Some(id) = form.doctor.as_deref() {
                wizard.slots = generate_slots(id, today);
            }
        } else {
            form.doctor = None;
        }

        if let Some(slot_id) = form.slot_id.as_deref() {
            if find_slot(&wizard.slots, slot_id).is_none() {
                tracing::info!("Saved slot {} is no longer offered", slot_id);
                form.slot_id = None;
            }
        }

        let mut step = draft.step.min(LAST_STEP);
        if form.doctor.is_none() {
            step = step.min(Step::TimePreference.index());
        }
        if let Some(incomplete) = (0..step).find(|&s| !can_advance(s, &form)) {
            step = incomplete;
        }

        tracing::info!("Resuming onboarding at step {} ({})", step, STEPS[step].step);
        wizard.form = form;
        wizard.step = step;
        wizard
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn current_step(&self) -> Step {
        STEPS[self.step].step
    }

    pub fn current(&self) -> &'static StepDef {
        &STEPS[self.step]
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Slots of the assigned clinician (empty before assignment)
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn assigned_clinician(&self) -> Option<&Clinician> {
        self.form
            .doctor
            .as_deref()
            .and_then(|id| self.reference.clinician(id))
    }

    pub fn selected_slot(&self) -> Option<&Slot> {
        self.form
            .slot_id
            .as_deref()
            .and_then(|id| find_slot(&self.slots, id))
    }

    /// Whether "Next" is allowed on the current step
    pub fn can_advance(&self) -> bool {
        can_advance(self.step, &self.form)
    }

    /// Percent of the wizard reached, counting the current step
    pub fn progress(&self) -> u8 {
        ((self.step + 1) * 100 / TOTAL_STEPS) as u8
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exited
    }

    pub fn is_closed(&self) -> bool {
        self.exited.is_some()
    }

    /// Snapshot for the draft file
    pub fn to_draft(&self, now: DateTime<Utc>) -> Draft {
        Draft {
            saved_at: now,
            step: self.step,
            form: self.form.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Move to the next step
    ///
    /// Fails with `StepIncomplete` when the current step is not answered, or
    /// with the hook's error (e.g. `NoMatchingClinician`); the step is left
    /// unchanged in both cases. Advancing on the last step is a no-op.
    pub fn advance(&mut self) -> Result<usize> {
        self.ensure_open()?;
        if self.step == LAST_STEP {
            return Ok(self.step);
        }

        let def = &STEPS[self.step];
        if !(def.is_complete)(&self.form) {
            return Err(Error::StepIncomplete(def.step));
        }
        if let Some(hook) = def.on_advance {
            self.run_hook(hook)?;
        }

        self.step += 1;
        tracing::debug!("Advanced to step {} ({})", self.step, STEPS[self.step].step);
        Ok(self.step)
    }

    /// Move to the previous step, clamped at the first
    ///
    /// Not allowed while a payment is processing; cancel it first.
    pub fn retreat(&mut self) -> Result<usize> {
        self.ensure_open()?;
        if self.pending_payment.is_some() {
            return Err(Error::Payment(
                "A payment is processing; cancel it before going back".into(),
            ));
        }

        self.step = self.step.saturating_sub(1);
        tracing::debug!("Went back to step {} ({})", self.step, STEPS[self.step].step);
        Ok(self.step)
    }

    fn run_hook(&mut self, hook: AdvanceHook) -> Result<()> {
        match hook {
            AdvanceHook::AssignClinician => self.assign_clinician(),
            AdvanceHook::PrepareBooking => self.prepare_booking(),
        }
    }

    /// Match a clinician to the current preferences
    ///
    /// A different clinician than before regenerates the slots and clears
    /// the selected slot.
    fn assign_clinician(&mut self) -> Result<()> {
        let FormData {
            day_pref,
            time_pref,
            age_group,
            ..
        } = self.form;

        let Some(clinician) = assign_doctor(&self.reference.clinicians, day_pref, time_pref, age_group)
        else {
            self.form.doctor = None;
            self.form.slot_id = None;
            self.slots.clear();
            return Err(Error::NoMatchingClinician {
                day: day_pref,
                time: time_pref,
                age: age_group,
            });
        };

        let id = clinician.id.clone();
        if self.form.doctor.as_deref() != Some(id.as_str()) || self.slots.is_empty() {
            if self.form.slot_id.take().is_some() {
                tracing::info!("Clinician changed to {}, cleared selected slot", id);
            }
            self.slots = generate_slots(&id, self.today);
            self.form.doctor = Some(id);
        }
        Ok(())
    }

    fn prepare_booking(&mut self) -> Result<()> {
        if self.selected_slot().is_none() {
            return Err(Error::Validation(
                "Selected slot does not belong to the assigned clinician".into(),
            ));
        }
        let booking_id = *self.form.booking_temp_id.get_or_insert_with(Uuid::new_v4);
        tracing::debug!("Prepared booking {}", booking_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Answers
    // ------------------------------------------------------------------

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        self.form.name = name.trim().to_string();
        Ok(())
    }

    /// Set the date of birth and recompute the age group
    ///
    /// An invalid or future date clears the age group and is returned as
    /// `InvalidDate`.
    pub fn set_dob(&mut self, dob: &str) -> Result<AgeGroup> {
        self.ensure_open()?;
        self.form.dob = dob.trim().to_string();
        match infer_age_group(&self.form.dob, self.today) {
            Ok(group) => {
                self.form.age_group = Some(group);
                Ok(group)
            }
            Err(e) => {
                self.form.age_group = None;
                Err(e)
            }
        }
    }

    pub fn set_gender(&mut self, gender: &str) -> Result<()> {
        self.ensure_open()?;
        self.form.gender = Some(gender.trim().to_string());
        Ok(())
    }

    pub fn set_city(&mut self, city: &str) -> Result<()> {
        self.ensure_open()?;
        self.form.city = pick_option(&self.reference.cities, city, "city")?;
        Ok(())
    }

    pub fn set_language(&mut self, language: &str) -> Result<()> {
        self.ensure_open()?;
        self.form.language = pick_option(&self.reference.languages, language, "language")?;
        Ok(())
    }

    /// Replace the selected issues. Every tag must be known.
    pub fn set_issues<S: AsRef<str>>(&mut self, issues: &[S]) -> Result<()> {
        self.ensure_open()?;
        let picked: BTreeSet<String> = issues
            .iter()
            .map(|tag| pick_option(&self.reference.issues, tag.as_ref(), "issue"))
            .collect::<Result<_>>()?;
        self.form.issues = picked;
        Ok(())
    }

    /// Toggle one issue; returns whether it is selected afterwards
    pub fn toggle_issue(&mut self, issue: &str) -> Result<bool> {
        self.ensure_open()?;
        let tag = pick_option(&self.reference.issues, issue, "issue")?;
        if self.form.issues.remove(&tag) {
            Ok(false)
        } else {
            self.form.issues.insert(tag);
            Ok(true)
        }
    }

    pub fn set_day_pref(&mut self, pref: DayPreference) -> Result<()> {
        self.ensure_open()?;
        self.form.day_pref = pref;
        Ok(())
    }

    pub fn set_time_pref(&mut self, pref: TimePreference) -> Result<()> {
        self.ensure_open()?;
        self.form.time_pref = pref;
        Ok(())
    }

    pub fn set_package(&mut self, package: PackageId) -> Result<()> {
        self.ensure_open()?;
        if self.reference.package(package).is_none() {
            return Err(Error::Validation(format!(
                "Package {:?} is not offered",
                package
            )));
        }
        self.form.package = Some(package);
        Ok(())
    }

    /// Choose one of the assigned clinician's slots
    pub fn select_slot(&mut self, slot_id: &str) -> Result<()> {
        self.ensure_open()?;
        if self.form.doctor.is_none() {
            return Err(Error::Validation("No clinician assigned yet".into()));
        }
        if find_slot(&self.slots, slot_id).is_none() {
            return Err(Error::Validation(format!(
                "Slot '{}' is not available for the assigned clinician",
                slot_id
            )));
        }
        self.form.slot_id = Some(slot_id.to_string());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------

    /// Start paying for the booking: init -> processing
    pub fn start_payment(
        &mut self,
        gateway: &mut dyn PaymentGateway,
        now: DateTime<Utc>,
    ) -> Result<PaymentStatus> {
        self.ensure_open()?;
        if self.current_step() != Step::Payment {
            return Err(Error::Payment(format!(
                "Cannot pay from step '{}'",
                self.current_step()
            )));
        }
        if self.form.payment_status != PaymentStatus::Init {
            return Err(Error::Payment(format!(
                "Payment already {:?}",
                self.form.payment_status
            )));
        }

        let clinician_id = self
            .form
            .doctor
            .clone()
            .ok_or_else(|| Error::Payment("No clinician assigned".into()))?;
        let slot_id = self
            .selected_slot()
            .map(|s| s.id.clone())
            .ok_or_else(|| Error::Payment("No slot selected".into()))?;
        let package = self
            .form
            .package
            .ok_or_else(|| Error::Payment("No package selected".into()))?;
        let amount_inr = self
            .reference
            .package(package)
            .map(|p| p.price_inr)
            .ok_or_else(|| Error::Payment(format!("Package {:?} is not offered", package)))?;
        let booking_id = *self.form.booking_temp_id.get_or_insert_with(Uuid::new_v4);

        let request = PaymentRequest {
            booking_id,
            clinician_id,
            slot_id,
            package,
            amount_inr,
        };
        let handle = gateway.initiate(&request, now)?;

        self.pending_payment = Some(handle);
        self.form.payment_status = PaymentStatus::Processing;
        tracing::info!("Payment processing for booking {}", booking_id);
        Ok(self.form.payment_status)
    }

    /// Check on the pending payment
    ///
    /// On success the meeting link is synthesized, the status becomes
    /// `Success` and the wizard exits with `Completed`. A closed wizard
    /// ignores completions and returns its current status.
    pub fn poll_payment(
        &mut self,
        gateway: &mut dyn PaymentGateway,
        now: DateTime<Utc>,
    ) -> Result<PaymentStatus> {
        if self.is_closed() {
            tracing::debug!("Ignoring payment poll on a closed wizard");
            return Ok(self.form.payment_status);
        }
        let Some(handle) = self.pending_payment.clone() else {
            return Ok(self.form.payment_status);
        };

        match gateway.poll(&handle, now)? {
            PaymentPoll::Pending => {}
            PaymentPoll::Cancelled => {
                self.pending_payment = None;
                self.form.payment_status = PaymentStatus::Init;
                tracing::info!("Payment {} was cancelled", handle.id);
            }
            PaymentPoll::Succeeded { reference } => {
                let clinician_id = self
                    .form
                    .doctor
                    .clone()
                    .ok_or_else(|| Error::Payment("No clinician assigned".into()))?;

                self.pending_payment = None;
                self.form.meeting_link =
                    meeting_link(&self.settings.meeting_base_url, &clinician_id);
                self.form.payment_status = PaymentStatus::Success;
                tracing::info!(
                    "Payment {} succeeded ({}), meeting link {}",
                    handle.id,
                    reference,
                    self.form.meeting_link
                );
                self.close(ExitReason::Completed);
            }
        }
        Ok(self.form.payment_status)
    }

    /// Abandon a processing payment: processing -> init
    pub fn cancel_payment(&mut self, gateway: &mut dyn PaymentGateway) -> Result<PaymentStatus> {
        self.ensure_open()?;
        if let Some(handle) = &self.pending_payment {
            gateway.cancel(handle)?;
            tracing::info!("Payment {} cancelled", handle.id);
            self.pending_payment = None;
            self.form.payment_status = PaymentStatus::Init;
        }
        Ok(self.form.payment_status)
    }

    // ------------------------------------------------------------------
    // Exits
    // ------------------------------------------------------------------

    /// Save a draft and leave
    ///
    /// If the draft cannot be written the error is returned and the wizard
    /// stays open.
    pub fn finish_later(&mut self, store: &DraftStore, now: DateTime<Utc>) -> Result<()> {
        self.ensure_open()?;
        if self.pending_payment.is_some() {
            return Err(Error::Payment(
                "A payment is processing; wait for it or cancel it first".into(),
            ));
        }
        store.save(&self.to_draft(now))?;
        self.close(ExitReason::FinishedLater);
        Ok(())
    }

    /// Leave without saving
    ///
    /// A payment still processing is cancelled with the gateway first. If
    /// the gateway refuses, the wizard stays open.
    pub fn skip(&mut self, gateway: &mut dyn PaymentGateway) -> Result<()> {
        self.cancel_payment(gateway)?;
        self.close(ExitReason::Skipped);
        Ok(())
    }

    fn close(&mut self, reason: ExitReason) {
        self.exited = Some(reason);
        self.exit.exit(&self.settings.exit_destination, reason);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::WizardClosed)
        } else {
            Ok(())
        }
    }
}

/// Match `input` case-insensitively against a fixed option list
fn pick_option(options: &[String], input: &str, label: &str) -> Result<String> {
    let wanted = input.trim();
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| Error::Validation(format!("Unknown {} '{}'", label, wanted)))
}

/// `{base}/{clinician}-{token}` with an 8-character random token
fn meeting_link(base_url: &str, clinician_id: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}-{}",
        base_url.trim_end_matches('/'),
        clinician_id,
        &token[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::SimulatedGateway;
    use crate::{build_default_reference, ClinicianRole};
    use chrono::Duration;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Exits = Rc<RefCell<Vec<(String, ExitReason)>>>;

    struct RecordingExit(Exits);

    impl ExitHandler for RecordingExit {
        fn exit(&mut self, destination: &str, reason: ExitReason) {
            self.0.borrow_mut().push((destination.to_string(), reason));
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn create_wizard() -> (Wizard, Exits) {
        crate::logging::init_test();
        let exits = Exits::default();
        let wizard = Wizard::new(
            build_default_reference(),
            WizardSettings::default(),
            Box::new(RecordingExit(exits.clone())),
            today(),
        );
        (wizard, exits)
    }

    /// Answer and advance until `target` is the current step
    fn walk_to(wizard: &mut Wizard, target: Step) {
        while wizard.current_step() != target {
            match wizard.current_step() {
                Step::Welcome => {}
                Step::Name => wizard.set_name("Asha").unwrap(),
                Step::DateOfBirth => {
                    wizard.set_dob("2006-10-18").unwrap();
                }
                Step::Gender => wizard.set_gender("Female").unwrap(),
                Step::City => wizard.set_city("bengaluru").unwrap(),
                Step::Language => wizard.set_language("English").unwrap(),
                Step::Issues => wizard.set_issues(&["Anxiety", "Sleep"]).unwrap(),
                Step::DayPreference => wizard.set_day_pref(DayPreference::Weekends).unwrap(),
                Step::TimePreference => wizard.set_time_pref(TimePreference::Morning).unwrap(),
                Step::Package => wizard.set_package(PackageId::StarterPack).unwrap(),
                Step::Slot => {
                    let id = wizard.slots()[0].id.clone();
                    wizard.select_slot(&id).unwrap();
                }
                Step::Payment => unreachable!("payment is the last step"),
            }
            wizard.advance().unwrap();
        }
    }

    #[test]
    fn test_step_table_is_ordered() {
        for (i, def) in STEPS.iter().enumerate() {
            assert_eq!(def.step.index(), i);
            assert_eq!(Step::from_index(i), Some(def.step));
        }
        assert_eq!(Step::from_index(TOTAL_STEPS), None);
    }

    #[test]
    fn test_name_gating() {
        let mut form = FormData::default();
        assert!(!can_advance(1, &form));
        form.name = "A".into();
        assert!(!can_advance(1, &form));
        form.name = " A ".into();
        assert!(!can_advance(1, &form));
        form.name = "Al".into();
        assert!(can_advance(1, &form));
    }

    #[test]
    fn test_issues_and_slot_gating() {
        let mut form = FormData::default();
        assert!(!can_advance(6, &form));
        form.issues.insert("Stress".into());
        assert!(can_advance(6, &form));

        assert!(!can_advance(10, &form));
        form.slot_id = Some("dr_a-2026-10-18-09:30".into());
        assert!(can_advance(10, &form));
    }

    #[test]
    fn test_unconditional_steps() {
        let form = FormData::default();
        for step in [0, 7, 8, 11] {
            assert!(can_advance(step, &form), "step {} should be open", step);
        }
        for step in [1, 2, 3, 4, 5, 6, 9, 10] {
            assert!(!can_advance(step, &form), "step {} should be gated", step);
        }
        assert!(!can_advance(TOTAL_STEPS, &form));
    }

    #[test]
    fn test_advance_blocked_when_incomplete() {
        let (mut wizard, _) = create_wizard();
        wizard.advance().unwrap();

        let err = wizard.advance().unwrap_err();
        assert!(matches!(err, Error::StepIncomplete(Step::Name)));
        assert_eq!(wizard.step(), 1);
    }

    #[test]
    fn test_retreat_clamps_at_zero() {
        let (mut wizard, _) = create_wizard();
        assert_eq!(wizard.retreat().unwrap(), 0);
        wizard.advance().unwrap();
        assert_eq!(wizard.retreat().unwrap(), 0);
    }

    #[test]
    fn test_advance_at_last_step_is_noop() {
        let (mut wizard, _) = create_wizard();
        walk_to(&mut wizard, Step::Payment);
        assert_eq!(wizard.step(), LAST_STEP);
        assert_eq!(wizard.advance().unwrap(), LAST_STEP);
        assert_eq!(wizard.progress(), 100);
    }

    #[test]
    fn test_progress() {
        let (mut wizard, _) = create_wizard();
        assert_eq!(wizard.progress(), 8);
        walk_to(&mut wizard, Step::City);
        assert_eq!(wizard.progress(), 41);
    }

    #[test]
    fn test_dob_sets_and_clears_age_group() {
        let (mut wizard, _) = create_wizard();
        assert_eq!(wizard.set_dob("2012-01-01").unwrap(), AgeGroup::Child);
        assert_eq!(wizard.form().age_group, Some(AgeGroup::Child));

        assert!(matches!(
            wizard.set_dob("not a date"),
            Err(Error::InvalidDate { .. })
        ));
        assert_eq!(wizard.form().age_group, None);
        assert_eq!(wizard.form().dob, "not a date");
    }

    #[test]
    fn test_unknown_city_rejected() {
        let (mut wizard, _) = create_wizard();
        assert!(matches!(
            wizard.set_city("Atlantis"),
            Err(Error::Validation(_))
        ));
        assert!(wizard.form().city.is_empty());

        wizard.set_city("  pune ").unwrap();
        assert_eq!(wizard.form().city, "Pune");
    }

    #[test]
    fn test_toggle_issue() {
        let (mut wizard, _) = create_wizard();
        assert!(wizard.toggle_issue("grief").unwrap());
        assert!(wizard.form().issues.contains("Grief"));
        assert!(!wizard.toggle_issue("Grief").unwrap());
        assert!(wizard.form().issues.is_empty());
        assert!(wizard.toggle_issue("Boredom").is_err());
    }

    #[test]
    fn test_clinician_assigned_after_time_preference() {
        let (mut wizard, _) = create_wizard();
        walk_to(&mut wizard, Step::TimePreference);
        assert!(wizard.form().doctor.is_none());
        assert!(wizard.slots().is_empty());

        wizard.set_time_pref(TimePreference::Morning).unwrap();
        wizard.advance().unwrap();

        assert_eq!(wizard.form().age_group, Some(AgeGroup::Adult));
        assert_eq!(wizard.assigned_clinician().unwrap().id, "dr_a");
        assert_eq!(wizard.slots().len(), 42);
        assert!(wizard.slots().iter().all(|s| s.doctor_id == "dr_a"));
    }

    #[test]
    fn test_reassignment_clears_slot() {
        let (mut wizard, _) = create_wizard();
        walk_to(&mut wizard, Step::Payment);
        let old_slot = wizard.form().slot_id.clone().unwrap();
        assert!(old_slot.starts_with("dr_a-"));

        // Back to time preference and switch to evenings
        for _ in 0..3 {
            wizard.retreat().unwrap();
        }
        assert_eq!(wizard.current_step(), Step::TimePreference);
        wizard.set_time_pref(TimePreference::Evening).unwrap();
        wizard.advance().unwrap();

        assert_eq!(wizard.assigned_clinician().unwrap().id, "dr_c");
        assert_eq!(wizard.form().slot_id, None);
        assert!(wizard.slots().iter().all(|s| s.doctor_id == "dr_c"));
    }

    #[test]
    fn test_same_clinician_keeps_slot() {
        let (mut wizard, _) = create_wizard();
        walk_to(&mut wizard, Step::Payment);
        let slot = wizard.form().slot_id.clone();

        for _ in 0..3 {
            wizard.retreat().unwrap();
        }
        wizard.advance().unwrap();
        assert_eq!(wizard.form().slot_id, slot);
    }

    #[test]
    fn test_no_matching_clinician_stays_on_step() {
        let exits = Exits::default();
        let mut reference = build_default_reference();
        reference.clinicians = vec![Clinician {
            id: "dr_x".into(),
            name: "Dr. X".into(),
            role: ClinicianRole::Psychiatrist,
            bio: String::new(),
            weekday: true,
            weekend: false,
            morning: true,
            evening: false,
            accepts_child: false,
        }];
        let mut wizard = Wizard::new(
            reference,
            WizardSettings::default(),
            Box::new(RecordingExit(exits)),
            today(),
        );
        walk_to(&mut wizard, Step::TimePreference);

        wizard.set_time_pref(TimePreference::Morning).unwrap();
        let err = wizard.advance().unwrap_err();
        assert!(matches!(err, Error::NoMatchingClinician { .. }));
        assert_eq!(wizard.current_step(), Step::TimePreference);
        assert!(wizard.form().doctor.is_none());
    }

    #[test]
    fn test_select_slot_requires_assigned_clinician_slot() {
        let (mut wizard, _) = create_wizard();
        assert!(wizard.select_slot("dr_a-2026-10-18-09:30").is_err());

        walk_to(&mut wizard, Step::Package);
        assert!(matches!(
            wizard.select_slot("dr_b-2026-10-18-09:30"),
            Err(Error::Validation(_))
        ));
        wizard.select_slot("dr_a-2026-10-31-19:00").unwrap();
    }

    #[test]
    fn test_booking_id_allocated_after_slot_step() {
        let (mut wizard, _) = create_wizard();
        walk_to(&mut wizard, Step::Slot);
        assert!(wizard.form().booking_temp_id.is_none());
        walk_to(&mut wizard, Step::Payment);
        assert!(wizard.form().booking_temp_id.is_some());
    }

    #[test]
    fn test_payment_flow_completes_and_exits() {
        let (mut wizard, exits) = create_wizard();
        let mut gateway = SimulatedGateway::new(Duration::seconds(2));
        walk_to(&mut wizard, Step::Payment);
        assert_eq!(wizard.form().payment_status, PaymentStatus::Init);

        let start = Utc::now();
        let status = wizard.start_payment(&mut gateway, start).unwrap();
        assert_eq!(status, PaymentStatus::Processing);
        assert_eq!(
            wizard.poll_payment(&mut gateway, start).unwrap(),
            PaymentStatus::Processing
        );
        assert!(wizard.form().meeting_link.is_empty());

        let status = wizard
            .poll_payment(&mut gateway, start + Duration::seconds(2))
            .unwrap();
        assert_eq!(status, PaymentStatus::Success);

        let link = &wizard.form().meeting_link;
        assert!(link.starts_with("https://meet.numa.care/session/dr_a-"));
        assert!(link.contains("dr_a"));

        assert_eq!(wizard.exit_reason(), Some(ExitReason::Completed));
        assert_eq!(
            exits.borrow().as_slice(),
            &[("http://localhost:3000".to_string(), ExitReason::Completed)]
        );
        assert!(matches!(wizard.set_name("Later"), Err(Error::WizardClosed)));
    }

    #[test]
    fn test_payment_only_from_payment_step() {
        let (mut wizard, _) = create_wizard();
        let mut gateway = SimulatedGateway::from_millis(0);
        walk_to(&mut wizard, Step::Slot);
        assert!(matches!(
            wizard.start_payment(&mut gateway, Utc::now()),
            Err(Error::Payment(_))
        ));
    }

    #[test]
    fn test_cannot_start_payment_twice() {
        let (mut wizard, _) = create_wizard();
        let mut gateway = SimulatedGateway::from_millis(1_000);
        walk_to(&mut wizard, Step::Payment);
        wizard.start_payment(&mut gateway, Utc::now()).unwrap();
        assert!(wizard.start_payment(&mut gateway, Utc::now()).is_err());
        assert!(wizard.retreat().is_err());
    }

    #[test]
    fn test_cancel_payment_returns_to_init() {
        let (mut wizard, exits) = create_wizard();
        let mut gateway = SimulatedGateway::from_millis(1_000);
        walk_to(&mut wizard, Step::Payment);

        let start = Utc::now();
        wizard.start_payment(&mut gateway, start).unwrap();
        assert_eq!(
            wizard.cancel_payment(&mut gateway).unwrap(),
            PaymentStatus::Init
        );
        assert_eq!(
            wizard
                .poll_payment(&mut gateway, start + Duration::seconds(5))
                .unwrap(),
            PaymentStatus::Init
        );
        assert!(wizard.form().meeting_link.is_empty());
        assert!(exits.borrow().is_empty());

        // Can pay again afterwards
        wizard.start_payment(&mut gateway, start).unwrap();
    }

    #[test]
    fn test_skip_cancels_processing_payment() {
        let (mut wizard, exits) = create_wizard();
        let mut gateway = SimulatedGateway::from_millis(10);
        walk_to(&mut wizard, Step::Payment);

        let start = Utc::now();
        wizard.start_payment(&mut gateway, start).unwrap();
        let handle = wizard.pending_payment.clone().unwrap();
        wizard.skip(&mut gateway).unwrap();

        // The gateway never completes the abandoned booking
        assert_eq!(
            gateway.poll(&handle, start + Duration::seconds(1)).unwrap(),
            PaymentPoll::Cancelled
        );
        assert_eq!(wizard.form().payment_status, PaymentStatus::Init);
        assert!(wizard.pending_payment.is_none());
        assert_eq!(exits.borrow().len(), 1);
        assert_eq!(exits.borrow()[0].1, ExitReason::Skipped);
    }

    #[test]
    fn test_completion_after_exit_is_ignored() {
        let (mut wizard, exits) = create_wizard();
        let mut gateway = SimulatedGateway::from_millis(10);
        walk_to(&mut wizard, Step::Payment);

        let start = Utc::now();
        wizard.start_payment(&mut gateway, start).unwrap();
        wizard.skip(&mut gateway).unwrap();

        let status = wizard
            .poll_payment(&mut gateway, start + Duration::seconds(1))
            .unwrap();
        assert_eq!(status, PaymentStatus::Init);
        assert!(wizard.form().meeting_link.is_empty());
        assert_eq!(exits.borrow().len(), 1);
    }

    #[test]
    fn test_finish_later_saves_draft_and_exits() {
        let (mut wizard, exits) = create_wizard();
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(temp_dir.path().join("draft.json"));
        walk_to(&mut wizard, Step::Issues);

        wizard.finish_later(&store, Utc::now()).unwrap();

        let draft = store.load().unwrap().unwrap();
        assert_eq!(draft.step, Step::Issues.index());
        assert_eq!(&draft.form, wizard.form());
        assert_eq!(exits.borrow()[0].1, ExitReason::FinishedLater);
        assert!(wizard.skip(&mut SimulatedGateway::from_millis(0)).is_err());
    }

    #[test]
    fn test_finish_later_failure_keeps_wizard_open() {
        let (mut wizard, exits) = create_wizard();
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = DraftStore::new(blocker.join("draft.json"));

        let err = wizard.finish_later(&store, Utc::now()).unwrap_err();
        assert!(matches!(err, Error::DraftWrite { .. }));
        assert!(!wizard.is_closed());
        assert!(exits.borrow().is_empty());
    }

    #[test]
    fn test_resume_restores_position() {
        let (mut wizard, _) = create_wizard();
        walk_to(&mut wizard, Step::Payment);
        let draft = wizard.to_draft(Utc::now());

        let resumed = Wizard::resume(
            draft.clone(),
            build_default_reference(),
            WizardSettings::default(),
            Box::new(RecordingExit(Exits::default())),
            today(),
        );
        assert_eq!(resumed.current_step(), Step::Payment);
        assert_eq!(resumed.form(), &draft.form);
        assert_eq!(resumed.slots().len(), 42);
    }

    #[test]
    fn test_resume_drops_expired_slot() {
        let (mut wizard, _) = create_wizard();
        walk_to(&mut wizard, Step::Payment);
        let draft = wizard.to_draft(Utc::now());

        // Three days later the first-day slot is gone
        let resumed = Wizard::resume(
            draft,
            build_default_reference(),
            WizardSettings::default(),
            Box::new(RecordingExit(Exits::default())),
            today() + Duration::days(3),
        );
        assert_eq!(resumed.form().slot_id, None);
        assert_eq!(resumed.current_step(), Step::Slot);
    }

    #[test]
    fn test_resume_rewinds_to_first_incomplete_step() {
        let mut form = FormData::default();
        form.name = "Ravi".into();
        form.dob = "bad".into();
        let draft = Draft {
            saved_at: Utc::now(),
            step: 9,
            form,
        };

        let resumed = Wizard::resume(
            draft,
            build_default_reference(),
            WizardSettings::default(),
            Box::new(RecordingExit(Exits::default())),
            today(),
        );
        assert_eq!(resumed.current_step(), Step::DateOfBirth);
        assert_eq!(resumed.form().age_group, None);
    }
}
