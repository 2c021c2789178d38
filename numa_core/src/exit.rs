//! Leaving the wizard.
//!
//! All navigation away from the onboarding flow goes through one
//! `ExitHandler`, injected by the front end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the wizard handed control back
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Booking confirmed
    Completed,
    /// Draft saved, user will resume later
    FinishedLater,
    /// User left without saving
    Skipped,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExitReason::Completed => "completed",
            ExitReason::FinishedLater => "finished_later",
            ExitReason::Skipped => "skipped",
        })
    }
}

/// Receives the single exit event of a wizard run
pub trait ExitHandler {
    fn exit(&mut self, destination: &str, reason: ExitReason);
}

/// Build the URL the host application is sent to
pub fn exit_url(destination: &str, reason: ExitReason) -> String {
    let sep = if destination.contains('?') { '&' } else { '?' };
    match reason {
        ExitReason::Completed => format!("{}{}onboarded=true", destination, sep),
        other => format!("{}{}onboarded=false&reason={}", destination, sep, other),
    }
}
