//! Payment gateway seam and the simulated gateway.
//!
//! The wizard only talks to `PaymentGateway`. `SimulatedGateway` completes
//! every payment after a fixed delay; it has no failure path.

use crate::{Error, PackageId, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// What is being paid for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    pub booking_id: Uuid,
    pub clinician_id: String,
    pub slot_id: String,
    pub package: PackageId,
    pub amount_inr: u32,
}

/// Opaque reference to an initiated payment
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PaymentHandle {
    pub id: Uuid,
    pub booking_id: Uuid,
}

/// Result of polling a payment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentPoll {
    Pending,
    Succeeded { reference: String },
    Cancelled,
}

/// External payment provider
pub trait PaymentGateway {
    /// Start a payment. Completion is observed through `poll`.
    fn initiate(&mut self, request: &PaymentRequest, now: DateTime<Utc>) -> Result<PaymentHandle>;

    /// Check on an initiated payment
    fn poll(&mut self, handle: &PaymentHandle, now: DateTime<Utc>) -> Result<PaymentPoll>;

    /// Abandon a pending payment
    fn cancel(&mut self, handle: &PaymentHandle) -> Result<()>;
}

#[derive(Clone, Debug)]
struct PendingPayment {
    started_at: DateTime<Utc>,
    cancelled: bool,
}

/// Gateway that succeeds once `delay` has elapsed since initiation
#[derive(Debug)]
pub struct SimulatedGateway {
    delay: Duration,
    payments: HashMap<Uuid, PendingPayment>,
}

impl SimulatedGateway {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            payments: HashMap::new(),
        }
    }

    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::milliseconds(delay_ms as i64))
    }
}

impl PaymentGateway for SimulatedGateway {
    fn initiate(&mut self, request: &PaymentRequest, now: DateTime<Utc>) -> Result<PaymentHandle> {
        let handle = PaymentHandle {
            id: Uuid::new_v4(),
            booking_id: request.booking_id,
        };
        self.payments.insert(
            handle.id,
            PendingPayment {
                started_at: now,
                cancelled: false,
            },
        );
        tracing::info!(
            "Simulated payment {} started: {:?} for {} INR",
            handle.id,
            request.package,
            request.amount_inr
        );
        Ok(handle)
    }

    fn poll(&mut self, handle: &PaymentHandle, now: DateTime<Utc>) -> Result<PaymentPoll> {
        let payment = self
            .payments
            .get(&handle.id)
            .ok_or_else(|| Error::Payment(format!("Unknown payment {}", handle.id)))?;

        if payment.cancelled {
            return Ok(PaymentPoll::Cancelled);
        }
        if now - payment.started_at >= self.delay {
            return Ok(PaymentPoll::Succeeded {
                reference: format!("SIM-{}", handle.id.simple()),
            });
        }
        Ok(PaymentPoll::Pending)
    }

    fn cancel(&mut self, handle: &PaymentHandle) -> Result<()> {
        let payment = self
            .payments
            .get_mut(&handle.id)
            .ok_or_else(|| Error::Payment(format!("Unknown payment {}", handle.id)))?;
        payment.cancelled = true;
        tracing::info!("Simulated payment {} cancelled", handle.id);
        Ok(())
    }
}
