//! Payment recording and settlement.
//!
//! Payments are attached to subscriptions and drive the debt gate in
//! [`debt`](super::debt). The manager here is front desk bookkeeping:
//! recording a charge, marking it settled, or voiding it.

use chrono::{DateTime, Utc};

use crate::error::Result;

use super::audit::{MembershipAuditEvent, MembershipAuditLogger, NoOpAuditLogger};
use super::error::MembershipError;
use super::storage::{PaymentLedger, PaymentStatus, StoredPayment};

/// Payment bookkeeping over a ledger.
pub struct PaymentManager<L: PaymentLedger, A: MembershipAuditLogger = NoOpAuditLogger> {
    ledger: L,
    audit: A,
}

impl<L: PaymentLedger> PaymentManager<L> {
    /// Create a manager without audit logging.
    #[must_use]
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            audit: NoOpAuditLogger,
        }
    }
}

impl<L: PaymentLedger, A: MembershipAuditLogger> PaymentManager<L, A> {
    /// Create a manager with an audit logger.
    #[must_use]
    pub fn with_audit(ledger: L, audit: A) -> Self {
        Self { ledger, audit }
    }

    /// Record a new charge against a subscription. Starts out pending,
    /// which counts as debt until settled.
    pub async fn create_payment(
        &self,
        subscription_id: u64,
        amount_cents: i64,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StoredPayment> {
        let payment = self
            .ledger
            .insert_payment(StoredPayment {
                id: 0,
                subscription_id,
                amount_cents,
                status: PaymentStatus::Pending,
                reference,
                paid_at: None,
                created_at: now,
            })
            .await?;

        self.audit
            .log(MembershipAuditEvent::PaymentStatusChanged {
                payment_id: payment.id,
                subscription_id: payment.subscription_id,
                status: payment.status.to_string(),
            })
            .await;

        Ok(payment)
    }

    /// Get a payment by ID.
    pub async fn get_payment(&self, payment_id: u64) -> Result<StoredPayment> {
        self.ledger
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| MembershipError::PaymentNotFound { payment_id }.into())
    }

    /// List payments, newest first, optionally filtered to one subscription.
    pub async fn list_payments(&self, subscription_id: Option<u64>) -> Result<Vec<StoredPayment>> {
        self.ledger.list_payments(subscription_id).await
    }

    /// Move a payment to a new status.
    ///
    /// Marking a payment paid stamps `paid_at` once; re-marking an
    /// already paid payment keeps the original settlement time. Moving
    /// back to pending or canceled clears the stamp.
    pub async fn update_payment_status(
        &self,
        payment_id: u64,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<StoredPayment> {
        let mut payment = self.get_payment(payment_id).await?;

        payment.paid_at = match status {
            PaymentStatus::Paid => payment.paid_at.or(Some(now)),
            PaymentStatus::Pending | PaymentStatus::Canceled => None,
        };
        payment.status = status;

        self.ledger.save_payment(&payment).await?;

        self.audit
            .log(MembershipAuditEvent::PaymentStatusChanged {
                payment_id: payment.id,
                subscription_id: payment.subscription_id,
                status: payment.status.to_string(),
            })
            .await;

        Ok(payment)
    }
}
