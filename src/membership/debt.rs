//! Outstanding-debt gate.
//!
//! A member with any unsettled payment (pending or canceled) on any of
//! their subscriptions is barred from the facility. The check-in engine
//! evaluates this gate before looking at the subscription at all.

use crate::error::Result;

use super::storage::PaymentLedger;

/// Debt check over a payment ledger.
pub struct DebtGate<L: PaymentLedger> {
    ledger: L,
}

impl<L: PaymentLedger> DebtGate<L> {
    /// Create a new debt gate.
    #[must_use]
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Number of unsettled payments across all of the member's
    /// subscriptions.
    pub async fn unsettled_count(&self, member_id: u64) -> Result<u64> {
        self.ledger.count_unsettled_payments(member_id).await
    }

    /// Whether the member has any outstanding debt.
    pub async fn has_outstanding_debt(&self, member_id: u64) -> Result<bool> {
        Ok(self.unsettled_count(member_id).await? > 0)
    }
}
