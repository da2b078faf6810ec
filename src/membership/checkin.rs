//! Check-in admission engine.
//!
//! Every front gate attempt runs an ordered rule gate and produces a
//! persisted [`CheckinRecord`], denials included. A denial is a valid
//! business outcome, not an error; the only failures surfaced as errors
//! are a nonexistent member (nothing to attach a record to) and a lost
//! optimistic-lock race on the quota decrement.

use chrono::{DateTime, Utc};

use crate::error::Result;

use super::audit::{MembershipAuditEvent, MembershipAuditLogger, NoOpAuditLogger};
use super::config::MembershipConfig;
use super::debt::DebtGate;
use super::error::MembershipError;
use super::lifecycle;
use super::storage::{
    CheckinRecord, CheckinResult, CheckinStore, MemberDirectory, PaymentLedger, SubscriptionStore,
};

const REASON_OK: &str = "OK";
const REASON_DEBT: &str = "Pending payment exists. Please settle outstanding debts.";
const REASON_INACTIVE: &str = "Member account is not active";
const REASON_NO_SUBSCRIPTION: &str = "No subscription";
const REASON_CANCELED: &str = "Subscription canceled";
const REASON_NOT_STARTED: &str = "Subscription not started yet";
const REASON_EXPIRED: &str = "Subscription expired";
const REASON_FROZEN: &str = "Subscription is frozen";
const REASON_NO_ENTRIES: &str = "No remaining entries";

/// Front gate admission decisions.
pub struct CheckinManager<
    S: SubscriptionStore + CheckinStore,
    D: MemberDirectory,
    L: PaymentLedger,
    A: MembershipAuditLogger = NoOpAuditLogger,
> {
    store: S,
    directory: D,
    debt: DebtGate<L>,
    config: MembershipConfig,
    audit: A,
}

impl<S: SubscriptionStore + CheckinStore, D: MemberDirectory, L: PaymentLedger>
    CheckinManager<S, D, L>
{
    /// Create a manager without audit logging.
    #[must_use]
    pub fn new(store: S, directory: D, ledger: L, config: MembershipConfig) -> Self {
        Self {
            store,
            directory,
            debt: DebtGate::new(ledger),
            config,
            audit: NoOpAuditLogger,
        }
    }
}

impl<
        S: SubscriptionStore + CheckinStore,
        D: MemberDirectory,
        L: PaymentLedger,
        A: MembershipAuditLogger,
    > CheckinManager<S, D, L, A>
{
    /// Create a manager with an audit logger.
    #[must_use]
    pub fn with_audit(store: S, directory: D, ledger: L, config: MembershipConfig, audit: A) -> Self {
        Self {
            store,
            directory,
            debt: DebtGate::new(ledger),
            config,
            audit,
        }
    }

    /// Run the admission gate for one member.
    ///
    /// Rules fire in order, first match wins:
    ///
    /// 1. unknown member: error, no record;
    /// 2. outstanding debt (outranks every subscription check);
    /// 3. member account not active;
    /// 4. no subscription on file;
    /// 5. most recent subscription carries the terminal canceled flag;
    /// 6. subscription not started yet;
    /// 7. subscription expired;
    /// 8. subscription frozen;
    /// 9. finite entry quota at zero;
    /// 10. otherwise approve and consume one entry from a finite quota.
    ///
    /// Only the single most recently created subscription is evaluated;
    /// an older still-valid subscription never rescues a member whose
    /// newest one is dead. The quota decrement runs under optimistic
    /// locking: a lost race re-evaluates the whole gate, and exhausted
    /// retries fail without writing any record.
    pub async fn attempt_checkin(
        &self,
        member_id: u64,
        now: DateTime<Utc>,
    ) -> Result<CheckinRecord> {
        let member = self
            .directory
            .find_member(member_id)
            .await?
            .ok_or(MembershipError::MemberNotFound { member_id })?;
        let today = now.date_naive();

        let mut contended_subscription = 0;
        for _attempt in 0..self.config.checkin_retry_limit.max(1) {
            if self.debt.has_outstanding_debt(member_id).await? {
                return self.record_denial(member_id, REASON_DEBT, now).await;
            }
            if !member.status.is_active() {
                return self.record_denial(member_id, REASON_INACTIVE, now).await;
            }

            let Some(subscription) = self.store.latest_subscription(member_id).await? else {
                return self
                    .record_denial(member_id, REASON_NO_SUBSCRIPTION, now)
                    .await;
            };

            if subscription.is_canceled() {
                return self.record_denial(member_id, REASON_CANCELED, now).await;
            }
            if subscription.start_date > today {
                return self.record_denial(member_id, REASON_NOT_STARTED, now).await;
            }
            if subscription.end_date < today {
                return self.record_denial(member_id, REASON_EXPIRED, now).await;
            }
            if subscription.frozen_until.is_some_and(|until| until >= today) {
                return self.record_denial(member_id, REASON_FROZEN, now).await;
            }
            if subscription.remaining_entries == Some(0) {
                return self.record_denial(member_id, REASON_NO_ENTRIES, now).await;
            }

            // Approved. An unlimited plan writes nothing; a finite quota
            // is consumed under optimistic locking.
            if subscription.remaining_entries.is_none() {
                return self.record_approval(member_id, now).await;
            }

            let mut updated = subscription.clone();
            let expected_version = updated.version;
            lifecycle::decrement_entry(&mut updated)?;
            updated.version = expected_version + 1;

            if self
                .store
                .compare_and_save_subscription(&updated, expected_version)
                .await?
            {
                return self.record_approval(member_id, now).await;
            }

            contended_subscription = subscription.id;
            tracing::debug!(
                target: "fitgate::membership",
                member_id,
                subscription_id = subscription.id,
                "version conflict on entry decrement, re-running admission gate"
            );
        }

        Err(MembershipError::ConcurrentModification {
            subscription_id: contended_subscription,
        }
        .into())
    }

    async fn record_denial(
        &self,
        member_id: u64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckinRecord> {
        let record = self
            .store
            .append_checkin(CheckinRecord {
                id: 0,
                member_id,
                result: CheckinResult::Denied,
                reason: reason.to_string(),
                corrects: None,
                created_at: now,
            })
            .await?;

        self.audit
            .log(MembershipAuditEvent::CheckinDenied {
                member_id,
                checkin_id: record.id,
                reason: reason.to_string(),
            })
            .await;

        Ok(record)
    }

    async fn record_approval(&self, member_id: u64, now: DateTime<Utc>) -> Result<CheckinRecord> {
        let record = self
            .store
            .append_checkin(CheckinRecord {
                id: 0,
                member_id,
                result: CheckinResult::Approved,
                reason: REASON_OK.to_string(),
                corrects: None,
                created_at: now,
            })
            .await?;

        self.audit
            .log(MembershipAuditEvent::CheckinApproved {
                member_id,
                checkin_id: record.id,
            })
            .await;

        Ok(record)
    }

    /// Get a check-in record by ID.
    pub async fn get_checkin(&self, checkin_id: u64) -> Result<CheckinRecord> {
        self.store
            .get_checkin(checkin_id)
            .await?
            .ok_or_else(|| MembershipError::CheckinNotFound { checkin_id }.into())
    }

    /// List check-in records, newest first, optionally for one member.
    pub async fn list_checkins(&self, member_id: Option<u64>) -> Result<Vec<CheckinRecord>> {
        self.store.list_checkins(member_id).await
    }

    /// File a staff correction against an earlier record.
    ///
    /// The log is append-only: the original decision stays on file
    /// untouched, and the correction is a new record pointing back at it.
    pub async fn correct_checkin(
        &self,
        checkin_id: u64,
        result: CheckinResult,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<CheckinRecord> {
        let original = self.get_checkin(checkin_id).await?;

        let correction = self
            .store
            .append_checkin(CheckinRecord {
                id: 0,
                member_id: original.member_id,
                result,
                reason: reason.into(),
                corrects: Some(original.id),
                created_at: now,
            })
            .await?;

        self.audit
            .log(MembershipAuditEvent::CheckinCorrected {
                member_id: original.member_id,
                original_id: original.id,
                correction_id: correction.id,
            })
            .await;

        Ok(correction)
    }

    /// The record that currently stands for a decision: the newest
    /// correction layered over it, or the original if uncorrected.
    pub async fn latest_interpretation(&self, checkin_id: u64) -> Result<CheckinRecord> {
        let original = self.get_checkin(checkin_id).await?;
        let corrections = self.store.corrections_for(checkin_id).await?;
        Ok(corrections
            .into_iter()
            .max_by_key(|r| r.id)
            .unwrap_or(original))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::membership::audit::test::CollectingAuditLogger;
    use crate::membership::roles::Role;
    use crate::membership::storage::test::InMemoryMembershipStore;
    use crate::membership::storage::{
        Member, MemberStatus, PaymentStatus, StoredPayment, StoredSubscription,
        SubscriptionStatus, SubscriptionStore,
    };
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // All scenarios run "today" on this date.
    fn now() -> DateTime<Utc> {
        "2025-01-15T10:00:00Z".parse().unwrap()
    }

    fn manager(
        store: InMemoryMembershipStore,
    ) -> CheckinManager<InMemoryMembershipStore, InMemoryMembershipStore, InMemoryMembershipStore>
    {
        CheckinManager::new(
            store.clone(),
            store.clone(),
            store,
            MembershipConfig::default(),
        )
    }

    fn seed_member(store: &InMemoryMembershipStore, id: u64, status: MemberStatus) {
        store.seed_member(Member {
            id,
            first_name: "Dana".to_string(),
            last_name: "Ortiz".to_string(),
            email: format!("dana{}@example.com", id),
            role: Role::Member,
            status,
        });
    }

    async fn seed_subscription(
        store: &InMemoryMembershipStore,
        member_id: u64,
        mutate: impl FnOnce(&mut StoredSubscription),
    ) -> StoredSubscription {
        let mut sub = StoredSubscription {
            id: 0,
            member_id,
            plan_id: "monthly".to_string(),
            status: SubscriptionStatus::Active,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 31),
            remaining_entries: None,
            frozen_until: None,
            created_at: Utc::now(),
            version: 0,
        };
        mutate(&mut sub);
        store.insert_subscription(sub).await.unwrap()
    }

    async fn seed_pending_payment(store: &InMemoryMembershipStore, subscription_id: u64) {
        use crate::membership::storage::PaymentLedger;
        store
            .insert_payment(StoredPayment {
                id: 0,
                subscription_id,
                amount_cents: 4900,
                status: PaymentStatus::Pending,
                reference: None,
                paid_at: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_approval_with_unlimited_plan() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Active);
        seed_subscription(&store, 1, |_| {}).await;
        let manager = manager(store.clone());

        let record = manager.attempt_checkin(1, now()).await.unwrap();
        assert!(record.is_approved());
        assert_eq!(record.reason, "OK");

        // The record is on file.
        assert_eq!(store.all_checkins().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_member_leaves_no_record() {
        let store = InMemoryMembershipStore::new();
        let manager = manager(store.clone());

        let err = manager.attempt_checkin(99, now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(store.all_checkins().is_empty());
    }

    #[tokio::test]
    async fn test_debt_outranks_a_valid_subscription() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Active);
        let sub = seed_subscription(&store, 1, |_| {}).await;
        seed_pending_payment(&store, sub.id).await;
        let manager = manager(store);

        let record = manager.attempt_checkin(1, now()).await.unwrap();
        assert!(!record.is_approved());
        assert_eq!(
            record.reason,
            "Pending payment exists. Please settle outstanding debts."
        );
    }

    #[tokio::test]
    async fn test_inactive_account_is_denied() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Suspended);
        seed_subscription(&store, 1, |_| {}).await;
        let manager = manager(store);

        let record = manager.attempt_checkin(1, now()).await.unwrap();
        assert_eq!(record.reason, "Member account is not active");
    }

    #[tokio::test]
    async fn test_denial_reasons_follow_rule_order() {
        let store = InMemoryMembershipStore::new();
        for id in 1..=5 {
            seed_member(&store, id, MemberStatus::Active);
        }

        // 1: no subscription at all.
        // 2: canceled flag, dates otherwise valid.
        seed_subscription(&store, 2, |s| s.status = SubscriptionStatus::Canceled).await;
        // 3: starts in the future.
        seed_subscription(&store, 3, |s| {
            s.start_date = date(2025, 2, 1);
            s.end_date = date(2025, 2, 28);
        })
        .await;
        // 4: already over.
        seed_subscription(&store, 4, |s| {
            s.start_date = date(2024, 12, 1);
            s.end_date = date(2024, 12, 31);
        })
        .await;
        // 5: frozen through today.
        seed_subscription(&store, 5, |s| s.frozen_until = Some(date(2025, 1, 20))).await;

        let manager = manager(store);
        for (member_id, reason) in [
            (1, "No subscription"),
            (2, "Subscription canceled"),
            (3, "Subscription not started yet"),
            (4, "Subscription expired"),
            (5, "Subscription is frozen"),
        ] {
            let record = manager.attempt_checkin(member_id, now()).await.unwrap();
            assert!(!record.is_approved());
            assert_eq!(record.reason, reason, "member {}", member_id);
        }
    }

    #[tokio::test]
    async fn test_expiry_is_checked_before_freeze() {
        // The gate checks raw fields in rule order, so a freeze window
        // extending past the end date reads as expired here even though
        // status derivation would report frozen.
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Active);
        seed_subscription(&store, 1, |s| {
            s.end_date = date(2025, 1, 10);
            s.frozen_until = Some(date(2025, 1, 20));
        })
        .await;
        let manager = manager(store);

        let record = manager.attempt_checkin(1, now()).await.unwrap();
        assert_eq!(record.reason, "Subscription expired");
    }

    #[tokio::test]
    async fn test_finite_quota_is_consumed_then_exhausted() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Active);
        let sub = seed_subscription(&store, 1, |s| s.remaining_entries = Some(1)).await;
        let manager = manager(store.clone());

        let record = manager.attempt_checkin(1, now()).await.unwrap();
        assert!(record.is_approved());

        let stored = store.get_subscription(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_entries, Some(0));
        assert_eq!(stored.version, sub.version + 1);

        // Next attempt: denied, nothing consumed.
        let record = manager.attempt_checkin(1, now()).await.unwrap();
        assert_eq!(record.reason, "No remaining entries");
        let stored = store.get_subscription(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_entries, Some(0));
        assert_eq!(stored.version, sub.version + 1);
    }

    #[tokio::test]
    async fn test_denial_does_not_touch_the_quota() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Active);
        let sub = seed_subscription(&store, 1, |s| {
            s.remaining_entries = Some(5);
            s.frozen_until = Some(date(2025, 1, 20));
        })
        .await;
        let manager = manager(store.clone());

        let record = manager.attempt_checkin(1, now()).await.unwrap();
        assert_eq!(record.reason, "Subscription is frozen");

        let stored = store.get_subscription(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_entries, Some(5));
    }

    #[tokio::test]
    async fn test_only_the_latest_subscription_is_evaluated() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Active);

        // Older subscription would admit the member just fine.
        seed_subscription(&store, 1, |_| {}).await;
        // But the newest one is canceled, and there is no fallback search.
        seed_subscription(&store, 1, |s| s.status = SubscriptionStatus::Canceled).await;

        let manager = manager(store);
        let record = manager.attempt_checkin(1, now()).await.unwrap();
        assert_eq!(record.reason, "Subscription canceled");
    }

    #[tokio::test]
    async fn test_corrections_layer_over_the_original() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Active);
        let manager = manager(store);

        let denial = manager.attempt_checkin(1, now()).await.unwrap();
        assert_eq!(denial.reason, "No subscription");

        let correction = manager
            .correct_checkin(denial.id, CheckinResult::Approved, "Front desk override", now())
            .await
            .unwrap();
        assert_eq!(correction.corrects, Some(denial.id));
        assert_eq!(correction.member_id, denial.member_id);

        // History keeps the original denial untouched.
        let original = manager.get_checkin(denial.id).await.unwrap();
        assert_eq!(original.result, CheckinResult::Denied);

        let standing = manager.latest_interpretation(denial.id).await.unwrap();
        assert_eq!(standing.id, correction.id);
        assert!(standing.is_approved());

        // An uncorrected record stands for itself.
        let standing = manager.latest_interpretation(correction.id).await.unwrap();
        assert_eq!(standing.id, correction.id);

        let err = manager
            .correct_checkin(999, CheckinResult::Denied, "typo", now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_decisions_are_audited() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1, MemberStatus::Active);
        seed_subscription(&store, 1, |_| {}).await;

        let audit = CollectingAuditLogger::new();
        let manager = CheckinManager::with_audit(
            store.clone(),
            store.clone(),
            store,
            MembershipConfig::default(),
            audit.clone(),
        );

        let approved = manager.attempt_checkin(1, now()).await.unwrap();
        manager
            .correct_checkin(approved.id, CheckinResult::Denied, "wrong member", now())
            .await
            .unwrap();

        let events = audit.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MembershipAuditEvent::CheckinApproved { .. }));
        assert!(matches!(events[1], MembershipAuditEvent::CheckinCorrected { .. }));
    }
}
