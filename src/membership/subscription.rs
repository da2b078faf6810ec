//! Subscription management.
//!
//! Enrollment, freeze/unfreeze, cancellation, and member-facing status
//! summaries. The decision logic lives in [`lifecycle`](super::lifecycle);
//! this manager wires it to storage with optimistic locking.

use chrono::{NaiveDate, Utc};

use crate::error::{FitgateError, Result};

use super::audit::{MembershipAuditEvent, MembershipAuditLogger, NoOpAuditLogger};
use super::config::MembershipConfig;
use super::error::MembershipError;
use super::lifecycle;
use super::plans::Plans;
use super::storage::{
    MemberDirectory, StoredSubscription, SubscriptionStatus, SubscriptionStore,
};

/// Member-facing view of a subscription, with the status freshly derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSummary {
    /// The subscription.
    pub subscription_id: u64,
    /// Plan it was created from.
    pub plan_id: String,
    /// Status derived as of the query day.
    pub status: SubscriptionStatus,
    /// Calendar days until `end_date`, clamped at zero.
    pub days_left: u32,
    /// Remaining entry quota. `None` = unlimited.
    pub remaining_entries: Option<u32>,
    /// Last day of the freeze window, if frozen.
    pub frozen_until: Option<NaiveDate>,
}

/// Subscription lifecycle operations.
pub struct SubscriptionManager<
    S: SubscriptionStore,
    D: MemberDirectory,
    A: MembershipAuditLogger = NoOpAuditLogger,
> {
    store: S,
    directory: D,
    plans: Plans,
    config: MembershipConfig,
    audit: A,
}

impl<S: SubscriptionStore, D: MemberDirectory> SubscriptionManager<S, D> {
    /// Create a manager without audit logging.
    #[must_use]
    pub fn new(store: S, directory: D, plans: Plans, config: MembershipConfig) -> Self {
        Self {
            store,
            directory,
            plans,
            config,
            audit: NoOpAuditLogger,
        }
    }
}

impl<S: SubscriptionStore, D: MemberDirectory, A: MembershipAuditLogger>
    SubscriptionManager<S, D, A>
{
    /// Create a manager with an audit logger.
    #[must_use]
    pub fn with_audit(
        store: S,
        directory: D,
        plans: Plans,
        config: MembershipConfig,
        audit: A,
    ) -> Self {
        Self {
            store,
            directory,
            plans,
            config,
            audit,
        }
    }

    async fn require_member(&self, member_id: u64) -> Result<()> {
        if self.directory.find_member(member_id).await?.is_none() {
            return Err(MembershipError::MemberNotFound { member_id }.into());
        }
        Ok(())
    }

    async fn load(&self, subscription_id: u64) -> Result<StoredSubscription> {
        self.store
            .get_subscription(subscription_id)
            .await?
            .ok_or_else(|| MembershipError::SubscriptionNotFound { subscription_id }.into())
    }

    /// Enroll a member in a plan.
    ///
    /// At most one live subscription per member: the most recently
    /// created subscription is re-derived as of `today`, and the
    /// enrollment is rejected while it is active or frozen. Expired and
    /// canceled subscriptions do not block a new one.
    pub async fn create_subscription(
        &self,
        member_id: u64,
        plan_id: &str,
        start_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<StoredSubscription> {
        self.require_member(member_id).await?;

        let plan = self
            .plans
            .get(plan_id)
            .ok_or_else(|| MembershipError::PlanNotFound {
                plan_id: plan_id.to_string(),
            })?;

        if let Some(latest) = self.store.latest_subscription(member_id).await? {
            if latest.is_live(today) {
                return Err(MembershipError::AlreadySubscribed { member_id }.into());
            }
        }

        let start = start_date.unwrap_or(today);
        let subscription = self
            .store
            .insert_subscription(StoredSubscription {
                id: 0,
                member_id,
                plan_id: plan.id.clone(),
                status: SubscriptionStatus::Active,
                start_date: start,
                end_date: plan.validity_end(start),
                remaining_entries: plan.max_entries,
                frozen_until: None,
                created_at: Utc::now(),
                version: 0,
            })
            .await?;

        self.audit
            .log(MembershipAuditEvent::SubscriptionCreated {
                member_id,
                subscription_id: subscription.id,
                plan_id: subscription.plan_id.clone(),
            })
            .await;

        Ok(subscription)
    }

    /// Freeze a subscription for `days` days starting `today`.
    ///
    /// Bounds come from [`MembershipConfig`]. A canceled subscription
    /// cannot be frozen; cancel is terminal.
    pub async fn freeze_subscription(
        &self,
        subscription_id: u64,
        days: u32,
        today: NaiveDate,
    ) -> Result<StoredSubscription> {
        let updated = self
            .apply_with_retry(subscription_id, |sub| {
                lifecycle::freeze_with_limits(
                    sub,
                    today,
                    days,
                    self.config.min_freeze_days,
                    self.config.max_freeze_days,
                )
            })
            .await?;

        self.audit
            .log(MembershipAuditEvent::SubscriptionFrozen {
                member_id: updated.member_id,
                subscription_id: updated.id,
                days,
            })
            .await;

        Ok(updated)
    }

    /// Clear a freeze window and mark the subscription active.
    pub async fn unfreeze_subscription(&self, subscription_id: u64) -> Result<StoredSubscription> {
        let updated = self
            .apply_with_retry(subscription_id, |sub| {
                lifecycle::unfreeze(sub);
                Ok(())
            })
            .await?;

        self.audit
            .log(MembershipAuditEvent::SubscriptionUnfrozen {
                member_id: updated.member_id,
                subscription_id: updated.id,
            })
            .await;

        Ok(updated)
    }

    /// Cancel a subscription. Terminal and idempotent: canceling an
    /// already canceled subscription returns it unchanged.
    ///
    /// The write goes through optimistic locking like every other
    /// subscription mutation, so a quota decrement committing at the same
    /// moment is never overwritten.
    pub async fn cancel_subscription(&self, subscription_id: u64) -> Result<StoredSubscription> {
        for _attempt in 0..self.config.checkin_retry_limit.max(1) {
            let mut subscription = self.load(subscription_id).await?;
            if subscription.is_canceled() {
                return Ok(subscription);
            }

            let expected_version = subscription.version;
            subscription.status = SubscriptionStatus::Canceled;
            subscription.version = expected_version + 1;

            if self
                .store
                .compare_and_save_subscription(&subscription, expected_version)
                .await?
            {
                self.audit
                    .log(MembershipAuditEvent::SubscriptionCanceled {
                        member_id: subscription.member_id,
                        subscription_id: subscription.id,
                    })
                    .await;
                return Ok(subscription);
            }

            tracing::debug!(
                target: "fitgate::membership",
                subscription_id,
                "version conflict on cancel, retrying"
            );
        }

        Err(MembershipError::ConcurrentModification { subscription_id }.into())
    }

    /// Status summary for a member's current subscription, or `None` if
    /// the member has never subscribed.
    pub async fn subscription_status(
        &self,
        member_id: u64,
        today: NaiveDate,
    ) -> Result<Option<SubscriptionSummary>> {
        self.require_member(member_id).await?;

        let Some(subscription) = self.store.latest_subscription(member_id).await? else {
            return Ok(None);
        };

        let status = lifecycle::derive_status(&subscription, today);
        let days_left = (subscription.end_date - today).num_days().max(0) as u32;

        Ok(Some(SubscriptionSummary {
            subscription_id: subscription.id,
            plan_id: subscription.plan_id,
            status,
            days_left,
            remaining_entries: subscription.remaining_entries,
            frozen_until: subscription.frozen_until,
        }))
    }

    /// Get a subscription by ID.
    pub async fn get_subscription(&self, subscription_id: u64) -> Result<StoredSubscription> {
        self.load(subscription_id).await
    }

    /// Full subscription history for a member, newest first.
    pub async fn list_member_subscriptions(
        &self,
        member_id: u64,
    ) -> Result<Vec<StoredSubscription>> {
        self.require_member(member_id).await?;
        self.store.list_subscriptions(member_id).await
    }

    /// Load-mutate-save with optimistic locking.
    ///
    /// Re-reads and re-applies `mutate` on every version conflict, up to
    /// the configured retry limit.
    async fn apply_with_retry(
        &self,
        subscription_id: u64,
        mutate: impl Fn(&mut StoredSubscription) -> std::result::Result<(), MembershipError>,
    ) -> Result<StoredSubscription> {
        for _attempt in 0..self.config.checkin_retry_limit.max(1) {
            let mut subscription = self.load(subscription_id).await?;
            if subscription.is_canceled() {
                return Err(FitgateError::conflict(format!(
                    "Subscription {} is canceled",
                    subscription_id
                )));
            }

            let expected_version = subscription.version;
            mutate(&mut subscription)?;
            subscription.version = expected_version + 1;

            if self
                .store
                .compare_and_save_subscription(&subscription, expected_version)
                .await?
            {
                return Ok(subscription);
            }

            tracing::debug!(
                target: "fitgate::membership",
                subscription_id,
                "version conflict on subscription write, retrying"
            );
        }

        Err(MembershipError::ConcurrentModification { subscription_id }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::membership::roles::Role;
    use crate::membership::storage::test::InMemoryMembershipStore;
    use crate::membership::storage::{Member, MemberStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plans() -> Plans {
        Plans::builder()
            .plan("monthly")
            .display_name("Monthly Unlimited")
            .price_cents(4900)
            .valid_days(30)
            .done()
            .plan("punch-card-10")
            .price_cents(9900)
            .valid_days(90)
            .max_entries(10)
            .done()
            .build()
    }

    fn manager(
        store: InMemoryMembershipStore,
    ) -> SubscriptionManager<InMemoryMembershipStore, InMemoryMembershipStore> {
        SubscriptionManager::new(
            store.clone(),
            store,
            plans(),
            MembershipConfig::default(),
        )
    }

    fn seed_member(store: &InMemoryMembershipStore, id: u64) {
        store.seed_member(Member {
            id,
            first_name: "Dana".to_string(),
            last_name: "Ortiz".to_string(),
            email: format!("dana{}@example.com", id),
            role: Role::Member,
            status: MemberStatus::Active,
        });
    }

    #[tokio::test]
    async fn test_create_subscription() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);

        let today = date(2025, 1, 1);
        let sub = manager
            .create_subscription(1, "punch-card-10", None, today)
            .await
            .unwrap();

        assert_eq!(sub.start_date, today);
        assert_eq!(sub.end_date, date(2025, 4, 1));
        assert_eq!(sub.remaining_entries, Some(10));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_member_and_plan() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let today = date(2025, 1, 1);

        let err = manager
            .create_subscription(99, "monthly", None, today)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = manager
            .create_subscription(1, "no-such-plan", None, today)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_one_live_subscription_per_member() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let today = date(2025, 1, 1);

        manager
            .create_subscription(1, "monthly", None, today)
            .await
            .unwrap();

        let err = manager
            .create_subscription(1, "monthly", None, today)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Once the first one has lapsed, a new enrollment goes through.
        let later = date(2025, 3, 1);
        manager
            .create_subscription(1, "monthly", None, later)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_canceled_subscription_does_not_block_enrollment() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let today = date(2025, 1, 1);

        let sub = manager
            .create_subscription(1, "monthly", None, today)
            .await
            .unwrap();
        manager.cancel_subscription(sub.id).await.unwrap();

        manager
            .create_subscription(1, "monthly", None, today)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_freeze_and_unfreeze_persist() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store.clone());
        let today = date(2025, 1, 1);

        let sub = manager
            .create_subscription(1, "monthly", None, today)
            .await
            .unwrap();

        let frozen = manager
            .freeze_subscription(sub.id, 14, date(2025, 1, 10))
            .await
            .unwrap();
        assert_eq!(frozen.frozen_until, Some(date(2025, 1, 24)));
        assert_eq!(frozen.status, SubscriptionStatus::Frozen);
        assert_eq!(frozen.version, sub.version + 1);

        use crate::membership::storage::SubscriptionStore;
        let stored = store.get_subscription(sub.id).await.unwrap().unwrap();
        assert_eq!(stored, frozen);

        let thawed = manager.unfreeze_subscription(sub.id).await.unwrap();
        assert_eq!(thawed.frozen_until, None);
        assert_eq!(thawed.status, SubscriptionStatus::Active);
        assert_eq!(thawed.version, frozen.version + 1);
    }

    #[tokio::test]
    async fn test_freeze_bounds_enforced() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let today = date(2025, 1, 1);

        let sub = manager
            .create_subscription(1, "monthly", None, today)
            .await
            .unwrap();

        for days in [0, 366] {
            let err = manager
                .freeze_subscription(sub.id, days, today)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[tokio::test]
    async fn test_cancel_is_terminal_and_idempotent() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let today = date(2025, 1, 1);

        let sub = manager
            .create_subscription(1, "monthly", None, today)
            .await
            .unwrap();

        let canceled = manager.cancel_subscription(sub.id).await.unwrap();
        assert_eq!(canceled.status, SubscriptionStatus::Canceled);

        // Second cancel changes nothing.
        let again = manager.cancel_subscription(sub.id).await.unwrap();
        assert_eq!(again, canceled);

        // Freeze and unfreeze refuse to touch a canceled subscription.
        let err = manager
            .freeze_subscription(sub.id, 7, today)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = manager.unfreeze_subscription(sub.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_cancel_preserves_a_committed_quota_decrement() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store.clone());
        let today = date(2025, 1, 1);

        let sub = manager
            .create_subscription(1, "punch-card-10", None, today)
            .await
            .unwrap();

        // A front-gate decrement lands just before the cancel.
        use crate::membership::storage::SubscriptionStore;
        let mut spent = sub.clone();
        spent.remaining_entries = Some(9);
        spent.version = sub.version + 1;
        assert!(store
            .compare_and_save_subscription(&spent, sub.version)
            .await
            .unwrap());

        let canceled = manager.cancel_subscription(sub.id).await.unwrap();
        assert_eq!(canceled.status, SubscriptionStatus::Canceled);
        assert_eq!(canceled.remaining_entries, Some(9));
        assert_eq!(canceled.version, spent.version + 1);
    }

    #[tokio::test]
    async fn test_subscription_status_summary() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let today = date(2025, 1, 1);

        assert_eq!(manager.subscription_status(1, today).await.unwrap(), None);

        let sub = manager
            .create_subscription(1, "monthly", None, today)
            .await
            .unwrap();

        let summary = manager
            .subscription_status(1, date(2025, 1, 21))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.subscription_id, sub.id);
        assert_eq!(summary.status, SubscriptionStatus::Active);
        assert_eq!(summary.days_left, 10);

        // After the end date, days_left clamps at zero.
        let summary = manager
            .subscription_status(1, date(2025, 3, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.status, SubscriptionStatus::Expired);
        assert_eq!(summary.days_left, 0);
    }

    #[tokio::test]
    async fn test_history_lists_newest_first() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);

        let first = manager
            .create_subscription(1, "monthly", None, date(2025, 1, 1))
            .await
            .unwrap();
        let second = manager
            .create_subscription(1, "monthly", None, date(2025, 3, 1))
            .await
            .unwrap();

        let history = manager.list_member_subscriptions(1).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);
    }
}
