//! Storage traits for membership data.
//!
//! Implement these traits to persist membership state to your database.
//! An in-memory implementation is provided for testing.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::roles::Role;

/// A gym member as seen by the admission engine.
///
/// Member accounts are created and managed by the embedding application;
/// this crate only reads them through [`MemberDirectory`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    /// Unique member ID.
    pub id: u64,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Role within the gym.
    pub role: Role,
    /// Account status.
    pub status: MemberStatus,
}

impl Member {
    /// Full display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Account status of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Account in good standing.
    Active,
    /// Account deactivated by staff.
    Inactive,
    /// Account suspended pending review.
    Suspended,
}

impl MemberStatus {
    /// Whether the account may use the facility.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only lookup of member accounts.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Get a member by ID.
    async fn find_member(&self, member_id: u64) -> Result<Option<Member>>;
}

/// A subscription record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSubscription {
    /// Unique subscription ID, assigned by the store on insert.
    pub id: u64,
    /// Owning member.
    pub member_id: u64,
    /// Plan the subscription was created from.
    pub plan_id: String,
    /// Cached status. Derive the live value with
    /// [`lifecycle::derive_status`](super::lifecycle::derive_status).
    pub status: SubscriptionStatus,
    /// First day of validity (inclusive).
    pub start_date: NaiveDate,
    /// Last day of validity (inclusive).
    pub end_date: NaiveDate,
    /// Remaining entry quota. `None` means unlimited.
    pub remaining_entries: Option<u32>,
    /// Last day of the freeze window (inclusive), if frozen.
    pub frozen_until: Option<NaiveDate>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Version counter for optimistic locking. Bumped on every write.
    pub version: u64,
}

impl StoredSubscription {
    /// Check if the subscription is canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.status == SubscriptionStatus::Canceled
    }

    /// Check if the subscription can admit a member today, ignoring
    /// quota. Shorthand over the lifecycle derivation.
    #[must_use]
    pub fn is_live(&self, today: NaiveDate) -> bool {
        matches!(
            super::lifecycle::derive_status(self, today),
            SubscriptionStatus::Active | SubscriptionStatus::Frozen
        )
    }
}

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Within the validity window and usable.
    Active,
    /// Temporarily paused by the member.
    Frozen,
    /// Validity window has passed.
    Expired,
    /// Terminated by the member or staff. Terminal.
    Canceled,
}

impl SubscriptionStatus {
    /// Parse from a stored status string. Unknown values map to expired,
    /// which denies admission without destroying the record.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "frozen" => Self::Frozen,
            "canceled" => Self::Canceled,
            _ => Self::Expired,
        }
    }

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Expired => "expired",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for storing subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Get a subscription by ID.
    async fn get_subscription(&self, subscription_id: u64) -> Result<Option<StoredSubscription>>;

    /// Get the most recently created subscription for a member, if any.
    ///
    /// "Most recent" means highest ID; earlier subscriptions remain on
    /// file as history but never drive admission decisions.
    async fn latest_subscription(&self, member_id: u64) -> Result<Option<StoredSubscription>>;

    /// List all subscriptions for a member, newest first.
    async fn list_subscriptions(&self, member_id: u64) -> Result<Vec<StoredSubscription>>;

    /// Insert a new subscription. The store assigns the ID and returns
    /// the record with it set.
    async fn insert_subscription(
        &self,
        subscription: StoredSubscription,
    ) -> Result<StoredSubscription>;

    /// Save an existing subscription, overwriting unconditionally.
    async fn save_subscription(&self, subscription: &StoredSubscription) -> Result<()>;

    /// Save a subscription only if it hasn't been modified since `expected_version`.
    ///
    /// This is used for optimistic locking to prevent race conditions.
    /// Returns `Ok(true)` if the save succeeded, `Ok(false)` if the version
    /// didn't match.
    ///
    /// # Important: Production Implementations MUST Override This
    ///
    /// The default implementation has a **time-of-check to time-of-use (TOCTOU)
    /// race condition** and is only suitable for single-threaded
    /// development/testing scenarios.
    ///
    /// Production implementations MUST override this method with an atomic
    /// compare-and-swap operation. Examples:
    ///
    /// - **PostgreSQL**: Use `UPDATE ... WHERE version = $expected_version`
    /// - **Redis**: Use `WATCH`/`MULTI`/`EXEC` transactions
    /// - **DynamoDB**: Use conditional writes with `ConditionExpression`
    ///
    /// # Example (PostgreSQL)
    ///
    /// ```sql
    /// UPDATE subscriptions
    /// SET ..., version = version + 1
    /// WHERE id = $1 AND version = $2
    /// RETURNING id
    /// ```
    ///
    /// If the query returns a row, the update succeeded. If not, version mismatch.
    async fn compare_and_save_subscription(
        &self,
        subscription: &StoredSubscription,
        expected_version: u64,
    ) -> Result<bool> {
        // WARNING: This default implementation is NOT atomic and has a TOCTOU
        // race condition. It exists only for simple development scenarios.
        // Production code MUST override this method with an atomic implementation.
        #[cfg(debug_assertions)]
        {
            static WARNED: std::sync::atomic::AtomicBool =
                std::sync::atomic::AtomicBool::new(false);
            if !WARNED.swap(true, std::sync::atomic::Ordering::Relaxed) {
                tracing::warn!(
                    target: "fitgate::membership",
                    "Using default non-atomic compare_and_save_subscription implementation. \
                     This is NOT safe for production use with concurrent requests. \
                     Override this method with an atomic compare-and-swap operation."
                );
            }
        }

        if let Some(current) = self.get_subscription(subscription.id).await? {
            if current.version != expected_version {
                return Ok(false);
            }
        }
        self.save_subscription(subscription).await?;
        Ok(true)
    }
}

/// Outcome of a check-in decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinResult {
    /// The member was admitted.
    Approved,
    /// The member was turned away.
    Denied,
}

impl CheckinResult {
    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl std::fmt::Display for CheckinResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audited check-in attempt.
///
/// The log is append-only. A mistaken record is never rewritten; a
/// correction record pointing back at it via `corrects` is appended
/// instead, and readers layer corrections over originals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckinRecord {
    /// Unique record ID, assigned by the store on append.
    pub id: u64,
    /// Member the attempt was for.
    pub member_id: u64,
    /// Approved or denied.
    pub result: CheckinResult,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// ID of the record this one corrects, if any.
    pub corrects: Option<u64>,
    /// Timestamp of the attempt.
    pub created_at: DateTime<Utc>,
}

impl CheckinRecord {
    /// Check if the member got in.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.result == CheckinResult::Approved
    }
}

/// Append-only store for check-in records.
#[async_trait]
pub trait CheckinStore: Send + Sync {
    /// Append a record. The store assigns the ID and returns the record
    /// with it set.
    async fn append_checkin(&self, record: CheckinRecord) -> Result<CheckinRecord>;

    /// Get a record by ID.
    async fn get_checkin(&self, checkin_id: u64) -> Result<Option<CheckinRecord>>;

    /// List records, newest first, optionally filtered to one member.
    async fn list_checkins(&self, member_id: Option<u64>) -> Result<Vec<CheckinRecord>>;

    /// List corrections filed against a record, oldest first.
    async fn corrections_for(&self, checkin_id: u64) -> Result<Vec<CheckinRecord>>;
}

/// A scheduled group class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GymClass {
    /// Unique class ID, assigned by the store on insert.
    pub id: u64,
    /// Display title.
    pub title: String,
    /// Instructor name.
    pub instructor: String,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Duration in minutes.
    pub duration_minutes: u32,
    /// Maximum concurrently active registrations.
    pub capacity: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Status of a class registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Holding a slot.
    Active,
    /// Slot released.
    Canceled,
}

/// A member's registration for a class.
///
/// At most one registration row exists per (class, member) pair; a
/// canceled row is reactivated in place when the member rejoins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    /// Unique registration ID, assigned by the store.
    pub id: u64,
    /// The class.
    pub class_id: u64,
    /// The member.
    pub member_id: u64,
    /// Whether the slot is currently held.
    pub status: RegistrationStatus,
    /// When the slot was (last) taken.
    pub registered_at: DateTime<Utc>,
    /// When the slot was released, if canceled.
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Registration {
    /// Check if the slot is currently held.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RegistrationStatus::Active
    }
}

/// Outcome of an atomic registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationWrite {
    /// A fresh registration was created.
    Created(Registration),
    /// A previously canceled registration was reactivated, keeping its ID.
    Reactivated(Registration),
    /// The member already held an active registration; nothing changed.
    AlreadyActive(Registration),
    /// No free slot; nothing changed.
    Full,
}

/// Trait for storing classes and registrations.
#[async_trait]
pub trait ClassStore: Send + Sync {
    /// Get a class by ID.
    async fn get_class(&self, class_id: u64) -> Result<Option<GymClass>>;

    /// List all classes, by start time ascending.
    async fn list_classes(&self) -> Result<Vec<GymClass>>;

    /// Insert a new class. The store assigns the ID and returns the
    /// record with it set.
    async fn insert_class(&self, class: GymClass) -> Result<GymClass>;

    /// Get the registration row for a (class, member) pair, active or not.
    async fn find_registration(&self, class_id: u64, member_id: u64)
        -> Result<Option<Registration>>;

    /// Count currently active registrations for a class.
    async fn count_active_registrations(&self, class_id: u64) -> Result<u32>;

    /// List currently active registrations for a class.
    async fn list_active_registrations(&self, class_id: u64) -> Result<Vec<Registration>>;

    /// Count canceled registrations for a class.
    async fn count_canceled_registrations(&self, class_id: u64) -> Result<u32>;

    /// Register a member if the class has a free slot.
    ///
    /// The capacity check and the write MUST be atomic with respect to
    /// other registration attempts for the same class: the count of
    /// active registrations never exceeds `capacity`, even under
    /// concurrent calls. SQL implementations should run the check and
    /// insert in a serializable transaction (or take a row lock on the
    /// class); the in-memory store holds one write lock across both.
    async fn register_if_capacity(
        &self,
        class_id: u64,
        member_id: u64,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<RegistrationWrite>;

    /// Save an existing registration, overwriting unconditionally.
    async fn save_registration(&self, registration: &Registration) -> Result<()>;
}

/// A position on a class waitlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitlistEntry {
    /// Unique entry ID, assigned by the store.
    pub id: u64,
    /// The class.
    pub class_id: u64,
    /// The member.
    pub member_id: u64,
    /// Queue position at join time. Never renumbered; gaps from
    /// departures are permanent.
    pub position: u32,
    /// When the member joined the queue.
    pub joined_at: DateTime<Utc>,
}

/// Outcome of an atomic waitlist append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitlistWrite {
    /// The member was queued at the returned entry's position.
    Added(WaitlistEntry),
    /// The member was already queued; the existing entry is returned
    /// and nothing changed.
    Duplicate(WaitlistEntry),
}

/// Trait for storing class waitlists.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    /// Get the waitlist entry for a (class, member) pair.
    async fn find_waitlist_entry(
        &self,
        class_id: u64,
        member_id: u64,
    ) -> Result<Option<WaitlistEntry>>;

    /// Append a member to a class waitlist.
    ///
    /// The assigned position is `current entry count + 1`. The count and
    /// the append MUST be atomic with respect to other appends for the
    /// same class so two concurrent joiners never read the same count. SQL
    /// implementations should compute the position inside the inserting
    /// transaction; the in-memory store holds one write lock across both.
    async fn append_waitlist_entry(
        &self,
        class_id: u64,
        member_id: u64,
        now: DateTime<Utc>,
    ) -> Result<WaitlistWrite>;

    /// Remove a member from a class waitlist. Remaining entries keep
    /// their positions. Returns whether an entry was removed.
    async fn remove_waitlist_entry(&self, class_id: u64, member_id: u64) -> Result<bool>;

    /// List a class waitlist, by position ascending.
    async fn list_waitlist(&self, class_id: u64) -> Result<Vec<WaitlistEntry>>;
}

/// Status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting settlement. Blocks check-in.
    Pending,
    /// Settled.
    Paid,
    /// Voided by staff.
    Canceled,
}

impl PaymentStatus {
    /// Whether this payment counts as outstanding debt.
    ///
    /// Both pending and canceled payments block check-in; a voided
    /// payment means the underlying charge was never settled.
    #[must_use]
    pub fn is_unsettled(&self) -> bool {
        matches!(self, Self::Pending | Self::Canceled)
    }

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment attached to a subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredPayment {
    /// Unique payment ID, assigned by the store on insert.
    pub id: u64,
    /// Subscription the payment settles.
    pub subscription_id: u64,
    /// Amount in minor currency units.
    pub amount_cents: i64,
    /// Settlement status.
    pub status: PaymentStatus,
    /// External reference (receipt number, processor ID).
    pub reference: Option<String>,
    /// When the payment was marked paid. `None` unless status is paid.
    pub paid_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Trait for storing payments.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Get a payment by ID.
    async fn get_payment(&self, payment_id: u64) -> Result<Option<StoredPayment>>;

    /// List payments, newest first, optionally filtered to one subscription.
    async fn list_payments(&self, subscription_id: Option<u64>) -> Result<Vec<StoredPayment>>;

    /// Count unsettled payments across all of a member's subscriptions.
    async fn count_unsettled_payments(&self, member_id: u64) -> Result<u64>;

    /// Insert a new payment. The store assigns the ID and returns the
    /// record with it set.
    async fn insert_payment(&self, payment: StoredPayment) -> Result<StoredPayment>;

    /// Save an existing payment, overwriting unconditionally.
    async fn save_payment(&self, payment: &StoredPayment) -> Result<()>;
}

/// A plan stored in the database.
///
/// This represents a membership plan that can be managed through an
/// admin surface; the runtime catalog is built from these with
/// [`Plans::from_stored`](super::plans::Plans::from_stored).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredPlan {
    /// Unique plan identifier (e.g., "monthly", "annual", "punch-card-10").
    pub id: String,
    /// Display name shown to members.
    pub name: String,
    /// Price in cents (for display purposes).
    pub price_cents: i64,
    /// Length of the validity window, in days.
    pub valid_days: u32,
    /// Entry quota granted at purchase. `None` = unlimited.
    pub max_entries: Option<u32>,
    /// Whether the plan is available for purchase.
    pub is_active: bool,
    /// Sort order for display.
    pub sort_order: i32,
}

/// Trait for storing plan data.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Get all active plans, ordered by sort_order.
    async fn list_plans(&self) -> Result<Vec<StoredPlan>>;

    /// Get all plans (including inactive), ordered by sort_order.
    async fn list_all_plans(&self) -> Result<Vec<StoredPlan>>;

    /// Get a plan by ID.
    async fn get_plan(&self, plan_id: &str) -> Result<Option<StoredPlan>>;

    /// Create or replace a plan.
    async fn upsert_plan(&self, plan: &StoredPlan) -> Result<()>;

    /// Activate or deactivate a plan.
    async fn set_plan_active(&self, plan_id: &str, is_active: bool) -> Result<()>;
}

/// In-memory membership store for testing.
#[cfg(any(test, feature = "test-membership"))]
pub mod test {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, RwLock};

    /// In-memory membership store for testing.
    ///
    /// Implements every storage trait in this module. Wraps data in Arc
    /// for cheap cloning.
    #[derive(Default, Clone)]
    pub struct InMemoryMembershipStore {
        inner: Arc<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        members: RwLock<HashMap<u64, Member>>,
        subscriptions: RwLock<HashMap<u64, StoredSubscription>>,
        checkins: RwLock<Vec<CheckinRecord>>,
        classes: RwLock<HashMap<u64, GymClass>>,
        registrations: RwLock<HashMap<(u64, u64), Registration>>,
        waitlists: RwLock<HashMap<u64, Vec<WaitlistEntry>>>,
        payments: RwLock<HashMap<u64, StoredPayment>>,
        plans: RwLock<HashMap<String, StoredPlan>>,
        next_subscription_id: AtomicU64,
        next_checkin_id: AtomicU64,
        next_class_id: AtomicU64,
        next_registration_id: AtomicU64,
        next_waitlist_id: AtomicU64,
        next_payment_id: AtomicU64,
    }

    impl InMemoryMembershipStore {
        /// Create a new in-memory store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a member account.
        pub fn seed_member(&self, member: Member) {
            self.inner.members.write().unwrap().insert(member.id, member);
        }

        /// Seed plans.
        pub fn seed_plans(&self, plans: Vec<StoredPlan>) {
            let mut store = self.inner.plans.write().unwrap();
            for plan in plans {
                store.insert(plan.id.clone(), plan);
            }
        }

        /// Get all check-in records in append order (for testing).
        pub fn all_checkins(&self) -> Vec<CheckinRecord> {
            self.inner.checkins.read().unwrap().clone()
        }
    }

    #[async_trait]
    impl MemberDirectory for InMemoryMembershipStore {
        async fn find_member(&self, member_id: u64) -> Result<Option<Member>> {
            Ok(self.inner.members.read().unwrap().get(&member_id).cloned())
        }
    }

    #[async_trait]
    impl SubscriptionStore for InMemoryMembershipStore {
        async fn get_subscription(
            &self,
            subscription_id: u64,
        ) -> Result<Option<StoredSubscription>> {
            Ok(self
                .inner
                .subscriptions
                .read()
                .unwrap()
                .get(&subscription_id)
                .cloned())
        }

        async fn latest_subscription(&self, member_id: u64) -> Result<Option<StoredSubscription>> {
            let subs = self.inner.subscriptions.read().unwrap();
            Ok(subs
                .values()
                .filter(|s| s.member_id == member_id)
                .max_by_key(|s| s.id)
                .cloned())
        }

        async fn list_subscriptions(&self, member_id: u64) -> Result<Vec<StoredSubscription>> {
            let subs = self.inner.subscriptions.read().unwrap();
            let mut list: Vec<StoredSubscription> = subs
                .values()
                .filter(|s| s.member_id == member_id)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(list)
        }

        async fn insert_subscription(
            &self,
            mut subscription: StoredSubscription,
        ) -> Result<StoredSubscription> {
            subscription.id = self.inner.next_subscription_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner
                .subscriptions
                .write()
                .unwrap()
                .insert(subscription.id, subscription.clone());
            Ok(subscription)
        }

        async fn save_subscription(&self, subscription: &StoredSubscription) -> Result<()> {
            self.inner
                .subscriptions
                .write()
                .unwrap()
                .insert(subscription.id, subscription.clone());
            Ok(())
        }

        async fn compare_and_save_subscription(
            &self,
            subscription: &StoredSubscription,
            expected_version: u64,
        ) -> Result<bool> {
            let mut subs = self.inner.subscriptions.write().unwrap();

            if let Some(current) = subs.get(&subscription.id) {
                if current.version != expected_version {
                    return Ok(false);
                }
            }

            subs.insert(subscription.id, subscription.clone());
            Ok(true)
        }
    }

    #[async_trait]
    impl CheckinStore for InMemoryMembershipStore {
        async fn append_checkin(&self, mut record: CheckinRecord) -> Result<CheckinRecord> {
            record.id = self.inner.next_checkin_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner.checkins.write().unwrap().push(record.clone());
            Ok(record)
        }

        async fn get_checkin(&self, checkin_id: u64) -> Result<Option<CheckinRecord>> {
            let records = self.inner.checkins.read().unwrap();
            Ok(records.iter().find(|r| r.id == checkin_id).cloned())
        }

        async fn list_checkins(&self, member_id: Option<u64>) -> Result<Vec<CheckinRecord>> {
            let records = self.inner.checkins.read().unwrap();
            let mut list: Vec<CheckinRecord> = records
                .iter()
                .filter(|r| member_id.map_or(true, |id| r.member_id == id))
                .cloned()
                .collect();
            list.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(list)
        }

        async fn corrections_for(&self, checkin_id: u64) -> Result<Vec<CheckinRecord>> {
            let records = self.inner.checkins.read().unwrap();
            Ok(records
                .iter()
                .filter(|r| r.corrects == Some(checkin_id))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl ClassStore for InMemoryMembershipStore {
        async fn get_class(&self, class_id: u64) -> Result<Option<GymClass>> {
            Ok(self.inner.classes.read().unwrap().get(&class_id).cloned())
        }

        async fn list_classes(&self) -> Result<Vec<GymClass>> {
            let classes = self.inner.classes.read().unwrap();
            let mut list: Vec<GymClass> = classes.values().cloned().collect();
            list.sort_by_key(|c| c.start_time);
            Ok(list)
        }

        async fn insert_class(&self, mut class: GymClass) -> Result<GymClass> {
            class.id = self.inner.next_class_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner
                .classes
                .write()
                .unwrap()
                .insert(class.id, class.clone());
            Ok(class)
        }

        async fn find_registration(
            &self,
            class_id: u64,
            member_id: u64,
        ) -> Result<Option<Registration>> {
            Ok(self
                .inner
                .registrations
                .read()
                .unwrap()
                .get(&(class_id, member_id))
                .cloned())
        }

        async fn count_active_registrations(&self, class_id: u64) -> Result<u32> {
            let regs = self.inner.registrations.read().unwrap();
            Ok(regs
                .values()
                .filter(|r| r.class_id == class_id && r.is_active())
                .count() as u32)
        }

        async fn list_active_registrations(&self, class_id: u64) -> Result<Vec<Registration>> {
            let regs = self.inner.registrations.read().unwrap();
            let mut list: Vec<Registration> = regs
                .values()
                .filter(|r| r.class_id == class_id && r.is_active())
                .cloned()
                .collect();
            list.sort_by_key(|r| r.id);
            Ok(list)
        }

        async fn count_canceled_registrations(&self, class_id: u64) -> Result<u32> {
            let regs = self.inner.registrations.read().unwrap();
            Ok(regs
                .values()
                .filter(|r| r.class_id == class_id && !r.is_active())
                .count() as u32)
        }

        async fn register_if_capacity(
            &self,
            class_id: u64,
            member_id: u64,
            capacity: u32,
            now: DateTime<Utc>,
        ) -> Result<RegistrationWrite> {
            // One write lock across the duplicate check, the capacity
            // count, and the write keeps the whole decision atomic.
            let mut regs = self.inner.registrations.write().unwrap();

            if let Some(existing) = regs.get(&(class_id, member_id)) {
                if existing.is_active() {
                    return Ok(RegistrationWrite::AlreadyActive(existing.clone()));
                }
            }

            let active = regs
                .values()
                .filter(|r| r.class_id == class_id && r.is_active())
                .count() as u32;
            if active >= capacity {
                return Ok(RegistrationWrite::Full);
            }

            if let Some(existing) = regs.get_mut(&(class_id, member_id)) {
                existing.status = RegistrationStatus::Active;
                existing.canceled_at = None;
                existing.registered_at = now;
                return Ok(RegistrationWrite::Reactivated(existing.clone()));
            }

            let registration = Registration {
                id: self.inner.next_registration_id.fetch_add(1, Ordering::SeqCst) + 1,
                class_id,
                member_id,
                status: RegistrationStatus::Active,
                registered_at: now,
                canceled_at: None,
            };
            regs.insert((class_id, member_id), registration.clone());
            Ok(RegistrationWrite::Created(registration))
        }

        async fn save_registration(&self, registration: &Registration) -> Result<()> {
            self.inner.registrations.write().unwrap().insert(
                (registration.class_id, registration.member_id),
                registration.clone(),
            );
            Ok(())
        }
    }

    #[async_trait]
    impl WaitlistStore for InMemoryMembershipStore {
        async fn find_waitlist_entry(
            &self,
            class_id: u64,
            member_id: u64,
        ) -> Result<Option<WaitlistEntry>> {
            let waitlists = self.inner.waitlists.read().unwrap();
            Ok(waitlists
                .get(&class_id)
                .and_then(|entries| entries.iter().find(|e| e.member_id == member_id))
                .cloned())
        }

        async fn append_waitlist_entry(
            &self,
            class_id: u64,
            member_id: u64,
            now: DateTime<Utc>,
        ) -> Result<WaitlistWrite> {
            // One write lock across the duplicate check, the count, and
            // the append keeps positions unique.
            let mut waitlists = self.inner.waitlists.write().unwrap();
            let entries = waitlists.entry(class_id).or_default();

            if let Some(existing) = entries.iter().find(|e| e.member_id == member_id) {
                return Ok(WaitlistWrite::Duplicate(existing.clone()));
            }

            let entry = WaitlistEntry {
                id: self.inner.next_waitlist_id.fetch_add(1, Ordering::SeqCst) + 1,
                class_id,
                member_id,
                position: entries.len() as u32 + 1,
                joined_at: now,
            };
            entries.push(entry.clone());
            Ok(WaitlistWrite::Added(entry))
        }

        async fn remove_waitlist_entry(&self, class_id: u64, member_id: u64) -> Result<bool> {
            let mut waitlists = self.inner.waitlists.write().unwrap();
            let Some(entries) = waitlists.get_mut(&class_id) else {
                return Ok(false);
            };
            let before = entries.len();
            entries.retain(|e| e.member_id != member_id);
            Ok(entries.len() < before)
        }

        async fn list_waitlist(&self, class_id: u64) -> Result<Vec<WaitlistEntry>> {
            let waitlists = self.inner.waitlists.read().unwrap();
            let mut list = waitlists.get(&class_id).cloned().unwrap_or_default();
            list.sort_by_key(|e| e.position);
            Ok(list)
        }
    }

    #[async_trait]
    impl PaymentLedger for InMemoryMembershipStore {
        async fn get_payment(&self, payment_id: u64) -> Result<Option<StoredPayment>> {
            Ok(self.inner.payments.read().unwrap().get(&payment_id).cloned())
        }

        async fn list_payments(
            &self,
            subscription_id: Option<u64>,
        ) -> Result<Vec<StoredPayment>> {
            let payments = self.inner.payments.read().unwrap();
            let mut list: Vec<StoredPayment> = payments
                .values()
                .filter(|p| subscription_id.map_or(true, |id| p.subscription_id == id))
                .cloned()
                .collect();
            list.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(list)
        }

        async fn count_unsettled_payments(&self, member_id: u64) -> Result<u64> {
            let subs = self.inner.subscriptions.read().unwrap();
            let member_subs: std::collections::HashSet<u64> = subs
                .values()
                .filter(|s| s.member_id == member_id)
                .map(|s| s.id)
                .collect();
            drop(subs);

            let payments = self.inner.payments.read().unwrap();
            Ok(payments
                .values()
                .filter(|p| p.status.is_unsettled() && member_subs.contains(&p.subscription_id))
                .count() as u64)
        }

        async fn insert_payment(&self, mut payment: StoredPayment) -> Result<StoredPayment> {
            payment.id = self.inner.next_payment_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner
                .payments
                .write()
                .unwrap()
                .insert(payment.id, payment.clone());
            Ok(payment)
        }

        async fn save_payment(&self, payment: &StoredPayment) -> Result<()> {
            self.inner
                .payments
                .write()
                .unwrap()
                .insert(payment.id, payment.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl PlanStore for InMemoryMembershipStore {
        async fn list_plans(&self) -> Result<Vec<StoredPlan>> {
            let plans = self.inner.plans.read().unwrap();
            let mut active: Vec<StoredPlan> =
                plans.values().filter(|p| p.is_active).cloned().collect();
            active.sort_by_key(|p| p.sort_order);
            Ok(active)
        }

        async fn list_all_plans(&self) -> Result<Vec<StoredPlan>> {
            let plans = self.inner.plans.read().unwrap();
            let mut all: Vec<StoredPlan> = plans.values().cloned().collect();
            all.sort_by_key(|p| p.sort_order);
            Ok(all)
        }

        async fn get_plan(&self, plan_id: &str) -> Result<Option<StoredPlan>> {
            Ok(self.inner.plans.read().unwrap().get(plan_id).cloned())
        }

        async fn upsert_plan(&self, plan: &StoredPlan) -> Result<()> {
            self.inner
                .plans
                .write()
                .unwrap()
                .insert(plan.id.clone(), plan.clone());
            Ok(())
        }

        async fn set_plan_active(&self, plan_id: &str, is_active: bool) -> Result<()> {
            let mut plans = self.inner.plans.write().unwrap();
            if let Some(plan) = plans.get_mut(plan_id) {
                plan.is_active = is_active;
            }
            Ok(())
        }
    }
}
