//! Membership lifecycle and admission control.
//!
//! Provides the subscription state machine, the check-in admission gate,
//! and capacity-bounded class registration with waitlisting.
//!
//! # Example
//!
//! ```rust,ignore
//! use fitgate::membership::{
//!     CheckinManager, MembershipConfig, Plans, SubscriptionManager,
//! };
//!
//! // Configure plans
//! let plans = Plans::builder()
//!     .plan("monthly")
//!         .display_name("Monthly Unlimited")
//!         .price_cents(4900)
//!         .valid_days(30)
//!         .done()
//!     .plan("punch-card-10")
//!         .price_cents(9900)
//!         .valid_days(90)
//!         .max_entries(10)
//!         .done()
//!     .build();
//!
//! let config = MembershipConfig::default();
//! let subscriptions = SubscriptionManager::new(store.clone(), directory.clone(), plans, config.clone());
//! let checkins = CheckinManager::new(store.clone(), directory, ledger, config);
//!
//! // Enroll, then run the front gate
//! let sub = subscriptions.create_subscription(member_id, "monthly", None, today).await?;
//! let record = checkins.attempt_checkin(member_id, Utc::now()).await?;
//! if !record.is_approved() {
//!     println!("turned away: {}", record.reason);
//! }
//! ```

pub mod audit;
pub mod checkin;
pub mod classes;
pub mod config;
pub mod debt;
pub mod error;
pub mod lifecycle;
pub mod payments;
pub mod plans;
pub mod roles;
pub mod storage;
pub mod subscription;
pub mod waitlist;

// Plan exports
pub use plans::{PlanBuilder, PlanConfig, Plans, PlansBuilder};

// Storage exports
pub use storage::{
    CheckinRecord, CheckinResult, CheckinStore, ClassStore, GymClass, Member, MemberDirectory,
    MemberStatus, PaymentLedger, PaymentStatus, PlanStore, Registration, RegistrationStatus,
    RegistrationWrite, StoredPayment, StoredPlan, StoredSubscription, SubscriptionStatus,
    SubscriptionStore, WaitlistEntry, WaitlistStore, WaitlistWrite,
};

// Lifecycle exports
pub use lifecycle::{
    decrement_entry, derive_status, freeze, freeze_with_limits, unfreeze, MAX_FREEZE_DAYS,
    MIN_FREEZE_DAYS,
};

// Manager exports
pub use checkin::CheckinManager;
pub use classes::{ClassManager, ClassStats};
pub use debt::DebtGate;
pub use payments::PaymentManager;
pub use subscription::{SubscriptionManager, SubscriptionSummary};
pub use waitlist::WaitlistManager;

// Role exports
pub use roles::{is_permitted, role_allows, Capability, Role};

// Config exports
pub use config::{MembershipConfig, MembershipConfigBuilder};

// Audit exports
pub use audit::{
    MembershipAuditEvent, MembershipAuditLogger, NoOpAuditLogger, TracingAuditLogger,
};

// Error exports
pub use error::MembershipError;

// Test exports
#[cfg(any(test, feature = "test-membership"))]
pub use audit::test::CollectingAuditLogger;

#[cfg(any(test, feature = "test-membership"))]
pub use storage::test::InMemoryMembershipStore;
