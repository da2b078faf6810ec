//! Fitgate - membership lifecycle and admission control for gyms
//!
//! Fitgate is the decision core of a gym management system: the
//! subscription state machine, the check-in admission gate, and
//! capacity-bounded class registration with waitlisting. It owns no HTTP
//! layer and no database; you bring storage by implementing the traits in
//! [`membership::storage`], and an embedding application maps the error
//! kinds in [`error`] to transport responses.
//!
//! # Features
//!
//! - **Lifecycle**: derive active/frozen/expired/canceled status on read,
//!   freeze/unfreeze windows, finite entry quotas
//! - **Admission**: ordered check-in rule gate with persisted, append-only
//!   decision records (denials included)
//! - **Classes**: atomic capacity gate, idempotent cancellation, ordered
//!   waitlists
//! - **Payments**: debt tracking that bars entry until settled
//! - **Testing**: in-memory store and collecting audit logger behind the
//!   `test-membership` feature
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fitgate::membership::{CheckinManager, MembershipConfig, Plans, SubscriptionManager};
//!
//! #[tokio::main]
//! async fn main() -> fitgate::Result<()> {
//!     fitgate::init_tracing();
//!
//!     let plans = Plans::builder()
//!         .plan("monthly").price_cents(4900).valid_days(30).done()
//!         .build();
//!     let config = MembershipConfig::default();
//!
//!     let subscriptions =
//!         SubscriptionManager::new(store.clone(), directory.clone(), plans, config.clone());
//!     subscriptions.create_subscription(member_id, "monthly", None, today).await?;
//!
//!     let checkins = CheckinManager::new(store, directory, ledger, config);
//!     let record = checkins.attempt_checkin(member_id, chrono::Utc::now()).await?;
//!     println!("{}: {}", record.result, record.reason);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod membership;

pub use error::{ErrorKind, FitgateError, Result};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with sensible defaults.
///
/// Respects `RUST_LOG` for filtering (defaulting to `info`) and switches
/// to JSON output when `FITGATE_LOG_JSON=true`.
///
/// # Example
///
/// ```rust,no_run
/// fn main() {
///     fitgate::init_tracing();
///     // ... rest of your app
/// }
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("FITGATE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
