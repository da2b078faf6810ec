//! Plan configuration and definitions.
//!
//! Define your membership plans with validity windows, entry quotas, and
//! pricing.
//!
//! # Static Plans (Code-configured)
//!
//! Use the builder pattern for plans defined in code:
//!
//! ```rust,ignore
//! use fitgate::membership::Plans;
//!
//! let plans = Plans::builder()
//!     .plan("monthly")
//!         .display_name("Monthly Unlimited")
//!         .price_cents(4900)
//!         .valid_days(30)
//!         .done()
//!     .plan("punch-card-10")
//!         .display_name("10 Visits")
//!         .price_cents(9900)
//!         .valid_days(90)
//!         .max_entries(10)
//!         .done()
//!     .build();
//! ```
//!
//! # Dynamic Plans (Database-backed)
//!
//! Use [`PlanStore`](super::storage::PlanStore) for admin-managed plans:
//!
//! ```rust,ignore
//! let stored_plans = store.list_plans().await?;
//! let plans = Plans::from_stored(stored_plans);
//! ```

use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use super::storage::StoredPlan;

/// A collection of plan configurations.
#[derive(Clone, Debug, Default)]
pub struct Plans {
    plans: HashMap<String, PlanConfig>,
}

impl Plans {
    /// Create a new empty plans collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing plans.
    #[must_use]
    pub fn builder() -> PlansBuilder {
        PlansBuilder::new()
    }

    /// Create a Plans collection from database-stored plans.
    ///
    /// This allows admin-managed plans to be used with the
    /// code-configured plan system.
    #[must_use]
    pub fn from_stored(stored: Vec<StoredPlan>) -> Self {
        let plans = stored
            .into_iter()
            .map(|sp| {
                let config = PlanConfig::from(sp);
                (config.id.clone(), config)
            })
            .collect();
        Self { plans }
    }

    /// Merge plans from another Plans collection.
    ///
    /// Plans from `other` will overwrite plans with the same ID.
    pub fn merge(&mut self, other: Plans) {
        self.plans.extend(other.plans);
    }

    /// Add a single plan config.
    pub fn add(&mut self, config: PlanConfig) {
        self.plans.insert(config.id.clone(), config);
    }

    /// Get a plan by ID.
    #[must_use]
    pub fn get(&self, plan_id: &str) -> Option<&PlanConfig> {
        self.plans.get(plan_id)
    }

    /// Get all plan IDs.
    #[must_use]
    pub fn plan_ids(&self) -> Vec<&str> {
        self.plans.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a plan exists.
    #[must_use]
    pub fn contains(&self, plan_id: &str) -> bool {
        self.plans.contains_key(plan_id)
    }

    /// Get the number of plans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Check if there are no plans.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Iterate over all plans.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlanConfig)> {
        self.plans.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Configuration for a single plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanConfig {
    /// Plan identifier (e.g., "monthly", "annual", "punch-card-10").
    pub id: String,
    /// Display name for the plan.
    pub display_name: Option<String>,
    /// Price in cents (for display purposes).
    pub price_cents: i64,
    /// Length of the validity window, in days.
    pub valid_days: u32,
    /// Entry quota granted at purchase. `None` = unlimited.
    pub max_entries: Option<u32>,
}

impl PlanConfig {
    /// Check if this plan admits an unlimited number of visits.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.max_entries.is_none()
    }

    /// Last valid day (inclusive) for a subscription starting on `start`.
    ///
    /// `end_date = start_date + valid_days`, so a 30-day plan starting
    /// January 1 is usable through January 31.
    #[must_use]
    pub fn validity_end(&self, start: NaiveDate) -> NaiveDate {
        start
            .checked_add_days(Days::new(u64::from(self.valid_days)))
            .unwrap_or(NaiveDate::MAX)
    }
}

impl From<StoredPlan> for PlanConfig {
    fn from(sp: StoredPlan) -> Self {
        Self {
            id: sp.id,
            display_name: Some(sp.name),
            price_cents: sp.price_cents,
            valid_days: sp.valid_days,
            max_entries: sp.max_entries,
        }
    }
}

/// Builder for a collection of plans.
#[derive(Default)]
pub struct PlansBuilder {
    plans: Plans,
}

impl PlansBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start configuring a plan with the given ID.
    #[must_use]
    pub fn plan(self, id: impl Into<String>) -> PlanBuilder {
        PlanBuilder {
            parent: self,
            config: PlanConfig {
                id: id.into(),
                display_name: None,
                price_cents: 0,
                valid_days: 30,
                max_entries: None,
            },
        }
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Plans {
        self.plans
    }
}

/// Builder for a single plan within a [`PlansBuilder`].
pub struct PlanBuilder {
    parent: PlansBuilder,
    config: PlanConfig,
}

impl PlanBuilder {
    /// Set the display name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.config.display_name = Some(name.into());
        self
    }

    /// Set the price in cents.
    #[must_use]
    pub fn price_cents(mut self, cents: i64) -> Self {
        self.config.price_cents = cents;
        self
    }

    /// Set the validity window length in days.
    #[must_use]
    pub fn valid_days(mut self, days: u32) -> Self {
        self.config.valid_days = days;
        self
    }

    /// Set a finite entry quota.
    #[must_use]
    pub fn max_entries(mut self, entries: u32) -> Self {
        self.config.max_entries = Some(entries);
        self
    }

    /// Finish this plan and return to the collection builder.
    #[must_use]
    pub fn done(mut self) -> PlansBuilder {
        self.parent.plans.add(self.config);
        self.parent
    }
}
