//! Subscription lifecycle engine.
//!
//! Pure decision logic over a [`StoredSubscription`]: deriving the current
//! status from the calendar, applying freeze/unfreeze transitions, and
//! decrementing the entry quota. Nothing here touches storage; managers
//! load a record, apply a transition, and persist the result.

use chrono::{Days, NaiveDate};

use super::error::MembershipError;
use super::storage::{StoredSubscription, SubscriptionStatus};

/// Shortest freeze window accepted, in days.
pub const MIN_FREEZE_DAYS: u32 = 1;

/// Longest freeze window accepted, in days.
pub const MAX_FREEZE_DAYS: u32 = 365;

/// Derive the current status of a subscription for a given day.
///
/// The stored `status` field is a cache; this is the source of truth.
/// Precedence is deliberate:
///
/// 1. A canceled subscription stays canceled; the flag is terminal and no
///    recomputation clears it.
/// 2. A live freeze window (`frozen_until >= today`) reports frozen even
///    when the window extends past `end_date`.
/// 3. `end_date < today` reports expired.
/// 4. Otherwise active.
#[must_use]
pub fn derive_status(subscription: &StoredSubscription, today: NaiveDate) -> SubscriptionStatus {
    if subscription.status == SubscriptionStatus::Canceled {
        return SubscriptionStatus::Canceled;
    }
    if let Some(frozen_until) = subscription.frozen_until {
        if frozen_until >= today {
            return SubscriptionStatus::Frozen;
        }
    }
    if subscription.end_date < today {
        return SubscriptionStatus::Expired;
    }
    SubscriptionStatus::Active
}

/// Freeze a subscription for `days` days starting today.
///
/// Sets `frozen_until = today + days` and forces the status to frozen
/// regardless of the prior state: freezing a previously expired
/// subscription revives it for the duration of the window. Repeated calls
/// overwrite the window.
///
/// # Errors
///
/// Returns [`MembershipError::InvalidFreezeDuration`] when `days` is
/// outside `[MIN_FREEZE_DAYS, MAX_FREEZE_DAYS]`.
pub fn freeze(
    subscription: &mut StoredSubscription,
    today: NaiveDate,
    days: u32,
) -> Result<(), MembershipError> {
    freeze_with_limits(subscription, today, days, MIN_FREEZE_DAYS, MAX_FREEZE_DAYS)
}

/// [`freeze`] with caller-supplied bounds, for deployments that configure
/// their own freeze policy.
pub fn freeze_with_limits(
    subscription: &mut StoredSubscription,
    today: NaiveDate,
    days: u32,
    min_days: u32,
    max_days: u32,
) -> Result<(), MembershipError> {
    if days < min_days || days > max_days {
        return Err(MembershipError::InvalidFreezeDuration {
            days,
            min: min_days,
            max: max_days,
        });
    }

    subscription.frozen_until = today
        .checked_add_days(Days::new(u64::from(days)))
        .or(Some(NaiveDate::MAX));
    subscription.status = SubscriptionStatus::Frozen;
    Ok(())
}

/// Clear the freeze window and mark the subscription active.
///
/// Does not re-derive expiry; callers must run [`derive_status`] on the
/// next read before acting on the stored status.
pub fn unfreeze(subscription: &mut StoredSubscription) {
    subscription.frozen_until = None;
    subscription.status = SubscriptionStatus::Active;
}

/// Consume one entry from a finite quota.
///
/// A `None` quota means unlimited: the call succeeds and nothing changes.
///
/// # Errors
///
/// Returns [`MembershipError::NoRemainingEntries`] when the quota is
/// finite and already at zero.
pub fn decrement_entry(subscription: &mut StoredSubscription) -> Result<(), MembershipError> {
    match subscription.remaining_entries {
        None => Ok(()),
        Some(0) => Err(MembershipError::NoRemainingEntries {
            subscription_id: subscription.id,
        }),
        Some(n) => {
            subscription.remaining_entries = Some(n - 1);
            Ok(())
        }
    }
}
