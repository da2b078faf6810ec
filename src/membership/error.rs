//! Membership-specific error types.
//!
//! Provides granular error types for lifecycle, admission, and registration
//! operations, enabling better error handling and more informative messages
//! for API consumers.

use std::fmt;

/// Membership-specific errors.
///
/// These errors carry more context than the top-level kinds and can be
/// converted to [`FitgateError`](crate::error::FitgateError) for callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    // Missing entities
    /// The referenced member does not exist.
    MemberNotFound { member_id: u64 },
    /// The referenced plan does not exist or is inactive.
    PlanNotFound { plan_id: String },
    /// The referenced subscription does not exist.
    SubscriptionNotFound { subscription_id: u64 },
    /// The referenced class does not exist.
    ClassNotFound { class_id: u64 },
    /// No registration exists for the (class, member) pair.
    RegistrationNotFound { class_id: u64, member_id: u64 },
    /// No waitlist entry exists for the (class, member) pair.
    WaitlistEntryNotFound { class_id: u64, member_id: u64 },
    /// The referenced payment does not exist.
    PaymentNotFound { payment_id: u64 },
    /// The referenced check-in record does not exist.
    CheckinNotFound { checkin_id: u64 },

    // Conflicts
    /// The member already holds a live (active or frozen) subscription.
    AlreadySubscribed { member_id: u64 },
    /// The member already holds an active registration for the class.
    AlreadyRegistered { class_id: u64, member_id: u64 },
    /// The class has no free slot.
    ClassFull { class_id: u64, capacity: u32 },
    /// The member is already on the class waitlist.
    AlreadyWaitlisted { class_id: u64, member_id: u64 },

    // Quota
    /// The subscription's finite entry quota is at zero.
    NoRemainingEntries { subscription_id: u64 },

    // Validation
    /// The freeze duration is outside the accepted range.
    InvalidFreezeDuration { days: u32, min: u32, max: u32 },

    // Concurrency
    /// A concurrent writer modified the record; the operation may be retried.
    ConcurrentModification { subscription_id: u64 },
}

impl fmt::Display for MembershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemberNotFound { member_id } => {
                write!(f, "Member not found: {}", member_id)
            }
            Self::PlanNotFound { plan_id } => {
                write!(f, "Plan not found: {}", plan_id)
            }
            Self::SubscriptionNotFound { subscription_id } => {
                write!(f, "Subscription not found: {}", subscription_id)
            }
            Self::ClassNotFound { class_id } => {
                write!(f, "Class not found: {}", class_id)
            }
            Self::RegistrationNotFound { class_id, member_id } => {
                write!(f, "No registration for member {} in class {}", member_id, class_id)
            }
            Self::WaitlistEntryNotFound { class_id, member_id } => {
                write!(f, "Member {} is not on the waitlist for class {}", member_id, class_id)
            }
            Self::PaymentNotFound { payment_id } => {
                write!(f, "Payment not found: {}", payment_id)
            }
            Self::CheckinNotFound { checkin_id } => {
                write!(f, "Check-in record not found: {}", checkin_id)
            }
            Self::AlreadySubscribed { member_id } => {
                write!(f, "Member {} already has an active subscription", member_id)
            }
            Self::AlreadyRegistered { class_id, member_id } => {
                write!(f, "Member {} already registered for class {}", member_id, class_id)
            }
            Self::ClassFull { class_id, capacity } => {
                write!(f, "Class {} is full (capacity {})", class_id, capacity)
            }
            Self::AlreadyWaitlisted { class_id, member_id } => {
                write!(f, "Member {} already on waiting list for class {}", member_id, class_id)
            }
            Self::NoRemainingEntries { subscription_id } => {
                write!(f, "No remaining entries on subscription {}", subscription_id)
            }
            Self::InvalidFreezeDuration { days, min, max } => {
                write!(f, "Freeze duration {} days is outside [{}, {}]", days, min, max)
            }
            Self::ConcurrentModification { subscription_id } => {
                write!(f, "Concurrent modification of subscription {}, please retry", subscription_id)
            }
        }
    }
}

impl std::error::Error for MembershipError {}

impl From<MembershipError> for crate::error::FitgateError {
    fn from(err: MembershipError) -> Self {
        match &err {
            MembershipError::MemberNotFound { .. }
            | MembershipError::PlanNotFound { .. }
            | MembershipError::SubscriptionNotFound { .. }
            | MembershipError::ClassNotFound { .. }
            | MembershipError::RegistrationNotFound { .. }
            | MembershipError::WaitlistEntryNotFound { .. }
            | MembershipError::PaymentNotFound { .. }
            | MembershipError::CheckinNotFound { .. } => {
                crate::error::FitgateError::NotFound(err.to_string())
            }

            MembershipError::AlreadySubscribed { .. }
            | MembershipError::AlreadyRegistered { .. }
            | MembershipError::ClassFull { .. }
            | MembershipError::AlreadyWaitlisted { .. } => {
                crate::error::FitgateError::Conflict(err.to_string())
            }

            MembershipError::NoRemainingEntries { .. } => {
                crate::error::FitgateError::QuotaExhausted(err.to_string())
            }

            MembershipError::InvalidFreezeDuration { .. } => {
                crate::error::FitgateError::InvalidArgument(err.to_string())
            }

            MembershipError::ConcurrentModification { .. } => {
                crate::error::FitgateError::Internal(err.to_string())
            }
        }
    }
}

impl MembershipError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Check if this error reports a missing entity.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MemberNotFound { .. }
                | Self::PlanNotFound { .. }
                | Self::SubscriptionNotFound { .. }
                | Self::ClassNotFound { .. }
                | Self::RegistrationNotFound { .. }
                | Self::WaitlistEntryNotFound { .. }
                | Self::PaymentNotFound { .. }
                | Self::CheckinNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, FitgateError};

    #[test]
    fn test_error_display() {
        let err = MembershipError::ClassFull { class_id: 7, capacity: 20 };
        assert_eq!(err.to_string(), "Class 7 is full (capacity 20)");

        let err = MembershipError::InvalidFreezeDuration { days: 400, min: 1, max: 365 };
        assert_eq!(err.to_string(), "Freeze duration 400 days is outside [1, 365]");
    }

    #[test]
    fn test_convert_to_fitgate_error() {
        let err = MembershipError::MemberNotFound { member_id: 42 };
        let top: FitgateError = err.into();
        assert_eq!(top.kind(), ErrorKind::NotFound);

        let err = MembershipError::AlreadyRegistered { class_id: 1, member_id: 2 };
        let top: FitgateError = err.into();
        assert_eq!(top.kind(), ErrorKind::Conflict);

        let err = MembershipError::NoRemainingEntries { subscription_id: 3 };
        let top: FitgateError = err.into();
        assert_eq!(top.kind(), ErrorKind::QuotaExhausted);

        let err = MembershipError::InvalidFreezeDuration { days: 0, min: 1, max: 365 };
        let top: FitgateError = err.into();
        assert_eq!(top.kind(), ErrorKind::InvalidArgument);

        let err = MembershipError::ConcurrentModification { subscription_id: 9 };
        let top: FitgateError = err.into();
        assert_eq!(top.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_classification() {
        assert!(MembershipError::ConcurrentModification { subscription_id: 1 }.is_retryable());
        assert!(!MembershipError::ClassFull { class_id: 1, capacity: 5 }.is_retryable());
        assert!(MembershipError::PlanNotFound { plan_id: "monthly".into() }.is_not_found());
        assert!(!MembershipError::AlreadySubscribed { member_id: 1 }.is_not_found());
    }
}
