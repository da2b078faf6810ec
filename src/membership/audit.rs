//! Audit logging for membership operations.
//!
//! Provides a trait-based audit logging system for tracking membership
//! events. This is useful for compliance, debugging, and dispute handling
//! at the front desk.

use std::fmt;

/// Audit event types for membership operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipAuditEvent {
    /// Subscription created.
    SubscriptionCreated {
        member_id: u64,
        subscription_id: u64,
        plan_id: String,
    },
    /// Subscription frozen.
    SubscriptionFrozen {
        member_id: u64,
        subscription_id: u64,
        days: u32,
    },
    /// Subscription unfrozen.
    SubscriptionUnfrozen {
        member_id: u64,
        subscription_id: u64,
    },
    /// Subscription canceled.
    SubscriptionCanceled {
        member_id: u64,
        subscription_id: u64,
    },
    /// Member admitted through the front gate.
    CheckinApproved {
        member_id: u64,
        checkin_id: u64,
    },
    /// Member turned away at the front gate.
    CheckinDenied {
        member_id: u64,
        checkin_id: u64,
        reason: String,
    },
    /// Correction filed against an earlier check-in record.
    CheckinCorrected {
        member_id: u64,
        original_id: u64,
        correction_id: u64,
    },
    /// Member registered for a class.
    ClassRegistered {
        member_id: u64,
        class_id: u64,
        reactivated: bool,
    },
    /// Class registration canceled.
    ClassRegistrationCanceled {
        member_id: u64,
        class_id: u64,
    },
    /// Member joined a class waitlist.
    WaitlistJoined {
        member_id: u64,
        class_id: u64,
        position: u32,
    },
    /// Member left a class waitlist.
    WaitlistLeft {
        member_id: u64,
        class_id: u64,
    },
    /// Payment status changed.
    PaymentStatusChanged {
        payment_id: u64,
        subscription_id: u64,
        status: String,
    },
}

impl fmt::Display for MembershipAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriptionCreated { member_id, subscription_id, plan_id } => {
                write!(f, "Subscription created: member={}, sub={}, plan={}", member_id, subscription_id, plan_id)
            }
            Self::SubscriptionFrozen { member_id, subscription_id, days } => {
                write!(f, "Subscription frozen: member={}, sub={}, days={}", member_id, subscription_id, days)
            }
            Self::SubscriptionUnfrozen { member_id, subscription_id } => {
                write!(f, "Subscription unfrozen: member={}, sub={}", member_id, subscription_id)
            }
            Self::SubscriptionCanceled { member_id, subscription_id } => {
                write!(f, "Subscription canceled: member={}, sub={}", member_id, subscription_id)
            }
            Self::CheckinApproved { member_id, checkin_id } => {
                write!(f, "Check-in approved: member={}, record={}", member_id, checkin_id)
            }
            Self::CheckinDenied { member_id, checkin_id, reason } => {
                write!(f, "Check-in denied: member={}, record={}, reason={}", member_id, checkin_id, reason)
            }
            Self::CheckinCorrected { member_id, original_id, correction_id } => {
                write!(f, "Check-in corrected: member={}, original={}, correction={}", member_id, original_id, correction_id)
            }
            Self::ClassRegistered { member_id, class_id, reactivated } => {
                write!(f, "Class registered: member={}, class={}, reactivated={}", member_id, class_id, reactivated)
            }
            Self::ClassRegistrationCanceled { member_id, class_id } => {
                write!(f, "Class registration canceled: member={}, class={}", member_id, class_id)
            }
            Self::WaitlistJoined { member_id, class_id, position } => {
                write!(f, "Waitlist joined: member={}, class={}, position={}", member_id, class_id, position)
            }
            Self::WaitlistLeft { member_id, class_id } => {
                write!(f, "Waitlist left: member={}, class={}", member_id, class_id)
            }
            Self::PaymentStatusChanged { payment_id, subscription_id, status } => {
                write!(f, "Payment status changed: payment={}, sub={}, status={}", payment_id, subscription_id, status)
            }
        }
    }
}

/// Trait for audit logging backends.
///
/// Implement this trait to integrate with your logging system (e.g.,
/// database, external service, file-based logging).
#[allow(async_fn_in_trait)]
pub trait MembershipAuditLogger: Send + Sync {
    /// Log a membership audit event.
    ///
    /// Implementations should handle failures gracefully (e.g., log to
    /// stderr) to avoid disrupting front desk operations.
    async fn log(&self, event: MembershipAuditEvent);
}

/// No-op audit logger that does nothing.
///
/// Use this when audit logging is not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

impl MembershipAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: MembershipAuditEvent) {
        // No-op
    }
}

/// Tracing-based audit logger.
///
/// Logs audit events using the `tracing` crate at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl MembershipAuditLogger for TracingAuditLogger {
    async fn log(&self, event: MembershipAuditEvent) {
        tracing::info!(
            target: "membership::audit",
            event_type = %event_kind(&event),
            "{}", event
        );
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &MembershipAuditEvent) -> &'static str {
    match event {
        MembershipAuditEvent::SubscriptionCreated { .. } => "subscription_created",
        MembershipAuditEvent::SubscriptionFrozen { .. } => "subscription_frozen",
        MembershipAuditEvent::SubscriptionUnfrozen { .. } => "subscription_unfrozen",
        MembershipAuditEvent::SubscriptionCanceled { .. } => "subscription_canceled",
        MembershipAuditEvent::CheckinApproved { .. } => "checkin_approved",
        MembershipAuditEvent::CheckinDenied { .. } => "checkin_denied",
        MembershipAuditEvent::CheckinCorrected { .. } => "checkin_corrected",
        MembershipAuditEvent::ClassRegistered { .. } => "class_registered",
        MembershipAuditEvent::ClassRegistrationCanceled { .. } => "class_registration_canceled",
        MembershipAuditEvent::WaitlistJoined { .. } => "waitlist_joined",
        MembershipAuditEvent::WaitlistLeft { .. } => "waitlist_left",
        MembershipAuditEvent::PaymentStatusChanged { .. } => "payment_status_changed",
    }
}

/// Test audit logger that captures events.
#[cfg(any(test, feature = "test-membership"))]
pub mod test {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    /// Audit logger that collects events in memory (for testing).
    #[derive(Default, Clone)]
    pub struct CollectingAuditLogger {
        events: Arc<Mutex<Vec<MembershipAuditEvent>>>,
    }

    impl CollectingAuditLogger {
        /// Create a new collecting logger.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of the events logged so far.
        pub fn events(&self) -> Vec<MembershipAuditEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl MembershipAuditLogger for CollectingAuditLogger {
        async fn log(&self, event: MembershipAuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::CollectingAuditLogger;
    use super::*;

    #[tokio::test]
    async fn test_noop_logger() {
        let logger = NoOpAuditLogger;
        logger
            .log(MembershipAuditEvent::CheckinApproved {
                member_id: 1,
                checkin_id: 7,
            })
            .await;
        // Just verifies it doesn't panic
    }

    #[tokio::test]
    async fn test_collecting_logger() {
        let logger = CollectingAuditLogger::new();

        logger
            .log(MembershipAuditEvent::SubscriptionCreated {
                member_id: 1,
                subscription_id: 2,
                plan_id: "monthly".to_string(),
            })
            .await;

        logger
            .log(MembershipAuditEvent::CheckinDenied {
                member_id: 1,
                checkin_id: 3,
                reason: "Subscription expired".to_string(),
            })
            .await;

        let events = logger.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MembershipAuditEvent::SubscriptionCreated { .. }));
        assert!(matches!(events[1], MembershipAuditEvent::CheckinDenied { .. }));
    }

    #[test]
    fn test_event_display() {
        let event = MembershipAuditEvent::WaitlistJoined {
            member_id: 42,
            class_id: 7,
            position: 3,
        };
        let display = format!("{}", event);
        assert!(display.contains("42"));
        assert!(display.contains("position=3"));
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(
            event_kind(&MembershipAuditEvent::CheckinApproved {
                member_id: 0,
                checkin_id: 0,
            }),
            "checkin_approved"
        );
        assert_eq!(
            event_kind(&MembershipAuditEvent::PaymentStatusChanged {
                payment_id: 0,
                subscription_id: 0,
                status: String::new(),
            }),
            "payment_status_changed"
        );
    }
}
