//! Class scheduling and capacity-bounded registration.
//!
//! Registration is the second admission gate in the system: a class
//! admits at most `capacity` concurrently active registrations, and the
//! capacity check is atomic with the write (see
//! [`ClassStore::register_if_capacity`]).

use chrono::{DateTime, Utc};

use crate::error::Result;

use super::audit::{MembershipAuditEvent, MembershipAuditLogger, NoOpAuditLogger};
use super::error::MembershipError;
use super::storage::{
    ClassStore, GymClass, MemberDirectory, Registration, RegistrationStatus, RegistrationWrite,
};

/// Occupancy snapshot for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    /// Maximum concurrently active registrations.
    pub capacity: u32,
    /// Currently active registrations.
    pub active: u32,
    /// Canceled registrations on file.
    pub canceled: u32,
    /// Free slots remaining.
    pub available: u32,
}

/// Class and registration operations.
pub struct ClassManager<S: ClassStore, D: MemberDirectory, A: MembershipAuditLogger = NoOpAuditLogger>
{
    store: S,
    directory: D,
    audit: A,
}

impl<S: ClassStore, D: MemberDirectory> ClassManager<S, D> {
    /// Create a manager without audit logging.
    #[must_use]
    pub fn new(store: S, directory: D) -> Self {
        Self {
            store,
            directory,
            audit: NoOpAuditLogger,
        }
    }
}

impl<S: ClassStore, D: MemberDirectory, A: MembershipAuditLogger> ClassManager<S, D, A> {
    /// Create a manager with an audit logger.
    #[must_use]
    pub fn with_audit(store: S, directory: D, audit: A) -> Self {
        Self {
            store,
            directory,
            audit,
        }
    }

    async fn require_member(&self, member_id: u64) -> Result<()> {
        if self.directory.find_member(member_id).await?.is_none() {
            return Err(MembershipError::MemberNotFound { member_id }.into());
        }
        Ok(())
    }

    /// Put a new class on the schedule.
    pub async fn create_class(
        &self,
        title: impl Into<String>,
        instructor: impl Into<String>,
        start_time: DateTime<Utc>,
        duration_minutes: u32,
        capacity: u32,
    ) -> Result<GymClass> {
        self.store
            .insert_class(GymClass {
                id: 0,
                title: title.into(),
                instructor: instructor.into(),
                start_time,
                duration_minutes,
                capacity,
                created_at: Utc::now(),
            })
            .await
    }

    /// Get a class by ID.
    pub async fn get_class(&self, class_id: u64) -> Result<GymClass> {
        self.store
            .get_class(class_id)
            .await?
            .ok_or_else(|| MembershipError::ClassNotFound { class_id }.into())
    }

    /// List all classes, by start time.
    pub async fn list_classes(&self) -> Result<Vec<GymClass>> {
        self.store.list_classes().await
    }

    /// Register a member for a class.
    ///
    /// Fails with a conflict when the member already holds an active
    /// registration or when the class is full. A previously canceled
    /// registration for the pair is reactivated in place, preserving a
    /// single historical row per (class, member).
    pub async fn register(
        &self,
        class_id: u64,
        member_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let class = self.get_class(class_id).await?;
        self.require_member(member_id).await?;

        let (registration, reactivated) = match self
            .store
            .register_if_capacity(class_id, member_id, class.capacity, now)
            .await?
        {
            RegistrationWrite::Created(r) => (r, false),
            RegistrationWrite::Reactivated(r) => (r, true),
            RegistrationWrite::AlreadyActive(_) => {
                return Err(MembershipError::AlreadyRegistered { class_id, member_id }.into());
            }
            RegistrationWrite::Full => {
                return Err(MembershipError::ClassFull {
                    class_id,
                    capacity: class.capacity,
                }
                .into());
            }
        };

        self.audit
            .log(MembershipAuditEvent::ClassRegistered {
                member_id,
                class_id,
                reactivated,
            })
            .await;

        Ok(registration)
    }

    /// Cancel a member's registration.
    ///
    /// Idempotent: canceling an already canceled registration returns it
    /// unchanged. Does not promote anyone from the waitlist; promotion
    /// is the embedding application's call, after this returns.
    pub async fn cancel(
        &self,
        class_id: u64,
        member_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let mut registration = self
            .store
            .find_registration(class_id, member_id)
            .await?
            .ok_or(MembershipError::RegistrationNotFound { class_id, member_id })?;

        if !registration.is_active() {
            return Ok(registration);
        }

        registration.status = RegistrationStatus::Canceled;
        registration.canceled_at = Some(now);
        self.store.save_registration(&registration).await?;

        self.audit
            .log(MembershipAuditEvent::ClassRegistrationCanceled { member_id, class_id })
            .await;

        Ok(registration)
    }

    /// Active registrations for a class.
    pub async fn participants(&self, class_id: u64) -> Result<Vec<Registration>> {
        self.get_class(class_id).await?;
        self.store.list_active_registrations(class_id).await
    }

    /// Occupancy snapshot for a class.
    pub async fn class_stats(&self, class_id: u64) -> Result<ClassStats> {
        let class = self.get_class(class_id).await?;
        let active = self.store.count_active_registrations(class_id).await?;
        let canceled = self.store.count_canceled_registrations(class_id).await?;
        Ok(ClassStats {
            capacity: class.capacity,
            active,
            canceled,
            available: class.capacity.saturating_sub(active),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::membership::audit::test::CollectingAuditLogger;
    use crate::membership::roles::Role;
    use crate::membership::storage::test::InMemoryMembershipStore;
    use crate::membership::storage::{Member, MemberStatus};

    fn manager(
        store: InMemoryMembershipStore,
    ) -> ClassManager<InMemoryMembershipStore, InMemoryMembershipStore> {
        ClassManager::new(store.clone(), store)
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

    async fn seed_class(
        manager: &ClassManager<InMemoryMembershipStore, InMemoryMembershipStore>,
        capacity: u32,
    ) -> GymClass {
        manager
            .create_class("Spin", "Lee", Utc::now(), 45, capacity)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_capacity_one_fills_after_a_single_registration() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        seed_member(&store, 2);
        let manager = manager(store);
        let class = seed_class(&manager, 1).await;
        let now = Utc::now();

        let reg = manager.register(class.id, 1, now).await.unwrap();
        assert!(reg.is_active());

        let err = manager.register(class.id, 2, now).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("full"));

        let stats = manager.class_stats(class.id).await.unwrap();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.available, 0);
    }

    #[tokio::test]
    async fn test_double_registration_is_a_conflict() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let class = seed_class(&manager, 5).await;
        let now = Utc::now();

        manager.register(class.id, 1, now).await.unwrap();
        let err = manager.register(class.id, 1, now).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn test_missing_class_or_member_is_not_found() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let now = Utc::now();

        let err = manager.register(99, 1, now).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let class = seed_class(&manager, 5).await;
        let err = manager.register(class.id, 99, now).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_reregistration_reactivates_the_original_row() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let class = seed_class(&manager, 5).await;
        let now = Utc::now();

        let original = manager.register(class.id, 1, now).await.unwrap();
        let canceled = manager.cancel(class.id, 1, now).await.unwrap();
        assert_eq!(canceled.id, original.id);
        assert!(canceled.canceled_at.is_some());

        let later = now + chrono::Duration::hours(1);
        let revived = manager.register(class.id, 1, later).await.unwrap();
        assert_eq!(revived.id, original.id);
        assert!(revived.is_active());
        assert_eq!(revived.canceled_at, None);
        assert_eq!(revived.registered_at, later);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let manager = manager(store);
        let class = seed_class(&manager, 5).await;
        let now = Utc::now();

        manager.register(class.id, 1, now).await.unwrap();
        let first = manager.cancel(class.id, 1, now).await.unwrap();
        let second = manager
            .cancel(class.id, 1, now + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(first, second);

        let err = manager.cancel(class.id, 2, now).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_participants_and_stats() {
        let store = InMemoryMembershipStore::new();
        for id in 1..=3 {
            seed_member(&store, id);
        }
        let manager = manager(store);
        let class = seed_class(&manager, 10).await;
        let now = Utc::now();

        for id in 1..=3 {
            manager.register(class.id, id, now).await.unwrap();
        }
        manager.cancel(class.id, 2, now).await.unwrap();

        let participants = manager.participants(class.id).await.unwrap();
        assert_eq!(
            participants.iter().map(|r| r.member_id).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let stats = manager.class_stats(class.id).await.unwrap();
        assert_eq!(stats.active, 2);
        assert_eq!(stats.canceled, 1);
        assert_eq!(stats.available, 8);
    }

    #[tokio::test]
    async fn test_registration_flow_is_audited() {
        let store = InMemoryMembershipStore::new();
        seed_member(&store, 1);
        let audit = CollectingAuditLogger::new();
        let manager = ClassManager::with_audit(store.clone(), store, audit.clone());
        let class = seed_class_audited(&manager).await;
        let now = Utc::now();

        manager.register(class.id, 1, now).await.unwrap();
        manager.cancel(class.id, 1, now).await.unwrap();
        manager.register(class.id, 1, now).await.unwrap();

        let events = audit.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            MembershipAuditEvent::ClassRegistered { reactivated: false, .. }
        ));
        assert!(matches!(
            events[2],
            MembershipAuditEvent::ClassRegistered { reactivated: true, .. }
        ));
    }

    async fn seed_class_audited(
        manager: &ClassManager<
            InMemoryMembershipStore,
            InMemoryMembershipStore,
            CollectingAuditLogger,
        >,
    ) -> GymClass {
        manager
            .create_class("Spin", "Lee", Utc::now(), 45, 5)
            .await
            .unwrap()
    }
}
