//! Ordered waitlists for full classes.
//!
//! Positions are assigned at join time as `current count + 1` and never
//! renumbered: a departure leaves a permanent gap, so a position is a
//! historical rank, not a live index. Promotion into a freed class slot
//! is the embedding application's call, typically using
//! [`next_in_line`](WaitlistManager::next_in_line) after a cancellation.

use chrono::{DateTime, Utc};

use crate::error::Result;

use super::audit::{MembershipAuditEvent, MembershipAuditLogger, NoOpAuditLogger};
use super::error::MembershipError;
use super::storage::{ClassStore, MemberDirectory, WaitlistEntry, WaitlistStore, WaitlistWrite};

/// Waitlist operations.
pub struct WaitlistManager<
    S: WaitlistStore + ClassStore,
    D: MemberDirectory,
    A: MembershipAuditLogger = NoOpAuditLogger,
> {
    store: S,
    directory: D,
    audit: A,
}

impl<S: WaitlistStore + ClassStore, D: MemberDirectory> WaitlistManager<S, D> {
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

impl<S: WaitlistStore + ClassStore, D: MemberDirectory, A: MembershipAuditLogger>
    WaitlistManager<S, D, A>
{
    /// Create a manager with an audit logger.
    #[must_use]
    pub fn with_audit(store: S, directory: D, audit: A) -> Self {
        Self {
            store,
            directory,
            audit,
        }
    }

    async fn require_class(&self, class_id: u64) -> Result<()> {
        if self.store.get_class(class_id).await?.is_none() {
            return Err(MembershipError::ClassNotFound { class_id }.into());
        }
        Ok(())
    }

    async fn require_member(&self, member_id: u64) -> Result<()> {
        if self.directory.find_member(member_id).await?.is_none() {
            return Err(MembershipError::MemberNotFound { member_id }.into());
        }
        Ok(())
    }

    /// Join a class waitlist.
    ///
    /// The assigned position is the entry count at join time plus one;
    /// the count-and-append is atomic inside the store. There is no cap
    /// on waitlist size. Fails with a conflict if the member is already
    /// queued.
    pub async fn join(
        &self,
        class_id: u64,
        member_id: u64,
        now: DateTime<Utc>,
    ) -> Result<WaitlistEntry> {
        self.require_class(class_id).await?;
        self.require_member(member_id).await?;

        let entry = match self
            .store
            .append_waitlist_entry(class_id, member_id, now)
            .await?
        {
            WaitlistWrite::Added(entry) => entry,
            WaitlistWrite::Duplicate(_) => {
                return Err(MembershipError::AlreadyWaitlisted { class_id, member_id }.into());
            }
        };

        self.audit
            .log(MembershipAuditEvent::WaitlistJoined {
                member_id,
                class_id,
                position: entry.position,
            })
            .await;

        Ok(entry)
    }

    /// Leave a class waitlist.
    ///
    /// Remaining entries keep their positions; the gap is permanent.
    pub async fn leave(&self, class_id: u64, member_id: u64) -> Result<()> {
        if !self.store.remove_waitlist_entry(class_id, member_id).await? {
            return Err(MembershipError::WaitlistEntryNotFound { class_id, member_id }.into());
        }

        self.audit
            .log(MembershipAuditEvent::WaitlistLeft { member_id, class_id })
            .await;

        Ok(())
    }

    /// The class waitlist in position order.
    pub async fn entries(&self, class_id: u64) -> Result<Vec<WaitlistEntry>> {
        self.require_class(class_id).await?;
        self.store.list_waitlist(class_id).await
    }

    /// The entry that has waited longest, if any. Feed this to the
    /// promotion flow after a registration frees a slot.
    pub async fn next_in_line(&self, class_id: u64) -> Result<Option<WaitlistEntry>> {
        let entries = self.entries(class_id).await?;
        Ok(entries.into_iter().next())
    }
}
