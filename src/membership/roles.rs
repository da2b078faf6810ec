//! Staff and member roles.
//!
//! The engine itself never rejects a call based on who made it;
//! enforcement belongs to the embedding application's authorization
//! layer. This module is the capability table that layer consults:
//! role-specific behavior is an explicit match, not a class hierarchy.

use serde::{Deserialize, Serialize};

use super::storage::MemberStatus;

/// Role held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A regular gym member.
    Member,
    /// A class instructor.
    Trainer,
    /// Front desk staff.
    Reception,
    /// Full administrative access.
    Admin,
}

impl Role {
    /// Parse from a stored role string. Unknown values map to member,
    /// the least-privileged role.
    #[must_use]
    pub fn parse(role: &str) -> Self {
        match role {
            "trainer" => Self::Trainer,
            "reception" => Self::Reception,
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Trainer => "trainer",
            Self::Reception => "reception",
            Self::Admin => "admin",
        }
    }

    /// Whether this role belongs to staff rather than a customer.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        !matches!(self, Self::Member)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An action a caller may or may not perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Check oneself in at the front gate.
    SelfCheckin,
    /// Record check-ins for other members at the front desk.
    RecordCheckins,
    /// Register new members and manage their subscriptions.
    ManageMembers,
    /// Create classes and edit schedules.
    ManageClasses,
    /// Manage training sessions and workout plans.
    ManageSessions,
    /// Record and settle payments.
    ManageFinances,
    /// Edit the plan catalog.
    ManagePlans,
    /// File a correction against a check-in record.
    CorrectCheckins,
}

/// Whether a role grants a capability, ignoring account status.
#[must_use]
pub fn role_allows(role: Role, capability: Capability) -> bool {
    use Capability::*;
    match role {
        // Admins hold every capability.
        Role::Admin => true,
        Role::Reception => matches!(
            capability,
            SelfCheckin | RecordCheckins | ManageMembers | CorrectCheckins
        ),
        Role::Trainer => matches!(capability, SelfCheckin | ManageClasses | ManageSessions),
        Role::Member => matches!(capability, SelfCheckin),
    }
}

/// Whether an account may perform an action right now.
///
/// A suspended or deactivated account holds no capabilities at all,
/// whatever its role.
#[must_use]
pub fn is_permitted(role: Role, status: MemberStatus, capability: Capability) -> bool {
    status.is_active() && role_allows(role, capability)
}
