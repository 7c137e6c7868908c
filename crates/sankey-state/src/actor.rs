//! # Actors
//!
//! Who is asking for a transition, resolved once at the request boundary
//! from the caller's claims. The state machine only ever sees this value.

use sankey_core::UserId;
use serde::{Deserialize, Serialize};

/// Identifier recorded as `changedBy` for system-initiated transitions.
pub const SYSTEM_ACTOR: &str = "system";

/// The principal requesting a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "camelCase")]
pub enum Actor {
    /// A regular applicant; may act only on applications they own.
    Owner(UserId),
    /// An operator holding the admin role; may act on any application.
    Elevated(UserId),
    /// The platform itself (schedulers, issuance workers, expiry sweeps).
    System,
}

impl Actor {
    /// Whether this actor passes the ownership guard for `owner`.
    pub fn may_act_for(&self, owner: &UserId) -> bool {
        match self {
            Self::Elevated(_) => true,
            Self::Owner(id) => id == owner,
            Self::System => false,
        }
    }

    /// Whether this actor may drive a system-initiated transition.
    pub fn may_act_as_system(&self) -> bool {
        matches!(self, Self::System | Self::Elevated(_))
    }

    /// Whether this actor holds the elevated role.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Elevated(_))
    }

    /// Identifier recorded in the history ledger.
    pub fn changed_by(&self) -> &str {
        match self {
            Self::Owner(id) | Self::Elevated(id) => id.as_str(),
            Self::System => SYSTEM_ACTOR,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner(id) => write!(f, "owner:{id}"),
            Self::Elevated(id) => write!(f, "admin:{id}"),
            Self::System => f.write_str(SYSTEM_ACTOR),
        }
    }
}
