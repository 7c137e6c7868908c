//! # Application Status
//!
//! ```text
//! Pending ──▶ Approve ──▶ AwaitingNotification ──▶ Active ──▶ Revoked  (terminal)
//!    │                            │                   │
//!    └──▶ Rejected (terminal)     └──▶ Cancelled      └──▶ Expired  (terminal)
//!                                      (terminal)
//! ```
//!
//! The graph is acyclic: no status is ever re-entered once left.

use serde::{Deserialize, Serialize};

/// The lifecycle status of a license application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// Submitted, awaiting an approval decision.
    Pending,
    /// Approved, issuance not yet scheduled.
    Approve,
    /// Issuance scheduled; the owner may still cancel within the window.
    AwaitingNotification,
    /// License issued and in force.
    Active,
    /// Application declined (terminal).
    Rejected,
    /// Owner withdrew before issuance (terminal).
    Cancelled,
    /// Issued license withdrawn (terminal).
    Revoked,
    /// Issued license ran out (terminal).
    Expired,
}

impl ApplicationStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ApplicationStatus; 8] = [
        Self::Pending,
        Self::Approve,
        Self::AwaitingNotification,
        Self::Active,
        Self::Rejected,
        Self::Cancelled,
        Self::Revoked,
        Self::Expired,
    ];

    /// Whether this status is terminal (no outgoing transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Cancelled | Self::Revoked | Self::Expired
        )
    }

    /// Stable name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approve => "Approve",
            Self::AwaitingNotification => "AwaitingNotification",
            Self::Active => "Active",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::Revoked => "Revoked",
            Self::Expired => "Expired",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
