//! # sankey-state — Application Lifecycle
//!
//! - **Status** (`status.rs`): the eight application statuses.
//! - **Actor** (`actor.rs`): owner / elevated / system principals.
//! - **Record** (`record.rs`): the persisted application and its
//!   compare-and-swap precondition.
//! - **Retention** (`retention.rs`): purge deadlines for terminal records.
//! - **Machine** (`machine.rs`): transition table, guards, and effects as a
//!   pure function.
//! - **History** (`history.rs`): append-only audit ledger.
//! - **Store** (`store.rs`): persistence traits and the in-memory store.
//! - **Workflow** (`workflow.rs`): load, transition, conditional write,
//!   audit, with retry on lost updates.
//!
//! ## Crate Policy
//!
//! - The machine performs no I/O and never reads the clock.
//! - Records change only through [`ApplicationStateMachine`].
//! - Only `ConcurrentModification` is retried.

pub mod actor;
pub mod history;
pub mod machine;
pub mod record;
pub mod retention;
pub mod status;
pub mod store;
pub mod workflow;

pub use actor::Actor;
pub use history::{HistoryAction, HistoryLedger, HistoryRecord, LedgerEntry};
pub use machine::{
    ApplicationStateMachine, IssuedLicense, Transition, TransitionError, TransitionRequest,
};
pub use record::{ApplicationRecord, ExpectedVersion};
pub use retention::{RetentionError, RetentionPolicy};
pub use status::ApplicationStatus;
pub use store::{ApplicationStore, HistoryStore, MemoryStore, PurgeReport, StoreError};
pub use workflow::{Applied, LicenseWorkflow, WorkflowError};
