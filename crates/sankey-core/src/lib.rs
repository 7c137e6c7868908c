//! # sankey-core — Foundational Types for the EA License Core
//!
//! Leaf crate of the workspace. Defines the primitives shared by the
//! license codec and the application workflow.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for record keys.** `UserId`, `ApplicationKey`,
//!    `HistoryKey` — validated constructors, no bare strings.
//!
//! 2. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision and
//!    exposes both the ISO-8601 and epoch-seconds views used by the store.
//!
//! 3. **One error taxonomy.** `ErrorKind` is the closed set every component
//!    error maps onto; callers match it exhaustively.
//!
//! 4. **Explicit configuration.** `LifecycleConfig` is built once and passed
//!    by value.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sankey-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod config;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use config::LifecycleConfig;
pub use error::{CanonicalizationError, ErrorKind, ValidationError};
pub use identity::{ApplicationKey, HistoryKey, UserId};
pub use temporal::Timestamp;
