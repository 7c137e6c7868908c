//! # sankey-crypto — Authenticated License Codec
//!
//! Produces and consumes the encrypted license string delivered to EA
//! terminals:
//!
//! - **Key** (`key.rs`): 256-bit master key, zeroized on drop.
//! - **Payload** (`payload.rs`): versioned license document with
//!   forward-compatible extra fields.
//! - **Codec** (`codec.rs`): AES-256-CBC + account-bound HMAC-SHA-256,
//!   Base64 wire format.
//! - **Verify** (`verify.rs`): terminal-side open + expiry check, typed
//!   accessors, and the terminal status codes.
//!
//! ## Crate Policy
//!
//! - Depends only on `sankey-core` internally.
//! - No mocking of cryptographic operations in tests.
//! - Keys, plaintext, and license strings are never logged.

pub mod codec;
pub mod error;
pub mod key;
pub mod payload;
pub mod verify;

pub use codec::{decrypt, encrypt, EncryptedLicense, LicenseCodec};
pub use error::{CodecError, VerifyError};
pub use key::LicenseKey;
pub use payload::{LicensePayload, CURRENT_VERSION, RESERVED_FIELDS};
pub use verify::{LicenseStatus, LicenseVerifier, VerifiedLicense};
