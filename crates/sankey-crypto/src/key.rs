//! # License Master Key
//!
//! A 256-bit symmetric key used both as the AES-256 key and as the
//! HMAC-SHA-256 key (see the codec module for the key-reuse note).
//!
//! ## Security Invariant
//!
//! - Key bytes are zeroized on drop.
//! - `Debug` never prints key material.
//! - No `Serialize` impl; the only export path is [`LicenseKey::to_base64`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CodecError;

/// Length of a license master key in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit license master key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LicenseKey([u8; KEY_LEN]);

impl LicenseKey {
    /// Create a key from raw bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidKeyLength`] unless `bytes` is exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Decode a Base64 master key, the form in which keys are distributed.
    pub fn from_base64(encoded: &str) -> Result<Self, CodecError> {
        let mut bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| CodecError::InvalidKeyEncoding)?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Encode as Base64 for distribution.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for LicenseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LicenseKey(<redacted>)")
    }
}
