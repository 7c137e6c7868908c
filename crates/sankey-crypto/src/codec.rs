//! # License Codec
//!
//! Seals a [`LicensePayload`] into an [`EncryptedLicense`] and opens it again.
//!
//! ## Wire Format
//!
//! ```text
//! base64( IV[16] || TAG[32] || AES-256-CBC(PKCS#7, key, IV, canonical JSON) )
//!
//! TAG = HMAC-SHA-256(key, IV || ciphertext || account context)
//! ```
//!
//! The account context (the trading account id) is folded into the tag, so
//! a license only opens for the account it was sealed for. The tag is
//! checked in constant time before any decryption happens; every failure
//! up to and including the tag check is reported as
//! [`CodecError::TamperDetected`].
//!
//! ## Key Reuse
//!
//! The same 256 raw key bytes key both AES and HMAC. Deployed terminal
//! decoders verify exactly this construction, so it is kept for wire
//! compatibility. A separate MAC key (or an AEAD) would need a new payload
//! version and a decoder rollout.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sankey_core::CanonicalBytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::CodecError;
use crate::key::LicenseKey;
use crate::payload::{check_version, LicensePayload};

/// Length of the CBC initialization vector.
pub const IV_LEN: usize = 16;

/// Length of the HMAC-SHA-256 tag.
pub const TAG_LEN: usize = 32;

const HEADER_LEN: usize = IV_LEN + TAG_LEN;

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// A sealed license: the Base64 string stored on the application record
/// and delivered to the EA terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedLicense(String);

impl EncryptedLicense {
    /// Wrap a license string received from storage or a terminal.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Access the Base64 string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the Base64 string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EncryptedLicense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seals and opens licenses under one master key.
#[derive(Debug, Clone)]
pub struct LicenseCodec {
    key: LicenseKey,
}

impl LicenseCodec {
    /// Create a codec for `key`.
    pub fn new(key: LicenseKey) -> Self {
        Self { key }
    }

    /// Create a codec from raw key bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidKeyLength`] unless `key` is exactly 32 bytes.
    pub fn from_slice(key: &[u8]) -> Result<Self, CodecError> {
        Ok(Self::new(LicenseKey::from_bytes(key)?))
    }

    /// Seal `payload` for `account_context` under a fresh random IV.
    ///
    /// The payload is not validated: any serializable value is sealed.
    /// Validation happens on [`open`](Self::open).
    pub fn seal<T: Serialize>(
        &self,
        payload: &T,
        account_context: &str,
    ) -> Result<EncryptedLicense, CodecError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        self.seal_with_iv(payload, account_context, iv)
    }

    pub(crate) fn seal_with_iv<T: Serialize>(
        &self,
        payload: &T,
        account_context: &str,
        iv: [u8; IV_LEN],
    ) -> Result<EncryptedLicense, CodecError> {
        let plaintext = CanonicalBytes::new(payload)
            .map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
        let key = self.key.as_bytes();

        let ciphertext = Aes256CbcEnc::new_from_slices(key, &iv)
            .map_err(|_| CodecError::InvalidKeyLength(key.len()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        let tag = compute_tag(key, &iv, &ciphertext, account_context)?;

        let mut wire = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        wire.extend_from_slice(&iv);
        wire.extend_from_slice(&tag);
        wire.extend_from_slice(&ciphertext);
        Ok(EncryptedLicense(BASE64.encode(wire)))
    }

    /// Open a license sealed for `account_context`.
    ///
    /// # Errors
    ///
    /// - [`CodecError::TamperDetected`] — not Base64, too short, or the tag
    ///   does not match (wrong key, wrong account, corrupted bytes).
    /// - [`CodecError::MalformedPayload`] — authenticated plaintext is not a
    ///   license payload.
    /// - [`CodecError::InvalidVersion`] — `version` missing, non-positive, or
    ///   not an integer.
    pub fn open(&self, license: &str, account_context: &str) -> Result<LicensePayload, CodecError> {
        let compact: String = license.chars().filter(|c| !c.is_whitespace()).collect();
        let raw = BASE64
            .decode(compact)
            .map_err(|_| CodecError::TamperDetected)?;
        if raw.len() <= HEADER_LEN {
            return Err(CodecError::TamperDetected);
        }

        let (iv, rest) = raw.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        let key = self.key.as_bytes();

        let expected = compute_tag(key, iv, ciphertext, account_context)?;
        if !bool::from(expected.as_slice().ct_eq(tag)) {
            tracing::debug!(len = raw.len(), "license tag mismatch");
            return Err(CodecError::TamperDetected);
        }

        let mut plaintext = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|_| CodecError::InvalidKeyLength(key.len()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CodecError::InvalidPadding)?;
        let parsed = serde_json::from_slice::<Value>(&plaintext);
        plaintext.zeroize();

        let doc = match parsed {
            Ok(Value::Object(doc)) => doc,
            Ok(_) => {
                return Err(CodecError::MalformedPayload(
                    "payload is not a JSON object".to_string(),
                ))
            }
            Err(e) => return Err(CodecError::MalformedPayload(e.to_string())),
        };
        check_version(&doc).map_err(CodecError::InvalidVersion)?;

        serde_json::from_value(Value::Object(doc))
            .map_err(|e| CodecError::MalformedPayload(e.to_string()))
    }
}

/// Seal `payload` under raw key bytes. See [`LicenseCodec::seal`].
pub fn encrypt<T: Serialize>(
    key: &[u8],
    payload: &T,
    account_context: &str,
) -> Result<EncryptedLicense, CodecError> {
    LicenseCodec::from_slice(key)?.seal(payload, account_context)
}

/// Open `license` under raw key bytes. See [`LicenseCodec::open`].
pub fn decrypt(key: &[u8], license: &str, account_context: &str) -> Result<LicensePayload, CodecError> {
    LicenseCodec::from_slice(key)?.open(license, account_context)
}

fn compute_tag(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    account_context: &str,
) -> Result<[u8; TAG_LEN], CodecError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| CodecError::InvalidKeyLength(key.len()))?;
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(account_context.as_bytes());
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

// ─── Tests ───────────────────────────────────────────────────────────
