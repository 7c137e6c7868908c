//! # Canonical Serialization
//!
//! `CanonicalBytes` is the byte encoding sealed inside a license. Issuers
//! in different runtimes must produce the same plaintext for the same
//! payload, so serialization goes through RFC 8785 (JCS): sorted keys,
//! compact separators, no trailing whitespace.
//!
//! Unlike digest canonicalization, floats are permitted. License payloads
//! carry issuer-defined extra fields (lot limits, risk multipliers) and
//! those must round-trip as the same JSON number. JCS uses the shortest
//! ECMAScript form, so `1.0` is sealed as `1`.

use serde::Serialize;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// The inner buffer is private; the only constructor is [`CanonicalBytes::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    #[test]
    fn test_sorted_compact_output() {
        let data = serde_json::json!({"version": 1, "eaName": "MyEA", "accountId": "1234"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"accountId":"1234","eaName":"MyEA","version":1}"#
        );
    }

    #[test]
    fn test_nested_objects_sorted() {
        let data = serde_json::json!({"z": {"b": 2, "a": 1}, "a": [3, 2, 1]});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"a":[3,2,1],"z":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn test_floats_permitted() {
        let data = serde_json::json!({"maxLots": 0.5});
        let cb = CanonicalBytes::new(&data).unwrap();
        let back: Value = serde_json::from_slice(cb.as_bytes()).unwrap();
        assert_eq!(back["maxLots"], serde_json::json!(0.5));
    }

    proptest! {
        /// Same input always produces same bytes, regardless of insertion order.
        #[test]
        fn canonical_bytes_order_independent(
            entries in prop::collection::btree_map("[a-zA-Z]{1,8}", any::<i64>(), 0..8)
        ) {
            let forward: serde_json::Map<String, Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            let reverse: serde_json::Map<String, Value> = entries
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            let a = CanonicalBytes::new(&Value::Object(forward)).unwrap();
            let b = CanonicalBytes::new(&Value::Object(reverse)).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }
    }
}
