//! Key-value payload and its CBOR wire form.
//!
//! A [`Payload`] is what the platform messaging transport actually carries: a
//! flat map from text keys to scalar values. Keys are kept ordered so the
//! encoded form is deterministic, which keeps simulated transports and tests
//! reproducible.

use std::collections::{BTreeMap, btree_map};

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::{
    Value,
    errors::{ProtocolError, Result},
    keys,
};

/// Flat key-value message exchanged with the companion device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    entries: BTreeMap<String, Value>,
}

impl Payload {
    /// Largest encoded payload accepted by [`Payload::decode`].
    ///
    /// Matches the per-message budget of device pairing transports.
    pub const MAX_ENCODED_SIZE: usize = 64 * 1024;

    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Boolean at `key`. `None` if absent or not a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Number at `key` as `f64`. `None` if absent or not numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Integer at `key`. `None` if absent or not integral.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Text at `key`. `None` if absent or not text.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the payload has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Command acknowledgment carried by a reply.
    ///
    /// `None` when the reply has no boolean `success` key.
    pub fn success(&self) -> Option<bool> {
        self.get_bool(keys::SUCCESS)
    }

    /// Acknowledgment reply: `{ "success": <accepted> }`.
    pub fn acknowledgment(accepted: bool) -> Self {
        Self::new().with(keys::SUCCESS, accepted)
    }

    /// Receipt returned for unsolicited pushes: `{ "received": true }`.
    pub fn receipt() -> Self {
        Self::new().with(keys::RECEIVED, true)
    }

    /// Encode as a CBOR map.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();
        ciborium::ser::into_writer(self, &mut writer)
            .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode a CBOR map.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if `bytes` exceeds
    ///   [`Payload::MAX_ENCODED_SIZE`]
    /// - `ProtocolError::CborDecode` if the bytes are not a map of scalars
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > Self::MAX_ENCODED_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: Self::MAX_ENCODED_SIZE,
            });
        }

        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
    }
}

impl<'a> IntoIterator for &'a Payload {
    type IntoIter = btree_map::Iter<'a, String, Value>;
    type Item = (&'a String, &'a Value);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn receipt_is_received_true() {
        let receipt = Payload::receipt();
        assert_eq!(receipt.len(), 1);
        assert_eq!(receipt.get_bool(keys::RECEIVED), Some(true));
    }

    #[test]
    fn success_requires_bool() {
        assert_eq!(Payload::acknowledgment(true).success(), Some(true));
        assert_eq!(Payload::acknowledgment(false).success(), Some(false));
        assert_eq!(Payload::new().with(keys::SUCCESS, 1i64).success(), None);
        assert_eq!(Payload::new().success(), None);
    }

    #[test]
    fn decode_preserves_value_types() {
        let payload = Payload::new()
            .with(keys::HEART_RATE, 142.5)
            .with(keys::STEPS, 5000i64)
            .with(keys::SUCCESS, true)
            .with(keys::WORKOUT_TYPE, "Running");

        let bytes = payload.to_bytes().expect("encode");
        let decoded = Payload::decode(&bytes).expect("decode");

        assert_eq!(decoded.get(keys::HEART_RATE), Some(&Value::Float(142.5)));
        assert_eq!(decoded.get(keys::STEPS), Some(&Value::Int(5000)));
        assert_eq!(decoded.get(keys::SUCCESS), Some(&Value::Bool(true)));
        assert_eq!(decoded.get_str(keys::WORKOUT_TYPE), Some("Running"));
    }

    #[test]
    fn decode_rejects_non_map() {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&vec![1u8, 2, 3], &mut bytes).expect("encode array");

        assert!(matches!(Payload::decode(&bytes), Err(ProtocolError::CborDecode(_))));
    }

    #[test]
    fn decode_rejects_oversized_input() {
        let bytes = vec![0u8; Payload::MAX_ENCODED_SIZE + 1];

        assert!(matches!(
            Payload::decode(&bytes),
            Err(ProtocolError::PayloadTooLarge { size, max })
                if size == Payload::MAX_ENCODED_SIZE + 1 && max == Payload::MAX_ENCODED_SIZE
        ));
    }
}
