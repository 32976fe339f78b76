//! Correlation identifiers for watched transactions.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Size of a correlation id in bytes.
pub const CORRELATION_ID_LEN: usize = 16;

/// Opaque identifier embedded in a transaction payload.
///
/// Lets the watcher look up a transaction's packing location on every node
/// without knowing the transaction id in advance. 16 random bytes, displayed
/// and serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationId([u8; CORRELATION_ID_LEN]);

impl CorrelationId {
    /// Create a new random CorrelationId.
    pub fn random() -> Self {
        let mut bytes = [0u8; CORRELATION_ID_LEN];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Create a CorrelationId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == CORRELATION_ID_LEN {
            let mut arr = [0u8; CORRELATION_ID_LEN];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Get the raw bytes of this CorrelationId.
    pub fn as_bytes(&self) -> &[u8; CORRELATION_ID_LEN] {
        &self.0
    }

    /// Lowercase hex form, as sent to nodes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; CORRELATION_ID_LEN]> for CorrelationId {
    fn from(bytes: [u8; CORRELATION_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for CorrelationId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes).ok_or(TypesError::InvalidLength {
            expected: CORRELATION_ID_LEN,
            actual: bytes.len(),
        })
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({})", &self.to_hex()[..8])
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
