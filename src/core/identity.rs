//! Identity atoms.
//!
//! VertexId: 32 random bytes, rendered as lowercase hex, `aig:<hex>` outside.
//! NodeIdentity: the controlling node (the signer).
//! UserIdentity: the acting user recorded on each changeset.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidId};

/// Byte length of a vertex identifier.
pub const VERTEX_ID_LEN: usize = 32;

/// URN namespace under which vertex ids are exposed.
pub const URN_NAMESPACE: &str = "aig";

/// Vertex identifier - 32 random bytes.
///
/// Stored and indexed as lowercase hex; the `aig:` URN form exists only at
/// the service boundary.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId([u8; VERTEX_ID_LEN]);

impl VertexId {
    pub fn from_bytes(bytes: [u8; VERTEX_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; VERTEX_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse from 64 lowercase hex chars.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        if s.len() != VERTEX_ID_LEN * 2 {
            return Err(InvalidId::Vertex {
                raw: s.to_string(),
                reason: format!("must be {} hex chars (got {})", VERTEX_ID_LEN * 2, s.len()),
            }
            .into());
        }
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(InvalidId::Vertex {
                raw: s.to_string(),
                reason: "hex must be lowercase".into(),
            }
            .into());
        }
        let mut bytes = [0u8; VERTEX_ID_LEN];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hex = std::str::from_utf8(chunk).map_err(|_| InvalidId::Vertex {
                raw: s.to_string(),
                reason: "contains invalid UTF-8".into(),
            })?;
            bytes[i] = u8::from_str_radix(hex, 16).map_err(|_| InvalidId::Vertex {
                raw: s.to_string(),
                reason: format!("contains invalid hex: {}", hex),
            })?;
        }
        Ok(Self(bytes))
    }

    /// Render as `aig:<hex>`.
    pub fn to_urn(&self) -> String {
        format!("{}:{}", URN_NAMESPACE, self.to_hex())
    }

    /// Parse a strict `aig:<hex>` URN. Other namespaces are rejected.
    pub fn from_urn(s: &str) -> Result<Self, CoreError> {
        let Some((namespace, rest)) = s.split_once(':') else {
            return Err(InvalidId::Vertex {
                raw: s.to_string(),
                reason: "missing urn namespace".into(),
            }
            .into());
        };
        if namespace != URN_NAMESPACE {
            return Err(InvalidId::Namespace {
                raw: s.to_string(),
                expected: URN_NAMESPACE,
                got: namespace.to_string(),
            }
            .into());
        }
        Self::from_hex(rest)
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VertexId({})", self.to_hex())
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for VertexId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VertexId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        VertexId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Controlling node identity - non-empty opaque string (a DID in practice).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIdentity(String);

impl NodeIdentity {
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.is_empty() {
            Err(InvalidId::EmptyIdentity.into())
        } else {
            Ok(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIdentity({:?})", self.0)
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Acting user identity - non-empty opaque string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.is_empty() {
            Err(InvalidId::EmptyIdentity.into())
        } else {
            Ok(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserIdentity({:?})", self.0)
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vertex id generation capability; injected so tests are deterministic.
pub trait IdSource: Send + Sync {
    fn next_vertex_id(&self) -> VertexId;
}

/// OS-randomness id source.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
    fn next_vertex_id(&self) -> VertexId {
        let mut bytes = [0u8; VERTEX_ID_LEN];
        rand::rng().fill_bytes(&mut bytes);
        VertexId::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_id_hex_roundtrip() {
        let id = VertexId::from_bytes([0x01; 32]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(VertexId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn vertex_id_urn_roundtrip() {
        let id = VertexId::from_bytes([0xab; 32]);
        let urn = id.to_urn();
        assert!(urn.starts_with("aig:"));
        assert_eq!(VertexId::from_urn(&urn).unwrap(), id);
    }

    #[test]
    fn vertex_id_rejects_wrong_namespace() {
        let id = VertexId::from_bytes([0x01; 32]);
        let urn = format!("other:{}", id.to_hex());
        let err = VertexId::from_urn(&urn).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidId(InvalidId::Namespace { ref got, .. }) if got == "other"
        ));
    }

    #[test]
    fn vertex_id_rejects_malformed_hex() {
        assert!(VertexId::from_hex("abc").is_err());
        assert!(VertexId::from_hex(&"zz".repeat(32)).is_err());
        assert!(VertexId::from_hex(&"AB".repeat(32)).is_err());
        assert!(VertexId::from_urn("no-namespace").is_err());
    }

    #[test]
    fn identities_reject_empty() {
        assert!(NodeIdentity::parse("").is_err());
        assert!(UserIdentity::parse("").is_err());
        assert_eq!(
            NodeIdentity::parse("did:test:node").unwrap().as_str(),
            "did:test:node"
        );
    }

    #[test]
    fn random_id_source_yields_distinct_ids() {
        let source = RandomIdSource;
        assert_ne!(source.next_vertex_id(), source.next_vertex_id());
    }
}
