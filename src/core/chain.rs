//! Blake2b-256 changeset hash chain.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

type Blake2b256 = Blake2b<U32>;

/// Byte length of a chain digest.
pub const DIGEST_LEN: usize = 32;

/// Compute the chain digest for one changeset.
///
/// Input is the byte concatenation of the previous digest (absent for the
/// first link), the decimal epoch, the user identity, and the canonical
/// patch bytes, with no separators. The raw digest is what gets signed;
/// base64 is storage-only.
pub fn chain_digest(
    prev: Option<&[u8; DIGEST_LEN]>,
    created: super::time::EpochMs,
    user_identity: &str,
    canonical_patches: &[u8],
) -> [u8; DIGEST_LEN] {
    let mut hasher = Blake2b256::new();
    if let Some(prev) = prev {
        hasher.update(prev);
    }
    hasher.update(created.to_string().as_bytes());
    hasher.update(user_identity.as_bytes());
    hasher.update(canonical_patches);
    hasher.finalize().into()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid changeset digest {raw:?}: {reason}")]
pub struct InvalidDigest {
    pub raw: String,
    pub reason: String,
}

/// A stored chain digest, rendered as URL-unsafe base64.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChangesetDigest([u8; DIGEST_LEN]);

impl ChangesetDigest {
    pub fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, InvalidDigest> {
        let bytes = BASE64.decode(s).map_err(|e| InvalidDigest {
            raw: s.to_string(),
            reason: e.to_string(),
        })?;
        let bytes: [u8; DIGEST_LEN] = bytes.try_into().map_err(|b: Vec<u8>| InvalidDigest {
            raw: s.to_string(),
            reason: format!("must be {} bytes (got {})", DIGEST_LEN, b.len()),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for ChangesetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangesetDigest({})", self.to_base64())
    }
}

impl fmt::Display for ChangesetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl Serialize for ChangesetDigest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for ChangesetDigest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ChangesetDigest::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::EpochMs;

    #[test]
    fn digest_matches_manual_concatenation() {
        let prev = [7u8; DIGEST_LEN];
        let digest = chain_digest(Some(&prev), EpochMs(1234), "user-1", b"[]");

        let mut hasher = Blake2b256::new();
        hasher.update(prev);
        hasher.update(b"1234");
        hasher.update(b"user-1");
        hasher.update(b"[]");
        let expected: [u8; DIGEST_LEN] = hasher.finalize().into();
        assert_eq!(digest, expected);
    }

    #[test]
    fn first_link_omits_previous_digest() {
        let without = chain_digest(None, EpochMs(1), "u", b"[]");
        let with = chain_digest(Some(&[0u8; DIGEST_LEN]), EpochMs(1), "u", b"[]");
        assert_ne!(without, with);
    }

    #[test]
    fn every_input_feeds_the_digest() {
        let base = chain_digest(None, EpochMs(1), "u", b"[]");
        assert_ne!(base, chain_digest(None, EpochMs(2), "u", b"[]"));
        assert_ne!(base, chain_digest(None, EpochMs(1), "v", b"[]"));
        assert_ne!(base, chain_digest(None, EpochMs(1), "u", b"[{}]"));
    }

    #[test]
    fn stored_form_is_44_char_base64() {
        let digest = ChangesetDigest::new(chain_digest(None, EpochMs(1), "u", b"[]"));
        let encoded = digest.to_base64();
        assert_eq!(encoded.len(), 44);
        assert_eq!(ChangesetDigest::from_base64(&encoded).unwrap(), digest);
    }

    #[test]
    fn malformed_base64_is_rejected() {
        assert!(ChangesetDigest::from_base64("not base64!").is_err());
        assert!(ChangesetDigest::from_base64("AAAA").is_err());
    }
}
