//! Chain replay and envelope verification.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ServiceConfig;
use crate::core::{
    chain_digest, to_canon_json_bytes, Changeset, EpochMs, NodeIdentity, PatchOp, Vertex,
    DIGEST_LEN,
};
use crate::ports::{EncryptionAlgo, Identity, IdentityError, ImmutableLog, Vault};

use super::envelope::{self, vault_key_ref, IntegrityPayload};
use super::error::OpCause;

/// How much of the chain to verify during a get.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyDepth {
    #[default]
    None,
    /// Latest changeset only.
    Current,
    /// Every changeset in order.
    All,
}

/// Verification failure kinds, reported per changeset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerifyFailure {
    InvalidChangesetHash,
    InvalidChangesetSignature,
    InvalidChangesetCanonical,
    ChangesetCredentialRevoked,
}

/// Audit entry for one changeset; emitted even when verification passes.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetVerification {
    pub created: EpochMs,
    pub patches: Vec<PatchOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<VerifyFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_properties: Option<BTreeMap<String, Value>>,
}

/// Outcome of replaying a vertex chain.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub verified: bool,
    pub changesets: Vec<ChangesetVerification>,
}

/// Replay the chain: recompute digests, then check the anchored envelope for
/// changesets in scope. Diagnostics are recorded per entry; only collaborator
/// failures propagate as errors.
pub(crate) async fn verify_vertex(
    vault: &Arc<dyn Vault>,
    identity: &Arc<dyn Identity>,
    immutable: &Arc<dyn ImmutableLog>,
    config: &ServiceConfig,
    vertex: &Vertex,
    depth: VerifyDepth,
) -> Result<VerificationReport, OpCause> {
    let changesets: &[Changeset] = vertex.changesets.as_deref().unwrap_or(&[]);
    let last = changesets.len().saturating_sub(1);
    let mut verified = true;
    let mut entries = Vec::with_capacity(changesets.len());
    let mut previous: Option<[u8; DIGEST_LEN]> = None;

    for (index, changeset) in changesets.iter().enumerate() {
        let canonical = to_canon_json_bytes(&changeset.patches)?;
        let digest = chain_digest(
            previous.as_ref(),
            changeset.created,
            changeset.user_identity.as_str(),
            &canonical,
        );

        let mut failure = None;
        let mut properties = BTreeMap::new();

        if digest != *changeset.hash.as_bytes() {
            properties.insert("hash".to_string(), json!(changeset.hash.to_base64()));
            properties.insert("calculatedHash".to_string(), json!(BASE64.encode(digest)));
            properties.insert("epoch".to_string(), json!(changeset.created));
            failure = Some(VerifyFailure::InvalidChangesetHash);
        } else if in_scope(depth, index, last) {
            if let Some(storage_id) = changeset.immutable_storage_id.as_deref() {
                failure = check_envelope(
                    vault,
                    identity,
                    immutable,
                    config,
                    &vertex.node_identity,
                    changeset,
                    &digest,
                    storage_id,
                    &mut properties,
                )
                .await?;
            }
        }

        if let Some(failure) = failure {
            debug!(
                vertex = %vertex.id,
                index,
                ?failure,
                "changeset verification failed"
            );
            verified = false;
        }
        entries.push(ChangesetVerification {
            created: changeset.created,
            patches: changeset.patches.clone(),
            failure,
            failure_properties: if properties.is_empty() {
                None
            } else {
                Some(properties)
            },
        });
        // The recomputed digest seeds the next link, so a corrupted link
        // also invalidates every later stored hash.
        previous = Some(digest);
    }

    Ok(VerificationReport {
        verified,
        changesets: entries,
    })
}

fn in_scope(depth: VerifyDepth, index: usize, last: usize) -> bool {
    match depth {
        VerifyDepth::All => true,
        VerifyDepth::Current => index == last,
        VerifyDepth::None => false,
    }
}

#[allow(clippy::too_many_arguments)]
async fn check_envelope(
    vault: &Arc<dyn Vault>,
    identity: &Arc<dyn Identity>,
    immutable: &Arc<dyn ImmutableLog>,
    config: &ServiceConfig,
    node: &NodeIdentity,
    changeset: &Changeset,
    digest: &[u8; DIGEST_LEN],
    storage_id: &str,
    properties: &mut BTreeMap<String, Value>,
) -> Result<Option<VerifyFailure>, OpCause> {
    let stored = envelope::open(identity, immutable, storage_id).await?;
    // Properties are attached only when a failure is recorded; clean entries
    // stay bare.
    let stamp_identities = |properties: &mut BTreeMap<String, Value>| {
        if let Some(issuer) = &stored.issuer {
            properties.insert("issuer".to_string(), json!(issuer));
        }
        if let Some(subject_id) = &stored.subject_id {
            properties.insert("subjectId".to_string(), json!(subject_id));
        }
    };

    if stored.revoked {
        stamp_identities(properties);
        properties.insert("epoch".to_string(), json!(changeset.created));
        return Ok(Some(VerifyFailure::ChangesetCredentialRevoked));
    }

    let key_ref = vault_key_ref(node, &config.vault_key_id);
    let calculated = BASE64.encode(vault.sign(&key_ref, digest).await?);
    if calculated != stored.subject.signature {
        stamp_identities(properties);
        properties.insert(
            "credentialSignature".to_string(),
            json!(stored.subject.signature),
        );
        properties.insert("calculatedSignature".to_string(), json!(calculated));
        properties.insert("epoch".to_string(), json!(changeset.created));
        return Ok(Some(VerifyFailure::InvalidChangesetSignature));
    }

    if let Some(integrity) = &stored.subject.integrity {
        let ciphertext = BASE64
            .decode(integrity)
            .map_err(|e| OpCause::Identity(IdentityError::Malformed(e.to_string())))?;
        let plaintext = vault
            .decrypt(&key_ref, EncryptionAlgo::ChaCha20Poly1305, &ciphertext)
            .await?;
        let reconstructed = to_canon_json_bytes(&IntegrityPayload {
            created: changeset.created,
            user_identity: &changeset.user_identity,
            patches: &changeset.patches,
        })?;
        if plaintext != reconstructed {
            stamp_identities(properties);
            properties.insert("epoch".to_string(), json!(changeset.created));
            properties.insert(
                "storedPayload".to_string(),
                payload_value(&plaintext),
            );
            properties.insert(
                "reconstructedPayload".to_string(),
                payload_value(&reconstructed),
            );
            return Ok(Some(VerifyFailure::InvalidChangesetCanonical));
        }
    }

    Ok(None)
}

fn payload_value(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| json!(String::from_utf8_lossy(bytes).into_owned()))
}
