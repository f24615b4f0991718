//! Integrity envelope: signed, optionally encrypted credential payloads
//! anchored in the immutable log.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::core::{to_canon_json_bytes, EpochMs, NodeIdentity, PatchOp, UserIdentity, DIGEST_LEN};
use crate::ports::{EncryptionAlgo, Identity, IdentityError, ImmutableLog, Vault};

use super::error::OpCause;

/// Credential type attached to each anchored changeset.
pub const CREDENTIAL_TYPE: &str = "AuditableItemGraphIntegrity";

/// Vault key reference for a controlling node.
pub fn vault_key_ref(node: &NodeIdentity, vault_key_id: &str) -> String {
    format!("{}/{}", node.as_str(), vault_key_id)
}

/// Assertion method reference used when issuing credentials.
pub fn assertion_method_ref(node: &NodeIdentity, assertion_method_id: &str) -> String {
    format!("{}#{}", node.as_str(), assertion_method_id)
}

/// Payload embedded (encrypted) in the credential for tamper detection
/// beyond the hash chain.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntegrityPayload<'a> {
    pub created: EpochMs,
    pub user_identity: &'a UserIdentity,
    pub patches: &'a [PatchOp],
}

/// Subject of the anchored credential.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

/// Sign and anchor one changeset; returns the immutable storage id.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn anchor(
    vault: &Arc<dyn Vault>,
    identity: &Arc<dyn Identity>,
    immutable: &Arc<dyn ImmutableLog>,
    config: &ServiceConfig,
    node: &NodeIdentity,
    digest: &[u8; DIGEST_LEN],
    created: EpochMs,
    user_identity: &UserIdentity,
    patches: &[PatchOp],
) -> Result<String, OpCause> {
    let key_ref = vault_key_ref(node, &config.vault_key_id);
    let signature = vault.sign(&key_ref, digest).await?;

    let integrity = if config.enable_integrity_check {
        let payload = IntegrityPayload {
            created,
            user_identity,
            patches,
        };
        let canonical = to_canon_json_bytes(&payload)?;
        let ciphertext = vault
            .encrypt(&key_ref, EncryptionAlgo::ChaCha20Poly1305, &canonical)
            .await?;
        Some(BASE64.encode(ciphertext))
    } else {
        None
    };

    let subject = CredentialSubject {
        signature: BASE64.encode(signature),
        integrity,
    };
    let subject_value =
        serde_json::to_value(&subject).map_err(|e| OpCause::Canon(e.into()))?;
    let credential = identity
        .create_verifiable_credential(
            node.as_str(),
            &assertion_method_ref(node, &config.assertion_method_id),
            None,
            CREDENTIAL_TYPE,
            &subject_value,
        )
        .await?;
    Ok(immutable
        .store(node.as_str(), credential.jwt.as_bytes())
        .await?)
}

/// A credential fetched back from the immutable log.
#[derive(Clone, Debug)]
pub(crate) struct StoredEnvelope {
    pub revoked: bool,
    pub subject: CredentialSubject,
    pub issuer: Option<String>,
    pub subject_id: Option<String>,
}

/// Fetch and decode the credential anchored at `id`.
pub(crate) async fn open(
    identity: &Arc<dyn Identity>,
    immutable: &Arc<dyn ImmutableLog>,
    id: &str,
) -> Result<StoredEnvelope, OpCause> {
    let bytes = immutable.get(id).await?;
    let jwt = String::from_utf8(bytes)
        .map_err(|e| OpCause::Identity(IdentityError::Malformed(e.to_string())))?;
    let check = identity.check_verifiable_credential(&jwt).await?;
    let subject_value = credential_subject(&check.credential).ok_or_else(|| {
        OpCause::Identity(IdentityError::Malformed("credential subject missing".into()))
    })?;
    let subject: CredentialSubject = serde_json::from_value(subject_value.clone())
        .map_err(|e| OpCause::Identity(IdentityError::Malformed(e.to_string())))?;
    Ok(StoredEnvelope {
        revoked: check.revoked,
        subject,
        issuer: check
            .credential
            .get("iss")
            .and_then(Value::as_str)
            .map(str::to_string),
        subject_id: check
            .credential
            .get("sub")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

// The subject sits under `vc.credentialSubject` in JWT claims, or at the top
// level in already-unwrapped credential documents.
fn credential_subject(credential: &Value) -> Option<&Value> {
    credential
        .get("vc")
        .and_then(|vc| vc.get("credentialSubject"))
        .or_else(|| credential.get("credentialSubject"))
}
