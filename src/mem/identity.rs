//! Identity driver issuing Ed25519-signed JWS credentials.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde_json::{json, Value};

use crate::ports::{CredentialCheck, Identity, IdentityError, IssuedCredential};

/// Issues compact JWS credentials under a process-local Ed25519 key and
/// tracks revocations in memory.
pub struct MemIdentity {
    signing: SigningKey,
    verifying: VerifyingKey,
    revoked: RwLock<HashSet<String>>,
}

impl MemIdentity {
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        let signing = SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        Self {
            signing,
            verifying,
            revoked: RwLock::new(HashSet::new()),
        }
    }

    /// Mark a previously issued credential as revoked.
    pub fn revoke(&self, jwt: &str) {
        self.revoked
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(jwt.to_string());
    }

    fn is_revoked(&self, jwt: &str) -> bool {
        self.revoked
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(jwt)
    }
}

impl Default for MemIdentity {
    fn default() -> Self {
        Self::new()
    }
}

fn malformed(e: impl std::fmt::Display) -> IdentityError {
    IdentityError::Malformed(e.to_string())
}

#[async_trait]
impl Identity for MemIdentity {
    async fn create_verifiable_credential(
        &self,
        issuer: &str,
        assertion_method: &str,
        subject_id: Option<&str>,
        credential_type: &str,
        subject: &Value,
    ) -> Result<IssuedCredential, IdentityError> {
        let header = json!({"alg": "EdDSA", "typ": "JWT", "kid": assertion_method});
        let mut payload = json!({
            "iss": issuer,
            "vc": {
                "type": ["VerifiableCredential", credential_type],
                "credentialSubject": subject,
            },
        });
        if let Some(subject_id) = subject_id {
            payload["sub"] = json!(subject_id);
        }

        let header_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).map_err(malformed)?);
        let payload_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).map_err(malformed)?);
        let signing_input = format!("{}.{}", header_b64, payload_b64);
        let signature = self.signing.sign(signing_input.as_bytes());
        let jwt = format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        );
        Ok(IssuedCredential { jwt })
    }

    async fn check_verifiable_credential(
        &self,
        jwt: &str,
    ) -> Result<CredentialCheck, IdentityError> {
        let mut parts = jwt.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(IdentityError::Malformed(
                "expected three jws segments".into(),
            ));
        };

        let signing_input = format!("{}.{}", header, payload);
        let signature_bytes = URL_SAFE_NO_PAD.decode(signature).map_err(malformed)?;
        let signature = Signature::from_slice(&signature_bytes).map_err(malformed)?;
        self.verifying
            .verify(signing_input.as_bytes(), &signature)
            .map_err(malformed)?;

        let payload_bytes = URL_SAFE_NO_PAD.decode(payload).map_err(malformed)?;
        let credential: Value = serde_json::from_slice(&payload_bytes).map_err(malformed)?;
        Ok(CredentialCheck {
            revoked: self.is_revoked(jwt),
            credential,
        })
    }
}
