//! Software vault: Ed25519 signing and ChaCha20-Poly1305 encryption.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;

use crate::ports::{EncryptionAlgo, Vault, VaultError};

const NONCE_LEN: usize = 12;

#[derive(Clone)]
struct KeyMaterial {
    signing: SigningKey,
    secret: [u8; 32],
}

impl KeyMaterial {
    fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        Self {
            signing: SigningKey::from_bytes(&seed),
            secret,
        }
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.secret))
    }
}

/// Key material is created on demand per key reference and held for the
/// process lifetime, so repeated signing over the same bytes is
/// deterministic.
#[derive(Default)]
pub struct MemVault {
    keys: RwLock<HashMap<String, KeyMaterial>>,
}

impl MemVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regenerate the material behind `key_ref`. Existing signatures and
    /// ciphertexts stop verifying against the new key.
    pub fn rotate_key(&self, key_ref: &str) {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.insert(key_ref.to_string(), KeyMaterial::generate());
    }

    fn material(&self, key_ref: &str) -> KeyMaterial {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.entry(key_ref.to_string())
            .or_insert_with(KeyMaterial::generate)
            .clone()
    }

    fn existing_material(&self, key_ref: &str) -> Result<KeyMaterial, VaultError> {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.get(key_ref)
            .cloned()
            .ok_or_else(|| VaultError::UnknownKey(key_ref.to_string()))
    }
}

#[async_trait]
impl Vault for MemVault {
    async fn sign(&self, key_ref: &str, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        let material = self.material(key_ref);
        Ok(material.signing.sign(data).to_bytes().to_vec())
    }

    async fn encrypt(
        &self,
        key_ref: &str,
        algo: EncryptionAlgo,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        let EncryptionAlgo::ChaCha20Poly1305 = algo;
        let material = self.material(key_ref);
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);
        let ciphertext = material
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| VaultError::Cipher("encryption failed".into()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    async fn decrypt(
        &self,
        key_ref: &str,
        algo: EncryptionAlgo,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        let EncryptionAlgo::ChaCha20Poly1305 = algo;
        let material = self.existing_material(key_ref)?;
        if ciphertext.len() < NONCE_LEN {
            return Err(VaultError::Cipher("ciphertext too short".into()));
        }
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        material
            .cipher()
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| VaultError::Cipher("authentication failed".into()))
    }
}
