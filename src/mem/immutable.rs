//! Append-only in-memory log returning `immutable:memory:` URNs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rand::RngCore;

use crate::ports::{ImmutableLog, ImmutableLogError};

const URN_PREFIX: &str = "immutable:memory:";

struct Record {
    controller: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
pub struct MemImmutableLog {
    records: RwLock<HashMap<String, Record>>,
}

impl MemImmutableLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the bytes behind an id, keeping the id stable. Exists so
    /// tests can simulate a compromised backend.
    pub fn overwrite(&self, id: &str, bytes: Vec<u8>) -> bool {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        match records.get_mut(id) {
            Some(record) => {
                record.bytes = bytes;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ImmutableLog for MemImmutableLog {
    async fn store(&self, controller: &str, bytes: &[u8]) -> Result<String, ImmutableLogError> {
        let mut suffix = [0u8; 32];
        rand::rng().fill_bytes(&mut suffix);
        let id = format!("{}{}", URN_PREFIX, hex(&suffix));
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id.clone(),
                Record {
                    controller: controller.to_string(),
                    bytes: bytes.to_vec(),
                },
            );
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, ImmutableLogError> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .map(|record| record.bytes.clone())
            .ok_or_else(|| ImmutableLogError::NotFound(id.to_string()))
    }

    async fn remove(&self, controller: &str, id: &str) -> Result<(), ImmutableLogError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        match records.get(id) {
            None => Err(ImmutableLogError::NotFound(id.to_string())),
            Some(record) if record.controller != controller => {
                Err(ImmutableLogError::WrongController(id.to_string()))
            }
            Some(_) => {
                records.remove(id);
                Ok(())
            }
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
