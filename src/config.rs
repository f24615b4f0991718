//! Service configuration.

/// Default vault key id under the controlling node.
pub const DEFAULT_VAULT_KEY_ID: &str = "auditable-item-graph";

/// Default assertion method fragment for issued credentials.
pub const DEFAULT_ASSERTION_METHOD_ID: &str = "auditable-item-graph";

/// Immutable configuration handed to the vertex service at construction.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// When false the encrypted integrity payload is omitted and only the
    /// signature is anchored.
    pub enable_integrity_check: bool,
    pub vault_key_id: String,
    pub assertion_method_id: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enable_integrity_check: true,
            vault_key_id: DEFAULT_VAULT_KEY_ID.to_string(),
            assertion_method_id: DEFAULT_ASSERTION_METHOD_ID.to_string(),
        }
    }
}
