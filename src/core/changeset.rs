//! Hash-chained changeset records.

use serde::{Deserialize, Serialize};

use super::chain::ChangesetDigest;
use super::identity::UserIdentity;
use super::patch::PatchOp;
use super::time::EpochMs;

/// One recorded vertex mutation.
///
/// `hash` chains to the previous changeset; `immutable_storage_id` points at
/// the anchored credential and is cleared by an explicit immutable detach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    pub created: EpochMs,
    pub user_identity: UserIdentity,
    pub patches: Vec<PatchOp>,
    pub hash: ChangesetDigest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub immutable_storage_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chain::{chain_digest, DIGEST_LEN};
    use serde_json::json;

    #[test]
    fn changeset_serializes_camel_case_with_base64_hash() {
        let digest = chain_digest(None, EpochMs(5), "user-a", b"[]");
        let changeset = Changeset {
            created: EpochMs(5),
            user_identity: UserIdentity::parse("user-a").unwrap(),
            patches: Vec::new(),
            hash: ChangesetDigest::new(digest),
            immutable_storage_id: Some("immutable:memory:00".into()),
        };

        let value = serde_json::to_value(&changeset).unwrap();
        assert_eq!(value["created"], json!(5));
        assert_eq!(value["userIdentity"], json!("user-a"));
        assert_eq!(value["patches"], json!([]));
        assert_eq!(value["immutableStorageId"], json!("immutable:memory:00"));
        let hash = value["hash"].as_str().unwrap();
        assert_eq!(hash.len(), 44);

        let back: Changeset = serde_json::from_value(value).unwrap();
        assert_eq!(back, changeset);
        assert_eq!(back.hash.as_bytes().len(), DIGEST_LEN);
    }

    #[test]
    fn detached_changeset_omits_storage_id() {
        let changeset = Changeset {
            created: EpochMs(1),
            user_identity: UserIdentity::parse("u").unwrap(),
            patches: Vec::new(),
            hash: ChangesetDigest::new([0u8; DIGEST_LEN]),
            immutable_storage_id: None,
        };
        let value = serde_json::to_value(&changeset).unwrap();
        assert!(value.get("immutableStorageId").is_none());
    }
}
