//! Wire types of the console object API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One object, one version of an object, or a folder placeholder (`name` ends in `/`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BucketObject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default, alias = "is_delete_marker")]
    pub delete_flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub user_tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_hold_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_until_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

impl BucketObject {
    /// Folder placeholder as produced by permission-derived listings
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_folder(&self) -> bool {
        self.name.ends_with('/')
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListObjectsResponse {
    #[serde(default)]
    pub objects: Option<Vec<BucketObject>>,
    #[serde(default)]
    pub total: Option<i64>,
}

/// Listing entry as of a rewind date
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewindItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub delete_flag: bool,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub is_latest: bool,
}

impl From<RewindItem> for BucketObject {
    fn from(item: RewindItem) -> Self {
        BucketObject {
            name: item.name,
            size: item.size,
            last_modified: item.last_modified,
            version_id: item.version_id,
            is_latest: item.is_latest,
            delete_flag: item.delete_flag,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewindResponse {
    #[serde(default)]
    pub objects: Option<Vec<RewindItem>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludedPrefix {
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketVersioningResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "MFADelete")]
    pub mfa_delete: Option<String>,
    #[serde(default, rename = "excludedPrefixes")]
    pub excluded_prefixes: Option<Vec<ExcludedPrefix>>,
    #[serde(default, rename = "excludeFolders")]
    pub exclude_folders: Option<bool>,
}

impl BucketVersioningResponse {
    /// Versioned mode covers both `Enabled` and `Suspended` buckets
    pub fn is_versioned(&self) -> bool {
        matches!(self.status.as_deref(), Some("Enabled") | Some("Suspended"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteFile {
    pub path: String,
    #[serde(rename = "versionID", skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PutObjectTagsRequest {
    pub tags: HashMap<String, String>,
}

/// Session policy resource, used to derive browsable paths when listing is forbidden
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionResource {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default, rename = "conditionOperator")]
    pub condition_operator: Option<String>,
    #[serde(default)]
    pub prefixes: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_object_accepts_delete_marker_alias_and_missing_fields() {
        let json = r#"{"name":"a.txt","is_delete_marker":true,"version_id":"v2"}"#;
        let obj: BucketObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.name, "a.txt");
        assert!(obj.delete_flag);
        assert_eq!(obj.size, 0);
        assert_eq!(obj.version_id.as_deref(), Some("v2"));
    }

    #[test]
    fn versioning_status_detection() {
        let enabled: BucketVersioningResponse =
            serde_json::from_str(r#"{"status":"Enabled"}"#).unwrap();
        let off: BucketVersioningResponse = serde_json::from_str("{}").unwrap();
        assert!(enabled.is_versioned());
        assert!(!off.is_versioned());
    }
}
