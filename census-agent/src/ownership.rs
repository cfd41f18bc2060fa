//! Opt-in ownership metadata
//!
//! A small set of user-supplied fields persisted as one JSON object in the
//! cluster's key/value namespace. Updates merge on top of what is stored.
//! `url` is the publish target and never appears in the report body.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ceph::KeyValueStore;
use crate::error::{CensusError, Result, StoreError};

/// Accepted ownership keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipField {
    Name,
    Organization,
    Email,
    Description,
    Url,
}

impl OwnershipField {
    pub const ALL: [OwnershipField; 5] = [
        OwnershipField::Name,
        OwnershipField::Organization,
        OwnershipField::Email,
        OwnershipField::Description,
        OwnershipField::Url,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipField::Name => "name",
            OwnershipField::Organization => "organization",
            OwnershipField::Email => "email",
            OwnershipField::Description => "description",
            OwnershipField::Url => "url",
        }
    }
}

impl FromStr for OwnershipField {
    type Err = CensusError;

    fn from_str(key: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == key)
            .ok_or_else(|| CensusError::Validation(key.to_string()))
    }
}

impl fmt::Display for OwnershipField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identification fields embedded in the report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OwnerDetails {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.organization.is_none()
            && self.email.is_none()
            && self.description.is_none()
    }
}

/// Stored ownership blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipMetadata {
    #[serde(flatten)]
    pub details: OwnerDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl OwnershipMetadata {
    pub fn get(&self, field: OwnershipField) -> Option<&str> {
        match field {
            OwnershipField::Name => self.details.name.as_deref(),
            OwnershipField::Organization => self.details.organization.as_deref(),
            OwnershipField::Email => self.details.email.as_deref(),
            OwnershipField::Description => self.details.description.as_deref(),
            OwnershipField::Url => self.url.as_deref(),
        }
    }

    pub fn set(&mut self, field: OwnershipField, value: String) {
        let slot = match field {
            OwnershipField::Name => &mut self.details.name,
            OwnershipField::Organization => &mut self.details.organization,
            OwnershipField::Email => &mut self.details.email,
            OwnershipField::Description => &mut self.details.description,
            OwnershipField::Url => &mut self.url,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty() && self.url.is_none()
    }

    /// Separate the report content from the publish target.
    pub fn into_parts(self) -> (Option<OwnerDetails>, Option<String>) {
        let details = (!self.details.is_empty()).then_some(self.details);
        (details, self.url)
    }
}

/// Split one `--key=value` command-line assignment. Keys are checked by [`OwnershipStore::update`].
pub fn split_assignment(arg: &str) -> Result<(String, String)> {
    arg.strip_prefix("--")
        .and_then(|rest| rest.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| CensusError::Usage(format!("expected --key=value, got `{}`", arg)))
}

pub struct OwnershipStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl OwnershipStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Stored metadata, or empty metadata if absent or unreadable.
    pub async fn read(&self) -> OwnershipMetadata {
        let blob = match self.store.get(&self.key).await {
            Ok(blob) => blob,
            Err(StoreError::NotFound(_)) => return OwnershipMetadata::default(),
            Err(e) => {
                warn!("Could not read ownership metadata: {}", e);
                return OwnershipMetadata::default();
            }
        };

        if blob.trim().is_empty() {
            return OwnershipMetadata::default();
        }
        serde_json::from_str(&blob).unwrap_or_else(|e| {
            warn!("Ignoring unparsable ownership metadata: {}", e);
            OwnershipMetadata::default()
        })
    }

    /// Merge `fields` on top of the stored metadata and persist the result.
    ///
    /// Every key is validated before anything is read or written.
    pub async fn update(&self, fields: &[(String, String)]) -> Result<OwnershipMetadata> {
        let parsed = fields
            .iter()
            .map(|(key, value)| key.parse::<OwnershipField>().map(|field| (field, value.clone())))
            .collect::<Result<Vec<_>>>()?;

        let mut metadata = self.read().await;
        for (field, value) in parsed {
            debug!("ownership {} updated", field);
            metadata.set(field, value);
        }

        let blob = serde_json::to_string(&metadata).map_err(CensusError::Encode)?;
        self.store.put(&self.key, &blob).await?;
        info!("Ownership metadata stored under {}", self.key);
        Ok(metadata)
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.delete(&self.key).await?;
        info!("Ownership metadata cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl KeyValueStore for MapStore {
        async fn get(&self, key: &str) -> std::result::Result<String, StoreError> {
            self.values
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(key.to_string()))
        }

        async fn put(&self, key: &str, value: &str) -> std::result::Result<(), StoreError> {
            self.values.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> std::result::Result<(), StoreError> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    fn ownership() -> (OwnershipStore, Arc<MapStore>) {
        let store = Arc::new(MapStore::default());
        (OwnershipStore::new(store.clone(), "cluster-ownership"), store)
    }

    #[tokio::test]
    async fn test_updates_merge() {
        let (ownership, _) = ownership();
        ownership.update(&[pair("name", "A")]).await.unwrap();
        ownership.update(&[pair("organization", "B")]).await.unwrap();

        let metadata = ownership.read().await;
        assert_eq!(metadata.get(OwnershipField::Name), Some("A"));
        assert_eq!(metadata.get(OwnershipField::Organization), Some("B"));
        assert_eq!(metadata.get(OwnershipField::Email), None);
    }

    #[tokio::test]
    async fn test_unknown_key_leaves_store_unchanged() {
        let (ownership, store) = ownership();
        ownership.update(&[pair("name", "A")]).await.unwrap();
        let before = store.values.lock().unwrap().clone();

        let err = ownership
            .update(&[pair("email", "a@b.c"), pair("bogus", "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, CensusError::Validation(ref key) if key == "bogus"));
        assert_eq!(*store.values.lock().unwrap(), before);
    }

    #[tokio::test]
    async fn test_unparsable_blob_reads_as_empty() {
        let (ownership, store) = ownership();
        store
            .values
            .lock()
            .unwrap()
            .insert("cluster-ownership".to_string(), "{'name': 'legacy'}".to_string());
        assert!(ownership.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let (ownership, store) = ownership();
        ownership.update(&[pair("url", "http://x")]).await.unwrap();
        ownership.clear().await.unwrap();
        assert!(store.values.lock().unwrap().is_empty());
        assert!(ownership.read().await.is_empty());
    }

    #[test]
    fn test_blob_format() {
        let mut metadata = OwnershipMetadata::default();
        metadata.set(OwnershipField::Name, "Lab".to_string());
        metadata.set(OwnershipField::Url, "http://brag".to_string());
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"name":"Lab","url":"http://brag"}"#
        );
    }

    #[test]
    fn test_into_parts_strips_url() {
        let mut metadata = OwnershipMetadata::default();
        metadata.set(OwnershipField::Url, "http://brag".to_string());
        let (details, url) = metadata.clone().into_parts();
        assert!(details.is_none());
        assert_eq!(url.as_deref(), Some("http://brag"));

        metadata.set(OwnershipField::Email, "ops@example.com".to_string());
        let (details, _) = metadata.into_parts();
        let value = serde_json::to_value(details.unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"email": "ops@example.com"}));
    }

    #[test]
    fn test_split_assignment() {
        let (key, value) = split_assignment("--description=Rack 4, row 2").unwrap();
        assert_eq!(key, "description");
        assert_eq!(value, "Rack 4, row 2");

        let (_, value) = split_assignment("--url=http://h/brag?x=1").unwrap();
        assert_eq!(value, "http://h/brag?x=1");

        assert!(matches!(split_assignment("name=1"), Err(CensusError::Usage(_))));
        assert!(matches!(split_assignment("--name"), Err(CensusError::Usage(_))));
        assert!(matches!(split_assignment("--=x"), Err(CensusError::Usage(_))));
    }

    #[test]
    fn test_field_names() {
        assert_eq!("email".parse::<OwnershipField>().unwrap(), OwnershipField::Email);
        assert!(matches!("Email".parse::<OwnershipField>(), Err(CensusError::Validation(_))));
        assert_eq!(OwnershipField::Organization.to_string(), "organization");
    }
}
