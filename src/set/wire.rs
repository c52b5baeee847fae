//! Wire format for whole sets.
//!
//! ```json
//! {"resources": [{"path": "/a.js", "content": "...", "etag": "..."}],
//!  "loadPath": ["/a.js"]}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::ResourceSet;
use crate::error::{ResourceError, Result};
use crate::resource::{ResourceData, SerializeOptions};

/// Resources serialized concurrently at most this many at a time.
const SERIALIZE_BATCH: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetData {
    #[serde(default)]
    pub resources: Vec<ResourceData>,
    #[serde(default, alias = "load")]
    pub load_path: Vec<String>,
}

impl ResourceSet {
    /// Serialize every resource with its content, plus the load path.
    pub async fn serialize(&self) -> Result<SetData> {
        self.serialize_with(&BTreeMap::new()).await
    }

    /// Like [`ResourceSet::serialize`], omitting content for `(path, etag)`
    /// pairs listed in `known` (the shape of
    /// [`crate::cache::ResourceSetCache::resource_versions`]).
    pub async fn serialize_with(&self, known: &BTreeMap<String, Vec<String>>) -> Result<SetData> {
        self.settled().await;
        let resources = self.resources();
        let mut serialized = Vec::with_capacity(resources.len());

        for batch in resources.chunks(SERIALIZE_BATCH) {
            let handles: Vec<_> = batch
                .iter()
                .cloned()
                .map(|resource| {
                    let cached = resource.etag().is_some_and(|etag| {
                        known
                            .get(resource.path())
                            .is_some_and(|etags| etags.contains(&etag))
                    });
                    let options = SerializeOptions {
                        include_content: !cached,
                    };
                    tokio::spawn(async move { resource.serialize(options).await })
                })
                .collect();

            for (resource, handle) in batch.iter().zip(handles) {
                let data = handle
                    .await
                    .map_err(|e| ResourceError::content(resource.path(), e))??;
                serialized.push(data);
            }
        }

        Ok(SetData {
            resources: serialized,
            load_path: self.load_path(),
        })
    }

    /// Rebuild a set from wire data.
    ///
    /// Wire content is already processed, so `enclose` and `minify` are
    /// recorded but not applied again.
    pub async fn deserialize(data: SetData, root_path: impl Into<PathBuf>) -> Result<ResourceSet> {
        let set = ResourceSet::new(root_path);
        for resource in data.resources {
            set.add(resource.into_wire_spec()).await?;
        }
        set.append_to_load(&data.load_path)?;
        Ok(set)
    }

    pub async fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.serialize().await?)?)
    }

    pub async fn from_json(json: &str, root_path: impl Into<PathBuf>) -> Result<ResourceSet> {
        let data: SetData = serde_json::from_str(json)?;
        Self::deserialize(data, root_path).await
    }
}
