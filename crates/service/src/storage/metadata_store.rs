use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ServiceError;
use crate::storage::json_file::{self, LoadOutcome};
use crate::templates::Category;

/// The durable index: category -> stored filename -> display name.
///
/// Keys are kept as plain strings so categories this build does not know
/// about survive a load/save cycle untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub templates: BTreeMap<String, BTreeMap<String, String>>,
}

impl MetadataDocument {
    pub fn entries(&self, category: Category) -> Option<&BTreeMap<String, String>> {
        self.templates.get(category.as_str())
    }

    pub fn display_name(&self, category: Category, file_name: &str) -> Option<&str> {
        self.entries(category)?.get(file_name).map(String::as_str)
    }

    /// Insert or overwrite one entry; returns the previous display name.
    pub fn upsert(&mut self, category: Category, file_name: String, display_name: String) -> Option<String> {
        self.templates
            .entry(category.as_str().to_string())
            .or_default()
            .insert(file_name, display_name)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.values().all(BTreeMap::is_empty)
    }
}

/// Whole-document persistence for the metadata index.
///
/// `load` never fails: an absent or corrupt backing document reads as empty.
/// `save` replaces the document; an error means the mutation did not happen.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn load(&self) -> MetadataDocument;
    async fn save(&self, doc: &MetadataDocument) -> Result<(), ServiceError>;
}

/// JSON file implementation of [`MetadataStore`].
#[derive(Clone, Debug)]
pub struct JsonMetadataStore {
    file_path: PathBuf,
}

impl JsonMetadataStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into() }
    }
}

#[async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn load(&self) -> MetadataDocument {
        match json_file::read_json::<MetadataDocument>(&self.file_path).await {
            LoadOutcome::Missing => {
                debug!(path = %self.file_path.display(), "metadata document absent; starting empty");
                MetadataDocument::default()
            }
            outcome => outcome.into_value(),
        }
    }

    async fn save(&self, doc: &MetadataDocument) -> Result<(), ServiceError> {
        json_file::write_json_atomic(&self.file_path, doc)
            .await
            .map_err(ServiceError::metadata)
    }
}
