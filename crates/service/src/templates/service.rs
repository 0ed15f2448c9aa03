use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::errors::ServiceError;
use crate::file::{StoredFile, TemplateFiles};
use crate::metrics;
use crate::storage::MetadataStore;
use crate::templates::naming::{derive_stored_name, has_zip_extension};
use crate::templates::Category;

/// One indexed template as returned by list and store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub file_name: String,
    pub display_name: String,
}

/// category -> templates, sorted by file name. Empty categories are omitted.
pub type TemplateListing = BTreeMap<Category, Vec<TemplateInfo>>;

/// Uploaded archive as received from the client.
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Drift between the files on disk and the index, for one category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReconcile {
    /// On disk, not indexed.
    pub orphan_files: Vec<String>,
    /// Indexed, not on disk.
    pub missing_files: Vec<String>,
}

pub type ReconcileReport = BTreeMap<Category, CategoryReconcile>;

/// Owns the storage root and the metadata index.
///
/// Every store runs its file write and its load-mutate-save cycle under the
/// write half of `gate`; list and reconcile take the read half. Fetch reads the
/// filesystem only.
pub struct TemplateRegistry {
    files: TemplateFiles,
    metadata: Arc<dyn MetadataStore>,
    gate: RwLock<()>,
}

impl TemplateRegistry {
    pub fn new(files: TemplateFiles, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { files, metadata, gate: RwLock::new(()) }
    }

    /// Indexed templates for one category, or for all of them when `category` is `None`.
    pub async fn list(&self, category: Option<&str>) -> Result<TemplateListing, ServiceError> {
        let wanted: Vec<Category> = match category {
            Some(raw) => vec![raw.parse()?],
            None => Category::ALL.to_vec(),
        };

        let _read = self.gate.read().await;
        let doc = self.metadata.load().await;

        let mut listing = TemplateListing::new();
        for c in wanted {
            let Some(entries) = doc.entries(c) else { continue };
            if entries.is_empty() {
                continue;
            }
            let items = entries
                .iter()
                .map(|(file_name, display_name)| TemplateInfo {
                    file_name: file_name.clone(),
                    display_name: display_name.clone(),
                })
                .collect();
            listing.insert(c, items);
        }
        Ok(listing)
    }

    /// Open `root/<category>/<file_name>`. The index is not consulted.
    pub async fn fetch(&self, category: &str, file_name: &str) -> Result<StoredFile, ServiceError> {
        let category: Category = category.parse()?;
        let stored = self.files.open(category, file_name).await?;
        metrics::DOWNLOADS_TOTAL.with_label_values(&[category.as_str()]).inc();
        debug!(%category, file_name, len = stored.len, "template opened");
        Ok(stored)
    }

    /// Validate, write the archive, then index it. If the index cannot be saved
    /// the archive is removed again.
    ///
    /// Same display name plus same upload name means same stored file: the
    /// second store overwrites the first.
    pub async fn store(
        &self,
        category: &str,
        display_name: &str,
        upload: Option<Upload>,
    ) -> Result<TemplateInfo, ServiceError> {
        let (category, stored_name, upload) = match validate(category, display_name, upload) {
            Ok(v) => v,
            Err(e) => {
                metrics::UPLOAD_FAILURES_TOTAL.with_label_values(&["validation"]).inc();
                return Err(e);
            }
        };

        let _write = self.gate.write().await;

        let path = match self.files.write(category, &stored_name, &upload.bytes).await {
            Ok(path) => path,
            Err(e) => {
                metrics::UPLOAD_FAILURES_TOTAL.with_label_values(&["storage"]).inc();
                error!(%category, file_name = %stored_name, error = %e, "template write failed");
                return Err(e);
            }
        };
        debug!(%category, path = %path.display(), bytes = upload.bytes.len(), "template written");

        let mut doc = self.metadata.load().await;
        let previous = doc.upsert(category, stored_name.clone(), display_name.to_string());
        if let Err(e) = self.metadata.save(&doc).await {
            metrics::UPLOAD_FAILURES_TOTAL.with_label_values(&["metadata"]).inc();
            error!(%category, file_name = %stored_name, error = %e, "metadata save failed; rolling back");
            self.roll_back(category, &stored_name).await;
            return Err(e);
        }

        metrics::UPLOADS_TOTAL.with_label_values(&[category.as_str()]).inc();
        info!(
            %category,
            file_name = %stored_name,
            display_name,
            overwrote = previous.is_some(),
            "template stored"
        );
        Ok(TemplateInfo { file_name: stored_name, display_name: display_name.to_string() })
    }

    async fn roll_back(&self, category: Category, stored_name: &str) {
        match self.files.remove(category, stored_name).await {
            Ok(()) => {
                metrics::ROLLBACKS_TOTAL.inc();
                warn!(%category, file_name = stored_name, "uploaded template removed after metadata failure");
            }
            Err(e) => {
                metrics::ORPHANS_TOTAL.inc();
                error!(
                    %category,
                    file_name = stored_name,
                    path = %self.files.dir(category).join(stored_name).display(),
                    error = %e,
                    "rollback failed; orphan template left on disk"
                );
            }
        }
    }

    /// Compare every category directory with the index. Read-only.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ServiceError> {
        let _read = self.gate.read().await;
        let doc = self.metadata.load().await;

        let mut report = ReconcileReport::new();
        for c in Category::ALL {
            let on_disk = self.files.list_names(c).await?;
            let indexed = doc.entries(c);

            let orphan_files = on_disk
                .iter()
                .filter(|n| indexed.map_or(true, |m| !m.contains_key(n.as_str())))
                .cloned()
                .collect();
            let missing_files = indexed
                .map(|m| m.keys().filter(|k| on_disk.binary_search(*k).is_err()).cloned().collect())
                .unwrap_or_default();

            report.insert(c, CategoryReconcile { orphan_files, missing_files });
        }
        Ok(report)
    }
}

fn validate(
    category: &str,
    display_name: &str,
    upload: Option<Upload>,
) -> Result<(Category, String, Upload), ServiceError> {
    let category: Category = category.parse()?;
    if display_name.is_empty() {
        return Err(ServiceError::MissingDisplayName);
    }
    let upload = upload.ok_or(ServiceError::MissingFile)?;
    if !has_zip_extension(&upload.file_name) {
        return Err(ServiceError::UnsupportedExtension);
    }
    let stored_name = derive_stored_name(display_name, &upload.file_name)?;
    Ok((category, stored_name, upload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonMetadataStore, MetadataDocument};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use tokio::io::AsyncReadExt;
    use uuid::Uuid;

    struct Fixture {
        root: PathBuf,
        registry: Arc<TemplateRegistry>,
    }

    impl Fixture {
        fn metadata_path(&self) -> PathBuf {
            self.root.join("metadata.json")
        }
    }

    async fn layout() -> Result<PathBuf, anyhow::Error> {
        let root = std::env::temp_dir().join(format!("svc_registry_{}", Uuid::new_v4()));
        for c in Category::ALL {
            tokio::fs::create_dir_all(root.join(c.as_str())).await?;
        }
        Ok(root)
    }

    async fn fixture() -> Result<Fixture, anyhow::Error> {
        let root = layout().await?;
        let store = Arc::new(JsonMetadataStore::new(root.join("metadata.json")));
        let registry = Arc::new(TemplateRegistry::new(TemplateFiles::new(&root), store));
        Ok(Fixture { root, registry })
    }

    fn zip(name: &str, bytes: &[u8]) -> Option<Upload> {
        Some(Upload { file_name: name.to_string(), bytes: bytes.to_vec() })
    }

    async fn read_all(mut stored: StoredFile) -> Vec<u8> {
        let mut buf = Vec::new();
        stored.file.read_to_end(&mut buf).await.expect("read stored file");
        buf
    }

    async fn dir_is_empty(dir: &Path) -> bool {
        let mut rd = tokio::fs::read_dir(dir).await.expect("read dir");
        rd.next_entry().await.expect("entry").is_none()
    }

    #[tokio::test]
    async fn store_then_fetch_and_list() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        let info = fx.registry.store("live", "My Template", zip("my file.zip", b"PK-data")).await?;
        assert_eq!(info.file_name, "My_Template_my_file.zip");
        assert_eq!(info.display_name, "My Template");

        let bytes = read_all(fx.registry.fetch("live", &info.file_name).await?).await;
        assert_eq!(bytes, b"PK-data");

        let listing = fx.registry.list(Some("live")).await?;
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[&Category::Live], vec![info.clone()]);

        let all = fx.registry.list(None).await?;
        assert_eq!(all.get(&Category::Live), Some(&vec![info]));
        assert!(!all.contains_key(&Category::File));

        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }

    #[tokio::test]
    async fn invalid_category_mutates_nothing() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        let r = &fx.registry;
        assert!(matches!(r.list(Some("snippet")).await, Err(ServiceError::InvalidCategory(_))));
        assert!(matches!(r.fetch("snippet", "a.zip").await, Err(ServiceError::InvalidCategory(_))));
        assert!(matches!(
            r.store("snippet", "x", zip("a.zip", b"1")).await,
            Err(ServiceError::InvalidCategory(_))
        ));
        assert!(!fx.metadata_path().exists());
        assert!(!fx.root.join("snippet").exists());
        for c in Category::ALL {
            assert!(dir_is_empty(&fx.root.join(c.as_str())).await);
        }
        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }

    #[tokio::test]
    async fn validation_order_and_no_writes() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        let r = &fx.registry;
        assert!(matches!(r.store("file", "", zip("a.zip", b"1")).await, Err(ServiceError::MissingDisplayName)));
        assert!(matches!(r.store("file", "x", None).await, Err(ServiceError::MissingFile)));
        assert!(matches!(
            r.store("file", "x", zip("template.txt", b"1")).await,
            Err(ServiceError::UnsupportedExtension)
        ));
        assert!(matches!(
            r.store("file", "../x", zip("a.zip", b"1")).await,
            Err(ServiceError::InvalidFileName(_))
        ));
        assert!(dir_is_empty(&fx.root.join("file")).await);
        assert!(!fx.metadata_path().exists());
        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }

    #[tokio::test]
    async fn uppercase_extension_is_accepted() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        let info = fx.registry.store("file", "t", zip("ARCHIVE.ZIP", b"z")).await?;
        assert_eq!(info.file_name, "t_ARCHIVE.ZIP");
        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }

    #[tokio::test]
    async fn same_names_overwrite() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        let first = fx.registry.store("file", "dup", zip("a.zip", b"first")).await?;
        let second = fx.registry.store("file", "dup", zip("a.zip", b"second")).await?;
        assert_eq!(first.file_name, second.file_name);

        let bytes = read_all(fx.registry.fetch("file", &second.file_name).await?).await;
        assert_eq!(bytes, b"second");
        assert_eq!(fx.registry.list(Some("file")).await?[&Category::File].len(), 1);
        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_metadata_lists_empty() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        fx.registry.store("live", "a", zip("a.zip", b"1")).await?;
        tokio::fs::write(fx.metadata_path(), b"{\"templates\": [oops").await?;

        assert!(fx.registry.list(None).await?.is_empty());
        assert!(fx.registry.list(Some("live")).await?.is_empty());
        assert!(fx.registry.list(Some("file")).await?.is_empty());
        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }

    #[tokio::test]
    async fn fetch_ignores_index() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        tokio::fs::write(fx.root.join("file").join("manual.zip"), b"by hand").await?;
        let bytes = read_all(fx.registry.fetch("file", "manual.zip").await?).await;
        assert_eq!(bytes, b"by hand");
        assert!(matches!(fx.registry.fetch("file", "absent.zip").await, Err(ServiceError::NotFound)));
        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }

    /// Metadata store whose save always fails. When `sabotage` is set it also
    /// turns the just-written archive into a directory so the rollback's
    /// `remove_file` fails too.
    struct FailingStore {
        sabotage: Option<PathBuf>,
    }

    #[async_trait]
    impl MetadataStore for FailingStore {
        async fn load(&self) -> MetadataDocument {
            MetadataDocument::default()
        }

        async fn save(&self, _doc: &MetadataDocument) -> Result<(), ServiceError> {
            if let Some(path) = &self.sabotage {
                tokio::fs::remove_file(path).await.map_err(ServiceError::metadata)?;
                tokio::fs::create_dir(path).await.map_err(ServiceError::metadata)?;
            }
            Err(ServiceError::Metadata("disk full".into()))
        }
    }

    #[tokio::test]
    async fn metadata_failure_rolls_back_file() -> Result<(), anyhow::Error> {
        let root = layout().await?;
        let registry = TemplateRegistry::new(TemplateFiles::new(&root), Arc::new(FailingStore { sabotage: None }));

        let err = registry.store("live", "t", zip("a.zip", b"1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Metadata(_)));
        assert!(!root.join("live").join("t_a.zip").exists());
        assert!(dir_is_empty(&root.join("live")).await);

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_rollback_reports_orphan_without_panicking() -> Result<(), anyhow::Error> {
        let root = layout().await?;
        let target = root.join("live").join("t_a.zip");
        let store = Arc::new(FailingStore { sabotage: Some(target.clone()) });
        let registry = TemplateRegistry::new(TemplateFiles::new(&root), store);

        let orphans_before = metrics::ORPHANS_TOTAL.get();
        let err = registry.store("live", "t", zip("a.zip", b"1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Metadata(_)));
        assert!(target.exists());
        assert!(metrics::ORPHANS_TOTAL.get() > orphans_before);

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_stores_are_all_indexed() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = Arc::clone(&fx.registry);
            handles.push(tokio::spawn(async move {
                registry.store("file", &format!("t{i}"), zip("a.zip", format!("{i}").as_bytes())).await
            }));
        }
        for h in handles {
            h.await??;
        }

        let listing = fx.registry.list(Some("file")).await?;
        let names: Vec<&str> = listing[&Category::File].iter().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names.len(), 16);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }

    #[tokio::test]
    async fn reconcile_reports_drift() -> Result<(), anyhow::Error> {
        let fx = fixture().await?;
        fx.registry.store("live", "kept", zip("a.zip", b"1")).await?;
        fx.registry.store("live", "gone", zip("a.zip", b"2")).await?;
        tokio::fs::remove_file(fx.root.join("live").join("gone_a.zip")).await?;
        tokio::fs::write(fx.root.join("file").join("stray.zip"), b"3").await?;

        let report = fx.registry.reconcile().await?;
        assert_eq!(report[&Category::Live].orphan_files, Vec::<String>::new());
        assert_eq!(report[&Category::Live].missing_files, vec!["gone_a.zip".to_string()]);
        assert_eq!(report[&Category::File].orphan_files, vec!["stray.zip".to_string()]);
        assert!(report[&Category::File].missing_files.is_empty());

        let _ = tokio::fs::remove_dir_all(&fx.root).await;
        Ok(())
    }
}
