use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::ServiceError;
use crate::storage::json_file::temp_sibling;
use crate::templates::naming::ensure_single_component;
use crate::templates::Category;

/// An opened template archive ready to be streamed.
#[derive(Debug)]
pub struct StoredFile {
    pub file_name: String,
    pub len: u64,
    pub file: fs::File,
}

/// Category-scoped directories under a single storage root.
#[derive(Clone, Debug)]
pub struct TemplateFiles {
    root: PathBuf,
}

impl TemplateFiles {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, category: Category) -> PathBuf {
        self.root.join(category.as_str())
    }

    /// `root/<category>/<name>`; `name` must be a single path component.
    pub fn path_for(&self, category: Category, name: &str) -> Result<PathBuf, ServiceError> {
        ensure_single_component(name)?;
        Ok(self.dir(category).join(name))
    }

    /// Write `bytes` to the category directory, replacing any existing file.
    pub async fn write(&self, category: Category, name: &str, bytes: &[u8]) -> Result<PathBuf, ServiceError> {
        let target = self.path_for(category, name)?;
        let tmp = temp_sibling(&target);
        if let Err(e) = fs::write(&tmp, bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::storage(e));
        }
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::storage(e));
        }
        Ok(target)
    }

    /// Open a regular file for reading. Anything else, including an
    /// in-flight temp file, is `NotFound`.
    pub async fn open(&self, category: Category, name: &str) -> Result<StoredFile, ServiceError> {
        if is_temp_name(name) {
            return Err(ServiceError::NotFound);
        }
        let path = self.path_for(category, name).map_err(|_| ServiceError::NotFound)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(ServiceError::NotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ServiceError::NotFound),
            Err(e) => return Err(ServiceError::storage(e)),
        };
        let file = fs::File::open(&path).await.map_err(ServiceError::storage)?;
        Ok(StoredFile { file_name: name.to_string(), len: meta.len(), file })
    }

    pub async fn remove(&self, category: Category, name: &str) -> std::io::Result<()> {
        let path = self.dir(category).join(name);
        fs::remove_file(path).await
    }

    /// Names of the regular files in a category directory, sorted.
    /// In-flight temp files are skipped; a missing directory lists as empty.
    pub async fn list_names(&self, category: Category) -> Result<Vec<String>, ServiceError> {
        let mut dir = match fs::read_dir(self.dir(category)).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ServiceError::storage(e)),
        };
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(ServiceError::storage)? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_file && !is_temp_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".tmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use uuid::Uuid;

    async fn scratch() -> Result<TemplateFiles, anyhow::Error> {
        let root = std::env::temp_dir().join(format!("svc_files_{}", Uuid::new_v4()));
        for c in Category::ALL {
            fs::create_dir_all(root.join(c.as_str())).await?;
        }
        Ok(TemplateFiles::new(root))
    }

    #[tokio::test]
    async fn write_open_and_list() -> Result<(), anyhow::Error> {
        let files = scratch().await?;
        let path = files.write(Category::Live, "a.zip", b"PK\x03\x04").await?;
        assert_eq!(path, files.root().join("live").join("a.zip"));

        let mut stored = files.open(Category::Live, "a.zip").await?;
        assert_eq!(stored.len, 4);
        let mut buf = Vec::new();
        stored.file.read_to_end(&mut buf).await?;
        assert_eq!(buf, b"PK\x03\x04");

        assert_eq!(files.list_names(Category::Live).await?, vec!["a.zip".to_string()]);
        assert!(files.list_names(Category::File).await?.is_empty());

        let _ = fs::remove_dir_all(files.root()).await;
        Ok(())
    }

    #[tokio::test]
    async fn open_rejects_directories_and_traversal() -> Result<(), anyhow::Error> {
        let files = scratch().await?;
        fs::create_dir_all(files.dir(Category::File).join("sub.zip")).await?;
        fs::write(files.root().join("metadata.json"), b"{}").await?;

        assert!(matches!(files.open(Category::File, "sub.zip").await, Err(ServiceError::NotFound)));
        assert!(matches!(files.open(Category::File, "..").await, Err(ServiceError::NotFound)));
        assert!(matches!(files.open(Category::File, "../metadata.json").await, Err(ServiceError::NotFound)));
        assert!(matches!(files.open(Category::File, "nope.zip").await, Err(ServiceError::NotFound)));

        let _ = fs::remove_dir_all(files.root()).await;
        Ok(())
    }

    #[tokio::test]
    async fn temp_files_are_neither_listed_nor_served() -> Result<(), anyhow::Error> {
        let files = scratch().await?;
        let tmp = format!(".a.zip.{}.tmp", Uuid::new_v4());
        fs::write(files.dir(Category::Live).join(&tmp), b"partial").await?;

        assert!(files.list_names(Category::Live).await?.is_empty());
        assert!(matches!(files.open(Category::Live, &tmp).await, Err(ServiceError::NotFound)));

        let _ = fs::remove_dir_all(files.root()).await;
        Ok(())
    }

    #[tokio::test]
    async fn write_into_missing_category_dir_is_storage_error() -> Result<(), anyhow::Error> {
        let files = TemplateFiles::new(std::env::temp_dir().join(format!("svc_files_none_{}", Uuid::new_v4())));
        let err = files.write(Category::Live, "a.zip", b"x").await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(files.list_names(Category::Live).await?.is_empty());
        Ok(())
    }
}
