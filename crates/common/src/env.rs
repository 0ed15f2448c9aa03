//! Environment/runtime helpers
//!
//! Sanity checks to ensure the storage layout exists at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the storage root and one subdirectory per name exist.
pub async fn ensure_storage_dirs(root: &Path, subdirs: &[&str]) -> anyhow::Result<()> {
    if tokio::fs::metadata(root).await.is_err() {
        warn!(root = %root.display(), "storage root not found; creating it");
    }
    for sub in subdirs {
        let dir = root.join(sub);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    }
    info!(root = %root.display(), dirs = subdirs.len(), "storage layout ready");
    Ok(())
}

/// Ensure the parent directory of a file path exists.
pub async fn ensure_parent_dir(file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    }
    Ok(())
}
