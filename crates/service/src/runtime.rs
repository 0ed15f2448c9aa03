//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so binary crates can prepare the storage
//! layout without knowing the category list.

use std::path::Path;

use crate::templates::Category;

/// Ensure the storage root and one directory per category exist.
pub async fn ensure_layout(root: &Path, metadata_file: &Path) -> anyhow::Result<()> {
    let dirs: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    common::env::ensure_storage_dirs(root, &dirs).await?;
    common::env::ensure_parent_dir(metadata_file).await
}
