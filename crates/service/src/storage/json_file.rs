use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::warn;

/// Outcome of reading a JSON document that is allowed to be absent or broken.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadOutcome<T> {
    Loaded(T),
    Missing,
    Corrupt,
}

impl<T: Default> LoadOutcome<T> {
    pub fn into_value(self) -> T {
        match self {
            LoadOutcome::Loaded(v) => v,
            LoadOutcome::Missing | LoadOutcome::Corrupt => T::default(),
        }
    }
}

/// Read and parse `path`. Read and parse errors are folded into the outcome.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> LoadOutcome<T> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Missing,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "json document unreadable; treating as empty");
            return LoadOutcome::Corrupt;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(v) => LoadOutcome::Loaded(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "json document unparsable; treating as empty");
            LoadOutcome::Corrupt
        }
    }
}

/// Serialize `value` as pretty JSON and replace `path` with it.
///
/// Writes a sibling temp file first and renames it over the target, so a
/// reader sees either the old or the new document.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let data = serde_json::to_vec_pretty(value).map_err(std::io::Error::other)?;
    let tmp = temp_sibling(path);
    if let Err(e) = fs::write(&tmp, &data).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// `.<name>.<uuid>.tmp` next to `path`.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()))
}
