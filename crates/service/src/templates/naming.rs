//! Stored filename derivation and path-component checks.

use std::path::{Component, Path};

use crate::errors::ServiceError;

/// Last path segment of an uploaded filename. Both separators are honoured
/// because browsers on Windows may send a full `C:\...` path.
pub fn base_name(original: &str) -> &str {
    original.rsplit(['/', '\\']).next().unwrap_or(original)
}

/// `.zip` check on the base name, case-insensitive. A bare `.zip` counts.
pub fn has_zip_extension(original: &str) -> bool {
    match base_name(original).rsplit_once('.') {
        Some((_, ext)) => ext.eq_ignore_ascii_case("zip"),
        None => false,
    }
}

/// `<display name>_<base name>` with spaces replaced by underscores.
///
/// Deterministic: the same display name and upload name always map to the same
/// stored file, so a second upload overwrites the first.
pub fn derive_stored_name(display_name: &str, original: &str) -> Result<String, ServiceError> {
    let name = format!(
        "{}_{}",
        display_name.replace(' ', "_"),
        base_name(original).replace(' ', "_")
    );
    ensure_single_component(&name)?;
    Ok(name)
}

/// Reject anything that would resolve outside its category directory.
pub fn ensure_single_component(name: &str) -> Result<(), ServiceError> {
    let invalid = || ServiceError::InvalidFileName(name.to_string());
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}
