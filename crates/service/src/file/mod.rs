//! Filesystem placement of template archives.

pub mod template_files;

pub use template_files::{StoredFile, TemplateFiles};
