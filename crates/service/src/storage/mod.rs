//! Storage abstractions for the service layer
//!
//! Whole-document JSON persistence and the metadata index built on it.

pub mod json_file;
pub mod metadata_store;

pub use metadata_store::{JsonMetadataStore, MetadataDocument, MetadataStore};
