//! Service layer of the template registry.
//! - `storage` persists the metadata index as a single JSON document.
//! - `file` owns placement of template archives under the storage root.
//! - `templates` combines both behind the list/fetch/store operations.

pub mod errors;
pub mod metrics;
pub mod runtime;
pub mod storage;
pub mod file;
pub mod templates;
