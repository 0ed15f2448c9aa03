//! Template registry: list, fetch and store archives per category while
//! keeping the metadata index in step with the files on disk.

pub mod category;
pub mod naming;
pub mod service;

pub use category::Category;
pub use service::{CategoryReconcile, ReconcileReport, TemplateInfo, TemplateListing, TemplateRegistry, Upload};
