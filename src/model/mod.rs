//! Repository data model: plugins, categories, and repository snapshots.
//!
//! Types mirror the remote `plugin-repository` XML format and carry serde
//! derives that map field names onto it.

mod error;
mod plugin;
mod repository;

pub use error::ManifestError;
pub use plugin::{Compatibility, Plugin, Vendor};
pub use repository::{Category, ROOT_ELEMENT, Repository};
