//! The tool registry: a typed, indexed catalog of tools with performance
//! telemetry and query-to-tool matching.

mod criteria;
mod error;
mod registry;
mod scoring;
mod snapshot;

pub use criteria::FindCriteria;
pub use error::RegistryError;
pub use registry::ToolRegistry;
pub use snapshot::{RegistrySnapshot, ToolSnapshotEntry};
