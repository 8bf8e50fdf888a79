// # dnsbackup-core
//
// Core library for backing up DNS zones to a directory of JSON files.
//
// ## Architecture Overview
//
// - **DnsSource**: Trait for reading zones and records page by page
// - **fetch**: The shared pagination loop with termination guards
// - **snapshot**: Writing JSON files and pruning stale ones
// - **SnapshotCommitter**: Trait for recording the snapshot in version control
// - **vcs**: git implementation with a temporary ssh wrapper for push
// - **BackupEngine**: Orchestrates fetch → write → prune → commit
// - **SourceRegistry**: Plugin-based registry for DNS sources

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod registry;
pub mod snapshot;
pub mod traits;
pub mod vcs;

// Re-export core types for convenience
pub use config::{BackupConfig, ProviderConfig};
pub use engine::{BackupEngine, BackupReport};
pub use error::{Error, Result};
pub use registry::SourceRegistry;
pub use traits::{DnsSource, SnapshotCommitter};
