// # Snapshot Directory
//
// Writing the JSON snapshot and pruning what the current run did not write.

pub mod reconcile;
pub mod writer;

pub use reconcile::{PruneReport, reconcile};
pub use writer::{ZONES_FILE, ensure_dir, write_json, zone_file_name};
