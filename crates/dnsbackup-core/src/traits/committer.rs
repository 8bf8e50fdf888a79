// # Snapshot Committer Trait
//
// Defines the interface for recording a finished snapshot directory in
// version control.
//
// ## Implementations
//
// - git: [`crate::vcs::GitCommitter`]

use async_trait::async_trait;
use std::path::Path;

/// Result of a commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The staged tree matched the last commit; nothing was committed or pushed
    NothingToCommit,
    /// A commit was created
    Committed {
        /// The commit message used
        message: String,
        /// Whether the commit was pushed to the configured remote
        pushed: bool,
    },
}

/// Trait for committing a snapshot directory
///
/// Called only when the directory already holds repository metadata. A
/// committer never initializes a repository.
#[async_trait]
pub trait SnapshotCommitter: Send + Sync {
    /// Stage, commit and (optionally) push all changes under `dir`
    async fn commit(&self, dir: &Path) -> Result<CommitOutcome, crate::Error>;

    /// Name of the metadata entry that marks `dir` as a repository
    /// (e.g. ".git"); the reconciler never touches it
    fn metadata_dir_name(&self) -> &'static str;
}
