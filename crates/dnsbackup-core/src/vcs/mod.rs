// # Version Control
//
// Autocommit of the snapshot directory. Only git is supported.

pub mod git;
pub mod ssh_wrapper;

pub use git::{GIT_DIR_NAME, GIT_SSH_VAR, GitCommitter, autocommit_message};
pub use ssh_wrapper::SshWrapper;
