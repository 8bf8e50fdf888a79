//! git autocommit for snapshot directories
//!
//! Stages untracked, modified and deleted files, commits when the index
//! differs from `HEAD`, and pushes with a dedicated ssh key.
//!
//! Every git child gets its working directory and `GIT_SSH` set on the
//! command itself; the process-wide environment and current directory are
//! never modified. Every exit status is checked and a failing git command
//! surfaces as [`Error::Vcs`].

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::VcsConfig;
use crate::traits::{CommitOutcome, SnapshotCommitter};
use crate::vcs::SshWrapper;
use crate::Error;

/// Environment variable git reads to pick the ssh command
pub const GIT_SSH_VAR: &str = "GIT_SSH";

/// Name of git's metadata directory
pub const GIT_DIR_NAME: &str = ".git";

/// Commits snapshot directories that are git work trees
#[derive(Debug, Clone)]
pub struct GitCommitter {
    config: VcsConfig,
}

impl GitCommitter {
    /// Create a committer from VCS settings
    pub fn new(config: VcsConfig) -> Self {
        Self { config }
    }

    /// Run git in `dir`, returning its output whatever the exit status
    async fn git<I, S>(&self, dir: &Path, ssh: Option<&Path>, args: I) -> Result<Output, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();

        let mut cmd = Command::new(&self.config.git_program);
        cmd.args(&args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null());
        if let Some(wrapper) = ssh {
            cmd.env(GIT_SSH_VAR, wrapper);
        }

        tracing::trace!("Running git {}", describe(&args));

        cmd.output().await.map_err(|e| self.spawn_error(&args, e))
    }

    /// Run git in `dir` with `input` on stdin and fail unless it exits
    /// successfully
    async fn git_checked_with_input(
        &self,
        dir: &Path,
        args: &[&str],
        input: &[u8],
    ) -> Result<Output, Error> {
        let args: Vec<OsString> = args.iter().map(|a| OsString::from(*a)).collect();

        let mut child = Command::new(&self.config.git_program)
            .args(&args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(&args, e))?;

        tracing::trace!("Running git {} with {} byte(s) on stdin", describe(&args), input.len());

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .await
                .map_err(|e| self.spawn_error(&args, e))?;
            // Closing stdin ends the pathspec list
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_error(&args, e))?;

        if !output.status.success() {
            return Err(Error::vcs(format!(
                "git {} failed with {}: {}",
                describe(&args),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output)
    }

    fn spawn_error(&self, args: &[OsString], e: std::io::Error) -> Error {
        Error::vcs(format!(
            "Failed to run {} {}: {}",
            self.config.git_program,
            describe(args),
            e
        ))
    }

    /// Run git in `dir` and fail unless it exits successfully
    async fn git_checked<I, S>(
        &self,
        dir: &Path,
        ssh: Option<&Path>,
        args: I,
    ) -> Result<Output, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let output = self.git(dir, ssh, &args).await?;

        if !output.status.success() {
            return Err(Error::vcs(format!(
                "git {} failed with {}: {}",
                describe(&args),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output)
    }

    /// Untracked (respecting ignore rules), modified and deleted paths as a
    /// NUL-separated list
    async fn changed_paths(&self, dir: &Path) -> Result<Vec<u8>, Error> {
        let output = self
            .git_checked(
                dir,
                None,
                ["ls-files", "--exclude-standard", "--others", "--modified", "-z"],
            )
            .await?;
        Ok(output.stdout)
    }

    /// Whether the index differs from `HEAD`
    async fn has_staged_changes(&self, dir: &Path) -> Result<bool, Error> {
        let output = self.git(dir, None, ["diff", "--cached", "--quiet"]).await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Error::vcs(format!(
                "git diff --cached failed with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }

    async fn commit_with(&self, dir: &Path, ssh: Option<&Path>) -> Result<CommitOutcome, Error> {
        // Paths go through stdin to stay clear of ARG_MAX
        let changed = self.changed_paths(dir).await?;
        let count = count_nul_separated(&changed);
        if count > 0 {
            tracing::debug!("Staging {} changed path(s)", count);
            self.git_checked_with_input(
                dir,
                &[
                    "--literal-pathspecs",
                    "add",
                    "--pathspec-from-file=-",
                    "--pathspec-file-nul",
                ],
                &changed,
            )
            .await?;
        }

        if !self.has_staged_changes(dir).await? {
            tracing::info!("No changes to commit in {}", dir.display());
            return Ok(CommitOutcome::NothingToCommit);
        }

        let message = autocommit_message(chrono::Local::now());
        self.git_checked(dir, None, ["commit", "--quiet", "-a", "-m", message.as_str()])
            .await?;
        tracing::info!("Committed snapshot: {}", message);

        if !self.config.push {
            tracing::debug!("Push disabled; leaving commit local");
            return Ok(CommitOutcome::Committed {
                message,
                pushed: false,
            });
        }

        self.git_checked(dir, ssh, ["push", "--quiet"]).await?;
        tracing::info!("Pushed snapshot commit");

        Ok(CommitOutcome::Committed {
            message,
            pushed: true,
        })
    }
}

#[async_trait]
impl SnapshotCommitter for GitCommitter {
    async fn commit(&self, dir: &Path) -> Result<CommitOutcome, Error> {
        let wrapper = if self.config.push {
            Some(SshWrapper::create(
                &self.config.ssh_program,
                &self.config.ssh_key,
                self.config.wrapper_dir.as_deref(),
            )?)
        } else {
            None
        };

        let result = self
            .commit_with(dir, wrapper.as_ref().map(SshWrapper::path))
            .await;

        if let Some(wrapper) = wrapper
            && let Err(e) = wrapper.remove()
        {
            tracing::warn!("{}", e);
        }

        result
    }

    fn metadata_dir_name(&self) -> &'static str {
        GIT_DIR_NAME
    }
}

/// `Autocommit at <local time>`
pub fn autocommit_message<Tz>(now: chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("Autocommit at {}", now.format("%Y-%m-%d %H:%M:%S %z"))
}

fn count_nul_separated(bytes: &[u8]) -> usize {
    bytes.split(|b| *b == 0).filter(|name| !name.is_empty()).count()
}

fn describe(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
