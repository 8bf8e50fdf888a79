//! Temporary `GIT_SSH` wrapper script
//!
//! git invokes `$GIT_SSH <host> <command...>` without a way to pass extra
//! flags, so pushing with a dedicated key needs a tiny script that execs
//! ssh with `-i <key>`. The script lives in an owner-only (0700) temporary
//! file that is removed when the wrapper is dropped or explicitly removed.

use std::io::Write;
use std::path::Path;
use tempfile::TempPath;

use crate::Error;

/// An ssh wrapper script on disk
#[derive(Debug)]
pub struct SshWrapper {
    path: TempPath,
}

impl SshWrapper {
    /// Write a wrapper that runs `ssh_program -i <key> "$@"`
    ///
    /// `key` must exist; it is canonicalized so the script works from any
    /// working directory. The script is created in `dir`, or in the system
    /// temp dir when `dir` is `None`. The file handle is closed before this
    /// returns, so the script can be executed right away.
    pub fn create(ssh_program: &str, key: &Path, dir: Option<&Path>) -> Result<Self, Error> {
        let key = std::fs::canonicalize(key).map_err(|e| {
            Error::config(format!("SSH key {} is not accessible: {}", key.display(), e))
        })?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("git-ssh");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| Error::vcs(format!("Failed to create ssh wrapper: {}", e)))?;

        let script = render_script(ssh_program, &key.to_string_lossy());
        file.write_all(script.as_bytes())?;
        file.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o700))?;
        }

        let path = file.into_temp_path();
        tracing::debug!("Created ssh wrapper {}", path.display());
        Ok(Self { path })
    }

    /// Location of the script, suitable for `GIT_SSH`
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the script now, reporting failures instead of ignoring them
    pub fn remove(self) -> Result<(), Error> {
        let shown = self.path.display().to_string();
        self.path
            .close()
            .map_err(|e| Error::vcs(format!("Failed to remove ssh wrapper {}: {}", shown, e)))?;
        tracing::debug!("Removed ssh wrapper {}", shown);
        Ok(())
    }
}

fn render_script(ssh_program: &str, key: &str) -> String {
    format!(
        "#!/bin/sh\nexec {} -i {} \"$@\"\n",
        shell_quote(ssh_program),
        shell_quote(key)
    )
}

/// Single-quote `value` for /bin/sh
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
