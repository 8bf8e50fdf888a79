//! Backup engine
//!
//! The BackupEngine runs one backup cycle:
//! - Fetches every zone and every zone's records from the DnsSource
//! - Writes `zones.json` and one `<zone>.zone.json` per zone
//! - Prunes files the run did not write
//! - Commits the directory when it is already a repository
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐   zones, records   ┌──────────────┐
//! │  DnsSource  │ ─────────────────► │ BackupEngine │
//! └─────────────┘                    └──────────────┘
//!                                            │
//!         ┌──────────────────────────────────┼──────────────────────────┐
//!         ▼                                  ▼                          ▼
//! ┌───────────────┐                ┌──────────────────┐      ┌───────────────────┐
//! │ write_json    │                │ reconcile        │      │ SnapshotCommitter │
//! │ (snapshot)    │                │ (prune stale)    │      │ (if .git exists)  │
//! └───────────────┘                └──────────────────┘      └───────────────────┘
//! ```
//!
//! Everything runs sequentially on the caller's task. Fetch and filesystem
//! errors abort the run before the directory is committed.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::BackupConfig;
use crate::error::Result;
use crate::fetch::{fetch_all_records, fetch_all_zones};
use crate::snapshot::{self, PruneReport, ZONES_FILE};
use crate::traits::{CommitOutcome, DnsSource, Record, SnapshotCommitter, Zone};
use crate::vcs::{GIT_DIR_NAME, GitCommitter};

/// Summary of one backup run
#[derive(Debug, Clone, PartialEq)]
pub struct BackupReport {
    /// Number of zones fetched
    pub zones: usize,
    /// Number of records fetched across all zones
    pub records: usize,
    /// Files written this run
    pub written: Vec<PathBuf>,
    /// What the reconcile pass removed
    pub pruned: PruneReport,
    /// Commit result; `None` when no commit was attempted
    pub commit: Option<CommitOutcome>,
}

/// Core backup engine
pub struct BackupEngine {
    source: Box<dyn DnsSource>,
    committer: Option<Box<dyn SnapshotCommitter>>,
    config: BackupConfig,
}

impl BackupEngine {
    /// Create an engine with an explicit committer
    ///
    /// Pass `None` to never commit.
    pub fn new(
        source: Box<dyn DnsSource>,
        committer: Option<Box<dyn SnapshotCommitter>>,
        config: BackupConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            committer,
            config,
        })
    }

    /// Create an engine that commits with git when `config.vcs.enabled`
    pub fn from_config(source: Box<dyn DnsSource>, config: BackupConfig) -> Result<Self> {
        let committer: Option<Box<dyn SnapshotCommitter>> = if config.vcs.enabled {
            Some(Box::new(GitCommitter::new(config.vcs.clone())))
        } else {
            None
        };
        Self::new(source, committer, config)
    }

    /// Get the configuration
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Run one backup cycle
    pub async fn run(&self) -> Result<BackupReport> {
        let dir = self.config.target_dir.as_path();
        let max_pages = self.config.fetch.max_pages;

        tracing::info!(
            "Starting backup of {} into {}",
            self.source.source_name(),
            dir.display()
        );

        snapshot::ensure_dir(dir).await?;

        // Fetch everything before touching any file
        let zones = fetch_all_zones(self.source.as_ref(), max_pages).await?;
        let mut zone_records: Vec<(String, Vec<Record>)> = Vec::with_capacity(zones.len());
        for zone in &zones {
            let file_name = snapshot::zone_file_name(&zone.name)?;
            let records = fetch_all_records(self.source.as_ref(), zone, max_pages).await?;
            zone_records.push((file_name, records));
        }
        warn_duplicate_names(&zones);

        let mut written = Vec::with_capacity(zone_records.len() + 1);
        written.push(snapshot::write_json(dir, ZONES_FILE, &zones).await?);
        for (file_name, records) in &zone_records {
            written.push(snapshot::write_json(dir, file_name, records).await?);
        }

        let record_count: usize = zone_records.iter().map(|(_, r)| r.len()).sum();
        tracing::info!(
            "Wrote {} zone(s) with {} record(s)",
            zones.len(),
            record_count
        );

        let metadata_name = self
            .committer
            .as_ref()
            .map_or(GIT_DIR_NAME, |c| c.metadata_dir_name());
        let written_set: HashSet<PathBuf> = written.iter().cloned().collect();
        let pruned = snapshot::reconcile(
            dir,
            &written_set,
            metadata_name,
            self.config.snapshot.prune_empty_dirs,
        )
        .await?;

        let has_metadata = tokio::fs::try_exists(dir.join(metadata_name)).await?;
        let commit = match &self.committer {
            Some(committer) if has_metadata => Some(committer.commit(dir).await?),
            Some(_) => {
                tracing::debug!(
                    "{} has no {}; skipping commit",
                    dir.display(),
                    metadata_name
                );
                None
            }
            None => None,
        };

        tracing::info!("Backup complete");

        Ok(BackupReport {
            zones: zones.len(),
            records: record_count,
            written,
            pruned,
            commit,
        })
    }
}

fn warn_duplicate_names(zones: &[Zone]) {
    let mut seen = HashSet::new();
    for zone in zones {
        if !seen.insert(zone.name.as_str()) {
            tracing::warn!(
                "Zone {} listed more than once; its file holds the last listing",
                zone.name
            );
        }
    }
}
