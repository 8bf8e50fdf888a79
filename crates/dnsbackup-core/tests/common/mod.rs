//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal sources and committers that record how the
//! engine drives them, plus helpers for throwaway git repositories.

#![allow(dead_code)]

use dnsbackup_core::config::{BackupConfig, ProviderConfig};
use dnsbackup_core::error::{Error, Result};
use dnsbackup_core::traits::{CommitOutcome, DnsSource, Page, Record, SnapshotCommitter, Zone};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Build a zone the way a provider would list it
pub fn zone(name: &str) -> Zone {
    let id = format!("id-{}", name);
    Zone::new(
        name,
        id.clone(),
        json!({"id": id, "name": name, "status": "active"}),
    )
}

/// Build `count` A records for `zone_name`
pub fn records(zone_name: &str, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record(json!({
                "id": format!("{}-{}", zone_name, i),
                "type": "A",
                "name": format!("host{}.{}", i, zone_name),
                "content": format!("192.0.2.{}", i % 250),
                "ttl": 300
            }))
        })
        .collect()
}

/// A DnsSource that serves fixed data in pages of `page_size`
pub struct ScriptedSource {
    zones: Vec<Zone>,
    records: HashMap<String, Vec<Record>>,
    page_size: usize,
    /// Offsets requested per listing ("zones" or the zone name)
    requests: Arc<Mutex<Vec<(String, usize)>>>,
}

impl ScriptedSource {
    pub fn new(page_size: usize) -> Self {
        Self {
            zones: Vec::new(),
            records: HashMap::new(),
            page_size,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a zone with `count` generated records
    pub fn with_zone(mut self, name: &str, count: usize) -> Self {
        self.zones.push(zone(name));
        self.records.insert(name.to_string(), records(name, count));
        self
    }

    /// Shared handle to the request log
    pub fn request_log(&self) -> Arc<Mutex<Vec<(String, usize)>>> {
        Arc::clone(&self.requests)
    }

    /// Expected records for a zone
    pub fn records_for(&self, name: &str) -> Vec<Record> {
        self.records.get(name).cloned().unwrap_or_default()
    }

    fn page<T: Clone>(&self, items: &[T], offset: usize) -> Page<T> {
        let end = (offset + self.page_size).min(items.len());
        let slice = items.get(offset..end).unwrap_or_default().to_vec();
        Page {
            items: slice,
            has_more: end < items.len(),
        }
    }
}

#[async_trait::async_trait]
impl DnsSource for ScriptedSource {
    async fn fetch_zone_page(&self, offset: usize) -> Result<Page<Zone>> {
        self.requests
            .lock()
            .unwrap()
            .push(("zones".to_string(), offset));
        Ok(self.page(&self.zones, offset))
    }

    async fn fetch_record_page(&self, zone: &Zone, offset: usize) -> Result<Page<Record>> {
        self.requests
            .lock()
            .unwrap()
            .push((zone.name.clone(), offset));
        let records = self
            .records
            .get(&zone.name)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone.name)))?;
        Ok(self.page(records, offset))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A DnsSource whose record listing never finishes
pub struct EndlessSource;

#[async_trait::async_trait]
impl DnsSource for EndlessSource {
    async fn fetch_zone_page(&self, _offset: usize) -> Result<Page<Zone>> {
        Ok(Page::last(vec![zone("example.com")]))
    }

    async fn fetch_record_page(&self, zone: &Zone, offset: usize) -> Result<Page<Record>> {
        Ok(Page::more(records(&zone.name, 1 + offset % 2)))
    }

    fn source_name(&self) -> &'static str {
        "endless"
    }
}

/// A DnsSource that fails every request
pub struct FailingSource;

#[async_trait::async_trait]
impl DnsSource for FailingSource {
    async fn fetch_zone_page(&self, _offset: usize) -> Result<Page<Zone>> {
        Err(Error::auth("Invalid API token"))
    }

    async fn fetch_record_page(&self, _zone: &Zone, _offset: usize) -> Result<Page<Record>> {
        Err(Error::auth("Invalid API token"))
    }

    fn source_name(&self) -> &'static str {
        "failing"
    }
}

/// A committer that counts calls and reports nothing to commit
pub struct CountingCommitter {
    calls: Arc<AtomicUsize>,
}

impl CountingCommitter {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait::async_trait]
impl SnapshotCommitter for CountingCommitter {
    async fn commit(&self, _dir: &Path) -> Result<CommitOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CommitOutcome::NothingToCommit)
    }

    fn metadata_dir_name(&self) -> &'static str {
        ".git"
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Configuration pointing at `dir` with a dummy Cloudflare provider
pub fn config_for(dir: &Path) -> BackupConfig {
    BackupConfig::new(
        ProviderConfig::Cloudflare {
            email: "ops@example.com".to_string(),
            api_token: "test-token".to_string(),
            base_url: None,
        },
        dir,
    )
}

/// Sorted file names directly under `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Whether a usable git binary is on PATH
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git runs");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Initialise a repository with a local identity and no signing
pub fn init_repo(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--quiet"]);
    git(dir, &["config", "user.name", "Backup Test"]);
    git(dir, &["config", "user.email", "backup@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Number of commits reachable from HEAD (0 on an unborn branch)
pub fn commit_count(dir: &Path) -> usize {
    let output = Command::new("git")
        .args(["rev-list", "--count", "HEAD"])
        .current_dir(dir)
        .output()
        .expect("git runs");
    if !output.status.success() {
        return 0;
    }
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .unwrap_or(0)
}

/// A dummy private key file inside `dir`
pub fn dummy_key(dir: &Path) -> PathBuf {
    let key = dir.join("id_rsa");
    std::fs::write(&key, "not a real key\n").unwrap();
    key
}
