//! Core traits for the backup system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsSource`]: Read zones and records page by page from a provider API
//! - [`SnapshotCommitter`]: Record a finished snapshot in version control

pub mod committer;
pub mod dns_source;

pub use committer::{CommitOutcome, SnapshotCommitter};
pub use dns_source::{DnsSource, DnsSourceFactory, Page, Record, Zone};
