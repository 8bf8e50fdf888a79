// # DNS Source Trait
//
// Defines the interface for reading zones and records from a DNS provider API.
//
// ## Implementations
//
// - Cloudflare: `dnsbackup-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsbackup_core::fetch::{fetch_all_records, fetch_all_zones};
//
// let zones = fetch_all_zones(&source, 1000).await?;
// for zone in &zones {
//     let records = fetch_all_records(&source, zone, 1000).await?;
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page, in provider order
    pub items: Vec<T>,
    /// Whether the provider has more items past this page
    pub has_more: bool,
}

impl<T> Page<T> {
    /// A page with more items after it
    pub fn more(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: true,
        }
    }

    /// The final page of a listing
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: false,
        }
    }
}

/// A DNS zone as listed by the provider
///
/// Identity is the zone name. The provider's zone object is kept verbatim in
/// `raw` and is what gets serialized into the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Zone name (e.g. "example.com")
    pub name: String,
    /// Provider-specific zone identifier used for record listing
    pub id: String,
    /// The zone object exactly as the provider returned it
    pub raw: serde_json::Value,
}

impl Zone {
    /// Create a zone
    pub fn new(name: impl Into<String>, id: impl Into<String>, raw: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            raw,
        }
    }
}

impl Serialize for Zone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// A DNS record, stored and serialized without normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub serde_json::Value);

/// Trait for DNS source implementations
///
/// A source serves single pages; the pagination loop lives in
/// [`crate::fetch`] so that every source shares the same termination guards.
///
/// # Errors
///
/// Sources do not retry. Transport and API errors are returned as-is and
/// abort the backup run.
#[async_trait]
pub trait DnsSource: Send + Sync {
    /// Fetch the page of zones starting at `offset` (number of zones already
    /// collected)
    async fn fetch_zone_page(&self, offset: usize) -> Result<Page<Zone>, crate::Error>;

    /// Fetch the page of records for `zone` starting at `offset` (number of
    /// records already collected)
    async fn fetch_record_page(
        &self,
        zone: &Zone,
        offset: usize,
    ) -> Result<Page<Record>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS sources from configuration
pub trait DnsSourceFactory: Send + Sync {
    /// Create a DnsSource instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsSource>, crate::Error>;
}
