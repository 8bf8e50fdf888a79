//! Plugin-based source registry
//!
//! The registry allows DNS sources to be registered at runtime, so the
//! binary can pick a provider from configuration without hardcoding it.
//!
//! ## Registration
//!
//! Source crates expose a `register` function:
//!
//! ```rust,ignore
//! // In dnsbackup-provider-cloudflare
//! pub fn register(registry: &SourceRegistry) {
//!     registry.register_source("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsSource, DnsSourceFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry mapping source type names to factories
///
/// Uses interior mutability so that source crates can register through a
/// shared reference.
#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Box<dyn DnsSourceFactory>>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS source factory under `name` (e.g. "cloudflare")
    ///
    /// Registering the same name twice replaces the earlier factory.
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn DnsSourceFactory>) {
        let name = name.into();
        tracing::debug!("Registering DNS source: {}", name);
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name, factory);
    }

    /// Create a DNS source from configuration
    ///
    /// The factory is looked up by [`ProviderConfig::type_name`].
    pub fn create_source(&self, config: &ProviderConfig) -> Result<Box<dyn DnsSource>> {
        let source_type = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown DNS source type: {}", source_type)))?;

        factory.create(config)
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = sources.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }
}
