// # Cloudflare DNS Source
//
// This crate reads zones and DNS records from the Cloudflare API v4 for the
// backup engine.
//
// - Serves one page per call; the pagination loop and its termination
//   guards live in `dnsbackup_core::fetch`
// - No retry, backoff or caching: errors go straight back to the engine,
//   which aborts the run
// - HTTP timeout of 30 seconds
// - Status codes map to typed errors (401/403, 404, 429, 5xx)
//
// ## Authentication
//
// With an account email the credential is sent as a global API key
// (`X-Auth-Email` + `X-Auth-Key`); without one it is sent as an API token
// (`Authorization: Bearer`). The credential never appears in logs or Debug
// output.
//
// ## API Reference
//
// - List Zones: GET `/zones?page=N&per_page=M`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=N&per_page=M`

use async_trait::async_trait;
use dnsbackup_core::config::ProviderConfig;
use dnsbackup_core::traits::{DnsSource, DnsSourceFactory, Page, Record, Zone};
use dnsbackup_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Zones requested per page
const ZONES_PER_PAGE: usize = 50;

/// Records requested per page
const RECORDS_PER_PAGE: usize = 100;

/// Smallest `per_page` the API honours on either listing
const MIN_PER_PAGE: usize = 5;

/// Largest `per_page` the zone listing honours
const MAX_ZONES_PER_PAGE: usize = 50;

/// Largest `per_page` the DNS record listing honours
const MAX_RECORDS_PER_PAGE: usize = 5_000_000;

/// Response envelope shared by all v4 endpoints
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    page: usize,
    #[serde(default)]
    total_pages: usize,
}

impl ApiEnvelope {
    /// Turn a `success: false` envelope into an error and hand back the
    /// result array otherwise
    fn into_items(self, what: &str) -> Result<(Vec<Value>, bool)> {
        if !self.success {
            let errors: Vec<String> = self
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect();
            return Err(Error::provider(
                "cloudflare",
                format!("{} failed: {}", what, errors.join(", ")),
            ));
        }

        let has_more = self
            .result_info
            .as_ref()
            .is_some_and(|info| info.page < info.total_pages);

        match self.result {
            Value::Array(items) => Ok((items, has_more)),
            _ => Err(Error::provider(
                "cloudflare",
                format!("Invalid response format for {}: result is not an array", what),
            )),
        }
    }
}

/// Cloudflare DNS source
pub struct CloudflareSource {
    /// Account email for global API key auth; bearer token auth when `None`
    email: Option<String>,

    /// Cloudflare API key or token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    zones_per_page: usize,
    records_per_page: usize,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareSource")
            .field("email", &self.email)
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareSource {
    /// Create a new Cloudflare source
    ///
    /// # Parameters
    ///
    /// - `email`: Account email; empty selects bearer token auth
    /// - `api_token`: Global API key (with email) or API token with
    ///   Zone:Read and DNS:Read permissions
    /// - `base_url`: Override for the API base URL
    pub fn new(
        email: impl Into<String>,
        api_token: impl Into<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let email = Some(email.into()).filter(|e| !e.is_empty());

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            email,
            api_token,
            base_url,
            client,
            zones_per_page: ZONES_PER_PAGE,
            records_per_page: RECORDS_PER_PAGE,
        })
    }

    /// Override the page sizes
    ///
    /// Values outside the range the API accepts are clamped.
    pub fn with_page_sizes(mut self, zones_per_page: usize, records_per_page: usize) -> Self {
        self.zones_per_page = zones_per_page.clamp(MIN_PER_PAGE, MAX_ZONES_PER_PAGE);
        self.records_per_page = records_per_page.clamp(MIN_PER_PAGE, MAX_RECORDS_PER_PAGE);
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.email {
            Some(email) => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", &self.api_token),
            None => request.bearer_auth(&self.api_token),
        }
    }

    /// GET one page of a listing endpoint
    async fn get_page(
        &self,
        path: &str,
        offset: usize,
        per_page: usize,
        what: &str,
    ) -> Result<(Vec<Value>, bool)> {
        let page = page_for_offset(offset, per_page)?;
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!("Fetching {} page {} (per_page={})", what, page, per_page);

        let response = self
            .authorize(self.client.get(&url))
            .query(&[("page", page), ("per_page", per_page)])
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("Request for {} failed: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status.as_u16(), &error_text, what));
        }

        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {}", e)))?;

        envelope.into_items(what)
    }
}

#[async_trait]
impl DnsSource for CloudflareSource {
    async fn fetch_zone_page(&self, offset: usize) -> Result<Page<Zone>> {
        let (items, has_more) = self
            .get_page("/zones", offset, self.zones_per_page, "zone list")
            .await?;
        let zones = items.into_iter().map(parse_zone).collect::<Result<Vec<_>>>()?;
        Ok(Page { items: zones, has_more })
    }

    async fn fetch_record_page(&self, zone: &Zone, offset: usize) -> Result<Page<Record>> {
        let path = format!("/zones/{}/dns_records", zone.id);
        let what = format!("records of {}", zone.name);
        let (items, has_more) = self
            .get_page(&path, offset, self.records_per_page, &what)
            .await?;
        Ok(Page {
            items: items.into_iter().map(Record).collect(),
            has_more,
        })
    }

    fn source_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// 1-based page number holding item `offset`
///
/// Offsets come from the pagination loop and are always whole pages; a
/// partial offset would re-read a page and duplicate items.
fn page_for_offset(offset: usize, per_page: usize) -> Result<usize> {
    if offset % per_page != 0 {
        return Err(Error::pagination(format!(
            "Offset {} is not a multiple of the page size {}",
            offset, per_page
        )));
    }
    Ok(offset / per_page + 1)
}

fn parse_zone(raw: Value) -> Result<Zone> {
    let name = raw["name"]
        .as_str()
        .ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: zone.name is not a string")
        })?
        .to_string();
    let id = raw["id"]
        .as_str()
        .ok_or_else(|| {
            Error::provider("cloudflare", "Invalid response format: zone.id is not a string")
        })?
        .to_string();
    Ok(Zone::new(name, id, raw))
}

/// Map a non-success HTTP status to an error
fn status_error(status: u16, error_text: &str, what: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "Invalid API credentials or insufficient permissions for {}. Status: {}",
            what, status
        )),
        404 => Error::not_found(format!("{}: {}", what, error_text)),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded while fetching {}. Status: {}",
            what, status
        )),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("Fetching {} failed: {} - {}", what, status, error_text),
        ),
    }
}

/// Factory for creating Cloudflare sources
pub struct CloudflareFactory;

impl DnsSourceFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsSource>> {
        match config {
            ProviderConfig::Cloudflare {
                email,
                api_token,
                base_url,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }
                if email.is_empty() {
                    tracing::debug!("No account email given; using bearer token auth");
                }
                Ok(Box::new(CloudflareSource::new(
                    email.clone(),
                    api_token.clone(),
                    base_url.clone(),
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare source")),
        }
    }
}

/// Register the Cloudflare source with a registry
///
/// # Example
///
/// ```rust
/// use dnsbackup_core::SourceRegistry;
///
/// let registry = SourceRegistry::new();
/// dnsbackup_provider_cloudflare::register(&registry);
/// assert!(registry.has_source("cloudflare"));
/// ```
pub fn register(registry: &dnsbackup_core::SourceRegistry) {
    registry.register_source("cloudflare", Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn cloudflare_config(email: &str, token: &str) -> ProviderConfig {
        ProviderConfig::Cloudflare {
            email: email.to_string(),
            api_token: token.to_string(),
            base_url: None,
        }
    }

    #[test]
    fn test_factory_creation() {
        let source = CloudflareFactory.create(&cloudflare_config("ops@example.com", "key"));
        assert!(source.is_ok());
    }

    #[test]
    fn test_factory_missing_token() {
        let source = CloudflareFactory.create(&cloudflare_config("ops@example.com", ""));
        assert!(source.is_err());
    }

    #[test]
    fn test_factory_rejects_other_config() {
        let config = ProviderConfig::Custom {
            factory: "other".to_string(),
            config: json!({}),
        };
        assert!(CloudflareFactory.create(&config).is_err());
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let source = CloudflareSource::new("ops@example.com", "secret_token_12345", None).unwrap();
        let debug_str = format!("{:?}", source);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareSource"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source =
            CloudflareSource::new("", "token", Some("http://127.0.0.1:1/v4/".to_string()))
                .unwrap();
        assert_eq!(source.base_url, "http://127.0.0.1:1/v4");
        assert!(source.email.is_none());
    }

    #[test]
    fn test_page_sizes_clamped_to_api_range() {
        let source = CloudflareSource::new("", "token", None)
            .unwrap()
            .with_page_sizes(2, 0);
        assert_eq!(source.zones_per_page, 5);
        assert_eq!(source.records_per_page, 5);

        let source = CloudflareSource::new("", "token", None)
            .unwrap()
            .with_page_sizes(500, 1000);
        assert_eq!(source.zones_per_page, 50);
        assert_eq!(source.records_per_page, 1000);
    }

    #[test]
    fn test_page_for_offset() {
        assert_eq!(page_for_offset(0, 100).unwrap(), 1);
        assert_eq!(page_for_offset(100, 100).unwrap(), 2);
        assert_eq!(page_for_offset(300, 100).unwrap(), 4);
        assert!(page_for_offset(150, 100).is_err());
    }

    #[test]
    fn test_envelope_has_more_from_result_info() {
        let envelope: ApiEnvelope = serde_json::from_value(json!({
            "success": true,
            "errors": [],
            "result": [{"id": "1"}, {"id": "2"}],
            "result_info": {"page": 1, "per_page": 2, "count": 2, "total_count": 3, "total_pages": 2}
        }))
        .unwrap();
        let (items, has_more) = envelope.into_items("test").unwrap();
        assert_eq!(items.len(), 2);
        assert!(has_more);

        let last: ApiEnvelope = serde_json::from_value(json!({
            "success": true,
            "result": [],
            "result_info": {"page": 2, "total_pages": 2}
        }))
        .unwrap();
        assert!(!last.into_items("test").unwrap().1);
    }

    #[test]
    fn test_envelope_failure_is_error() {
        let envelope: ApiEnvelope = serde_json::from_value(json!({
            "success": false,
            "errors": [{"code": 9103, "message": "Unknown X-Auth-Key or X-Auth-Email"}],
            "result": null
        }))
        .unwrap();
        match envelope.into_items("zone list") {
            Err(Error::Provider { message, .. }) => assert!(message.contains("9103")),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_zone_keeps_raw_object() {
        let raw = json!({"id": "023e105f", "name": "example.com", "plan": {"name": "Free"}});
        let zone = parse_zone(raw.clone()).unwrap();
        assert_eq!(zone.name, "example.com");
        assert_eq!(zone.id, "023e105f");
        assert_eq!(zone.raw, raw);
        assert!(parse_zone(json!({"id": "x"})).is_err());
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(status_error(403, "", "x"), Error::Authentication(_)));
        assert!(matches!(status_error(404, "", "x"), Error::NotFound(_)));
        assert!(matches!(status_error(429, "", "x"), Error::RateLimited(_)));
        assert!(matches!(status_error(502, "", "x"), Error::Provider { .. }));
    }

    /// Client that ignores proxy settings from the environment
    fn direct_client() -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    /// Serve canned JSON bodies, one per connection, recording request heads
    async fn serve(bodies: Vec<Value>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            for body in bodies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                seen.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).into_owned());

                let body = body.to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        (format!("http://{}", addr), requests)
    }

    #[tokio::test]
    async fn test_record_pages_over_http() {
        let (base_url, requests) = serve(vec![
            json!({
                "success": true,
                "result": [
                    {"id": "r1", "type": "A"},
                    {"id": "r2", "type": "AAAA"},
                    {"id": "r3", "type": "CNAME"},
                    {"id": "r4", "type": "TXT"},
                    {"id": "r5", "type": "NS"}
                ],
                "result_info": {"page": 1, "total_pages": 2}
            }),
            json!({
                "success": true,
                "result": [{"id": "r6", "type": "MX"}],
                "result_info": {"page": 2, "total_pages": 2}
            }),
        ])
        .await;

        let mut source = CloudflareSource::new("ops@example.com", "global-key", Some(base_url))
            .unwrap()
            .with_page_sizes(50, 5);
        source.client = direct_client();
        let zone = Zone::new("example.com", "z1", json!({"id": "z1", "name": "example.com"}));

        let records = dnsbackup_core::fetch::fetch_all_records(&source, &zone, 10)
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.0["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3", "r4", "r5", "r6"]);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("GET /zones/z1/dns_records?page=1&per_page=5 "));
        assert!(requests[1].starts_with("GET /zones/z1/dns_records?page=2&per_page=5 "));
        let head = requests[0].to_lowercase();
        assert!(head.contains("x-auth-email: ops@example.com"));
        assert!(head.contains("x-auth-key: global-key"));
    }

    #[tokio::test]
    async fn test_bearer_auth_without_email() {
        let (base_url, requests) = serve(vec![json!({
            "success": true,
            "result": [{"id": "z1", "name": "example.com"}],
            "result_info": {"page": 1, "total_pages": 1}
        })])
        .await;

        let mut source = CloudflareSource::new("", "api-token", Some(base_url)).unwrap();
        source.client = direct_client();
        let page = source.fetch_zone_page(0).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "example.com");
        assert!(!page.has_more);
        let head = requests.lock().unwrap()[0].to_lowercase();
        assert!(head.contains("authorization: bearer api-token"));
        assert!(!head.contains("x-auth-key"));
    }
}
