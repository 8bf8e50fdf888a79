//! Paginated listing over a [`DnsSource`]
//!
//! Every listing follows the same loop: request the page starting at the
//! number of items collected so far, append it, and stop when the source
//! reports no more pages. The loop fails with [`Error::Pagination`] instead
//! of spinning when a source never signals completion.

use crate::error::{Error, Result};
use crate::traits::{DnsSource, Page, Record, Zone};
use std::future::Future;

/// Fetch every zone visible to the source
pub async fn fetch_all_zones(source: &dyn DnsSource, max_pages: usize) -> Result<Vec<Zone>> {
    let zones = paginate("zone list", max_pages, |offset| source.fetch_zone_page(offset)).await?;
    tracing::info!(
        "Fetched {} zone(s) from {}",
        zones.len(),
        source.source_name()
    );
    Ok(zones)
}

/// Fetch every record of `zone`, concatenating pages in request order
pub async fn fetch_all_records(
    source: &dyn DnsSource,
    zone: &Zone,
    max_pages: usize,
) -> Result<Vec<Record>> {
    let what = format!("records of {}", zone.name);
    let records = paginate(&what, max_pages, |offset| {
        source.fetch_record_page(zone, offset)
    })
    .await?;
    tracing::debug!("Fetched {} record(s) for zone {}", records.len(), zone.name);
    Ok(records)
}

/// Drive an offset-based listing to completion
///
/// `fetch_page` receives the offset (items collected so far). At most
/// `max_pages` requests are made.
pub async fn paginate<T, F, Fut>(what: &str, max_pages: usize, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();

    for request in 1..=max_pages {
        let offset = items.len();
        let page = fetch_page(offset).await?;
        let count = page.items.len();
        items.extend(page.items);

        tracing::trace!(
            "{}: page {} at offset {} returned {} item(s), has_more={}",
            what,
            request,
            offset,
            count,
            page.has_more
        );

        if !page.has_more {
            return Ok(items);
        }

        // The next request would repeat this offset forever
        if count == 0 {
            return Err(Error::pagination(format!(
                "{}: source reported more pages but returned an empty page at offset {}",
                what, offset
            )));
        }
    }

    Err(Error::pagination(format!(
        "{}: source still reported more pages after {} requests",
        what, max_pages
    )))
}
