//! Link discovery: turn a listing page into an ordered set of document
//! references.
//!
//! The listing contract is deliberately small: documents are anchors inside
//! an ordered list (`ol li a`), the anchor text is the display name, the
//! href is the download URL. Page-specific scraping beyond that contract
//! lives outside this crate; anything that can produce
//! [`DocumentReference`]s can drive the pipeline via
//! [`crate::harvest_documents`].
//!
//! Parsing is a pure function over the HTML string so the selector logic is
//! unit-testable without a network.

use crate::error::MillError;
use crate::output::DocumentReference;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};

/// Fetch `listing_url` and extract document references in page order,
/// minus the configured exclusions.
///
/// A listing page with no matching anchors at all is a fatal
/// [`MillError::ListingEmpty`] — it almost always means the wrong URL or a
/// site redesign, and silently processing zero documents would mask that.
/// A page whose anchors are all excluded yields an empty, non-error list.
pub async fn discover_documents(
    client: &reqwest::Client,
    listing_url: &str,
    excluded_urls: &[String],
) -> Result<Vec<DocumentReference>, MillError> {
    info!("discovering documents on {listing_url}");

    let response =
        client
            .get(listing_url)
            .send()
            .await
            .map_err(|e| MillError::ListingFetchFailed {
                url: listing_url.to_string(),
                reason: e.to_string(),
            })?;

    let status = response.status();
    if !status.is_success() {
        return Err(MillError::ListingFetchFailed {
            url: listing_url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    let html = response
        .text()
        .await
        .map_err(|e| MillError::ListingFetchFailed {
            url: listing_url.to_string(),
            reason: e.to_string(),
        })?;

    let all = parse_listing(&html, listing_url);
    if all.is_empty() {
        return Err(MillError::ListingEmpty {
            url: listing_url.to_string(),
        });
    }

    let excluded: HashSet<&str> = excluded_urls.iter().map(String::as_str).collect();
    let mut refs = Vec::with_capacity(all.len());
    for reference in all {
        if excluded.contains(reference.source_url.as_str()) {
            info!(
                "excluding '{}' ({})",
                reference.display_name, reference.source_url
            );
            continue;
        }
        refs.push(reference);
    }

    info!("discovered {} documents", refs.len());
    Ok(refs)
}

/// Extract `(display_name, source_url)` pairs from listing HTML.
///
/// Anchors are taken from ordered lists only, in document order; relative
/// hrefs are resolved against `base_url`.
pub fn parse_listing(html: &str, base_url: &str) -> Vec<DocumentReference> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("ol li a").expect("static selector is valid");
    let base = reqwest::Url::parse(base_url).ok();

    let mut refs = Vec::new();
    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.trim().is_empty() {
            continue;
        }
        let resolved = match &base {
            Some(base) => base
                .join(href)
                .map(String::from)
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        };
        let display_name = anchor.text().collect::<String>().trim().to_string();
        debug!("anchor '{display_name}' → {resolved}");
        refs.push(DocumentReference::new(display_name, resolved));
    }
    refs
}
