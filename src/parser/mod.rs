pub mod card;

use reqwest::Url;
use scraper::Html;
use tracing::{debug, warn};

use crate::record::MovieRecord;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("detail link {href:?} cannot be resolved: {reason}")]
    UnresolvableLink { href: String, reason: String },
}

/// Parse one listing page and extract every movie card on it.
pub fn extract_page(markup: &str, origin: &Url) -> Vec<MovieRecord> {
    let doc = Html::parse_document(markup);
    extract_document(&doc, origin)
}

/// Extract movie cards from an already parsed document, in document order.
/// A card that fails extraction is logged and skipped.
pub fn extract_document(doc: &Html, origin: &Url) -> Vec<MovieRecord> {
    let mut records = Vec::new();
    for (index, el) in doc.select(&card::CARD).enumerate() {
        match card::extract(el, origin) {
            Ok(record) => records.push(record),
            Err(e) => warn!(index, error = %e, "Skipping malformed movie card"),
        }
    }
    debug!(count = records.len(), "Extracted movie cards");
    records
}
