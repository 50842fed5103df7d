use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Selector};

use super::ExtractError;
use crate::record::{na, MovieRecord};

pub(super) static CARD: LazyLock<Selector> = LazyLock::new(|| sel(".el-card__body"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("h2.m-b-sm"));
static CATEGORIES: LazyLock<Selector> = LazyLock::new(|| sel(".categories"));
static BUTTON: LazyLock<Selector> = LazyLock::new(|| sel("button"));
static INFO: LazyLock<Selector> = LazyLock::new(|| sel(".info"));
static SCORE: LazyLock<Selector> = LazyLock::new(|| sel(".score"));
static COVER: LazyLock<Selector> = LazyLock::new(|| sel("img.cover"));
static LINK: LazyLock<Selector> = LazyLock::new(|| sel("a[href]"));

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Build a record from one `.el-card__body` element.
///
/// The first `.info` holds "region / duration", the second the release date.
pub fn extract(card: ElementRef<'_>, origin: &Url) -> Result<MovieRecord, ExtractError> {
    let title = card.select(&TITLE).next().and_then(text_of).unwrap_or_else(na);

    let categories = card
        .select(&CATEGORIES)
        .next()
        .map(|div| div.select(&BUTTON).filter_map(text_of).collect::<Vec<_>>())
        .filter(|tags| !tags.is_empty())
        .map(|tags| tags.join(", "))
        .unwrap_or_else(na);

    let mut info = card.select(&INFO);
    let (region, duration) = info
        .next()
        .and_then(text_of)
        .map(|blob| split_region_duration(&blob))
        .unwrap_or_else(|| (na(), na()));
    let release_date = info.next().and_then(text_of).unwrap_or_else(na);

    let score = card.select(&SCORE).next().and_then(text_of).unwrap_or_else(na);

    let cover_url = card
        .select(&COVER)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(non_empty)
        .unwrap_or_else(na);

    let detail_url = match card.select(&LINK).next().and_then(|a| a.value().attr("href")) {
        Some(href) => resolve(origin, href)?,
        None => na(),
    };

    Ok(MovieRecord {
        title,
        categories,
        region,
        duration,
        release_date,
        score,
        cover_url,
        detail_url,
    })
}

/// Descendant text nodes, each trimmed, empties dropped, concatenated.
fn text_of(el: ElementRef<'_>) -> Option<String> {
    let text: String = el.text().map(str::trim).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// "中国内地、中国香港 / 171 分钟" → ("中国内地、中国香港", "171 分钟"). Splits on the first '/'.
pub fn split_region_duration(blob: &str) -> (String, String) {
    match blob.split_once('/') {
        Some((region, duration)) => (
            non_empty(region).unwrap_or_else(na),
            non_empty(duration).unwrap_or_else(na),
        ),
        None => (non_empty(blob).unwrap_or_else(na), na()),
    }
}

fn resolve(origin: &Url, href: &str) -> Result<String, ExtractError> {
    origin
        .join(href.trim())
        .map(|url| url.to_string())
        .map_err(|e| ExtractError::UnresolvableLink {
            href: href.to_string(),
            reason: e.to_string(),
        })
}
