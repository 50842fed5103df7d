pub mod stats;

use std::cmp::Ordering;

use crate::record::MovieRecord;
use stats::ViewStats;

/// Entries kept in [`ViewStats::top`].
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    ScoreDesc,
    ScoreAsc,
    TitleAsc,
    /// Raw release-date text, descending. Not calendar aware.
    DateDesc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// Case-insensitive title substring. Empty matches everything.
    pub search: String,
    pub score_min: f64,
    pub score_max: f64,
    /// OR-matched substrings of the joined category string.
    pub categories: Vec<String>,
    pub sort: SortKey,
    pub top_n: usize,
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec {
            search: String::new(),
            score_min: f64::NEG_INFINITY,
            score_max: f64::INFINITY,
            categories: Vec::new(),
            sort: SortKey::default(),
            top_n: TOP_N,
        }
    }
}

impl FilterSpec {
    /// Bounded when either end is finite. An unbounded range keeps unrated records.
    pub fn score_range(&self) -> Option<(f64, f64)> {
        if self.score_min.is_finite() || self.score_max.is_finite() {
            Some((self.score_min, self.score_max))
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub struct QueryResult<'a> {
    pub view: Vec<&'a MovieRecord>,
    pub stats: ViewStats<'a>,
}

/// Search, score and category filters, then a stable sort.
///
/// Statistics are computed on the filtered rows in dataset order, so top-N
/// ties resolve by original position whatever the sort key.
pub fn apply_filter<'a>(records: &'a [MovieRecord], spec: &FilterSpec) -> QueryResult<'a> {
    let needle = spec.search.to_lowercase();
    let range = spec.score_range();

    let mut view: Vec<&MovieRecord> = records
        .iter()
        .filter(|r| matches_search(r, &needle))
        .filter(|r| range.map_or(true, |(lo, hi)| in_range(r, lo, hi)))
        .filter(|r| matches_categories(r, &spec.categories))
        .collect();

    let stats = ViewStats::summarize(&view, spec.top_n);
    sort_view(&mut view, spec.sort);

    QueryResult { view, stats }
}

fn matches_search(record: &MovieRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record.has_title() && record.title.to_lowercase().contains(needle)
}

fn in_range(record: &MovieRecord, lo: f64, hi: f64) -> bool {
    record
        .score()
        .value()
        .is_some_and(|s| s >= lo && s <= hi)
}

fn matches_categories(record: &MovieRecord, wanted: &[String]) -> bool {
    wanted.is_empty() || wanted.iter().any(|c| record.categories.contains(c.as_str()))
}

pub fn sort_view(view: &mut [&MovieRecord], key: SortKey) {
    match key {
        SortKey::ScoreDesc => view.sort_by(|a, b| by_score(a, b, true)),
        SortKey::ScoreAsc => view.sort_by(|a, b| by_score(a, b, false)),
        SortKey::TitleAsc => view.sort_by(|a, b| a.title.cmp(&b.title)),
        SortKey::DateDesc => view.sort_by(|a, b| b.release_date.cmp(&a.release_date)),
    }
}

/// Unrated records go last in both directions.
fn by_score(a: &MovieRecord, b: &MovieRecord, descending: bool) -> Ordering {
    match (a.score().value(), b.score().value()) {
        (Some(x), Some(y)) if descending => y.total_cmp(&x),
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
