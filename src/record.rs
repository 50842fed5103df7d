use serde::{Deserialize, Serialize};

/// Marker for a field the page did not provide.
pub const NA: &str = "N/A";

pub fn na() -> String {
    NA.to_string()
}

/// One movie card, exactly as it is persisted.
///
/// Every field holds either a real value or [`NA`]; empty strings are never
/// produced by the extractor. The score is kept as raw page text and only
/// coerced through [`MovieRecord::score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    pub title: String,
    /// Tags joined with ", " in page order.
    pub categories: String,
    pub region: String,
    pub duration: String,
    pub release_date: String,
    pub score: String,
    pub cover_url: String,
    pub detail_url: String,
}

impl MovieRecord {
    pub fn score(&self) -> Score {
        Score::parse(&self.score)
    }

    /// Individual category tags, trimmed. Empty for an "N/A" record.
    pub fn tags(&self) -> Vec<&str> {
        if self.categories == NA {
            return Vec::new();
        }
        self.categories
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn has_title(&self) -> bool {
        self.title != NA
    }
}

/// Numeric view of a record's score text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Rated(f64),
    /// Placeholder text such as "暂无", a missing element, or a non-finite number.
    Unrated,
}

impl Score {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Score::Rated(v),
            _ => Score::Unrated,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Score::Rated(v) => Some(v),
            Score::Unrated => None,
        }
    }
}

/// Records from one crawl run, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<MovieRecord>,
}

impl Dataset {
    pub fn new(records: Vec<MovieRecord>) -> Self {
        Dataset { records }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = MovieRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[MovieRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn movie(title: &str, score: &str, categories: &str) -> MovieRecord {
    MovieRecord {
        title: title.to_string(),
        categories: categories.to_string(),
        region: na(),
        duration: na(),
        release_date: na(),
        score: score.to_string(),
        cover_url: na(),
        detail_url: na(),
    }
}
