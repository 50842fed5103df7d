use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::record::MovieRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBucket {
    pub score: f64,
    pub count: usize,
}

/// Aggregates over one filtered view.
#[derive(Debug, Clone, Serialize)]
pub struct ViewStats<'a> {
    pub count: usize,
    pub mean_score: Option<f64>,
    pub max_score: Option<f64>,
    pub distinct_categories: usize,
    pub category_frequency: Vec<CategoryCount>,
    pub score_distribution: Vec<ScoreBucket>,
    pub top: Vec<&'a MovieRecord>,
}

impl<'a> ViewStats<'a> {
    pub fn summarize(view: &[&'a MovieRecord], top_n: usize) -> Self {
        let records = || view.iter().copied();
        let category_frequency = category_frequency(records());
        ViewStats {
            count: view.len(),
            mean_score: mean_score(records()),
            max_score: max_score(records()),
            distinct_categories: category_frequency.len(),
            category_frequency,
            score_distribution: score_distribution(records()),
            top: top_by_score(records(), top_n),
        }
    }
}

fn rated<'a>(records: impl IntoIterator<Item = &'a MovieRecord>) -> Vec<f64> {
    records.into_iter().filter_map(|r| r.score().value()).collect()
}

/// Mean of numeric scores only; `None` when nothing is rated.
pub fn mean_score<'a>(records: impl IntoIterator<Item = &'a MovieRecord>) -> Option<f64> {
    let (sum, n) = rated(records).into_iter().fold((0.0, 0usize), |(sum, n), s| (sum + s, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

pub fn max_score<'a>(records: impl IntoIterator<Item = &'a MovieRecord>) -> Option<f64> {
    rated(records).into_iter().reduce(f64::max)
}

/// Observed (min, max) of numeric scores, for bounding a range control.
pub fn score_bounds<'a>(records: impl IntoIterator<Item = &'a MovieRecord>) -> Option<(f64, f64)> {
    rated(records).into_iter().fold(None, |acc, s| match acc {
        None => Some((s, s)),
        Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
    })
}

/// Every tag in the records, sorted.
pub fn all_categories<'a>(records: impl IntoIterator<Item = &'a MovieRecord>) -> BTreeSet<String> {
    records
        .into_iter()
        .flat_map(|r| r.tags())
        .map(str::to_string)
        .collect()
}

/// Tag → number of records carrying it, most frequent first. Ties keep first-seen order.
pub fn category_frequency<'a>(
    records: impl IntoIterator<Item = &'a MovieRecord>,
) -> Vec<CategoryCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut table: Vec<CategoryCount> = Vec::new();

    for record in records {
        let mut seen = HashSet::new();
        for tag in record.tags() {
            if !seen.insert(tag) {
                continue;
            }
            match index.get(tag) {
                Some(&i) => table[i].count += 1,
                None => {
                    index.insert(tag, table.len());
                    table.push(CategoryCount {
                        name: tag.to_string(),
                        count: 1,
                    });
                }
            }
        }
    }

    table.sort_by(|a, b| b.count.cmp(&a.count));
    table
}

/// Highest `n` numeric scores; equal scores keep input order.
pub fn top_by_score<'a>(
    records: impl IntoIterator<Item = &'a MovieRecord>,
    n: usize,
) -> Vec<&'a MovieRecord> {
    let mut scored: Vec<(f64, &MovieRecord)> = records
        .into_iter()
        .filter_map(|r| r.score().value().map(|s| (s, r)))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(n).map(|(_, r)| r).collect()
}

/// Count of each distinct numeric score, ascending.
pub fn score_distribution<'a>(
    records: impl IntoIterator<Item = &'a MovieRecord>,
) -> Vec<ScoreBucket> {
    let mut scores = rated(records);
    scores.sort_by(f64::total_cmp);

    let mut buckets: Vec<ScoreBucket> = Vec::new();
    for s in scores {
        match buckets.last_mut() {
            Some(last) if last.score == s => last.count += 1,
            _ => buckets.push(ScoreBucket { score: s, count: 1 }),
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{movie, NA};

    fn sample() -> Vec<MovieRecord> {
        vec![
            movie("肖申克的救赎", "9.5", "剧情, 犯罪"),
            movie("霸王别姬", "9.6", "剧情, 爱情"),
            movie("这个杀手不太冷", "9.5", "剧情, 动作, 犯罪"),
            movie("未知", "暂无", NA),
            movie("泰坦尼克号", "9.5", "剧情, 爱情, 灾难"),
        ]
    }

    #[test]
    fn mean_and_max_skip_unrated() {
        let data = sample();
        let mean = mean_score(&data).unwrap();
        assert!((mean - 9.525).abs() < 1e-9);
        assert_eq!(max_score(&data), Some(9.6));
    }

    #[test]
    fn nothing_rated() {
        let data = vec![movie("a", "暂无", NA)];
        assert_eq!(mean_score(&data), None);
        assert_eq!(max_score(&data), None);
        assert_eq!(score_bounds(&data), None);
    }

    #[test]
    fn frequency_ranked_with_first_seen_ties() {
        let freq = category_frequency(&sample());
        let pairs: Vec<(&str, usize)> = freq.iter().map(|c| (c.name.as_str(), c.count)).collect();
        assert_eq!(
            pairs,
            [("剧情", 4), ("犯罪", 2), ("爱情", 2), ("动作", 1), ("灾难", 1)]
        );
    }

    #[test]
    fn frequency_sum_matches_tag_occurrences() {
        let data = sample();
        let total: usize = category_frequency(&data).iter().map(|c| c.count).sum();
        let per_record: usize = data.iter().map(|r| r.tags().len()).sum();
        assert_eq!(total, per_record);
    }

    #[test]
    fn repeated_tag_counts_once_per_record() {
        let data = vec![movie("a", "1", "剧情, 剧情")];
        assert_eq!(category_frequency(&data)[0].count, 1);
    }

    #[test]
    fn distinct_and_sorted_categories() {
        let cats = all_categories(&sample());
        assert_eq!(cats.len(), 5);
        assert!(!cats.contains(NA));
        let v: Vec<&String> = cats.iter().collect();
        let mut sorted = v.clone();
        sorted.sort();
        assert_eq!(v, sorted);
    }

    #[test]
    fn top_ties_keep_dataset_order() {
        let data = sample();
        let top: Vec<&str> = top_by_score(&data, 3).iter().map(|r| r.title.as_str()).collect();
        assert_eq!(top, ["霸王别姬", "肖申克的救赎", "这个杀手不太冷"]);
    }

    #[test]
    fn top_excludes_unrated() {
        let data = sample();
        assert_eq!(top_by_score(&data, 10).len(), 4);
    }

    #[test]
    fn distribution_ascending() {
        let dist = score_distribution(&sample());
        assert_eq!(
            dist,
            [
                ScoreBucket { score: 9.5, count: 3 },
                ScoreBucket { score: 9.6, count: 1 }
            ]
        );
    }

    #[test]
    fn bounds() {
        assert_eq!(score_bounds(&sample()), Some((9.5, 9.6)));
    }

    #[test]
    fn summarize_view() {
        let data = sample();
        let view: Vec<&MovieRecord> = data.iter().collect();
        let stats = ViewStats::summarize(&view, 2);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.distinct_categories, 5);
        assert_eq!(stats.top.len(), 2);
    }
}
