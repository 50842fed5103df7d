use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use crate::parser;
use crate::record::Dataset;
use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request for page {page} failed: {source}")]
    Request {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("page {page} returned HTTP {status}")]
    Status { page: u32, status: StatusCode },
}

/// Anything that can hand back the raw markup of a listing page.
pub trait PageSource {
    fn fetch(&self, page: u32) -> impl Future<Output = Result<String, FetchError>>;
}

pub struct HttpSource {
    client: reqwest::Client,
    settings: Settings,
}

impl HttpSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(HttpSource {
            client,
            settings: settings.clone(),
        })
    }
}

impl PageSource for HttpSource {
    async fn fetch(&self, page: u32) -> Result<String, FetchError> {
        let url = self.settings.page_url(page);
        debug!(page, %url, "Fetching page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request { page, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { page, status });
        }

        response
            .text()
            .await
            .map_err(|source| FetchError::Request { page, source })
    }
}

/// Which pages to walk and how long to pause between them.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub first_page: u32,
    pub last_page: u32,
    pub delay: Duration,
    pub origin: Url,
}

/// Crawl stats returned after completion.
#[derive(Debug, Default, PartialEq)]
pub struct CrawlStats {
    pub pages: usize,
    pub ok: usize,
    pub errors: usize,
    pub records: usize,
}

/// Fetch and extract pages one at a time, in order.
///
/// A failed page is logged and contributes nothing. The delay is applied
/// between requests, never after the last one.
pub async fn crawl<S: PageSource>(source: &S, plan: &CrawlPlan) -> (Dataset, CrawlStats) {
    let pages: Vec<u32> = (plan.first_page..=plan.last_page).collect();
    let started = Instant::now();

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({msg})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut dataset = Dataset::default();
    let mut stats = CrawlStats {
        pages: pages.len(),
        ..Default::default()
    };

    for (i, &page) in pages.iter().enumerate() {
        match source.fetch(page).await {
            Ok(markup) => {
                let records = parser::extract_page(&markup, &plan.origin);
                info!(page, count = records.len(), "Parsed page");
                stats.ok += 1;
                stats.records += records.len();
                dataset.extend(records);
            }
            Err(e) => {
                warn!(page, error = %e, "Page failed, skipping");
                stats.errors += 1;
            }
        }
        pb.set_message(format!("{} movies", stats.records));
        pb.inc(1);

        if i + 1 < pages.len() && !plan.delay.is_zero() {
            tokio::time::sleep(plan.delay).await;
        }
    }

    pb.finish_and_clear();
    info!(
        pages = stats.pages,
        ok = stats.ok,
        errors = stats.errors,
        movies = stats.records,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Crawl finished"
    );
    (dataset, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeSource {
        pages: HashMap<u32, String>,
        calls: RefCell<Vec<(u32, Instant)>>,
    }

    impl FakeSource {
        fn new(pages: &[(u32, &str)]) -> Self {
            FakeSource {
                pages: pages.iter().map(|(n, html)| (*n, html.to_string())).collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageSource for FakeSource {
        async fn fetch(&self, page: u32) -> Result<String, FetchError> {
            self.calls.borrow_mut().push((page, Instant::now()));
            self.pages.get(&page).cloned().ok_or(FetchError::Status {
                page,
                status: StatusCode::NOT_FOUND,
            })
        }
    }

    fn card(title: &str) -> String {
        format!(r#"<div class="el-card__body"><h2 class="m-b-sm">{title}</h2><p class="score">9.0</p></div>"#)
    }

    fn plan(first: u32, last: u32, delay: Duration) -> CrawlPlan {
        CrawlPlan {
            first_page: first,
            last_page: last,
            delay,
            origin: Url::parse("https://ssr1.scrape.center").unwrap(),
        }
    }

    #[tokio::test]
    async fn pages_append_in_order() {
        let p1 = format!("{}{}", card("a"), card("b"));
        let p2 = card("c");
        let p3 = card("d");
        let source = FakeSource::new(&[(1, p1.as_str()), (2, p2.as_str()), (3, p3.as_str())]);

        let (dataset, stats) = crawl(&source, &plan(1, 3, Duration::ZERO)).await;

        let titles: Vec<&str> = dataset.records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c", "d"]);
        assert_eq!(
            stats,
            CrawlStats {
                pages: 3,
                ok: 3,
                errors: 0,
                records: 4
            }
        );
        let order: Vec<u32> = source.calls.borrow().iter().map(|(p, _)| *p).collect();
        assert_eq!(order, [1, 2, 3]);
    }

    #[tokio::test]
    async fn failed_page_is_skipped() {
        let p1 = card("a");
        let p3 = card("c");
        let source = FakeSource::new(&[(1, p1.as_str()), (3, p3.as_str())]);

        let (dataset, stats) = crawl(&source, &plan(1, 3, Duration::ZERO)).await;

        assert_eq!(dataset.len(), 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.ok, 2);
        assert_eq!(source.calls.borrow().len(), 3);
    }

    #[tokio::test]
    async fn delay_only_between_requests() {
        let delay = Duration::from_millis(200);
        let html = card("a");
        let source = FakeSource::new(&[(1, html.as_str()), (2, html.as_str()), (3, html.as_str())]);

        let _ = crawl(&source, &plan(1, 3, delay)).await;
        let finished = Instant::now();

        let calls = source.calls.borrow();
        for pair in calls.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= delay);
        }
        let (_, last) = calls.last().unwrap();
        assert!(finished - *last < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn empty_range() {
        let source = FakeSource::new(&[]);
        let (dataset, stats) = crawl(&source, &plan(2, 1, Duration::ZERO)).await;
        assert!(dataset.is_empty());
        assert_eq!(stats.pages, 0);
        assert!(source.calls.borrow().is_empty());
    }
}
