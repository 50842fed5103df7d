mod crawler;
mod parser;
mod query;
mod record;
mod settings;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use query::stats::{self, ViewStats};
use query::{FilterSpec, SortKey};
use record::{Dataset, MovieRecord, Score};
use settings::Settings;
use store::StoreError;

#[derive(Parser)]
#[command(name = "movie_scraper", about = "Movie listing scraper and browser for ssr1.scrape.center")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages and save every movie to CSV
    Crawl {
        /// First page to fetch
        #[arg(long)]
        first: Option<u32>,
        /// Last page to fetch (inclusive)
        #[arg(short = 'n', long)]
        last: Option<u32>,
        /// Pause between requests in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Output CSV (default: dataset_path setting)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Filter, sort and summarize the saved dataset
    Browse {
        #[command(flatten)]
        filter: FilterArgs,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Write the filtered view to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,
        /// Dataset CSV (default: dataset_path setting)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Score distribution and most common categories
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
        /// Dataset CSV (default: dataset_path setting)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Case-insensitive title search
    #[arg(short, long, default_value = "")]
    search: String,
    /// Lowest score to keep (inclusive)
    #[arg(long)]
    min_score: Option<f64>,
    /// Highest score to keep (inclusive)
    #[arg(long)]
    max_score: Option<f64>,
    /// Category to match; repeat for any-of matching
    #[arg(short, long = "category")]
    categories: Vec<String>,
    /// Sort order
    #[arg(long, value_enum, default_value_t = SortKey::ScoreDesc)]
    sort: SortKey,
    /// Entries in the top-by-score list
    #[arg(long, default_value_t = query::TOP_N)]
    top: usize,
}

impl FilterArgs {
    fn into_spec(self) -> FilterSpec {
        FilterSpec {
            search: self.search,
            score_min: self.min_score.unwrap_or(f64::NEG_INFINITY),
            score_max: self.max_score.unwrap_or(f64::INFINITY),
            categories: self.categories,
            sort: self.sort,
            top_n: self.top,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Crawl {
            first,
            last,
            delay_ms,
            output,
        } => {
            let plan = crawler::CrawlPlan {
                first_page: first.unwrap_or(settings.first_page),
                last_page: last.unwrap_or(settings.last_page),
                delay: delay_ms
                    .map(std::time::Duration::from_millis)
                    .unwrap_or_else(|| settings.delay()),
                origin: settings.origin_url()?,
            };
            let path = output.unwrap_or_else(|| settings.dataset_path.clone());
            let source = crawler::HttpSource::new(&settings)?;

            println!(
                "Crawling pages {}..={} (delay {}ms)...",
                plan.first_page,
                plan.last_page,
                plan.delay.as_millis()
            );
            let (dataset, stats) = crawler::crawl(&source, &plan).await;
            println!(
                "Done: {} pages ({} ok, {} errors), {} movies.",
                stats.pages, stats.ok, stats.errors, stats.records
            );

            if dataset.is_empty() {
                println!("Nothing scraped; {} left untouched.", path.display());
                return Ok(());
            }
            store::save(&path, dataset.records()).context("Failed to save dataset")?;
            println!("Saved {} movies to {}", dataset.len(), path.display());
            print_crawl_summary(&dataset);
            Ok(())
        }
        Commands::Browse {
            filter,
            limit,
            export,
            input,
        } => {
            let path = input.unwrap_or_else(|| settings.dataset_path.clone());
            let Some(dataset) = load_or_explain(&path)? else {
                return Ok(());
            };
            let spec = filter.into_spec();
            let result = query::apply_filter(dataset.records(), &spec);

            print_metrics(&result.stats);
            print_controls(&dataset);
            println!("\nFound {} movies", result.view.len());
            if result.view.is_empty() {
                println!("No movies match the current filters.");
            } else {
                print_table(&result.view, limit);
                print_categories(&result.stats, 10);
                print_top(&result.stats);
            }

            if let Some(out) = export {
                store::save(&out, result.view.iter().copied()).context("Failed to export view")?;
                println!("\nExported {} movies to {}", result.view.len(), out.display());
            }
            Ok(())
        }
        Commands::Stats { json, input } => {
            let path = input.unwrap_or_else(|| settings.dataset_path.clone());
            let Some(dataset) = load_or_explain(&path)? else {
                return Ok(());
            };
            let view: Vec<&MovieRecord> = dataset.records().iter().collect();
            let summary = ViewStats::summarize(&view, query::TOP_N);

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_metrics(&summary);
                print_distribution(&summary);
                print_categories(&summary, 10);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// `None` (after telling the user) when no dataset has been crawled yet.
fn load_or_explain(path: &std::path::Path) -> anyhow::Result<Option<Dataset>> {
    match store::load(path) {
        Ok(dataset) => Ok(Some(dataset)),
        Err(StoreError::Missing { path }) => {
            eprintln!("No dataset found at {}.", path.display());
            eprintln!("Run `movie_scraper crawl` first to scrape the movie listings.");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_crawl_summary(dataset: &Dataset) {
    let view: Vec<&MovieRecord> = dataset.records().iter().collect();
    let summary = ViewStats::summarize(&view, 0);
    print_distribution(&summary);
    print_categories(&summary, 10);
}

fn print_metrics(s: &ViewStats) {
    println!("Movies:     {}", s.count);
    println!("Avg score:  {}", fmt_opt(s.mean_score, 2));
    println!("Top score:  {}", fmt_opt(s.max_score, 1));
    println!("Categories: {}", s.distinct_categories);
}

/// Inputs a range control and multi-select would be populated from.
fn print_controls(dataset: &Dataset) {
    match stats::score_bounds(dataset.records()) {
        Some((lo, hi)) => println!("\nScore range: {:.1} to {:.1}", lo, hi),
        None => println!("\nScore range: no rated movies"),
    }
    let all: Vec<String> = stats::all_categories(dataset.records()).into_iter().collect();
    println!("Categories:  {}", all.join(", "));
}

fn print_table(view: &[&MovieRecord], limit: usize) {
    println!(
        "{:>3} | {:<28} | {:>5} | {:<5} | {:<16} | {:<14} | {:<8} | {:<14}",
        "#", "Title", "Score", "Stars", "Categories", "Region", "Duration", "Released"
    );
    println!("{}", "-".repeat(118));

    for (i, r) in view.iter().take(limit).enumerate() {
        println!(
            "{:>3} | {:<28} | {:>5} | {:<5} | {:<16} | {:<14} | {:<8} | {:<14}",
            i + 1,
            truncate(&r.title, 28),
            r.score,
            stars(r),
            truncate(&r.categories, 16),
            truncate(&r.region, 14),
            r.duration,
            r.release_date,
        );
    }
    if view.len() > limit {
        println!("... {} more (raise --limit to see them)", view.len() - limit);
    }

    let links: Vec<_> = view
        .iter()
        .take(limit)
        .filter(|r| r.detail_url != record::NA)
        .collect();
    if !links.is_empty() {
        println!("\n--- Details ---");
        for r in links {
            println!("  {}: {}", truncate(&r.title, 28), r.detail_url);
        }
    }
}

fn print_categories(s: &ViewStats, n: usize) {
    if s.category_frequency.is_empty() {
        return;
    }
    println!("\n--- Categories ---");
    for c in s.category_frequency.iter().take(n) {
        println!("  {:<12} {:>4}", c.name, c.count);
    }
}

fn print_distribution(s: &ViewStats) {
    if s.score_distribution.is_empty() {
        return;
    }
    println!("\n--- Scores ---");
    for b in &s.score_distribution {
        println!("  {:>4.1} {:>4} {}", b.score, b.count, "#".repeat(b.count.min(60)));
    }
}

fn print_top(s: &ViewStats) {
    if s.top.is_empty() {
        return;
    }
    println!("\n--- Top {} ---", s.top.len());
    for (i, r) in s.top.iter().enumerate() {
        println!(
            "{:>3}. {:<28} {:>5}  {}  {}",
            i + 1,
            truncate(&r.title, 28),
            r.score,
            truncate(&r.categories, 20),
            r.release_date
        );
    }
}

const MAX_STARS: usize = 5;

/// One star per two points, capped at a five-star scale.
fn stars(r: &MovieRecord) -> String {
    match r.score() {
        Score::Rated(s) if s >= 2.0 => {
            let n = ((s / 2.0).floor() as usize).min(MAX_STARS);
            "★".repeat(n)
        }
        _ => "-".to_string(),
    }
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{:.*}", precision, x))
        .unwrap_or_else(|| "-".into())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
