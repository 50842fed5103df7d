use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use reqwest::Url;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "MOVIES";

/// Runtime settings. Defaults target ssr1.scrape.center; any key can be
/// overridden with a `MOVIES_` environment variable, e.g. `MOVIES_LAST_PAGE=3`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listing URL template, `{}` is replaced with the page number.
    pub page_url: String,
    /// Base for resolving relative detail links.
    pub origin: String,
    pub first_page: u32,
    pub last_page: u32,
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub dataset_path: PathBuf,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("page_url", "https://ssr1.scrape.center/page/{}")?
        .set_default("origin", "https://ssr1.scrape.center")?
        .set_default("first_page", 1i64)?
        .set_default("last_page", 10i64)?
        .set_default("delay_ms", 1000i64)?
        .set_default("timeout_secs", 10i64)?
        .set_default("user_agent", concat!("movie_scraper/", env!("CARGO_PKG_VERSION")))?
        .set_default("dataset_path", "movie.csv")?)
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self> {
        defaults()?
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn page_url(&self, page: u32) -> String {
        self.page_url.replace("{}", &page.to_string())
    }

    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin).with_context(|| format!("Invalid origin {:?}", self.origin))
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
