use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use tracing::info;

use crate::parser::{self, Category};
use crate::recipes::RecipeRecord;

/// Search terms used when none are given on the command line.
pub const DEFAULT_MATERIALS: &[&str] = &[
    "乾パン",
    "レトルトカレー",
    "さば缶",
    "ツナ缶",
    "パスタ",
    "クラッカー",
    "グラノーラ",
];

/// Sequential ranking-page scraper. Only the first page per term or
/// category is read; any fetch or parse error ends the run.
pub struct Scraper {
    client: reqwest::Client,
    base_url: Url,
}

impl Scraper {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("Invalid base URL {}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Base URL {} cannot have a path", base_url));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    fn url_with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch_page(&self, url: Url) -> Result<String> {
        let html = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to fetch {}", url))?
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(html)
    }

    /// Ranking for one search term, e.g. `/search/ツナ缶`.
    pub async fn search(&self, term: &str) -> Result<Vec<RecipeRecord>> {
        let url = self.url_with_segments(&["search", term]);
        let html = self.fetch_page(url).await?;
        let records = parser::parse_ranking(&html, self.base_url.as_str(), term)?;
        info!(term, found = records.len(), "Fetched search ranking");
        Ok(records)
    }

    /// Category links listed on `/category/`.
    pub async fn discover_categories(&self) -> Result<Vec<Category>> {
        let url = self.url_with_segments(&["category", ""]);
        let html = self.fetch_page(url).await?;
        let categories = parser::parse_categories(&html);
        info!(found = categories.len(), "Discovered categories");
        Ok(categories)
    }

    pub async fn category(&self, category: &Category) -> Result<Vec<RecipeRecord>> {
        let url = self
            .base_url
            .join(&category.path)
            .with_context(|| format!("Invalid category path {}", category.path))?;
        let html = self.fetch_page(url).await?;
        let records = parser::parse_ranking(&html, self.base_url.as_str(), &category.name)?;
        info!(category = %category.name, found = records.len(), "Fetched category ranking");
        Ok(records)
    }

    pub async fn scrape_terms(&self, terms: &[String]) -> Result<Vec<RecipeRecord>> {
        let pb = progress_bar(terms.len())?;
        let mut recipes = Vec::new();
        for term in terms {
            pb.set_message(term.clone());
            recipes.extend(self.search(term).await?);
            pb.inc(1);
        }
        pb.finish_and_clear();
        info!("Scraped {} recipes from {} terms", recipes.len(), terms.len());
        Ok(recipes)
    }

    /// Discover categories, then read the ranking of each (the first `limit` when given).
    pub async fn scrape_categories(&self, limit: Option<usize>) -> Result<Vec<RecipeRecord>> {
        let mut categories = self.discover_categories().await?;
        if let Some(n) = limit {
            categories.truncate(n);
        }

        let pb = progress_bar(categories.len())?;
        let mut recipes = Vec::new();
        for category in &categories {
            pb.set_message(category.name.clone());
            recipes.extend(self.category(category).await?);
            pb.inc(1);
        }
        pb.finish_and_clear();
        info!(
            "Scraped {} recipes from {} categories",
            recipes.len(),
            categories.len()
        );
        Ok(recipes)
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}
