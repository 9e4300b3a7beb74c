use crate::parser::{parse_item_detail, parse_listing_ids};
use crate::types::ItemRecord;

use reqwest::{Client, Url};
use std::time::Duration;

/// Desktop Chrome; the site serves a stripped page to unknown agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid base URL '{0}'")]
    InvalidUrl(String),
}

/// Where the incremental sync gets its listings and item details from.
#[allow(async_fn_in_trait)]
pub trait ItemSource {
    /// Ids linked from the listing page of `category`.
    async fn fetch_category_ids(&self, category: &str) -> Result<Vec<String>, ScraperError>;

    /// The parsed detail page for `id`.
    async fn fetch_item(&self, id: &str) -> Result<ItemRecord, ScraperError>;
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    base_url: String,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_base_url(crate::BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ScraperError> {
        Url::parse(base_url).map_err(|_| ScraperError::InvalidUrl(base_url.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn listing_url(&self, category: &str) -> String {
        format!("{}/pet-value-list.php?params={}", self.base_url, category)
    }

    pub fn detail_url(&self, id: &str) -> String {
        format!("{}/what-is-worth.php?q=&id={}", self.base_url, id)
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

impl ItemSource for WebScraper {
    async fn fetch_category_ids(&self, category: &str) -> Result<Vec<String>, ScraperError> {
        let url = self.listing_url(category);
        log::debug!("Fetching listing for '{}': {}", category, url);
        let html = self.get_html(&url).await?;
        Ok(parse_listing_ids(&html))
    }

    async fn fetch_item(&self, id: &str) -> Result<ItemRecord, ScraperError> {
        let url = self.detail_url(id);
        log::debug!("Fetching item {}: {}", id, url);
        let html = self.get_html(&url).await?;
        Ok(parse_item_detail(&html, id, &self.base_url))
    }
}
