pub mod browser;
pub mod config;
pub mod export;
pub mod parser;
pub mod scraper;
pub mod store;
pub mod sync;
pub mod types;
pub mod variants;

pub use crate::browser::{HeadlessBrowser, PageRenderer};
pub use crate::scraper::{ItemSource, ScraperError, WebScraper};
pub use crate::sync::sync_items;
pub use crate::variants::scrape_variants;

pub const BASE_URL: &str = "https://adoptmetradingvalues.com";
