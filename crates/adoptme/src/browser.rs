use std::time::Duration;

use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

const CHROME_ARGS: [&str; 3] = ["--headless", "--no-sandbox", "--disable-dev-shm-usage"];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("WebDriver session failed: {0}")]
    WebDriver(#[from] WebDriverError),
    #[error("Rendered page for {0} is empty")]
    EmptyPage(String),
}

/// Turns a URL into the markup a browser ends up with after running the page's scripts.
#[allow(async_fn_in_trait)]
pub trait PageRenderer {
    async fn render(&self, url: &str) -> Result<String, RenderError>;
}

/// Headless Chrome driven over WebDriver. Needs a chromedriver listening on `webdriver_url`.
#[derive(Debug, Clone)]
pub struct HeadlessBrowser {
    webdriver_url: String,
    render_wait: Duration,
}

impl HeadlessBrowser {
    pub fn new(webdriver_url: impl Into<String>, render_wait: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            render_wait,
        }
    }

    async fn open(&self) -> Result<WebDriver, RenderError> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in CHROME_ARGS {
            caps.add_arg(arg)?;
        }
        log::info!("Starting headless browser via {}", self.webdriver_url);
        Ok(WebDriver::new(self.webdriver_url.as_str(), caps).await?)
    }

    async fn capture(&self, driver: &WebDriver, url: &str) -> Result<String, RenderError> {
        driver.goto(url).await?;
        log::debug!("Waiting {:?} for client-side rendering", self.render_wait);
        tokio::time::sleep(self.render_wait).await;
        Ok(driver.source().await?)
    }
}

impl Default for HeadlessBrowser {
    fn default() -> Self {
        Self::new(DEFAULT_WEBDRIVER_URL, crate::config::DEFAULT_RENDER_WAIT)
    }
}

impl PageRenderer for HeadlessBrowser {
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        let driver = self.open().await?;
        let result = self.capture(&driver, url).await;

        // The session is closed whether or not the page loaded.
        if let Err(e) = driver.quit().await {
            log::warn!("Failed to close browser session: {}", e);
        }

        let html = result.inspect_err(|e| log::error!("Error fetching page with browser: {e}"))?;
        if html.trim().is_empty() {
            return Err(RenderError::EmptyPage(url.to_string()));
        }

        log::info!("Page fetched and rendered ({} bytes)", html.len());
        Ok(html)
    }
}
