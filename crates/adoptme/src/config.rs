use std::path::{Path, PathBuf};
use std::time::Duration;

/// Every listing category the site publishes.
pub const ALL_CATEGORIES: [&str; 12] = [
    "foods",
    "gifts",
    "houses",
    "pets",
    "petsneons",
    "petsvehicles",
    "petwear",
    "stickers",
    "strollers",
    "toys",
    "vehicles",
    "wings",
];

pub const DEFAULT_CATEGORY: &str = "pets";
pub const DEFAULT_ITEMS_JSON: &str = "adoptme_values.json";
pub const DEFAULT_ITEMS_CSV: &str = "adoptme_values.csv";
pub const DEFAULT_VARIANTS_JSON: &str = "adoptme_neons_megas_values.json";
pub const DEFAULT_VARIANTS_CSV: &str = "adoptme_neons_megas_values.csv";
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_RENDER_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one category is required")]
    NoCategories,
    #[error("Category names cannot be blank")]
    BlankCategory,
    #[error("JSON and CSV outputs must be different files (both are {0})")]
    SameOutput(PathBuf),
    #[error("Listing URL cannot be empty")]
    EmptyUrl,
}

fn check_outputs(json_path: &Path, csv_path: &Path) -> Result<(), ConfigError> {
    if json_path == csv_path {
        return Err(ConfigError::SameOutput(json_path.to_path_buf()));
    }
    Ok(())
}

/// Settings for the incremental item sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub categories: Vec<String>,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
    /// Pause before every detail fetch.
    pub delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            categories: vec![DEFAULT_CATEGORY.to_string()],
            json_path: PathBuf::from(DEFAULT_ITEMS_JSON),
            csv_path: PathBuf::from(DEFAULT_ITEMS_CSV),
            delay: DEFAULT_DELAY,
        }
    }
}

impl SyncConfig {
    pub fn all_categories() -> Vec<String> {
        ALL_CATEGORIES.iter().map(|c| c.to_string()).collect()
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        if self.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::BlankCategory);
        }
        check_outputs(&self.json_path, &self.csv_path)?;
        Ok(self)
    }
}

/// Settings for the rendered neon/mega scrape.
#[derive(Debug, Clone)]
pub struct VariantConfig {
    pub list_url: String,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            list_url: format!("{}/pet-value-list.php?params=petsneons", crate::BASE_URL),
            json_path: PathBuf::from(DEFAULT_VARIANTS_JSON),
            csv_path: PathBuf::from(DEFAULT_VARIANTS_CSV),
        }
    }
}

impl VariantConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.list_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        check_outputs(&self.json_path, &self.csv_path)?;
        Ok(self)
    }
}
