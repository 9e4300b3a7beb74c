//! Incremental item sync: discover ids per category, skip the ones already
//! stored, fetch the rest one by one and persist each as soon as it arrives.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;

use crate::config::SyncConfig;
use crate::export::{ExportError, ExportOutcome, export_items_csv};
use crate::scraper::ItemSource;
use crate::store::{ItemStore, StoreError};
use crate::types::ScrapedItem;

const UNKNOWN_CATEGORY: &str = "unknown";

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Unique ids found across all category listings.
    pub discovered: usize,
    /// Ids already in the store when the run started.
    pub already_present: usize,
    pub fetched: usize,
    pub failed: usize,
    pub export: ExportOutcome,
}

impl Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nSync summary:")?;
        writeln!(f, "  Discovered on site: {}", self.discovered)?;
        writeln!(f, "  Already stored:     {}", self.already_present)?;
        writeln!(f, "  Fetched:            {}", self.fetched)?;
        writeln!(f, "  Failed:             {}", self.failed)?;
        writeln!(f, "  CSV export:         {}", self.export)
    }
}

/// Ids discovered on the listing pages, with the category each was last seen under.
#[derive(Debug, Default)]
pub struct Discovery {
    pub id_to_category: HashMap<String, String>,
    pub ids: BTreeSet<String>,
}

pub async fn discover_ids<S: ItemSource>(source: &S, categories: &[String]) -> Discovery {
    let mut discovery = Discovery::default();

    for category in categories {
        match source.fetch_category_ids(category).await {
            Ok(ids) => {
                log::info!("Found {} IDs in category '{}'", ids.len(), category);
                for id in ids {
                    // An id listed under several categories ends up with the last one.
                    discovery
                        .id_to_category
                        .insert(id.clone(), category.clone());
                    discovery.ids.insert(id);
                }
            }
            Err(e) => log::warn!("Could not fetch category '{}': {}", category, e),
        }
    }

    log::info!(
        "Found a total of {} unique IDs on the website",
        discovery.ids.len()
    );
    discovery
}

/// Ids already in the store. An unreadable document counts as empty.
pub fn load_persisted_ids(store: &ItemStore) -> Result<BTreeSet<String>, StoreError> {
    match store.load_ids() {
        Ok(Some(ids)) => {
            log::info!(
                "Loaded {} previously scraped items. Will skip them.",
                ids.len()
            );
            Ok(ids)
        }
        Ok(None) => {
            log::info!("No data file found. Starting a new scrape from scratch.");
            Ok(BTreeSet::new())
        }
        Err(e @ (StoreError::Json { .. } | StoreError::Shape { .. })) => {
            log::warn!("{}. Please delete it and restart.", e);
            Ok(BTreeSet::new())
        }
        Err(e) => Err(e),
    }
}

pub async fn sync_items<S: ItemSource>(
    source: &S,
    config: &SyncConfig,
) -> Result<SyncReport, SyncError> {
    let store = ItemStore::new(&config.json_path, &config.categories);

    let discovery = discover_ids(source, &config.categories).await;
    let persisted = load_persisted_ids(&store)?;

    let remaining: Vec<&String> = discovery.ids.difference(&persisted).collect();
    log::info!("There are {} new items to scrape", remaining.len());

    let mut fetched = 0;
    let mut failed = 0;

    if remaining.is_empty() {
        log::info!("Everything is already up-to-date!");
    }

    for id in remaining {
        tokio::time::sleep(config.delay).await;

        let category = discovery
            .id_to_category
            .get(id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CATEGORY);

        let record = match source.fetch_item(id).await {
            Ok(record) => record,
            Err(e) => {
                log::error!("ERROR on ID {}: {} - SKIPPING", id, e);
                failed += 1;
                continue;
            }
        };

        let item = ScrapedItem {
            id: id.clone(),
            category: category.to_string(),
            record,
        };

        match store.upsert(&item) {
            Ok(()) => {
                log::info!("SAVED: {} (ID: {})", item.record, item.id);
                fetched += 1;
            }
            Err(e) => {
                log::error!("ERROR on ID {}: {} - SKIPPING", id, e);
                failed += 1;
            }
        }
    }

    log::info!(
        "Generating a complete CSV file at '{}'",
        config.csv_path.display()
    );
    let export = export_items_csv(&config.json_path, &config.csv_path)?;

    Ok(SyncReport {
        discovered: discovery.ids.len(),
        already_present: persisted.len(),
        fetched,
        failed,
        export,
    })
}
