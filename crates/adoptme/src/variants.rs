//! Full re-scrape of the rendered neon/mega listing. No resume: every run
//! overwrites both outputs.

use std::fmt::Display;

use crate::browser::{PageRenderer, RenderError};
use crate::config::VariantConfig;
use crate::export::{ExportError, ExportOutcome, export_variants_csv};
use crate::parser::{ParseError, parse_variant_listing};
use crate::store::{StoreError, save_variants};
use crate::types::VariantMap;

#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantReport {
    pub neons: usize,
    pub megas: usize,
    pub skipped: usize,
    pub export: ExportOutcome,
}

impl Display for VariantReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nVariant summary:")?;
        writeln!(f, "  Neons:      {}", self.neons)?;
        writeln!(f, "  Megas:      {}", self.megas)?;
        writeln!(f, "  Skipped:    {}", self.skipped)?;
        writeln!(f, "  CSV export: {}", self.export)
    }
}

/// Site root the listing's relative image paths resolve against.
fn origin_of(list_url: &str) -> String {
    reqwest::Url::parse(list_url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .filter(|o| o != "null")
        .unwrap_or_else(|| crate::BASE_URL.to_string())
}

pub async fn scrape_variants<R: PageRenderer>(
    renderer: &R,
    config: &VariantConfig,
) -> Result<(VariantMap, VariantReport), VariantError> {
    log::info!("Fetching and parsing the neon/mega list page: {}", config.list_url);
    let html = renderer.render(&config.list_url).await?;

    let listing = parse_variant_listing(&html, &origin_of(&config.list_url))?;
    log::info!("Extracted {} items in total", listing.extracted);

    save_variants(&config.json_path, &listing.map)?;
    log::info!("JSON saved to '{}'", config.json_path.display());

    let export = export_variants_csv(&config.csv_path, &listing.map)?;

    let report = VariantReport {
        neons: listing.map.neons.len(),
        megas: listing.map.megas.len(),
        skipped: listing.skipped,
        export,
    };

    Ok((listing.map, report))
}
