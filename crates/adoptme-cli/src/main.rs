use std::path::PathBuf;
use std::process;
use std::time::Duration;

use adoptme::browser::{DEFAULT_WEBDRIVER_URL, HeadlessBrowser};
use adoptme::config::{self, SyncConfig, VariantConfig};
use adoptme::export::{ExportOutcome, export_items_csv};
use adoptme::scraper::WebScraper;
use adoptme::{scrape_variants, sync_items};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "adoptme")]
#[command(about = "An adoptmetradingvalues.com item value scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch item details for ids not yet in the JSON store, then rebuild the CSV
    Items {
        #[arg(
            short = 'c',
            long = "category",
            default_value = config::DEFAULT_CATEGORY,
            help = "Listing category to scan (repeatable)"
        )]
        categories: Vec<String>,

        #[arg(
            long,
            conflicts_with = "categories",
            help = "Scan every category the site publishes"
        )]
        all_categories: bool,

        #[arg(long, default_value = config::DEFAULT_ITEMS_JSON, help = "JSON store path")]
        json: PathBuf,

        #[arg(long, default_value = config::DEFAULT_ITEMS_CSV, help = "CSV export path")]
        csv: PathBuf,

        #[arg(
            long,
            default_value_t = 100,
            help = "Pause before each item request, in milliseconds"
        )]
        delay_ms: u64,

        #[arg(long, default_value = adoptme::BASE_URL, help = "Site base URL")]
        base_url: String,
    },
    /// Render the neon/mega listing in a headless browser and save every variant
    Variants {
        #[arg(long, help = "Listing URL to render [default: petsneons listing]")]
        url: Option<String>,

        #[arg(long, default_value = config::DEFAULT_VARIANTS_JSON, help = "JSON output path")]
        json: PathBuf,

        #[arg(long, default_value = config::DEFAULT_VARIANTS_CSV, help = "CSV output path")]
        csv: PathBuf,

        #[arg(long, default_value = DEFAULT_WEBDRIVER_URL, help = "chromedriver endpoint")]
        webdriver_url: String,

        #[arg(
            long,
            default_value_t = 5,
            help = "Seconds to wait for client-side rendering"
        )]
        render_wait_secs: u64,
    },
    /// Rebuild the item CSV from an existing JSON store without fetching anything
    Export {
        #[arg(long, default_value = config::DEFAULT_ITEMS_JSON, help = "JSON store path")]
        json: PathBuf,

        #[arg(long, default_value = config::DEFAULT_ITEMS_CSV, help = "CSV export path")]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Items {
            categories,
            all_categories,
            json,
            csv,
            delay_ms,
            base_url,
        } => {
            let categories = if all_categories {
                SyncConfig::all_categories()
            } else {
                categories
            };

            let sync_config = SyncConfig {
                categories,
                json_path: json,
                csv_path: csv,
                delay: Duration::from_millis(delay_ms),
            }
            .validate()
            .unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let scraper = WebScraper::with_base_url(&base_url).unwrap_or_else(|e| {
                log::error!("Error creating scraper: {}", e);
                process::exit(1);
            });

            log::info!(
                "Syncing categories {:?} from {}...",
                sync_config.categories,
                scraper.base_url()
            );

            let report = sync_items(&scraper, &sync_config)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error syncing items: {}", e);
                    process::exit(1);
                });

            print!("{}", report);
        }

        Commands::Variants {
            url,
            json,
            csv,
            webdriver_url,
            render_wait_secs,
        } => {
            let defaults = VariantConfig::default();
            let variant_config = VariantConfig {
                list_url: url.unwrap_or(defaults.list_url),
                json_path: json,
                csv_path: csv,
            }
            .validate()
            .unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let browser =
                HeadlessBrowser::new(webdriver_url, Duration::from_secs(render_wait_secs));

            let (_, report) = scrape_variants(&browser, &variant_config)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error scraping variants: {}", e);
                    process::exit(1);
                });

            print!("{}", report);
        }

        Commands::Export { json, csv } => {
            match export_items_csv(&json, &csv) {
                Ok(ExportOutcome::Written(rows)) => {
                    println!("Wrote {} rows to {}", rows, csv.display())
                }
                Ok(outcome) => println!("CSV export {}", outcome),
                Err(e) => {
                    log::error!("Error exporting CSV: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}
