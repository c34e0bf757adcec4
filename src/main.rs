use clap::{Parser, Subcommand};
use stagesync::config::Config;
use stagesync::db::{DatabaseManager, LibsqlShowStore};
use stagesync::detail::ShowDetailFetcher;
use stagesync::geocoder::VenueGeocoder;
use stagesync::ingester::{IngestSummary, Ingester};
use stagesync::lifecycle::{source_today, LifecycleJob};
use stagesync::listing::RegionLister;
use stagesync::logging;
use stagesync::source::{SourceClient, SourceFetch};
use stagesync::storage::ShowStore;
use stagesync::types::DateWindow;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stagesync")]
#[command(about = "Show data ingestion and lifecycle sync for the stage directory")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the directory service and store shows it has not seen yet
    Ingest,
    /// Advance lifecycle states and sync the weekly ranking
    Lifecycle,
    /// Run ingestion, then the lifecycle sync
    Run,
}

fn build_ingester(
    config: &Config,
    source: Arc<dyn SourceFetch>,
    store: Arc<dyn ShowStore>,
) -> Ingester {
    let today = source_today();
    let window = DateWindow {
        start: today - chrono::Duration::days(config.ingest.lookback_days),
        end: today + chrono::Duration::days(config.ingest.lookahead_days),
    };

    let lister = RegionLister::new(Arc::clone(&source), config.source.genre_code.clone());
    let geocoder = VenueGeocoder::new(Arc::clone(&source));
    let details = Arc::new(ShowDetailFetcher::new(source, geocoder));

    Ingester::new(
        lister,
        details,
        store,
        window,
        config.ingest.page_size,
        Duration::from_millis(config.ingest.page_delay_ms),
    )
}

fn print_summary(summary: &IngestSummary) {
    println!("\n📊 Ingestion results:");
    println!("   Pages crawled: {}", summary.pages);
    println!("   Entries listed: {}", summary.listed);
    println!("   Shows created: {}", summary.created);
    println!("   Already known: {}", summary.already_known);
    println!("   Failed: {}", summary.failed);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    let db = Arc::new(DatabaseManager::new().await?);
    db.run_migrations().await?;
    let store: Arc<dyn ShowStore> = Arc::new(LibsqlShowStore::new(Arc::clone(&db)));
    let source: Arc<dyn SourceFetch> = Arc::new(SourceClient::new(&config.source)?);

    match cli.command {
        Commands::Ingest => {
            println!("📥 Running ingestion...");
            let ingester = build_ingester(&config, source, store);
            let summary = ingester.run().await;
            print_summary(&summary);
        }
        Commands::Lifecycle => {
            println!("🔄 Running lifecycle sync...");
            let job = LifecycleJob::new(source, store, config.source.genre_code.clone());
            job.run().await;
            println!("✅ Lifecycle sync completed");
        }
        Commands::Run => {
            println!("🚀 Running ingestion, then lifecycle sync...");
            let ingester =
                build_ingester(&config, Arc::clone(&source), Arc::clone(&store));
            let summary = ingester.run().await;
            print_summary(&summary);

            let job = LifecycleJob::new(source, store, config.source.genre_code.clone());
            job.run().await;
            println!("✅ Full run completed");
        }
    }

    Ok(())
}
