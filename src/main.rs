use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};
use harvest::{
    export_to_dir, info_time, logging, ContactLookup, DomainContact, Error, FileStore, Halt,
    HarvestConfig, Harvester, HttpPageSource, NoContact, PageSource, Progress, Result,
    SyntheticSource,
};

/// Harvest organizations from a paginated listing.
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(version)]
struct Cli {
    /// Listing URL, `{page}` is replaced with the page number
    #[arg(long, global = true, env = "HARVEST_BASE_URL")]
    base_url: Option<String>,

    /// Directory holding the record snapshot
    #[arg(long, global = true, env = "HARVEST_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest pages until the batch is full, the source runs dry or a fetch fails
    Run {
        /// Use the built-in generator instead of fetching HTML
        #[arg(long)]
        demo: bool,

        /// Records per batch
        #[arg(long)]
        batch_limit: Option<usize>,

        /// Milliseconds to wait between pages
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Don't derive contact emails from websites
        #[arg(long)]
        no_contacts: bool,

        /// Write the CSV once the run stops
        #[arg(long)]
        export: bool,
    },
    /// Show what the snapshot holds
    Status,
    /// Write the snapshot's records to a CSV file
    Export {
        /// Output directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete every harvested record
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = HarvestConfig::from_env()?;
    if let Some(url) = &cli.base_url {
        config.source_base_url = url.clone();
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir = dir.clone();
    }

    let start_time = Local::now();
    match cli.command {
        Command::Run {
            demo,
            batch_limit,
            pacing_ms,
            no_contacts,
            export,
        } => {
            if let Some(limit) = batch_limit {
                config.batch_limit = limit;
            }
            if let Some(ms) = pacing_ms {
                config.pacing_interval = std::time::Duration::from_millis(ms);
            }
            config.validate()?;

            let source: Arc<dyn PageSource> = if demo {
                Arc::new(SyntheticSource::new(25, 20))
            } else {
                Arc::new(HttpPageSource::new(&config)?)
            };
            let lookup: Arc<dyn ContactLookup> = if no_contacts {
                Arc::new(NoContact)
            } else {
                Arc::new(DomainContact::default())
            };
            run(config, source, lookup, export).await?;
        }
        Command::Status => {
            let harvester = open(config, Arc::new(NoContact)).await;
            print_progress(&harvester.progress());
        }
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(|| config.export_dir.clone());
            let harvester = open(config, Arc::new(NoContact)).await;
            write_export(&harvester, &dir).await?;
        }
        Command::Reset => {
            let harvester = open(config, Arc::new(NoContact)).await;
            harvester.reset().await;
            println!("All harvested records were removed.");
        }
    }
    info_time!(start_time, "Full program time:");

    Ok(())
}

/// A harvester for the commands that only read or clear the snapshot.
async fn open(config: HarvestConfig, lookup: Arc<dyn ContactLookup>) -> Harvester {
    let store = Arc::new(FileStore::new(config.state_dir.clone()));
    Harvester::new(config, Arc::new(SyntheticSource::new(0, 0)), lookup, store).await
}

async fn run(
    config: HarvestConfig,
    source: Arc<dyn PageSource>,
    lookup: Arc<dyn ContactLookup>,
    export: bool,
) -> Result<()> {
    let export_dir = config.export_dir.clone();
    let store = Arc::new(FileStore::new(config.state_dir.clone()));
    let harvester = Harvester::new(config, source, lookup, store).await;

    // Ctrl-C pauses after the page in flight.
    tokio::spawn({
        let harvester = harvester.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                harvester.pause();
            }
        }
    });

    match harvester.start().await {
        Ok(halt) => {
            println!("Stopped: {halt}");
            print_progress(&harvester.progress());
            if halt == Halt::BatchFull {
                println!("Run `harvest run` again to harvest the next batch.");
            }
        }
        Err(e @ (Error::NotRestartable { .. } | Error::InvalidStatus(_))) => {
            println!("{e}");
            print_progress(&harvester.progress());
        }
        Err(e) => return Err(e),
    }

    if export {
        write_export(&harvester, &export_dir).await?;
    }
    Ok(())
}

async fn write_export(harvester: &Harvester, dir: &std::path::Path) -> Result<()> {
    let records = harvester.records();
    match export_to_dir(dir, &records, Local::now().date_naive()).await {
        Ok(path) => println!("Exported {} records to {}", records.len(), path.display()),
        Err(Error::EmptyExport) => println!("Nothing to export yet."),
        Err(e) => return Err(e),
    }
    Ok(())
}

fn print_progress(progress: &Progress) {
    let state = &progress.state;
    println!(
        "status: {}  next page: {}  batch: {}  records: {}",
        state.status, state.cursor, state.processed_count, progress.records
    );
    for (region, count) in progress.tally.iter() {
        println!("  {region:<8} {count}");
    }
}
