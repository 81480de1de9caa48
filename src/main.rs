use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;
use wikibench::{acquire_all, config, load_shard, CorpusConfig, Manifest, Store};

#[derive(Parser, Debug)]
#[command(name = "wikibench")]
#[command(about = "Load Wikipedia dump shards into SQLite for read benchmarks", long_about = None)]
#[command(version)]
struct Args {
    /// Shard names to load (comma-separated); defaults to the known manifest
    #[arg(short, long, value_delimiter = ',')]
    shards: Vec<String>,

    /// JSON manifest file overriding the built-in shard list
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Directory holding (and receiving) shard files
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// SQLite database path
    #[arg(long, default_value = "wikibench.db")]
    database: PathBuf,

    /// Dump download base URL
    #[arg(long, default_value = config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("wikibench={}", log_level))
        .init();

    let mut shards = args.shards;
    if shards.is_empty() {
        shards = match args.manifest {
            Some(path) => Manifest::from_file(&path)?.shards,
            None => CorpusConfig::default().shards,
        };
    }

    let config = CorpusConfig {
        base_url: args.base_url,
        data_dir: args.data_dir,
        db_path: args.database,
        shards,
    };

    info!("Loading Wikipedia dataset...");
    let acquired = match acquire_all(&config, &config.shards).await {
        Ok(acquired) => acquired,
        Err(e) => {
            eprintln!("Error: fail to load dataset: {}", e);
            std::process::exit(1);
        }
    };

    info!("Setting up database...");
    let mut store = Store::open(&config.db_path)?;
    store.setup()?;

    info!("Loading dataset into SQLite...");
    let mut total = 0usize;
    for shard in acquired {
        let bar = load_bar(shard.name());
        match load_shard(store.connection_mut(), shard, &bar) {
            Ok(count) => {
                bar.finish();
                total += count;
            }
            Err(e) => {
                bar.abandon();
                eprintln!("Error: fail to insert dataset: {}", e);
                std::process::exit(1);
            }
        }
    }

    info!("Completed, {} pages created.", total);
    Ok(())
}

/// Creates the per-record spinner shown while one shard loads.
fn load_bar(name: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:>45} {spinner:.cyan} {pos} pages {per_sec}")
            .unwrap(),
    );
    bar.set_prefix(name.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}
