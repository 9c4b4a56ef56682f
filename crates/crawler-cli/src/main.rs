mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "crawler",
    about = "Discover players from stored matches and collect their match history",
    version,
    propagate_version = true
)]
struct Cli {
    /// Crawler root (default: nearest directory containing .crawler/)
    #[arg(long, global = true, env = "CRAWLER_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and create the crawl database
    Init,

    /// Run the control server and pipeline orchestrator
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long, env = "CRAWLER_PORT")]
        port: Option<u16>,
    },

    /// Queue new players discovered from recent matches
    Seed {
        /// Platform to seed from (default: seed.default_region from config)
        #[arg(long)]
        region: Option<String>,
        /// Number of new players to queue
        #[arg(long)]
        count: Option<u32>,
    },

    /// Collect matches for every pending player
    Process,

    /// Show row counts per crawl status
    Queue,

    /// Move every failed player back to pending
    RetryFailed,

    /// Inspect the crawler configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Seed { region, count } => {
            cmd::seed::run(&root, region.as_deref(), count, cli.json)
        }
        Commands::Process => cmd::process::run(&root, cli.json),
        Commands::Queue => cmd::queue::show(&root, cli.json),
        Commands::RetryFailed => cmd::queue::retry_failed(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
