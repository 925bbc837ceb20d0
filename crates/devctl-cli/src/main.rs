mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, container::ContainerSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "devctl",
    about = "Start, stop and inspect Docker containers; back up and restore MySQL",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .devctl/)
    #[arg(long, global = true, env = "DEVCTL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .devctl/ with a default config
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },

    /// Start, stop or restart a container
    Container {
        #[command(subcommand)]
        subcommand: ContainerSubcommand,
    },

    /// Show the last lines of a container's logs
    Logs {
        name: String,
        /// Number of lines (default: logs.default_lines)
        #[arg(long, short = 'n')]
        lines: Option<u32>,
    },

    /// List containers
    Ps,

    /// Dump the database into a new backup file
    Backup {
        /// Backup filename (default: backup_<timestamp>.sql)
        #[arg(long)]
        filename: Option<String>,
    },

    /// Restore the database from a backup file
    Restore { filename: String },

    /// List backup files
    Backups,

    /// Show docker and host information
    Info,

    /// Show container, backup and database metrics
    Metrics,

    /// Show or validate the configuration
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
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Serve { bind, port } => cmd::serve::run(&root, &bind, port),
        Commands::Container { subcommand } => cmd::container::run(&root, subcommand, cli.json),
        Commands::Logs { name, lines } => cmd::logs::run(&root, &name, lines, cli.json),
        Commands::Ps => cmd::ps::run(&root, cli.json),
        Commands::Backup { filename } => cmd::backup::backup(&root, filename.as_deref(), cli.json),
        Commands::Restore { filename } => cmd::backup::restore(&root, &filename, cli.json),
        Commands::Backups => cmd::backup::list(&root, cli.json),
        Commands::Info => cmd::info::run(&root, cli.json),
        Commands::Metrics => cmd::metrics::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
