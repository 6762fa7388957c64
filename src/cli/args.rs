//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::{Overrides, RunMode};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Component application server
#[derive(Parser)]
#[command(
    name = "roost",
    version = env!("CARGO_PKG_VERSION"),
    about = "Component application server",
    long_about = "Serve a components directory with a supervised pool of worker processes.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ roost init                  # Create roost.toml in the current directory\n  $ roost serve                 # Supervisor, watcher and one worker per core\n  $ roost serve --single        # One in-process server, no supervisor\n  $ roost resolve nav header    # Show which config file a key resolves to"
)]
pub struct Cli {
    /// Path to a roost.toml file (defaults to {home}/roost.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Application home directory
    #[arg(long, global = true, env = "ROOST_HOME")]
    pub home: Option<PathBuf>,

    /// Application name
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Run mode
    #[arg(long, global = true, value_enum)]
    pub mode: Option<RunMode>,

    /// Listening port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings overrides given on the command line.
    pub fn overrides(&self) -> Overrides {
        let workers = match &self.command {
            Commands::Serve {
                single: true, ..
            } => Some(1),
            Commands::Serve { workers, .. } => *workers,
            _ => None,
        };
        Overrides {
            name: self.name.clone(),
            home: self.home.clone(),
            mode: self.mode,
            port: self.port,
            workers,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create a default roost.toml
    #[command(about = "Write roost.toml with default settings and create components/")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display effective settings as TOML")]
    Config,

    /// Start the server
    #[command(
        about = "Start the supervisor and worker pool",
        after_help = "Examples:\n  roost serve\n  roost serve --workers 2 --port 3000\n  roost serve --single --no-watch"
    )]
    Serve {
        /// Number of worker processes (overrides workers.count)
        #[arg(short, long, conflicts_with = "single")]
        workers: Option<usize>,

        /// Serve from this process without a worker pool
        #[arg(long)]
        single: bool,

        /// Do not watch sources for rebuilds
        #[arg(long)]
        no_watch: bool,
    },

    /// Worker process entrypoint, started by `serve`
    #[command(hide = true)]
    Worker,

    /// Resolve a component config from disk
    #[command(
        about = "Show the config candidates for a component and the document they resolve to",
        after_help = "Examples:\n  roost resolve nav\n  roost resolve nav header"
    )]
    Resolve {
        /// Component name
        component: String,

        /// Subcomponent name
        subcomponent: Option<String>,
    },

    /// Inspect the shared config cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Print the stored document for a key such as `nav` or `nav/header`
    Get {
        key: String,
    },
}
