//! plugstate: command-line host for plugin state.
//!
//! Loads a plugin's `plugstate.toml`, opens the medium its strategy names,
//! and runs one state operation against it.
//!
//! # Usage
//!
//! ```text
//! plugstate init --plugin-id state-demo
//! plugstate save '{"counter": 3}'
//! plugstate get
//! plugstate demo
//! plugstate clear
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod form;

#[derive(Parser)]
#[command(
    name = "plugstate",
    about = "plugstate: plugin state persistence host",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Directory holding the durable state database.
    #[arg(long, global = true, default_value = ".plugstate")]
    data_dir: PathBuf,

    /// Log debug output from the state store.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a plugstate.toml for the demo form.
    Init {
        #[arg(long)]
        plugin_id: String,
        #[arg(short, long, default_value = "plugstate.toml")]
        output: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Save a JSON object as the plugin's state.
    Save {
        #[arg(short, long, default_value = "plugstate.toml")]
        config: PathBuf,
        /// State snapshot, e.g. '{"counter": 3}'.
        state: String,
    },
    /// Print the restored state.
    Get {
        #[arg(short, long, default_value = "plugstate.toml")]
        config: PathBuf,
        /// Print schema defaults when nothing is persisted.
        #[arg(long)]
        defaults: bool,
    },
    /// Delete the persisted state.
    Clear {
        #[arg(short, long, default_value = "plugstate.toml")]
        config: PathBuf,
    },
    /// Run the demo form: restore, edit, and auto-save.
    Demo {
        #[arg(short, long, default_value = "plugstate.toml")]
        config: PathBuf,
        /// Finish by resetting the form and clearing its state.
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,plugstate=debug"
    } else {
        "warn,plugstate=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init {
            plugin_id,
            output,
            force,
        } => commands::init::init(&plugin_id, &output, force),
        Commands::Save { config, state } => {
            let store = commands::load_store(&cli.data_dir, &config)?;
            commands::state::save(&store, &state).await
        }
        Commands::Get { config, defaults } => {
            let store = commands::load_store(&cli.data_dir, &config)?;
            commands::state::get(&store, defaults).await
        }
        Commands::Clear { config } => {
            let store = commands::load_store(&cli.data_dir, &config)?;
            commands::state::clear(&store).await
        }
        Commands::Demo { config, reset } => {
            let store = commands::load_store(&cli.data_dir, &config)?;
            let form = commands::demo::run(&store, reset).await?;
            println!("✓ Final form: {form}");
            Ok(())
        }
    }
}
