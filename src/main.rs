// src/main.rs
//! Blink Package Manager - CLI Entry Point

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

mod commands;

// =============================================================================
// CLI Definitions
// =============================================================================

#[derive(Parser)]
#[command(name = "blink")]
#[command(version)]
#[command(about = "A lightweight, source-based package manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a package recipe into the local cache
    Get {
        /// Package name
        package: String,

        /// Re-download even if already cached
        #[arg(short, long)]
        force: bool,

        /// Recipe cache directory override
        #[arg(short = 'p', long)]
        path: Option<String>,

        /// Data root directory
        #[arg(short, long, default_value = "/")]
        root: String,
    },

    /// Fetch (if needed) and print recipe metadata
    Search {
        /// Package name
        package: String,

        /// Re-fetch the recipe even if already cached
        #[arg(short, long)]
        force: bool,

        /// Recipe cache directory override
        #[arg(short = 'p', long)]
        path: Option<String>,

        /// Data root directory
        #[arg(short, long, default_value = "/")]
        root: String,
    },

    /// Download, build and install a package
    Install {
        /// Package name
        package: String,

        /// Reinstall even if already installed
        #[arg(short, long)]
        force: bool,

        /// Recipe cache directory override
        #[arg(short = 'p', long)]
        path: Option<String>,

        /// Data root directory
        #[arg(short, long, default_value = "/")]
        root: String,
    },

    /// Run a package's uninstall commands and forget it
    Uninstall {
        /// Package name
        package: String,

        /// Re-fetch recipe and source before uninstalling
        #[arg(short, long)]
        force: bool,

        /// Recipe cache directory override
        #[arg(short = 'p', long)]
        path: Option<String>,

        /// Data root directory
        #[arg(short, long, default_value = "/")]
        root: String,
    },

    /// Synchronize the configured recipe repositories
    Sync {
        /// Hard-reset working trees to the verified commit
        #[arg(short, long)]
        force: bool,

        /// Data root directory
        #[arg(short, long, default_value = "/")]
        root: String,
    },

    /// Upgrade installed packages whose release has advanced
    Update {
        /// Recipe cache directory override
        #[arg(short = 'p', long)]
        path: Option<String>,

        /// Data root directory
        #[arg(short, long, default_value = "/")]
        root: String,
    },

    /// Confirm, then truncate recipes/, sources/ and build/
    Clean {
        /// Data root directory
        #[arg(short, long, default_value = "/")]
        root: String,
    },

    /// Show support information
    Support,

    /// Show version information
    Version,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn version_text() -> String {
    format!(
        "Blink Package Manager - Version {}\nLicensed under the Apache 2.0 License.\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Get {
            package,
            force,
            path,
            root,
        }) => commands::cmd_get(&package, force, path.as_deref(), &root),

        Some(Commands::Search {
            package,
            force,
            path,
            root,
        }) => commands::cmd_search(&package, force, path.as_deref(), &root),

        Some(Commands::Install {
            package,
            force,
            path,
            root,
        }) => commands::cmd_install(&package, force, path.as_deref(), &root),

        Some(Commands::Uninstall {
            package,
            force,
            path,
            root,
        }) => commands::cmd_uninstall(&package, force, path.as_deref(), &root),

        Some(Commands::Sync { force, root }) => commands::cmd_sync(force, &root),

        Some(Commands::Update { path, root }) => commands::cmd_update(path.as_deref(), &root),

        Some(Commands::Clean { root }) => commands::cmd_clean(&root),

        Some(Commands::Support) => {
            print!("{}", commands::SUPPORT_TEXT);
            Ok(())
        }

        Some(Commands::Version) => {
            print!("{}", version_text());
            Ok(())
        }

        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "blink", &mut io::stdout());
            Ok(())
        }

        None => {
            println!("Run 'blink --help' for usage information");
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BLINK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Welcome banner, printed by every command.
    println!("Blink Package Manager v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        // One line: the error kind, the implicated name, and any
        // captured subprocess stderr.
        eprintln!("blink: {e:#}");
        std::process::exit(1);
    }
}
