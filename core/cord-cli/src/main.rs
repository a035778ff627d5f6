//! cord: diagnostic CLI for the presence bridge.
//!
//! Exercises the same engine the editor plugin loads, without an editor.
//!
//! ## Subcommands
//!
//! - `profiles`: List named client profiles and their application ids
//! - `lookup`: Show how a file type is classified
//! - `show`: Connect, display one activity, hold it, disconnect
//! - `clear`: Connect and clear the displayed activity

mod logging;
mod lookup;
mod show;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cord")]
#[command(about = "Editor rich presence bridge")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List named client profiles
    Profiles,

    /// Classify a file type against the icon tables
    Lookup {
        /// Editor file type (e.g. rust, NvimTree, lazy, cord.idle)
        #[arg(value_name = "FILETYPE")]
        filetype: String,
    },

    /// Display an activity for a file, then disconnect
    Show {
        /// File name shown in the activity
        #[arg(value_name = "FILENAME")]
        filename: String,

        /// Editor file type
        #[arg(value_name = "FILETYPE")]
        filetype: String,

        /// Profile name or numeric client id
        #[arg(long, default_value = "neovim")]
        profile: String,

        /// Icon for numeric client ids
        #[arg(long)]
        icon: Option<String>,

        /// Show as viewing instead of editing
        #[arg(long)]
        read_only: bool,

        /// Workspace shown in the state line
        #[arg(long)]
        cwd: Option<String>,

        /// Repository URL for the button
        #[arg(long)]
        repo: Option<String>,

        /// JSON file with display templates
        #[arg(long, value_name = "PATH")]
        templates: Option<PathBuf>,

        /// Seconds to keep the activity displayed
        #[arg(long, default_value_t = 10)]
        hold: u64,
    },

    /// Clear the displayed activity
    Clear {
        /// Profile name or numeric client id
        #[arg(long, default_value = "neovim")]
        profile: String,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Profiles => {
            print_json(&lookup::profiles());
            Ok(())
        }
        Commands::Lookup { filetype } => {
            print_json(&lookup::classify(&filetype));
            Ok(())
        }
        Commands::Show {
            filename,
            filetype,
            profile,
            icon,
            read_only,
            cwd,
            repo,
            templates,
            hold,
        } => show::show(show::ShowArgs {
            profile,
            icon,
            filename,
            filetype,
            read_only,
            cwd,
            repository: repo,
            templates,
            hold: Duration::from_secs(hold),
        }),
        Commands::Clear { profile } => show::clear(profile),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "cord failed");
        std::process::exit(1);
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!(error = %e, "Failed to render output"),
    }
}
