//! CLI module for Kosei.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kosei - medical pamphlet outline drafting
///
/// Reads Word, PDF and PowerPoint files plus recorded talks from an input
/// directory and drafts the outline of a pamphlet for healthcare professionals.
/// "Kōsei" is Japanese for "structure".
#[derive(Parser, Debug)]
#[command(name = "kosei")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract the input files and generate a pamphlet outline
    Run {
        /// Directory holding the source files (default: from config, "input")
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Directory the outline and summary are written to (default: from config, "output")
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Do not transcribe audio files
        #[arg(long)]
        skip_audio: bool,

        /// Do not analyze documents and presentations
        #[arg(long)]
        skip_documents: bool,

        /// Reference outline whose format the generated outline follows
        #[arg(long)]
        reference: Option<PathBuf>,
    },

    /// Check credentials, directories and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a configuration file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
