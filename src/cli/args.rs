//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Question answering over your documents
#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version = env!("CARGO_PKG_VERSION"),
    about = "Question answering over uploaded documents",
    long_about = "Ingest text, PDF and image files, search them by similarity and ask questions answered from their content.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ docqa init\n  $ docqa ingest manual.pdf notes.txt\n  $ docqa ask \"How do I reset the device?\"\n  $ docqa serve"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .docqa directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Start the HTTP server
    #[command(
        about = "Start the HTTP API and browser UI",
        after_help = "Examples:\n  docqa serve\n  docqa serve --bind 0.0.0.0:8000"
    )]
    Serve {
        /// Bind address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ingest files into the collection
    #[command(about = "Extract, chunk and store files")]
    Ingest {
        /// Files to ingest
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Similarity search without generation
    #[command(about = "Find the chunks closest to a query")]
    Search {
        query: String,

        /// Number of results (overrides retrieval.search_k)
        #[arg(short)]
        k: Option<usize>,
    },

    /// Ask a question answered from the stored documents
    #[command(about = "Answer a question from retrieved context")]
    Ask {
        question: String,

        /// Chunks of context (overrides retrieval.ask_k)
        #[arg(short)]
        k: Option<usize>,

        /// Sampling temperature (overrides retrieval.temperature)
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// List ingested documents
    #[command(about = "List documents with their chunk counts")]
    Documents {
        /// Maximum number of documents (overrides retrieval.documents_limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show collection statistics
    #[command(about = "Show chunk count, generation model and embedding scheme")]
    Stats,

    /// Delete every stored chunk
    #[command(about = "Destroy and recreate the collection")]
    Reset,
}
