//! Clap derive structures for the `docmarks` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// docmarks -- browse and prune document annotations and bookmarks
#[derive(Debug, Parser)]
#[command(
    name = "docmarks",
    version,
    about = "Browse and prune document annotations and bookmarks",
    long_about = "Loads annotation and bookmark collections for a document through\n\
        single-flight collection views, and removes items optimistically.\n\n\
        Data comes from a JSON fixture file (--seed or the `seed` config key).",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "DOCMARKS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// JSON fixture with annotations and bookmarks
    #[arg(long, env = "DOCMARKS_SEED", global = true)]
    pub seed: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, short = 'o', env = "DOCMARKS_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Simulated repository latency in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub latency_ms: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List or remove a document's annotations
    #[command(alias = "ann", alias = "a")]
    Annotations(CollectionArgs),

    /// List or remove a document's bookmarks
    #[command(alias = "bm", alias = "b")]
    Bookmarks(CollectionArgs),

    /// List documents present in the fixture
    #[command(alias = "docs")]
    Documents,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct CollectionArgs {
    #[command(subcommand)]
    pub command: CollectionCommand,
}

#[derive(Debug, Subcommand)]
pub enum CollectionCommand {
    /// Load and print the collection
    #[command(alias = "ls")]
    List {
        /// Document id
        #[arg(long, short = 'd')]
        document: String,
    },

    /// Remove items by list position, then print what remains
    #[command(alias = "rm")]
    Remove {
        /// Document id
        #[arg(long, short = 'd')]
        document: String,

        /// Zero-based position in the listed order (repeatable)
        #[arg(long = "index", short = 'i', required = true, num_args = 1..)]
        indices: Vec<usize>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
