//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use docmarks_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const LOAD: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("No fixture data configured")]
    #[diagnostic(
        code(docmarks::no_seed),
        help(
            "Pass --seed <file>, set DOCMARKS_SEED, or add `seed = \"...\"` to {path}"
        )
    )]
    NoSeed { path: String },

    #[error("Could not read fixture {path}")]
    #[diagnostic(code(docmarks::fixture_io))]
    FixtureIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture {path}")]
    #[diagnostic(
        code(docmarks::fixture_json),
        help("Expected an object with `annotations` and/or `bookmarks` arrays.")
    )]
    FixtureJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(docmarks::config))]
    Config(Box<figment::Error>),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(docmarks::validation))]
    Validation { field: String, reason: String },

    // ── Collection views ─────────────────────────────────────────────
    #[error("Could not load collection for document {document}")]
    #[diagnostic(
        code(docmarks::load_failed),
        help("{reason}\nRun the command again to retry.")
    )]
    LoadFailed { document: String, reason: String },

    #[error("Collection view stopped unexpectedly")]
    #[diagnostic(code(docmarks::view_closed))]
    ViewClosed,

    #[error("Internal error: {message}")]
    #[diagnostic(
        code(docmarks::internal),
        help("This is a bug in docmarks; rerun with -vv and report the output.")
    )]
    Internal { message: String },
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoSeed { .. }
            | Self::FixtureIo { .. }
            | Self::FixtureJson { .. }
            | Self::Config(_) => exit_code::CONFIG,
            Self::LoadFailed { .. } => exit_code::LOAD,
            Self::ViewClosed | Self::Internal { .. } => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::FetchFailed { document, source } => CliError::LoadFailed {
                document: document.to_string(),
                reason: source.to_string(),
            },
            CoreError::ViewClosed => CliError::ViewClosed,
            // Delete failures stay inside the view and no entry point
            // returns them; a reply mismatch is a view bug.
            err @ (CoreError::DeleteFailed { .. } | CoreError::UnexpectedReply { .. }) => {
                CliError::Internal {
                    message: err.to_string(),
                }
            }
        }
    }
}
