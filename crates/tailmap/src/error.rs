//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and api-crate failures into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use tailmap_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const SOURCES: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("no device source configured")]
    #[diagnostic(
        code(tailmap::no_sources),
        help(
            "Set a tailnet and API key (--tailnet/--api-key, TAILMAP_TAILNET/\n\
             TAILMAP_API_KEY, or the config file at {config_path}), or point\n\
             --device-file at a manual device file."
        )
    )]
    NoSources { config_path: String },

    #[error("invalid {field}: {reason}")]
    #[diagnostic(code(tailmap::validation))]
    Validation { field: String, reason: String },

    #[error("could not load configuration")]
    #[diagnostic(
        code(tailmap::config),
        help("Check the TOML syntax of your config file and any TAILMAP_* variables.")
    )]
    Config(#[from] Box<figment::Error>),

    #[error(transparent)]
    #[diagnostic(code(tailmap::core))]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(code(tailmap::api))]
    Api(#[from] tailmap_api::Error),
}

impl CliError {
    /// Map each error class to a stable exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoSources { .. } | Self::Validation { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            Self::Core(CoreError::NotFound { .. }) => exit_code::NOT_FOUND,
            Self::Core(
                CoreError::AllSourcesExhausted { .. } | CoreError::SourceUnavailable { .. },
            ) => exit_code::SOURCES,
            Self::Core(_) | Self::Api(_) => exit_code::GENERAL,
        }
    }
}
