//! Error taxonomy for a matrix run.
//!
//! Every variant is terminal: the driver never retries.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum CiError {
    /// The manifest is missing, unreadable, or lacks a string `rust-version`.
    #[error("{0}")]
    Config(String),

    /// A toolchain probe could not produce the information the run needs.
    #[error("{0}")]
    Probe(String),

    /// The build tool could not be started.
    #[error("could not run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// An external phase exited unsuccessfully. Its output has already been shown.
    #[error("`{subcommand}` failed with exit code {code}")]
    PhaseFailed { subcommand: String, code: i32 },

    /// The user pressed Ctrl+C.
    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CiError {
    /// Process exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            CiError::PhaseFailed { code, .. } => *code,
            CiError::Interrupted => crate::interrupt::EXIT_CODE,
            CiError::Config(_) | CiError::Probe(_) | CiError::Spawn { .. } | CiError::Io(_) => 1,
        }
    }
}
