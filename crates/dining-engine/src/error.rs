//! Error types for the dining engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the run so that
//! `main` can propagate with `?`.

/// Top-level error for the dining engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: dining_core::ConfigError,
    },

    /// The table could not be built or an actor failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: dining_core::RunnerError,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
