//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error that `main` propagates with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: lastseen_core::config::ConfigError,
    },

    /// The processor refused to start.
    #[error("processor error: {source}")]
    Processor {
        /// The underlying processor error.
        #[from]
        source: lastseen_core::processor::ProcessorError,
    },

    /// NATS connection or subscription failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },
}
