use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use gtfsflow_core::error::Error;
    /// let err = Error::Config("batch_size must be greater than zero".into());
    /// let err = err.with_context("GTFSFLOW_BATCH_SIZE");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self) as Box<dyn std::error::Error + Send + Sync>,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Config(msg) if msg.contains("batch") => vec![
                "batch_size must be at least 1".into(),
                "Check GTFSFLOW_BATCH_SIZE in the environment".into(),
            ],
            _ => vec![],
        }
    }
}
