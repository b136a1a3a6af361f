use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Context not found for session: {0}")]
    ContextNotFound(String),

    #[error("Failed to load conversation context: {0}")]
    Load(String),

    #[error("Failed to append message: {0}")]
    AddMessage(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Document ingestion failed: {0}")]
    Ingestion(String),

    #[error("Knowledge search failed: {0}")]
    Search(String),

    #[error("Not supported by this store: {0}")]
    NotSupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use cogni_core::Error;
    /// let err = Error::config_error("overlap must be smaller than chunk size");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating load errors
    pub fn load_error(msg: impl Into<String>) -> Self {
        Error::Load(msg.into())
    }

    /// Helper for creating search errors
    pub fn search_error(msg: impl Into<String>) -> Self {
        Error::Search(msg.into())
    }

    /// True when the error indicates a missing optional capability rather
    /// than a genuine failure.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::NotSupported(_))
    }
}
