use thiserror::Error;

/// Failures while loading the embedded keyboard layout definitions
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout file not found: {0}")]
    Missing(String),

    #[error("layout file {file} is not valid UTF-8")]
    Encoding { file: String },

    #[error("failed to parse layout file {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("layout {0} is defined more than once")]
    Duplicate(String),
}

/// Failures while persisting engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
