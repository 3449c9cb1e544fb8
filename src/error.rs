use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("Missing configuration: {0} is not set")]
    ConfigurationMissing(&'static str),

    #[error("Invalid configuration for {key}: {reason}")]
    ConfigurationInvalid { key: &'static str, reason: String },

    #[error("Invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected file format in {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error("Io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}
