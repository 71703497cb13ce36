// Errors for the file-backed parts of the agent (config, stats, templates)
use std::path::PathBuf;
use thiserror::Error;

pub type AutoResult<T> = Result<T, AutoError>;

#[derive(Debug, Error)]
pub enum AutoError {
    #[error("Failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file {path:?} is not valid JSON: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to access stats file {path:?}: {source}")]
    StatsIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Stats file {path:?} is not valid JSON: {source}")]
    StatsParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to load template {path:?}: {source}")]
    TemplateLoad {
        path: PathBuf,
        source: image::ImageError,
    },
}
