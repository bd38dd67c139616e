use std::io;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RdlError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Manifest Parsing Error: {0}")]
    Toml(#[from] Arc<toml::de::Error>),

    #[error("Invalid URL '{0}': {1}")]
    Url(String, url::ParseError),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Manifest Error: {0}")]
    Manifest(String),

    #[error("Cache Error: {0}")]
    Cache(String),

    #[error("Resolution Error for '{0}': {1}")]
    Resolution(String, String),

    #[error("Load Error for '{0}': {1}")]
    LoadError(String, String),

    #[error("File in use: {0}")]
    FileContention(String),

    #[error("Load of '{0}' failed after {1} attempts: {2}")]
    RetriesExhausted(String, u32, Box<RdlError>),

    #[error("Task failed to complete: {0}")]
    TaskJoin(String),

    #[error("Runtime Error: {0}")]
    Runtime(String),
}

impl RdlError {
    /// Whether this failure is a transient filesystem-contention error
    /// (target file locked or in use by a concurrent writer).
    pub fn is_file_contention(&self) -> bool {
        match self {
            RdlError::FileContention(_) => true,
            RdlError::Io(e) => is_contention_io(e),
            _ => false,
        }
    }
}

fn is_contention_io(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::ResourceBusy | io::ErrorKind::ExecutableFileBusy
    ) {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}

impl From<io::Error> for RdlError {
    fn from(err: io::Error) -> Self {
        RdlError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for RdlError {
    fn from(err: serde_json::Error) -> Self {
        RdlError::Json(Arc::new(err))
    }
}

impl From<toml::de::Error> for RdlError {
    fn from(err: toml::de::Error) -> Self {
        RdlError::Toml(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, RdlError>;
