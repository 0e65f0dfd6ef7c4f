use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("owners cache error: {0}")]
    OwnersCache(String),

    #[error("{0}")]
    CiParse(String),

    #[error("reviewer recommendation error: {0}")]
    Recommend(String),

    #[error("{0}")]
    Multi(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Accumulates failures from multi-step drivers so every partial fault
/// surfaces in one joined error instead of aborting at the first.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<String>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn add_error(&mut self, e: Error) {
        self.errors.push(e.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Multi(self.errors.join("; ")))
        }
    }
}
