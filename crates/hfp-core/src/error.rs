use std::path::PathBuf;
use thiserror::Error;

pub type HfpResult<T> = Result<T, HfpError>;

/// Hint shown to users when an on-demand cloud file cannot be opened.
pub const KEEP_LOCAL_HINT: &str =
    "set the file to 'Always keep on this device' or make sure it is synced locally";

#[derive(Debug, Error)]
pub enum HfpError {
    /// A cloud placeholder could not be materialized.
    #[error(
        "on-demand file '{}' could not be synced: {source} (set the file to 'Always keep on this device' or make sure it is synced locally)",
        .path.display()
    )]
    OnDemandUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source could not be opened for a reason unrelated to cloud sync.
    #[error("source unavailable '{}': {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HfpError {
    /// True for the unavailable-source category, the only one that reaches the host.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            HfpError::OnDemandUnavailable { .. } | HfpError::SourceUnavailable { .. }
        )
    }

    /// True when the failure is specific to an on-demand cloud file.
    pub fn is_on_demand(&self) -> bool {
        matches!(self, HfpError::OnDemandUnavailable { .. })
    }
}
