use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the planner, each naming the layer that failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid routing input: {0}")]
    Input(String),

    #[error("matrix build failed: provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable {
        provider: &'static str,
        reason: String,
    },

    #[error("solve failed: no tour avoids every unreachable arc")]
    Infeasible,

    #[error("load failed: {0}")]
    Load(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("solver task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn unavailable(provider: &'static str, reason: impl ToString) -> Self {
        Error::ProviderUnavailable {
            provider,
            reason: reason.to_string(),
        }
    }
}
