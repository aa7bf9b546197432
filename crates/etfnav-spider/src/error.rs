use reqwest::StatusCode;

/// Problems with the run's inputs, raised before any network call is made.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("invalid ETF symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    #[error("{name} must be a positive integer")]
    NotPositive { name: &'static str },
}

/// Failures talking to, or understanding, a data provider.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{provider}: request failed ({context}): {source}")]
    Http {
        provider: &'static str,
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider}: unexpected status {status} ({context})")]
    Status {
        provider: &'static str,
        context: String,
        status: StatusCode,
    },

    #[error("{provider}: authentication rejected with status {status}")]
    Auth {
        provider: &'static str,
        status: StatusCode,
    },

    #[error("{provider}: unexpected page structure: {reason}")]
    Structure {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider}: failed to decode response ({context}): {source}")]
    Decode {
        provider: &'static str,
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub(crate) fn http(provider: &'static str, context: impl Into<String>) -> impl FnOnce(reqwest::Error) -> Self {
        let context = context.into();
        move |source| FetchError::Http {
            provider,
            context,
            source,
        }
    }

    pub(crate) fn structure(provider: &'static str, reason: impl Into<String>) -> Self {
        FetchError::Structure {
            provider,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
