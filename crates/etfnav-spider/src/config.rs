use crate::ConfigError;
use dotenv::var;
use std::fmt;

pub const ALPACA_API_KEY: &str = "ALPACA_API_KEY";
pub const ALPACA_SECRET_KEY: &str = "ALPACA_SECRET_KEY";
pub const ALPACA_DATA_URL: &str = "ALPACA_DATA_URL";

pub const DEFAULT_ALPACA_URL: &str = "https://data.alpaca.markets";
pub const DEFAULT_SCHWAB_URL: &str = "https://www.schwab.wallst.com";

/// Alpaca API credentials, read once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub key_id: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Read `ALPACA_API_KEY` & `ALPACA_SECRET_KEY` from the environment (or `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            key_id: required(ALPACA_API_KEY)?,
            secret_key: required(ALPACA_SECRET_KEY)?,
        })
    }
}

// keep secrets out of the logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &"***")
            .field("secret_key", &"***")
            .finish()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match var(name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}

/// Alpaca market data feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feed {
    Iex,
    Sip,
}

impl Feed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Iex => "iex",
            Feed::Sip => "sip",
        }
    }
}

/// Everything the Alpaca price client needs, passed in at construction.
#[derive(Clone, Debug)]
pub struct AlpacaConfig {
    pub credentials: Credentials,
    pub base_url: String,
    pub feed: Option<Feed>,
    /// Symbols per request.
    pub batch_size: usize,
    /// Requests in flight at once.
    pub concurrency: usize,
}

impl AlpacaConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_ALPACA_URL.to_string(),
            feed: None,
            batch_size: 200,
            concurrency: 4,
        }
    }

    /// Build from the environment; fails before any request if credentials are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(Credentials::from_env()?);
        if let Ok(url) = var(ALPACA_DATA_URL) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        Ok(config)
    }

    pub fn with_feed(mut self, feed: Option<Feed>) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::NotPositive { name: "batch size" });
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::NotPositive {
                name: "concurrency",
            });
        }
        self.concurrency = concurrency;
        Ok(self)
    }
}

#[derive(Clone, Debug)]
pub struct SchwabConfig {
    pub base_url: String,
}

impl Default for SchwabConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCHWAB_URL.to_string(),
        }
    }
}
