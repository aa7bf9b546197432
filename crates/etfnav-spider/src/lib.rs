pub mod analyze;
pub mod common;
pub mod config;
pub mod error;
pub mod fs;
pub mod holdings;
pub mod merge;
pub mod model;
pub mod prices;
pub mod report;
pub mod tui;

pub use error::{ConfigError, Error, FetchError};

/// Shortcut for required API elements.
pub(crate) mod http {
    pub(crate) use reqwest::Client as HttpClient;
}

/// A browser-like user agent; the holdings provider rejects bare clients.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0";

/// The default [`reqwest`] client used by the spiders.
pub(crate) fn std_client_build() -> Result<http::HttpClient, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .build()
}

/// Format the time elapsed since `time`, for logging.
pub(crate) fn time_elapsed(time: std::time::Instant) -> String {
    format!("time elapsed: {:?}", time.elapsed())
}
