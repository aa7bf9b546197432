use crate::model::HoldingsPage;
use crate::FetchError;
use async_trait::async_trait;

/// ETF holdings scraped from [Schwab's] public ETF research pages.
///
/// [Schwab's]: https://www.schwab.wallst.com/schwab/Prospect/research/etfs/schwabETF/index.asp
pub mod schwab;

/// Anything that can disclose an ETF's holdings.
///
/// Implementations return at most `max_rows` holdings, ordered by weight descending as
/// published, and fail with [`FetchError::Structure`] rather than an empty list when the
/// provider's markup can't be read.
#[async_trait]
pub trait HoldingsSource: Send + Sync {
    async fn fetch_holdings(&self, symbol: &str, max_rows: usize)
        -> Result<HoldingsPage, FetchError>;
}
