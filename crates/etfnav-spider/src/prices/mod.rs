use crate::model::QuoteBook;
use crate::FetchError;
use async_trait::async_trait;

/// Latest bars from the [Alpaca Market Data API].
///
/// [Alpaca Market Data API]: https://docs.alpaca.markets/reference/stocklatestbars-1
pub mod alpaca;

/// Anything that can quote the latest price for a set of symbols.
///
/// A symbol the provider doesn't know is left out of the returned [`QuoteBook`]; only
/// transport, authentication and provider failures are errors.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteBook, FetchError>;
}
