use crate::holdings::HoldingsSource;
use crate::merge::merge;
use crate::model::{Analysis, Valuation};
use crate::prices::PriceSource;
use crate::tui::{finish_stage, stage_spinner};
use crate::{Error, FetchError};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// What to analyze.
#[derive(Clone, Debug)]
pub struct Request {
    /// Upper-cased ETF ticker.
    pub etf_symbol: String,
    /// Maximum number of holdings, from the top of the weight order.
    pub max_rows: usize,
    pub valuation: Valuation,
}

/// Run the pipeline: holdings, then quotes for the ETF and every holding, then the merge.
///
/// Nothing is written here; rendering and saving are left to the caller, so a failure at
/// any stage leaves no output behind.
pub async fn analyze(
    holdings: &dyn HoldingsSource,
    prices: &dyn PriceSource,
    request: &Request,
    tui: bool,
) -> Result<Analysis, Error> {
    let time = std::time::Instant::now();
    let symbol = request.etf_symbol.as_str();

    // 1. holdings
    let pb = stage_spinner(tui, format!("fetching {symbol} holdings"));
    let mut page = holdings
        .fetch_holdings(symbol, request.max_rows)
        .await
        .map_err(|err| {
            pb.abandon();
            err
        })?;
    page.holdings.truncate(request.max_rows);
    finish_stage(&pb, format!("fetching {symbol} holdings"));

    if page.holdings.is_empty() {
        error!("no holdings found for {symbol}");
        return Err(FetchError::Structure {
            provider: "holdings",
            reason: format!("no holdings found for {symbol}"),
        }
        .into());
    }
    info!("{} holdings disclosed for {symbol}", page.holdings.len());

    // 2. quotes; the ETF first, then each distinct holding symbol
    let symbols = quote_symbols(symbol, &page.holdings);
    let pb = stage_spinner(tui, format!("fetching {} quotes", symbols.len()));
    let quotes = prices.fetch_quotes(&symbols).await.map_err(|err| {
        pb.abandon();
        err
    })?;
    finish_stage(&pb, format!("fetching {} quotes", symbols.len()));

    if quotes.get(symbol).is_none() {
        warn!("no quote for {symbol} itself; falling back to the scraped last price");
    }

    // 3. merge & compute
    let analysis = merge(symbol, page, &quotes, request.valuation);
    debug!("[{symbol}] analysis complete, {}", crate::time_elapsed(time));

    Ok(analysis)
}

fn quote_symbols(etf_symbol: &str, holdings: &[crate::model::Holding]) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(etf_symbol)
        .chain(holdings.iter().filter_map(|h| h.quote_symbol.as_deref()))
        .filter(|symbol| seen.insert(*symbol))
        .map(str::to_string)
        .collect()
}
