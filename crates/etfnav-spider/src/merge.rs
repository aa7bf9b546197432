//! Join holdings with quotes, value them, and compare the result to the fund's price.

use crate::common::parse_num;
use crate::model::{
    Analysis, EnrichedHolding, FundSummary, Holding, HoldingsPage, NavReport, Percent, Quote,
    QuoteBook, UnresolvedReason, Valuation,
};
use tracing::{debug, info};

/// How a portfolio total becomes a per-share NAV.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NavBasis {
    /// The holdings already describe one fund share (weight convention).
    Unit,
    /// Implied fund shares outstanding: reported market value over the fund's price.
    SharesOutstanding(f64),
}

impl NavBasis {
    /// Pick the basis for a valuation convention.
    ///
    /// Under [`Valuation::Shares`] there is no basis when the fund's price is missing or zero,
    /// or when no resolved holding reported a market value.
    pub fn for_valuation(
        valuation: Valuation,
        total_market_value: f64,
        etf_last_price: Option<f64>,
    ) -> Option<Self> {
        match valuation {
            Valuation::Weight => Some(NavBasis::Unit),
            Valuation::Shares => match etf_last_price {
                Some(price) if price > 0.0 && total_market_value > 0.0 => {
                    Some(NavBasis::SharesOutstanding(total_market_value / price))
                }
                _ => None,
            },
        }
    }

    pub fn per_share(&self, total: f64) -> f64 {
        match self {
            NavBasis::Unit => total,
            NavBasis::SharesOutstanding(shares) => total / shares,
        }
    }
}

/// Value every holding against `quotes` and build the fund-level report.
///
/// Holdings keep their input order; one without a usable quote is kept with empty
/// computed fields and an [`UnresolvedReason`].
pub fn merge(
    etf_symbol: &str,
    page: HoldingsPage,
    quotes: &QuoteBook,
    valuation: Valuation,
) -> Analysis {
    let HoldingsPage { summary, holdings } = page;

    let unattributed_weight = unattributed_weight(&holdings);
    let holdings: Vec<EnrichedHolding> = holdings
        .into_iter()
        .map(|holding| enrich(holding, quotes, valuation))
        .collect();

    let etf_quote = quotes.get(etf_symbol);
    let etf_last_price = etf_quote
        .map(|quote| quote.last_price)
        .or_else(|| summary.last_price.as_deref().and_then(parse_num));

    let (total_market_value, total_true_value) = holdings
        .iter()
        .filter(|h| h.is_resolved())
        .fold((0.0, 0.0), |(mv, tv), h| {
            (
                mv + h.market_value.unwrap_or_default(),
                tv + h.true_value.unwrap_or_default(),
            )
        });

    let basis = NavBasis::for_valuation(valuation, total_market_value, etf_last_price);
    let calculated_nav = basis.map(|basis| basis.per_share(total_true_value));
    debug!("[{etf_symbol}] nav basis {basis:?}, total true value {total_true_value}");

    let difference = match (calculated_nav, etf_last_price) {
        (Some(nav), Some(price)) => Some(nav - price),
        _ => None,
    };
    let pct_difference = match difference {
        Some(difference) => Percent::of(difference, etf_last_price),
        None => Percent::NotAvailable,
    };

    let resolved = holdings.iter().filter(|h| h.is_resolved()).count();
    let unresolved = holdings.len() - resolved;

    let report = NavReport {
        etf_symbol: etf_symbol.to_string(),
        title: summary.title.clone(),
        as_of: as_of(&summary, etf_quote),
        valuation,
        etf_last_price,
        calculated_nav,
        difference,
        pct_difference,
        volume: volume(&summary, etf_quote),
        volume_label: summary.volume_label.clone(),
        resolved,
        unresolved,
        partial: unresolved > 0,
        unattributed_weight,
    };

    info!(
        "[{etf_symbol}] {resolved} holdings valued, {unresolved} unresolved, nav {:?} vs price {:?}",
        report.calculated_nav, report.etf_last_price
    );

    Analysis {
        report,
        summary,
        holdings,
        rejected_quotes: quotes.rejected.clone(),
    }
}

fn enrich(holding: Holding, quotes: &QuoteBook, valuation: Valuation) -> EnrichedHolding {
    let quote = holding
        .quote_symbol
        .as_deref()
        .and_then(|symbol| quotes.get(symbol))
        .cloned();

    let valued = match (&holding.quote_symbol, &quote) {
        (None, _) => Err(UnresolvedReason::NoSymbol),
        (Some(_), None) => Err(UnresolvedReason::MissingQuote),
        (Some(_), Some(quote)) => value(&holding, quote.last_price, valuation),
    };

    let mut enriched = EnrichedHolding {
        last_price: quote.as_ref().map(|quote| quote.last_price),
        holding,
        market_value: None,
        true_value: None,
        discrepancy: None,
        pct_diff: None,
        unresolved: None,
        quote,
    };

    match valued {
        Ok((market_value, true_value)) => {
            let discrepancy = true_value - market_value;
            enriched.market_value = Some(market_value);
            enriched.true_value = Some(true_value);
            enriched.discrepancy = Some(discrepancy);
            enriched.pct_diff = Some(Percent::of(discrepancy, Some(market_value)));
        }
        Err(reason) => enriched.unresolved = Some(reason),
    }

    enriched
}

/// `(market value, true value)` for one holding at `last_price`.
fn value(
    holding: &Holding,
    last_price: f64,
    valuation: Valuation,
) -> Result<(f64, f64), UnresolvedReason> {
    match valuation {
        Valuation::Shares => {
            let shares = holding.shares.ok_or(UnresolvedReason::MissingShares)?;
            let market_value = holding
                .reported_market_value
                .ok_or(UnresolvedReason::MissingMarketValue)?;
            Ok((market_value, shares * last_price))
        }
        Valuation::Weight => {
            let weight = holding.weight.ok_or(UnresolvedReason::MissingWeight)?;
            let value = weight * last_price;
            Ok((value, value))
        }
    }
}

// weights short of 1.0 (cash, rounding, rows past the requested count) are a residual
fn unattributed_weight(holdings: &[Holding]) -> Option<f64> {
    let weights: Vec<f64> = holdings.iter().filter_map(|h| h.weight).collect();
    if weights.is_empty() {
        return None;
    }
    Some((1.0 - weights.iter().sum::<f64>()).max(0.0))
}

fn volume(summary: &FundSummary, etf_quote: Option<&Quote>) -> Option<u64> {
    summary
        .volume
        .as_deref()
        .and_then(parse_num)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64)
        .or_else(|| etf_quote.map(|quote| quote.volume))
}

fn as_of(summary: &FundSummary, etf_quote: Option<&Quote>) -> Option<String> {
    summary.as_of.clone().or_else(|| {
        etf_quote.map(|quote| quote.as_of.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    })
}
