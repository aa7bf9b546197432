use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// holdings
// ----------------------------------------------------------------------------

/// One constituent security, as disclosed on the holdings page.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Holding {
    pub symbol: String,
    /// `symbol` normalized for the quotes provider; `None` for cash lines and placeholders.
    pub quote_symbol: Option<String>,
    pub name: String,
    /// Fraction of net assets, in `[0, 1]`.
    pub weight: Option<f64>,
    pub shares: Option<f64>,
    pub reported_market_value: Option<f64>,
}

/// The fund's own summary block, kept as scraped.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FundSummary {
    pub title: Option<String>,
    pub last_price: Option<String>,
    pub change: Option<String>,
    pub bid: Option<String>,
    pub bid_size: Option<String>,
    pub ask: Option<String>,
    pub ask_size: Option<String>,
    pub volume: Option<String>,
    pub volume_label: Option<String>,
    pub as_of: Option<String>,
}

/// Everything one visit to the holdings page yields.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HoldingsPage {
    pub summary: FundSummary,
    /// Ordered by disclosed weight, descending.
    pub holdings: Vec<Holding>,
}

// quotes
// ----------------------------------------------------------------------------

/// The latest traded bar for one symbol.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    /// Closing price of the latest bar; always positive.
    pub last_price: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: u64,
    pub vwap: Option<f64>,
    pub trade_count: Option<u64>,
    pub as_of: DateTime<Utc>,
}

/// Quotes keyed by symbol, plus the bars that came back but failed validation.
///
/// A requested symbol in neither map is simply missing from the provider's response.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QuoteBook {
    pub quotes: BTreeMap<String, Quote>,
    pub rejected: BTreeMap<String, String>,
}

impl QuoteBook {
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    pub fn extend(&mut self, other: QuoteBook) {
        self.quotes.extend(other.quotes);
        self.rejected.extend(other.rejected);
    }
}

// computed
// ----------------------------------------------------------------------------

/// How a holding's market value is derived; fixed by configuration, never guessed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Valuation {
    /// `shares × last price` against the provider's reported market value.
    #[default]
    Shares,
    /// `weight × last price`, a basket normalized to one fund share.
    Weight,
}

/// A percentage, or the explicit `N/A` sentinel where the denominator is zero or missing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Percent {
    Value(f64),
    NotAvailable,
}

impl Percent {
    /// `numerator / denominator × 100`, guarding the zero and non-finite cases.
    pub fn of(numerator: f64, denominator: Option<f64>) -> Self {
        match denominator {
            Some(d) if d != 0.0 && d.is_finite() => {
                let pct = numerator / d * 100.0;
                match pct.is_finite() {
                    true => Percent::Value(pct),
                    false => Percent::NotAvailable,
                }
            }
            _ => Percent::NotAvailable,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Percent::Value(v) => Some(*v),
            Percent::NotAvailable => None,
        }
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percent::Value(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}%"),
                None => write!(f, "{v}%"),
            },
            Percent::NotAvailable => f.pad("N/A"),
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Percent::Value(v) => serializer.serialize_f64(*v),
            Percent::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

/// Why a holding carries no computed values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The disclosed symbol has no tradable counterpart (cash, placeholders).
    NoSymbol,
    /// The quotes provider returned nothing usable for the symbol.
    MissingQuote,
    MissingShares,
    MissingWeight,
    MissingMarketValue,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnresolvedReason::NoSymbol => "no symbol",
            UnresolvedReason::MissingQuote => "missing quote",
            UnresolvedReason::MissingShares => "missing shares",
            UnresolvedReason::MissingWeight => "missing weight",
            UnresolvedReason::MissingMarketValue => "missing market value",
        };
        f.pad(s)
    }
}

/// A holding joined with its quote and valued.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedHolding {
    #[serde(flatten)]
    pub holding: Holding,
    pub last_price: Option<f64>,
    pub market_value: Option<f64>,
    pub true_value: Option<f64>,
    pub discrepancy: Option<f64>,
    pub pct_diff: Option<Percent>,
    pub unresolved: Option<UnresolvedReason>,
    pub quote: Option<Quote>,
}

impl EnrichedHolding {
    pub fn is_resolved(&self) -> bool {
        self.unresolved.is_none()
    }
}

/// The fund-level comparison, built once per run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NavReport {
    pub etf_symbol: String,
    pub title: Option<String>,
    pub as_of: Option<String>,
    pub valuation: Valuation,
    pub etf_last_price: Option<f64>,
    pub calculated_nav: Option<f64>,
    pub difference: Option<f64>,
    pub pct_difference: Percent,
    pub volume: Option<u64>,
    pub volume_label: Option<String>,
    pub resolved: usize,
    pub unresolved: usize,
    /// Set when any holding went unresolved, so the NAV covers only part of the fund.
    pub partial: bool,
    /// `1 − Σ disclosed weights`, the share of the fund not attributed to a listed holding.
    pub unattributed_weight: Option<f64>,
}

/// The complete output of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub report: NavReport,
    pub summary: FundSummary,
    pub holdings: Vec<EnrichedHolding>,
    pub rejected_quotes: BTreeMap<String, String>,
}
