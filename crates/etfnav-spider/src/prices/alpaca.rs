use super::PriceSource;
use crate::config::AlpacaConfig;
use crate::http::*;
use crate::model::{Quote, QuoteBook};
use crate::{ConfigError, Error, FetchError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, error, trace, warn};

const PROVIDER: &str = "alpaca";

// RATE_LIMIT = 200 /60s on the free plan
//
// latest bars = `https://data.alpaca.markets/v2/stocks/bars/latest?symbols=AAPL,MSFT`

/////////////////////////////////////////////////////////////////////////////////
// core
/////////////////////////////////////////////////////////////////////////////////

pub struct AlpacaClient {
    client: HttpClient,
    config: AlpacaConfig,
}

impl AlpacaClient {
    pub fn new(config: AlpacaConfig) -> Result<Self, Error> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }

    async fn fetch_batch(&self, symbols: Vec<String>) -> Result<QuoteBook, FetchError> {
        let time = std::time::Instant::now();
        let url = format!("{}/v2/stocks/bars/latest", self.config.base_url);
        let context = format!("latest bars for {} symbols", symbols.len());

        let mut query = vec![("symbols", symbols.join(","))];
        if let Some(feed) = self.config.feed {
            query.push(("feed", feed.as_str().to_string()));
        }

        trace!("fetching {context}");
        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|err| {
                error!("failed to fetch Alpaca bars, error({err})");
                err
            })
            .map_err(FetchError::http(PROVIDER, context.clone()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!("Alpaca rejected the credentials, status({status})");
            return Err(FetchError::Auth {
                provider: PROVIDER,
                status,
            });
        }
        if !status.is_success() {
            error!("failed to fetch Alpaca bars, status({status})");
            return Err(FetchError::Status {
                provider: PROVIDER,
                context,
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(FetchError::http(PROVIDER, context.clone()))?;
        let book = parse_bars(&body).map_err(|err| {
            error!("failed to parse Alpaca bars, error({err})");
            err
        })?;

        debug!(
            "{} quotes received for {} symbols, {}",
            book.quotes.len(),
            symbols.len(),
            crate::time_elapsed(time)
        );
        Ok(book)
    }
}

#[async_trait]
impl PriceSource for AlpacaClient {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteBook, FetchError> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = symbols
            .iter()
            .filter(|symbol| seen.insert(*symbol))
            .cloned()
            .collect();
        if unique.is_empty() {
            return Ok(QuoteBook::default());
        }

        // batches are independent; run a bounded number at once
        let batches: Vec<Vec<String>> = unique
            .chunks(self.config.batch_size)
            .map(<[String]>::to_vec)
            .collect();
        debug!(
            "requesting {} symbols from Alpaca in {} batch(es)",
            unique.len(),
            batches.len()
        );

        let book = stream::iter(batches)
            .map(|batch| self.fetch_batch(batch))
            .buffered(self.config.concurrency)
            .try_fold(QuoteBook::default(), |mut book, batch| async move {
                book.extend(batch);
                Ok(book)
            })
            .await?;

        let missing: Vec<&str> = unique
            .iter()
            .map(String::as_str)
            .filter(|symbol| {
                !book.quotes.contains_key(*symbol) && !book.rejected.contains_key(*symbol)
            })
            .collect();
        if !missing.is_empty() {
            warn!("no Alpaca bar for {} symbol(s): {}", missing.len(), missing.join(", "));
        }

        Ok(book)
    }
}

// alpaca requires "APCA-API-KEY-ID" & "APCA-API-SECRET-KEY" on every request
fn build_client(config: &AlpacaConfig) -> Result<HttpClient, Error> {
    let header = |name: &'static str, value: &str| {
        let mut value =
            HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { name })?;
        value.set_sensitive(true);
        Ok::<_, ConfigError>(value)
    };

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("apca-api-key-id"),
        header("APCA-API-KEY-ID", &config.credentials.key_id)?,
    );
    headers.insert(
        HeaderName::from_static("apca-api-secret-key"),
        header("APCA-API-SECRET-KEY", &config.credentials.secret_key)?,
    );

    let client = reqwest::ClientBuilder::new()
        .default_headers(headers)
        .build()
        .map_err(FetchError::http(PROVIDER, "building http client"))?;
    Ok(client)
}

/////////////////////////////////////////////////////////////////////////////////
// endpoints
/////////////////////////////////////////////////////////////////////////////////
//
// latest bars
// ----------------------------------------------------------------
// {
//      "bars": {
//          "AAPL": {
//              "c": 189.84,
//              "h": 189.9,
//              "l": 189.78,
//              "n": 412,
//              "o": 189.8,
//              "t": "2024-05-03T19:59:00Z",
//              "v": 40113,
//              "vw": 189.838
//          },
//          ...
//      }
// }
#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    c: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    n: Option<u64>,
    o: Option<f64>,
    t: Option<String>,
    v: Option<f64>,
    vw: Option<f64>,
}

/// A bar either validates into a [`Quote`], or fails with a reason.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBar {
    Quote(Quote),
    ParseFailure(String),
}

/// Validate one bar; nothing about the shape of provider JSON is assumed.
pub fn parse_bar(symbol: &str, bar: &Value) -> ParsedBar {
    let raw: RawBar = match serde_json::from_value(bar.clone()) {
        Ok(raw) => raw,
        Err(err) => return ParsedBar::ParseFailure(format!("malformed bar: {err}")),
    };

    let last_price = match raw.c {
        Some(c) if c.is_finite() && c > 0.0 => c,
        Some(c) => return ParsedBar::ParseFailure(format!("non-positive close {c}")),
        None => return ParsedBar::ParseFailure("close missing".to_string()),
    };

    let as_of = match raw.t.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(t)) => t.with_timezone(&Utc),
        Some(Err(err)) => return ParsedBar::ParseFailure(format!("bad timestamp: {err}")),
        None => return ParsedBar::ParseFailure("timestamp missing".to_string()),
    };

    let volume = match raw.v {
        Some(v) if v.is_finite() && v >= 0.0 => v.round() as u64,
        Some(v) => return ParsedBar::ParseFailure(format!("negative volume {v}")),
        None => 0,
    };

    ParsedBar::Quote(Quote {
        symbol: symbol.to_string(),
        last_price,
        open: raw.o,
        high: raw.h,
        low: raw.l,
        volume,
        vwap: raw.vw,
        trade_count: raw.n,
        as_of,
    })
}

/// Parse a latest-bars response body into a [`QuoteBook`].
pub fn parse_bars(body: &[u8]) -> Result<QuoteBook, FetchError> {
    let response: BarsResponse =
        serde_json::from_slice(body).map_err(|source| FetchError::Decode {
            provider: PROVIDER,
            context: "latest bars response".to_string(),
            source,
        })?;

    let mut book = QuoteBook::default();
    for (symbol, bar) in response.bars {
        match parse_bar(&symbol, &bar) {
            ParsedBar::Quote(quote) => {
                book.quotes.insert(symbol, quote);
            }
            ParsedBar::ParseFailure(reason) => {
                warn!("rejecting Alpaca bar for {symbol}: {reason}");
                book.rejected.insert(symbol, reason);
            }
        }
    }

    Ok(book)
}
