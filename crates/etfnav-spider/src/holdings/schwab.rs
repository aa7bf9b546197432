use super::HoldingsSource;
use crate::common::{normalize_symbol, parse_num};
use crate::config::SchwabConfig;
use crate::http::*;
use crate::model::{FundSummary, Holding, HoldingsPage};
use crate::FetchError;
use async_trait::async_trait;
use base64::prelude::{Engine, BASE64_STANDARD};
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error, trace, warn};

const PROVIDER: &str = "schwab";

// the holdings page embeds the ids needed to call the holdings module
//
// WSDOM.Page.sessionID = WSOD_DATA.sessionID || 'a1b2c3';
// var gSymbolWSODIssue = '123456';
lazy_static::lazy_static! {
    static ref SESSION_ID: Regex =
        Regex::new(r"WSDOM\.Page\.sessionID\s*=\s*WSOD_DATA\.sessionID\s*\|\|\s*'([^']+)'")
            .expect("session id pattern");
    static ref WSOD_ISSUE: Regex =
        Regex::new(r"var gSymbolWSODIssue = '(\d+)'").expect("wsod issue pattern");
}

/////////////////////////////////////////////////////////////////////////////////
// core
/////////////////////////////////////////////////////////////////////////////////

/// Holdings scraper for Schwab's ETF research pages.
///
/// One visit is two requests: the holdings page (for the session, the issue id and the
/// fund's summary block), then the holdings table module, which answers with a
/// JavaScript-wrapped JSON tree.
pub struct SchwabHoldings {
    client: HttpClient,
    config: SchwabConfig,
}

impl SchwabHoldings {
    pub fn new(config: SchwabConfig) -> Result<Self, FetchError> {
        let client = crate::std_client_build()
            .map_err(FetchError::http(PROVIDER, "building http client"))?;
        Ok(Self { client, config })
    }

    fn page_url(&self, symbol: &str) -> String {
        format!(
            "{}/schwab/Prospect/research/etfs/schwabETF/index.asp?type=holdings&symbol={symbol}",
            self.config.base_url
        )
    }

    fn module_url(&self, session_id: &str) -> String {
        format!(
            "{}/schwab/Prospect/research/resources/server/Module/SchwabETF.ModuleAPI.asp?{session_id}",
            self.config.base_url
        )
    }
}

#[async_trait]
impl HoldingsSource for SchwabHoldings {
    async fn fetch_holdings(
        &self,
        symbol: &str,
        max_rows: usize,
    ) -> Result<HoldingsPage, FetchError> {
        let time = std::time::Instant::now();

        // 1. the holdings page
        let url = self.page_url(symbol);
        trace!("fetching holdings page {url}");
        let response = self
            .client
            .get(&url)
            .header(REFERER, &url)
            .send()
            .await
            .map_err(|err| {
                error!("failed to fetch holdings page for {symbol}, error({err})");
                err
            })
            .map_err(FetchError::http(PROVIDER, format!("holdings page for {symbol}")))?;
        let page = ok_text(response, format!("holdings page for {symbol}")).await?;

        // 2. session & issue ids, plus the summary block
        let (session_id, issue) = parse_session(&page)?;
        debug!("[{symbol}] session {session_id}, issue {issue}");
        let summary = parse_summary(&page);

        // 3. the holdings table module
        let body = module_request_body(symbol, &issue, max_rows)?;
        trace!("posting holdings module request for {symbol}");
        let response = self
            .client
            .post(self.module_url(&session_id))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(REFERER, &url)
            .header(ACCEPT, "*/*")
            .body(body)
            .send()
            .await
            .map_err(|err| {
                error!("failed to fetch holdings table for {symbol}, error({err})");
                err
            })
            .map_err(FetchError::http(PROVIDER, format!("holdings table for {symbol}")))?;
        let raw = ok_text(response, format!("holdings table for {symbol}")).await?;

        let holdings = parse_holdings(&raw, max_rows).map_err(|err| {
            error!("failed to parse holdings table for {symbol}, error({err})");
            err
        })?;

        debug!(
            "[{symbol}] {} holdings scraped, {}",
            holdings.len(),
            crate::time_elapsed(time)
        );

        Ok(HoldingsPage { summary, holdings })
    }
}

async fn ok_text(response: reqwest::Response, context: String) -> Result<String, FetchError> {
    let status = response.status();
    if !status.is_success() {
        error!("{context} returned {status}");
        return Err(FetchError::Status {
            provider: PROVIDER,
            context,
            status,
        });
    }
    response
        .text()
        .await
        .map_err(FetchError::http(PROVIDER, context))
}

/////////////////////////////////////////////////////////////////////////////////
// page
/////////////////////////////////////////////////////////////////////////////////

/// Pull the session id & the WSOD issue id out of the holdings page.
pub fn parse_session(page: &str) -> Result<(String, String), FetchError> {
    let session_id = SESSION_ID
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    let issue = WSOD_ISSUE
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    match (session_id, issue) {
        (Some(session_id), Some(issue)) => Ok((session_id, issue)),
        (None, _) => Err(FetchError::structure(PROVIDER, "session id not found")),
        (_, None) => Err(FetchError::structure(PROVIDER, "wsod issue id not found")),
    }
}

/// Scrape the fund's summary block.
///
/// The block is informational; anything missing is logged and left as `None`.
pub fn parse_summary(page: &str) -> FundSummary {
    let html = Html::parse_document(page);
    let mut summary = FundSummary::default();

    let (Some(row_sel), Some(td_sel), Some(value_sel), Some(sublabel_sel)) = (
        selector("div.popupVersion.realtime table tr:nth-of-type(2)"),
        selector("td"),
        selector(".value"),
        selector(".sublabel"),
    ) else {
        return summary;
    };

    match html.select(&row_sel).next() {
        Some(row) => {
            let cells: Vec<ElementRef> = row.select(&td_sel).collect();
            let cell = |i: usize| cells.get(i).copied();
            let within = |i: usize, sel: &Selector| {
                cell(i).and_then(|td| td.select(sel).next()).and_then(text)
            };

            summary.last_price = cell(0).and_then(text);
            summary.change = cell(2).and_then(text);
            summary.bid = within(4, &value_sel);
            summary.bid_size = within(4, &sublabel_sel);
            summary.ask = within(6, &value_sel);
            summary.ask_size = within(6, &sublabel_sel);
            summary.volume = within(8, &value_sel);
            summary.volume_label = within(8, &sublabel_sel);
        }
        None => warn!("summary block not found on holdings page"),
    }

    summary.as_of = selector("#firstGlanceFooter")
        .and_then(|sel| html.select(&sel).next())
        .and_then(text)
        .map(|as_of| as_of.replace("As of", "").trim().to_string())
        .filter(|as_of| !as_of.is_empty());

    summary.title = selector("#content > div > h2")
        .and_then(|sel| html.select(&sel).next())
        .and_then(text);

    summary
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css)
        .map_err(|err| error!("invalid selector {css}, error({err:?})"))
        .ok()
}

fn text(element: ElementRef) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match text.is_empty() {
        true => None,
        false => Some(text),
    }
}

/////////////////////////////////////////////////////////////////////////////////
// holdings module
/////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Serialize)]
struct ModulePayload<'a> {
    module: &'static str,
    #[serde(rename = "moduleArgs")]
    module_args: ModuleArgs<'a>,
}

#[derive(Debug, Serialize)]
struct ModuleArgs<'a> {
    #[serde(rename = "ModuleID")]
    module_id: &'static str,
    symbol: &'a str,
    wsodissue: &'a str,
    #[serde(rename = "sortDir")]
    sort_dir: &'static str,
    #[serde(rename = "sortBy")]
    sort_by: &'static str,
    page: &'static str,
    #[serde(rename = "numRows")]
    num_rows: String,
    #[serde(rename = "isThirdPartyETF")]
    is_third_party_etf: &'static str,
}

/// The form body for the holdings module: a base64-encoded JSON payload, sorted by weight.
pub fn module_request_body(
    symbol: &str,
    issue: &str,
    max_rows: usize,
) -> Result<String, FetchError> {
    let payload = ModulePayload {
        module: "schwabETFHoldingsTable",
        module_args: ModuleArgs {
            module_id: "holdingsTableContainer",
            symbol,
            wsodissue: issue,
            sort_dir: "desc",
            sort_by: "PctNetAssets",
            page: "1",
            num_rows: max_rows.to_string(),
            is_third_party_etf: "true",
        },
    };
    let json = serde_json::to_string(&payload).map_err(|source| FetchError::Decode {
        provider: PROVIDER,
        context: "encoding holdings module payload".to_string(),
        source,
    })?;
    let encoded = BASE64_STANDARD.encode(json.as_bytes());

    Ok(format!(
        "inputs=B64ENC{encoded}&..contenttype..=text/javascript&..requester..=ContentBuffer"
    ))
}

// holdings module response
// ----------------------------------------------------------------
// this.apiReturn = {
//     "module": {
//         "c": [
//             { "c": [
//                 { ... table header ... },
//                 { "c": [                                      <- rows
//                     { "c": [
//                         { "c": ["AAPL"] },                    <- symbol
//                         { "c": ["Apple Inc"] },               <- name
//                         { "c": ["7.12%"] },                   <- % of net assets
//                         { "c": ["178,531,092"] },             <- shares
//                         { "c": ["$40.1B"] }                   <- market value
//                     ] },
//                     ...
//                 ] }
//             ] }
//         ]
//     }
// };

/// Parse the holdings module response into at most `max_rows` holdings.
///
/// Malformed rows are skipped with a warning, and rows with no weight are dropped; a
/// response without the rows array at all is a [`FetchError::Structure`].
pub fn parse_holdings(raw: &str, max_rows: usize) -> Result<Vec<Holding>, FetchError> {
    let txt = raw.trim();
    let txt = txt
        .strip_prefix("this.apiReturn")
        .map(|rest| rest.trim_start().trim_start_matches('=').trim_start())
        .unwrap_or(txt);
    let txt = txt.trim_end().trim_end_matches(';');

    let data: Value = serde_json::from_str(txt).map_err(|source| FetchError::Decode {
        provider: PROVIDER,
        context: "holdings module response".to_string(),
        source,
    })?;

    let rows = data
        .pointer("/module/c/0/c/1/c")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::structure(PROVIDER, "holdings rows not found at module.c[0].c[1].c"))?;

    let mut seen = HashSet::new();
    let mut holdings = Vec::with_capacity(rows.len().min(max_rows));
    for (i, row) in rows.iter().enumerate() {
        let holding = match parse_row(row) {
            Ok(Some(holding)) => holding,
            Ok(None) => {
                trace!("holdings row {i} has no weight; skipping");
                continue;
            }
            Err(reason) => {
                warn!("skipping holdings row {i}: {reason}");
                continue;
            }
        };

        if !holding.symbol.is_empty() && !seen.insert(holding.symbol.clone()) {
            warn!("duplicate holding {} in row {i}; keeping the first", holding.symbol);
            continue;
        }

        holdings.push(holding);
        if holdings.len() == max_rows {
            break;
        }
    }

    Ok(holdings)
}

fn parse_row(row: &Value) -> Result<Option<Holding>, String> {
    let cells = row
        .get("c")
        .and_then(Value::as_array)
        .ok_or("row has no cells")?;
    if cells.len() < 3 {
        return Err(format!("expected at least 3 cells, found {}", cells.len()));
    }
    let text = |i: usize| cells.get(i).and_then(cell_text);

    let weight = match text(2) {
        Some(raw) => parse_num(&raw).ok_or(format!("unreadable weight {raw:?}"))?,
        None => 0.0,
    };
    if weight == 0.0 {
        return Ok(None);
    }

    let symbol = text(0).unwrap_or_default();
    Ok(Some(Holding {
        quote_symbol: normalize_symbol(&symbol),
        symbol,
        name: text(1).unwrap_or_default(),
        weight: Some(weight),
        shares: text(3).and_then(|raw| parse_num(&raw)),
        reported_market_value: text(4).and_then(|raw| parse_num(&raw)),
    }))
}

/// Flatten a module tree node into its text; nested nodes (links, spans) are joined.
fn cell_text(node: &Value) -> Option<String> {
    let text = match node {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => map
            .get("c")
            .and_then(Value::as_array)?
            .iter()
            .filter_map(cell_text)
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };

    match text.is_empty() {
        true => None,
        false => Some(text),
    }
}
