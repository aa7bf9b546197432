use crate::model::{Analysis, EnrichedHolding, FundSummary, Percent, Valuation};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::info;

const NAME_WIDTH: usize = 28;

// console
// ----------------------------------------------------------------------------

/// Write the NAV summary block and the per-holding table to `out`.
///
/// Valued holdings are sorted by absolute discrepancy, largest first; unresolved holdings
/// follow in input order with the reason they could not be valued.
pub fn render<W: Write>(out: &mut W, analysis: &Analysis, color: bool) -> std::io::Result<()> {
    let report = &analysis.report;
    let paint = |text: String, value: Option<f64>| -> ColoredString {
        match (color, value) {
            (true, Some(v)) if v < 0.0 => text.red(),
            (true, Some(_)) => text.green(),
            _ => text.normal(),
        }
    };

    writeln!(out, "ETF NAV SUMMARY")?;
    writeln!(out, "===============")?;
    match &report.title {
        Some(title) => writeln!(out, "ETF:                       {} ({title})", report.etf_symbol)?,
        None => writeln!(out, "ETF:                       {}", report.etf_symbol)?,
    }

    let dollars = |value: Option<f64>| match value {
        Some(v) => format!("${}", thousands(v, 4)),
        None => "N/A".to_string(),
    };
    writeln!(out, "ETF reported last price:   {}", dollars(report.etf_last_price))?;
    writeln!(out, "Calculated NAV per share:  {}", dollars(report.calculated_nav))?;
    match report.difference {
        Some(difference) => writeln!(
            out,
            "Difference:                {}",
            paint(
                format!(
                    "${}  ({})",
                    thousands(difference, 4),
                    pct(report.pct_difference, 4)
                ),
                Some(difference),
            )
        )?,
        None => {
            writeln!(out, "Difference:                N/A  (N/A)")?;
            writeln!(out, "Insufficient data to calculate NAV discrepancy.")?;
        }
    }

    writeln!(out, "Volume: {}", or_na(report.volume.map(|v| thousands(v as f64, 0))))?;
    writeln!(out, "Volume label: {}", or_na(report.volume_label.clone()))?;
    writeln!(out, "As of: {}", or_na(report.as_of.clone()))?;
    writeln!(out, "Valuation: {}", valuation_label(report.valuation))?;
    writeln!(
        out,
        "Holdings: {} valued, {} unresolved{}",
        report.resolved,
        report.unresolved,
        match report.partial {
            true => " (partial NAV)",
            false => "",
        }
    )?;
    if let Some(residual) = report.unattributed_weight {
        writeln!(out, "Unattributed weight: {:.4}%", residual * 100.0)?;
    }
    writeln!(out)?;

    // table
    writeln!(
        out,
        "{:<8} {:<30} {:>15} {:>15} {:>15} {:>10}",
        "Symbol", "Name", "Market Value", "True Value", "Discrepancy", "% Diff"
    )?;
    writeln!(out, "{}", "-".repeat(95))?;

    let mut valued: Vec<&EnrichedHolding> =
        analysis.holdings.iter().filter(|h| h.is_resolved()).collect();
    valued.sort_by(|a, b| {
        let a = a.discrepancy.unwrap_or_default().abs();
        let b = b.discrepancy.unwrap_or_default().abs();
        b.total_cmp(&a)
    });

    for h in valued {
        let discrepancy = h.discrepancy.unwrap_or_default();
        writeln!(
            out,
            "{:<8} {:<30} {:>15} {:>15} {} {}",
            h.holding.symbol,
            truncate(&h.holding.name),
            thousands(h.market_value.unwrap_or_default(), 2),
            thousands(h.true_value.unwrap_or_default(), 2),
            paint(format!("{:>15}", thousands(discrepancy, 2)), Some(discrepancy)),
            paint(
                format!("{:>10}", h.pct_diff.map(|p| pct_number(p, 2)).unwrap_or_default()),
                h.pct_diff.and_then(|p| p.value()),
            ),
        )?;
    }

    for h in analysis.holdings.iter().filter(|h| !h.is_resolved()) {
        let reason = h.unresolved.map(|r| r.to_string()).unwrap_or_default();
        writeln!(
            out,
            "{:<8} {:<30} {:>15} {:>15} {:>15} {:>10}  unresolved: {reason}",
            h.holding.symbol,
            truncate(&h.holding.name),
            "-",
            "-",
            "-",
            "-",
        )?;
    }

    if !analysis.rejected_quotes.is_empty() {
        writeln!(out)?;
        writeln!(out, "Rejected quotes:")?;
        for (symbol, reason) in &analysis.rejected_quotes {
            writeln!(out, "  {symbol}: {reason}")?;
        }
    }

    Ok(())
}

/// Format with thousands separators, e.g. `1234567.891` at 2 decimals is `1,234,567.89`.
pub fn thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.decimals$}", value.abs());
    let (int, frac) = match formatted.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int.len() + int.len() / 3 + 1);
    for (i, digit) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = match value < 0.0 {
        true => "-",
        false => "",
    };
    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn pct(p: Percent, decimals: usize) -> String {
    match p {
        Percent::Value(v) => format!("{v:.decimals$}%"),
        Percent::NotAvailable => "N/A".to_string(),
    }
}

fn pct_number(p: Percent, decimals: usize) -> String {
    match p {
        Percent::Value(v) => format!("{v:.decimals$}"),
        Percent::NotAvailable => "N/A".to_string(),
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

fn truncate(name: &str) -> String {
    name.chars().take(NAME_WIDTH).collect()
}

fn valuation_label(valuation: Valuation) -> &'static str {
    match valuation {
        Valuation::Shares => "shares (shares x last price vs reported market value)",
        Valuation::Weight => "weight (weight x last price, per fund share)",
    }
}

// json
// ----------------------------------------------------------------------------

/// The JSON document written for a run.
#[derive(Debug, Serialize)]
pub struct Document<'a> {
    pub etf_symbol: &'a str,
    pub title: Option<&'a str>,
    pub as_of: Option<&'a str>,
    pub nav_summary: NavSummary<'a>,
    pub summary: &'a FundSummary,
    pub holdings: &'a [EnrichedHolding],
    pub rejected_quotes: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct NavSummary<'a> {
    pub valuation: Valuation,
    pub etf_last_price: Option<f64>,
    pub calculated_nav: Option<f64>,
    pub difference: Option<f64>,
    pub pct_difference: Percent,
    pub volume: Option<u64>,
    pub volume_label: Option<&'a str>,
    pub resolved: usize,
    pub unresolved: usize,
    pub partial: bool,
    pub unattributed_weight: Option<f64>,
}

impl<'a> From<&'a Analysis> for Document<'a> {
    fn from(analysis: &'a Analysis) -> Self {
        let report = &analysis.report;
        Document {
            etf_symbol: &report.etf_symbol,
            title: report.title.as_deref(),
            as_of: report.as_of.as_deref(),
            nav_summary: NavSummary {
                valuation: report.valuation,
                etf_last_price: report.etf_last_price,
                calculated_nav: report.calculated_nav,
                difference: report.difference,
                pct_difference: report.pct_difference,
                volume: report.volume,
                volume_label: report.volume_label.as_deref(),
                resolved: report.resolved,
                unresolved: report.unresolved,
                partial: report.partial,
                unattributed_weight: report.unattributed_weight,
            },
            summary: &analysis.summary,
            holdings: &analysis.holdings,
            rejected_quotes: &analysis.rejected_quotes,
        }
    }
}

/// Serialize the run to `path` as pretty JSON.
pub async fn write_json(path: impl AsRef<Path>, analysis: &Analysis) -> crate::error::Result<()> {
    let path = path.as_ref();
    crate::fs::write_json(path, &Document::from(analysis)).await?;
    info!("report written to {}", path.display());
    Ok(())
}
