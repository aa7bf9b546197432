use chrono::{TimeZone, Utc};
use etfnav_spider::merge::{merge, NavBasis};
use etfnav_spider::model::{
    FundSummary, Holding, HoldingsPage, Percent, Quote, QuoteBook, UnresolvedReason, Valuation,
};

fn holding(symbol: &str, weight: f64, shares: f64, market_value: f64) -> Holding {
    Holding {
        symbol: symbol.to_string(),
        quote_symbol: Some(symbol.to_string()),
        name: format!("{symbol} Corp"),
        weight: Some(weight),
        shares: Some(shares),
        reported_market_value: Some(market_value),
    }
}

fn quote(symbol: &str, last_price: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        last_price,
        open: None,
        high: None,
        low: None,
        volume: 1_000,
        vwap: None,
        trade_count: None,
        as_of: Utc.with_ymd_and_hms(2024, 5, 3, 19, 59, 0).unwrap(),
    }
}

fn book(quotes: &[(&str, f64)]) -> QuoteBook {
    let mut book = QuoteBook::default();
    for (symbol, price) in quotes {
        book.quotes.insert(symbol.to_string(), quote(symbol, *price));
    }
    book
}

fn page(holdings: Vec<Holding>) -> HoldingsPage {
    HoldingsPage {
        summary: FundSummary::default(),
        holdings,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// weight convention
// ----------------------------------------------------------------------------

#[test]
fn weighted_basket_nav() {
    let holdings = vec![holding("AAA", 0.6, 0.0, 0.0), holding("BBB", 0.4, 0.0, 0.0)];
    let quotes = book(&[("AAA", 10.0), ("BBB", 20.0), ("ETF", 15.0)]);

    let analysis = merge("ETF", page(holdings), &quotes, Valuation::Weight);
    let report = &analysis.report;

    assert!(close(report.calculated_nav.unwrap(), 14.0));
    assert_eq!(report.etf_last_price, Some(15.0));
    assert!(close(report.difference.unwrap(), -1.0));
    let pct = report.pct_difference.value().unwrap();
    assert!((pct - (-6.667)).abs() < 1e-3, "pct {pct}");
    assert!(!report.partial);
    assert!(close(report.unattributed_weight.unwrap(), 0.0));

    let aaa = &analysis.holdings[0];
    assert_eq!(aaa.market_value, aaa.true_value);
    assert!(close(aaa.market_value.unwrap(), 6.0));
    assert_eq!(aaa.discrepancy, Some(0.0));
}

#[test]
fn missing_quote_makes_a_partial_nav() {
    let holdings = vec![holding("AAA", 0.6, 0.0, 0.0), holding("BBB", 0.4, 0.0, 0.0)];
    let quotes = book(&[("AAA", 10.0), ("ETF", 15.0)]);

    let analysis = merge("ETF", page(holdings), &quotes, Valuation::Weight);

    assert_eq!(analysis.holdings.len(), 2);
    let bbb = &analysis.holdings[1];
    assert_eq!(bbb.holding.symbol, "BBB");
    assert_eq!(bbb.unresolved, Some(UnresolvedReason::MissingQuote));
    assert_eq!(bbb.market_value, None);
    assert_eq!(bbb.true_value, None);
    assert_eq!(bbb.discrepancy, None);
    assert_eq!(bbb.pct_diff, None);

    let report = &analysis.report;
    assert!(close(report.calculated_nav.unwrap(), 6.0));
    assert!(report.partial);
    assert_eq!((report.resolved, report.unresolved), (1, 1));
}

#[test]
fn weights_short_of_one_leave_a_residual() {
    let holdings = vec![holding("AAA", 0.5, 0.0, 0.0), holding("BBB", 0.3, 0.0, 0.0)];
    let quotes = book(&[("AAA", 10.0), ("BBB", 10.0), ("ETF", 10.0)]);

    let report = merge("ETF", page(holdings), &quotes, Valuation::Weight).report;

    assert!(close(report.calculated_nav.unwrap(), 8.0));
    assert!(close(report.unattributed_weight.unwrap(), 0.2));
    assert!(!report.partial);
}

// share convention
// ----------------------------------------------------------------------------

#[test]
fn share_based_discrepancies() {
    // the fund reports 100 shares of AAA at $1,000 and 50 of BBB at $1,000;
    // AAA has since risen to $11, BBB fallen to $19
    let holdings = vec![
        holding("AAA", 0.5, 100.0, 1_000.0),
        holding("BBB", 0.5, 50.0, 1_000.0),
    ];
    let quotes = book(&[("AAA", 11.0), ("BBB", 19.0), ("ETF", 20.0)]);

    let analysis = merge("ETF", page(holdings), &quotes, Valuation::Shares);

    let aaa = &analysis.holdings[0];
    assert_eq!(aaa.market_value, Some(1_000.0));
    assert!(close(aaa.true_value.unwrap(), 1_100.0));
    assert!(close(aaa.discrepancy.unwrap(), 100.0));
    assert!(close(aaa.pct_diff.unwrap().value().unwrap(), 10.0));

    let bbb = &analysis.holdings[1];
    assert!(close(bbb.discrepancy.unwrap(), -50.0));

    // implied shares outstanding = 2,000 / 20 = 100; nav = 2,050 / 100
    let report = &analysis.report;
    assert!(close(report.calculated_nav.unwrap(), 20.5));
    assert!(close(report.difference.unwrap(), 0.5));
    assert!(close(report.pct_difference.value().unwrap(), 2.5));
}

#[test]
fn missing_disclosures_are_unresolved() {
    let mut no_shares = holding("AAA", 0.5, 0.0, 1_000.0);
    no_shares.shares = None;
    let mut no_value = holding("BBB", 0.5, 10.0, 0.0);
    no_value.reported_market_value = None;
    let mut cash = holding("--", 0.01, 5.0, 5.0);
    cash.quote_symbol = None;

    let quotes = book(&[("AAA", 10.0), ("BBB", 10.0), ("ETF", 10.0)]);
    let analysis = merge(
        "ETF",
        page(vec![no_shares, no_value, cash]),
        &quotes,
        Valuation::Shares,
    );

    let reasons: Vec<_> = analysis.holdings.iter().map(|h| h.unresolved).collect();
    assert_eq!(
        reasons,
        vec![
            Some(UnresolvedReason::MissingShares),
            Some(UnresolvedReason::MissingMarketValue),
            Some(UnresolvedReason::NoSymbol),
        ]
    );

    // the quote is still attached where one was found
    assert_eq!(analysis.holdings[0].last_price, Some(10.0));
    assert_eq!(analysis.holdings[2].last_price, None);

    // nothing resolved, so no basis for a nav
    assert_eq!(analysis.report.calculated_nav, None);
    assert_eq!(analysis.report.pct_difference, Percent::NotAvailable);
}

#[test]
fn zero_reported_value_has_no_percentage() {
    let holdings = vec![holding("AAA", 1.0, 10.0, 0.0)];
    let quotes = book(&[("AAA", 10.0), ("ETF", 10.0)]);

    let analysis = merge("ETF", page(holdings), &quotes, Valuation::Shares);

    let aaa = &analysis.holdings[0];
    assert!(aaa.is_resolved());
    assert_eq!(aaa.pct_diff, Some(Percent::NotAvailable));
    // no reported value means no implied share count either
    assert_eq!(analysis.report.calculated_nav, None);
}

// the fund's own price
// ----------------------------------------------------------------------------

#[test]
fn zero_etf_price_is_not_available() {
    let holdings = vec![holding("AAA", 0.6, 0.0, 0.0), holding("BBB", 0.4, 0.0, 0.0)];
    let quotes = book(&[("AAA", 10.0), ("BBB", 20.0), ("ETF", 0.0)]);

    let report = merge("ETF", page(holdings.clone()), &quotes, Valuation::Weight).report;
    assert_eq!(report.pct_difference, Percent::NotAvailable);
    assert!(close(report.calculated_nav.unwrap(), 14.0));

    let report = merge("ETF", page(holdings), &quotes, Valuation::Shares).report;
    assert_eq!(report.pct_difference, Percent::NotAvailable);
    assert_eq!(report.calculated_nav, None);
    assert_eq!(report.difference, None);
}

#[test]
fn scraped_summary_fills_the_gaps() {
    let holdings = vec![holding("AAA", 1.0, 0.0, 0.0)];
    let quotes = book(&[("AAA", 10.0)]);
    let page = HoldingsPage {
        summary: FundSummary {
            last_price: Some("$9.50".to_string()),
            volume: Some("1.2M".to_string()),
            volume_label: Some("Above Avg.".to_string()),
            as_of: Some("04:00 PM ET 05/03/2024".to_string()),
            ..Default::default()
        },
        holdings,
    };

    let report = merge("ETF", page, &quotes, Valuation::Weight).report;
    assert_eq!(report.etf_last_price, Some(9.5));
    assert_eq!(report.volume, Some(1_200_000));
    assert_eq!(report.volume_label.as_deref(), Some("Above Avg."));
    assert_eq!(report.as_of.as_deref(), Some("04:00 PM ET 05/03/2024"));
    assert!(close(report.difference.unwrap(), 0.5));
}

#[test]
fn etf_quote_wins_over_the_scraped_price() {
    let holdings = vec![holding("AAA", 1.0, 0.0, 0.0)];
    let quotes = book(&[("AAA", 10.0), ("ETF", 10.25)]);
    let page = HoldingsPage {
        summary: FundSummary {
            last_price: Some("$9.50".to_string()),
            ..Default::default()
        },
        holdings,
    };

    let report = merge("ETF", page, &quotes, Valuation::Weight).report;
    assert_eq!(report.etf_last_price, Some(10.25));
    assert_eq!(report.volume, Some(1_000));
    assert_eq!(report.as_of.as_deref(), Some("2024-05-03 19:59:00 UTC"));
}

// invariants
// ----------------------------------------------------------------------------

#[test]
fn order_is_preserved_whatever_resolves() {
    let symbols = ["EEE", "AAA", "DDD", "BBB", "CCC"];
    let holdings: Vec<Holding> = symbols
        .iter()
        .map(|s| holding(s, 0.2, 1.0, 1.0))
        .collect();
    let quotes = book(&[("AAA", 1.0), ("CCC", 3.0), ("ETF", 1.0)]);

    for valuation in [Valuation::Shares, Valuation::Weight] {
        let analysis = merge("ETF", page(holdings.clone()), &quotes, valuation);
        let out: Vec<&str> = analysis
            .holdings
            .iter()
            .map(|h| h.holding.symbol.as_str())
            .collect();
        assert_eq!(out, symbols);

        let resolved: Vec<bool> = analysis.holdings.iter().map(|h| h.is_resolved()).collect();
        assert_eq!(resolved, vec![false, true, false, false, true]);
    }
}

#[test]
fn nav_is_the_normalized_sum_of_values() {
    let holdings = vec![
        holding("AAA", 0.31, 120.0, 1_250.0),
        holding("BBB", 0.27, 75.0, 2_010.0),
        holding("CCC", 0.22, 310.0, 905.5),
        holding("DDD", 0.12, 12.0, 480.0),
    ];
    let quotes = book(&[
        ("AAA", 10.37),
        ("BBB", 27.91),
        ("DDD", 41.05),
        ("ETF", 33.33),
    ]);

    for valuation in [Valuation::Shares, Valuation::Weight] {
        let analysis = merge("ETF", page(holdings.clone()), &quotes, valuation);
        let resolved = analysis.holdings.iter().filter(|h| h.is_resolved());

        let total_market: f64 = resolved.clone().map(|h| h.market_value.unwrap()).sum();
        let total_true: f64 = resolved.map(|h| h.true_value.unwrap()).sum();

        let basis = NavBasis::for_valuation(valuation, total_market, Some(33.33)).unwrap();
        assert_eq!(
            basis.per_share(total_true),
            analysis.report.calculated_nav.unwrap()
        );
    }
}
