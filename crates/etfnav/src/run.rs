use crate::cli::{Feed, Valuation};
use etfnav_spider as spider;
use spider::analyze::{analyze, Request};
use spider::config::{AlpacaConfig, SchwabConfig};
use spider::holdings::schwab::SchwabHoldings;
use spider::prices::alpaca::AlpacaClient;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Debug)]
pub(crate) struct Args {
    pub etf_symbol: String,
    pub nrows: usize,
    pub output_file: Option<PathBuf>,
    pub valuation: Valuation,
    pub feed: Option<Feed>,
    pub batch_size: usize,
    pub concurrency: usize,
}

/// Fetch holdings & quotes, print the NAV report, and optionally save it.
pub(crate) async fn run(args: Args, tui: bool) -> anyhow::Result<()> {
    let time = std::time::Instant::now();

    // 1. configuration; everything is checked before the first request
    let etf_symbol = spider::common::validate_etf_symbol(&args.etf_symbol).map_err(|err| {
        error!("{err}");
        err
    })?;
    let alpaca_config = AlpacaConfig::from_env()
        .and_then(|config| config.with_batch_size(args.batch_size))
        .and_then(|config| config.with_concurrency(args.concurrency))
        .map_err(|err| {
            error!("alpaca configuration error: {err}");
            err
        })?
        .with_feed(args.feed.map(Into::into));
    debug!("alpaca configuration: {alpaca_config:?}");

    let request = Request {
        etf_symbol,
        max_rows: args.nrows,
        valuation: args.valuation.into(),
    };

    // 2. clients
    let holdings = SchwabHoldings::new(SchwabConfig::default())?;
    let prices = AlpacaClient::new(alpaca_config)?;

    // 3. fetch, merge & compute
    let analysis = analyze(&holdings, &prices, &request, tui).await?;

    // 4. report
    let stdout = std::io::stdout();
    let color = stdout.is_terminal();
    spider::report::render(&mut stdout.lock(), &analysis, color)?;

    if let Some(path) = &args.output_file {
        spider::report::write_json(path, &analysis).await?;
        if tui {
            println!("\nSaved merged data to {}", path.display());
        }
    }

    info!(
        "{} analysed, time elapsed: {:?}",
        request.etf_symbol,
        time.elapsed()
    );

    Ok(())
}
