mod cli;
mod run;

// remote imports
use clap::Parser;
use cli::{Cli, TraceLevel};
use tracing::{subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

////////////////////////////////////////////////////////////////////////////

// preproccess the trace level; logs go to stderr, leaving stdout to the report
fn preprocess(trace_level: Level) -> anyhow::Result<()> {
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .with_writer(std::io::stderr)
        .finish();
    subscriber::set_global_default(my_subscriber)?;
    Ok(())
}

////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // set the trace level
    if let Some(trace_level) = cli.trace {
        preprocess(match trace_level {
            TraceLevel::DEBUG => Level::DEBUG,
            TraceLevel::ERROR => Level::ERROR,
            TraceLevel::INFO => Level::INFO,
            TraceLevel::TRACE => Level::TRACE,
            TraceLevel::WARN => Level::WARN,
        })?;
    }
    trace!("command line input recorded: {cli:?}");

    // if no trace level provided, use tui
    let tui = cli.trace.is_none();

    // read cli inputs
    use cli::Commands::*;
    match cli.command {
        // `etfnav run <ETF_SYMBOL> [NROWS] [OUTPUT_FILE]`: fetch, merge, report
        Run {
            etf_symbol,
            nrows,
            output_file,
            valuation,
            feed,
            batch_size,
            concurrency,
        } => {
            let args = run::Args {
                etf_symbol,
                nrows: nrows as usize,
                output_file,
                valuation,
                feed,
                batch_size: batch_size as usize,
                concurrency: concurrency as usize,
            };
            run::run(args, tui).await?;
        }
    }

    Ok(())
}
