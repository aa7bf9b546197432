use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare an ETF's quoted price to the NAV implied by its disclosed holdings.
    Run {
        /// The ETF's ticker symbol, e.g. SPY.
        etf_symbol: String,

        /// Number of holdings to fetch, from the top of the weight order.
        #[arg(default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
        nrows: u32,

        /// Save the merged dataset as JSON to this path.
        output_file: Option<PathBuf>,

        /// How each holding's market value is derived.
        #[arg(short, long, value_enum, default_value_t = Valuation::Shares)]
        valuation: Valuation,

        /// Alpaca market data feed; the account's default when omitted.
        #[arg(long, value_enum)]
        feed: Option<Feed>,

        /// Symbols per quote request.
        #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u32).range(1..))]
        batch_size: u32,

        /// Quote requests in flight at once.
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
        concurrency: u32,
    },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Valuation {
    /// Shares held × last price, against the provider's reported market value.
    Shares,

    /// Weight × last price; a basket normalized to one fund share.
    Weight,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Feed {
    /// Investors Exchange only (free plans).
    Iex,

    /// All US exchanges.
    Sip,
}

impl From<Valuation> for etfnav_spider::model::Valuation {
    fn from(valuation: Valuation) -> Self {
        match valuation {
            Valuation::Shares => Self::Shares,
            Valuation::Weight => Self::Weight,
        }
    }
}

impl From<Feed> for etfnav_spider::config::Feed {
    fn from(feed: Feed) -> Self {
        match feed {
            Feed::Iex => Self::Iex,
            Feed::Sip => Self::Sip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn positional_arguments() {
        let cli = Cli::parse_from(["etfnav", "run", "spy", "2", "out.json", "--valuation", "weight"]);
        let Commands::Run {
            etf_symbol,
            nrows,
            output_file,
            valuation,
            ..
        } = cli.command;
        assert_eq!(etf_symbol, "spy");
        assert_eq!(nrows, 2);
        assert_eq!(output_file, Some(PathBuf::from("out.json")));
        assert_eq!(valuation, Valuation::Weight);
    }

    #[test]
    fn defaults_and_rejections() {
        let cli = Cli::parse_from(["etfnav", "run", "QQQ"]);
        let Commands::Run { nrows, output_file, valuation, .. } = cli.command;
        assert_eq!(nrows, 100);
        assert_eq!(output_file, None);
        assert_eq!(valuation, Valuation::Shares);

        assert!(Cli::try_parse_from(["etfnav", "run", "QQQ", "0"]).is_err());
        assert!(Cli::try_parse_from(["etfnav", "run", "QQQ", "ten"]).is_err());
        assert!(Cli::try_parse_from(["etfnav", "run"]).is_err());
    }

    #[test]
    fn enums_map_onto_the_library() {
        use etfnav_spider::{config, model};

        // every cli value has a library counterpart with the same name
        for valuation in Valuation::value_variants() {
            let name = valuation.to_possible_value().unwrap().get_name().to_string();
            let mapped = serde_json::to_value(model::Valuation::from(*valuation)).unwrap();
            assert_eq!(mapped, name.as_str());
        }
        for feed in Feed::value_variants() {
            let name = feed.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(config::Feed::from(*feed).as_str(), name);
        }
    }
}
