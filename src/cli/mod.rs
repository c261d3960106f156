pub mod args;
pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use args::{AwaitArgs, ClaimArgs, CreateArgs, GetArgs, PlaceArgs, ResolveArgs};

#[derive(Parser, Debug)]
#[command(name = "soroban-bets")]
#[command(version, about = "Create, stake on and settle bets on a Soroban bet-market contract")]
pub struct Cli {
    /// TOML config file; BETS_* environment variables override it
    #[arg(long, global = true, env = "BETS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Soroban RPC endpoint (overrides config and BETS_RPC_URL)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Network passphrase (overrides config and BETS_NETWORK_PASSPHRASE)
    #[arg(long, global = true)]
    pub network_passphrase: Option<String>,

    /// Bet-market contract id (overrides config and BETS_CONTRACT_ID)
    #[arg(long, global = true)]
    pub contract_id: Option<String>,

    /// Token contract id (overrides config and BETS_TOKEN_ID)
    #[arg(long, global = true)]
    pub token_id: Option<String>,

    /// Output format
    #[arg(long, short, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "BETS_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a bet; the signing account becomes its oracle
    Create(CreateArgs),

    /// Stake an amount on one option of a bet
    Place(PlaceArgs),

    /// Declare the winning option of a bet (oracle only)
    Resolve(ResolveArgs),

    /// Claim winnings from a resolved bet
    Claim(ClaimArgs),

    /// Show one bet
    Get(GetArgs),

    /// Show every bet
    List,

    /// Print the number of bets created so far
    Count,

    /// Print the signing account's address
    Address,

    /// Check the node's health and network passphrase
    Status,

    /// Resume waiting for a previously submitted transaction
    Await(AwaitArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Trace,
}

impl Verbosity {
    /// Default filter when `RUST_LOG` is unset.
    pub fn to_log_level(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info,soroban_bets=debug",
            Verbosity::Trace => "debug,soroban_bets=trace",
        }
    }

    pub fn shows_progress(self) -> bool {
        self != Verbosity::Quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        let cli = Cli::parse_from(["soroban-bets", "-vv", "count"]);
        assert_eq!(cli.verbosity(), Verbosity::Trace);
        let cli = Cli::parse_from(["soroban-bets", "--quiet", "count"]);
        assert_eq!(cli.verbosity(), Verbosity::Quiet);
        assert_eq!(Verbosity::Quiet.to_log_level(), "error");
    }

    #[test]
    fn create_takes_trailing_options() {
        let cli = Cli::parse_from(["soroban-bets", "create", "Rain?", "Yes", "No"]);
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.question, "Rain?");
                assert_eq!(args.options, vec!["Yes", "No"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn json_output_flag() {
        let cli = Cli::parse_from(["soroban-bets", "list", "--output", "json"]);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
