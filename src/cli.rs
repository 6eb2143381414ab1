use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(version, about = "Work out the trades that bring a portfolio back to its target allocation")]
pub(crate) struct Cli {
    #[arg(short, long, global = true, help = "Configuration file")]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "More logging, repeat for trace output")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Compute buy and sell actions for the current holdings
    Balance {
        #[arg(help = "Current holdings CSV with Symbol and Shares columns")]
        current_holdings: PathBuf,
        #[arg(short, long, help = "Target allocation")]
        target: Option<PathBuf>,
        #[arg(short, long, help = "Pricing date (YYYY-MM-DD), defaults to today")]
        date: Option<NaiveDate>,
        #[arg(
            short,
            long,
            help = "Prices CSV with Date, Symbol and Price columns instead of querying Alpha Vantage"
        )]
        prices: Option<PathBuf>,
        #[arg(short, long, help = "Write the updated portfolio to this CSV file")]
        output: Option<PathBuf>,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
