use std::io;

use anyhow::Context;
use chrono::Local;
use clap::{CommandFactory, Parser};
use offbalance::{
    Portfolio, PriceSource, Rebalancer,
    config::{self, Config},
    price::{StaticPrices, alpha_vantage::AlphaVantage},
    report, target,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

mod cli;

fn main() -> anyhow::Result<()> {
    let opts = Cli::parse();
    let default_level = match opts.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match opts.command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Command::Balance {
            current_holdings,
            target: target_path,
            date,
            prices,
            output,
        } => {
            let config = Config::load(opts.config.as_deref())?;

            let Some(targets_path) =
                target_path.or(config::config_dir().map(|dir| dir.join("target.yml")))
            else {
                anyhow::bail!("Failed to get target path");
            };
            let requested = target::load_from_file(&targets_path)?;
            println!("Target Allocations");
            requested
                .iter()
                .for_each(|h| println!(" - {}: {:.1}%", h.symbol, h.allocation));
            println!();

            let current = Portfolio::load_from_file(&current_holdings)?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());

            let source: Box<dyn PriceSource> = match prices {
                Some(path) => Box::new(StaticPrices::load_csv(path)?),
                None => {
                    let api_key = config.alpha_vantage.api_key().with_context(|| {
                        format!(
                            "No Alpha Vantage API key: set {} or pass --prices",
                            config::API_KEY_ENV
                        )
                    })?;
                    Box::new(AlphaVantage::new(api_key, &config.alpha_vantage)?)
                }
            };
            info!(%date, holdings = current.len(), targets = requested.len(), "rebalancing");

            let rebalance = Rebalancer::new(source)
                .balance(&current, &requested, date)
                .with_context(|| format!("Failed to rebalance with prices for {date}"))?;

            println!("Portfolio value on {date}: ${:.2}", rebalance.total_value);
            println!();
            println!("In order to reach your target allocations, the following actions are necessary.");
            println!("{}", report::actions_table(&rebalance));
            println!();
            println!("Updated portfolio");
            println!("{}", report::holdings_table(&rebalance.updated));

            if let Some(path) = output {
                rebalance.updated.save_to_file(&path)?;
                info!(?path, "wrote updated portfolio");
            }
            Ok(())
        }
    }
}
