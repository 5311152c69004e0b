//! `votesplit distribute` command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use votesplit_core::distribution::inert_remainder;
use votesplit_core::{distribute, Address, Delegation, DelegationSet};

use super::{load_config, parse_u128_dec, OutputFormat};

#[derive(Debug, Serialize)]
struct SplitLine {
    delegatee: Address,
    share: u32,
    amount: String,
}

#[derive(Debug, Serialize)]
struct SplitReport {
    balance: String,
    denominator: u32,
    splits: Vec<SplitLine>,
    inert_remainder: String,
}

/// Parse `<address>:<share>`.
fn parse_delegation(s: &str) -> Result<Delegation> {
    let (addr, share) = s
        .rsplit_once(':')
        .with_context(|| format!("expected <address>:<share>, got '{s}'"))?;
    let delegatee = Address::from_hex(addr).with_context(|| format!("invalid address '{addr}'"))?;
    let share = share
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid share '{share}'"))?;
    Ok(Delegation::new(delegatee, share))
}

pub fn run(
    balance: String,
    delegations: Vec<String>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let config = load_config(config_path)?;
    let balance = parse_u128_dec(&balance)?;

    let entries = delegations
        .iter()
        .map(|s| parse_delegation(s))
        .collect::<Result<Vec<_>>>()?;
    let set = DelegationSet::new(entries, &config).context("invalid delegation set")?;
    let adjustments = distribute(set.as_slice(), balance, config.denominator)?;

    let report = SplitReport {
        balance: balance.to_string(),
        denominator: config.denominator,
        splits: set
            .as_slice()
            .iter()
            .zip(&adjustments)
            .map(|(d, a)| SplitLine {
                delegatee: d.delegatee,
                share: d.share,
                amount: a.amount.to_string(),
            })
            .collect(),
        inert_remainder: inert_remainder(&adjustments, balance).to_string(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Human => {
            println!(
                "Balance: {} (denominator {})",
                report.balance, report.denominator
            );
            for line in &report.splits {
                println!(
                    "   {} share {:>6} -> {}",
                    line.delegatee, line.share, line.amount
                );
            }
            println!("Inert remainder: {}", report.inert_remainder);
        }
    }

    Ok(())
}
