//! `votesplit replay` command implementation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use votesplit_core::hash::state_digest;
use votesplit_core::metrics::MetricsSnapshot;
use votesplit_core::{
    check_invariants, Address, Delegation, EngineConfig, ManualClock, Token, VotesEvent,
    VotingPowerQuery,
};

use super::{load_config, parse_u128_dec, OutputFormat};

fn default_start() -> u64 {
    1
}

/// Replay script file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Block the clock starts at.
    #[serde(default = "default_start")]
    pub start: u64,
    pub steps: Vec<Step>,
}

/// One ledger operation. Amounts are decimal strings.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Mint {
        to: Address,
        amount: String,
    },
    Burn {
        from: Address,
        amount: String,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: String,
    },
    Delegate {
        account: Address,
        delegations: Vec<Delegation>,
    },
    DelegateAll {
        account: Address,
        delegatee: Address,
    },
    Advance {
        blocks: u64,
    },
}

#[derive(Debug, Serialize)]
struct VotesLine {
    delegatee: Address,
    votes: String,
    checkpoints: usize,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    steps: usize,
    clock: u64,
    clock_mode: &'static str,
    total_supply: String,
    votes: Vec<VotesLine>,
    events: usize,
    metrics: MetricsSnapshot,
    state_digest: String,
}

fn apply_step(
    token: &mut Token<Arc<ManualClock>>,
    clock: &ManualClock,
    step: &Step,
) -> Result<Vec<VotesEvent>> {
    let events = match step {
        Step::Mint { to, amount } => token.mint(*to, parse_u128_dec(amount)?)?,
        Step::Burn { from, amount } => token.burn(*from, parse_u128_dec(amount)?)?,
        Step::Transfer { from, to, amount } => {
            token.transfer(*from, *to, parse_u128_dec(amount)?)?
        }
        Step::Delegate {
            account,
            delegations,
        } => token.set_delegations(*account, delegations.clone())?,
        Step::DelegateAll { account, delegatee } => token.delegate(*account, *delegatee)?,
        Step::Advance { blocks } => {
            let now = clock.advance(*blocks);
            debug!(now, "Clock advanced");
            Vec::new()
        }
    };
    Ok(events)
}

/// Run `script` against a fresh token. Returns the token and the number of events emitted.
pub fn replay(
    script: &Script,
    config: EngineConfig,
    check: bool,
) -> Result<(Token<Arc<ManualClock>>, usize)> {
    let clock = Arc::new(ManualClock::new(script.start));
    let mut token = Token::new(config, Arc::clone(&clock))?;
    let mut events = 0usize;

    for (i, step) in script.steps.iter().enumerate() {
        let emitted = apply_step(&mut token, &clock, step)
            .with_context(|| format!("step {i} ({step:?}) failed"))?;
        debug!(step = i, events = emitted.len(), "Step applied");
        events += emitted.len();
        if check {
            check_invariants(&token).with_context(|| format!("invariant check after step {i}"))?;
        }
    }

    Ok((token, events))
}

pub fn run(
    script_path: PathBuf,
    format: String,
    check: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let config = load_config(config_path)?;
    let content = std::fs::read_to_string(&script_path)
        .with_context(|| format!("failed to read script {}", script_path.display()))?;
    let script: Script = serde_json::from_str(&content)
        .with_context(|| format!("invalid script {}", script_path.display()))?;

    info!(steps = script.steps.len(), check, "Replaying script");
    let (token, events) = replay(&script, config, check)?;

    let engine = token.engine();
    let report = ReplayReport {
        steps: script.steps.len(),
        clock: token.clock(),
        clock_mode: token.clock_mode(),
        total_supply: token.current_total_supply().to_string(),
        votes: engine
            .checkpoints()
            .delegatees()
            .map(|d| VotesLine {
                delegatee: d,
                votes: token.current_votes(&d).to_string(),
                checkpoints: token.num_checkpoints(&d),
            })
            .collect(),
        events,
        metrics: engine.metrics().snapshot(),
        state_digest: state_digest(engine).to_string(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Human => print_human(&report),
    }
    Ok(())
}

fn print_human(report: &ReplayReport) {
    println!(
        "Replayed {} steps, clock at {} ({})",
        report.steps, report.clock, report.clock_mode
    );
    println!("Total supply: {}", report.total_supply);
    println!();
    println!("Votes");
    if report.votes.is_empty() {
        println!("   (no delegatees)");
    }
    for line in &report.votes {
        println!(
            "   {} {} ({} checkpoints)",
            line.delegatee, line.votes, line.checkpoints
        );
    }
    println!();
    println!("Events: {}", report.events);
    println!(
        "Operations: {} applied, {} rejected, {} checkpoint writes",
        report.metrics.operations_total,
        report.metrics.rejected_total,
        report.metrics.checkpoint_writes_total
    );
    println!("State digest: {}", report.state_digest);
}
