//! `shroud withdraw`

use anyhow::Context;
use num_bigint::BigUint;
use std::fs;

use shroud_core::{FailurePolicy, FeeOverrides, WithdrawMode, WithdrawOutcome, Withdrawer};
use shroud_privacy::Note;
use shroud_wire::{GWEI, parse_address, parse_units};

use crate::{connect, signing_account};

/// Parsed `withdraw` arguments
#[derive(Debug, Default)]
pub struct WithdrawArgs {
    pub notes: Vec<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// `Some(None)` means "pick a configured relayer"
    pub relayer: Option<Option<String>>,
    pub dry_run: bool,
    pub policy: FailurePolicy,
    pub fees: FeeOverrides,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<WithdrawArgs> {
    let mut parsed = WithdrawArgs::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--from" => {
                parsed.from = args.get(i + 1).cloned();
                i += 1;
            }
            "--to" => {
                parsed.to = args.get(i + 1).cloned();
                i += 1;
            }
            "--relayer" => match args.get(i + 1) {
                Some(url) if url.starts_with("http") => {
                    parsed.relayer = Some(Some(url.clone()));
                    i += 1;
                }
                _ => parsed.relayer = Some(None),
            },
            "--notes-file" => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--notes-file needs a path"))?;
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path))?;
                parsed.notes.extend(
                    contents
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty() && !l.starts_with('#'))
                        .map(String::from),
                );
                i += 1;
            }
            "--dry-run" => parsed.dry_run = true,
            "--abort-on-error" => parsed.policy = FailurePolicy::Abort,
            "--max-fee-gwei" => {
                parsed.fees.max_fee_per_gas = Some(gwei(args.get(i + 1))?);
                i += 1;
            }
            "--priority-fee-gwei" => {
                parsed.fees.max_priority_fee_per_gas = Some(gwei(args.get(i + 1))?);
                i += 1;
            }
            "--gas-limit" => {
                let gas = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--gas-limit needs a value"))?;
                parsed.fees.gas_limit =
                    Some(gas.parse().with_context(|| format!("invalid gas limit '{}'", gas))?);
                i += 1;
            }
            flag if flag.starts_with("--") => anyhow::bail!("unknown option {}", flag),
            note => parsed.notes.push(note.to_string()),
        }
        i += 1;
    }

    if parsed.notes.is_empty() {
        anyhow::bail!("no notes given");
    }
    if parsed.relayer.is_some() && parsed.to.is_none() {
        anyhow::bail!("--relayer needs --to <recipient>");
    }
    Ok(parsed)
}

fn gwei(value: Option<&String>) -> anyhow::Result<BigUint> {
    let value = value.ok_or_else(|| anyhow::anyhow!("fee flag needs a value in gwei"))?;
    parse_units(value, GWEI).with_context(|| format!("invalid gwei amount '{}'", value))
}

pub async fn run(args: WithdrawArgs) -> anyhow::Result<()> {
    let notes = args
        .notes
        .iter()
        .map(|text| text.parse::<Note>().context("invalid note"))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (config, settings, services) = connect()?;
    let mode = match (&args.relayer, args.dry_run) {
        (_, true) => WithdrawMode::DryRun {
            from: signing_account(&config, args.from.as_deref())?,
        },
        (Some(relayer_url), false) => {
            let to = args.to.as_deref().unwrap_or_default();
            WithdrawMode::Relayer {
                relayer_url: relayer_url.clone(),
                recipient: parse_address(to)
                    .with_context(|| format!("invalid recipient '{}'", to))?,
            }
        }
        (None, false) => WithdrawMode::Direct {
            from: signing_account(&config, args.from.as_deref())?,
            fees: args.fees.clone(),
        },
    };

    let withdrawer = Withdrawer::new(settings, services);
    println!("🔐 Withdrawing {} note(s)...", notes.len());
    let outcomes = withdrawer.withdraw_all(&notes, &mode, args.policy).await;

    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(WithdrawOutcome::Submitted { tx_hash, receipt }) => {
                let block = receipt
                    .as_ref()
                    .map(|r| format!(" in block {}", r.block_number))
                    .unwrap_or_default();
                println!(
                    "✅ Note {} ({} ETH) withdrawn: {}{}",
                    outcome.index, outcome.label, tx_hash, block
                );
            }
            Ok(WithdrawOutcome::Relayed {
                job_id, tx_hash, ..
            }) => {
                println!(
                    "✅ Note {} ({} ETH) relayed as job {}: {}",
                    outcome.index, outcome.label, job_id, tx_hash
                );
            }
            Ok(WithdrawOutcome::Simulated { output }) => {
                println!(
                    "🧪 Note {} ({} ETH) simulation succeeded, returned {}",
                    outcome.index, outcome.label, output
                );
            }
            Err(e) => {
                failures += 1;
                eprintln!("❌ Note {} ({} ETH) failed: {}", outcome.index, outcome.label, e);
            }
        }
    }

    let skipped = notes.len() - outcomes.len();
    if skipped > 0 {
        println!("⏭️  {} note(s) not attempted", skipped);
    }
    if failures > 0 {
        anyhow::bail!("{} of {} note(s) failed", failures, outcomes.len());
    }
    Ok(())
}
