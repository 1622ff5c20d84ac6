//! `shroud deposit`

use anyhow::Context;
use rand::rngs::OsRng;
use std::fs::OpenOptions;
use std::io::Write;

use shroud_core::{Depositor, FeeOverrides};

use crate::{connect, flag_value, signing_account};

pub async fn run(label: &str, args: &[String]) -> anyhow::Result<()> {
    let (config, settings, services) = connect()?;
    let from = signing_account(&config, flag_value(args, "--from"))?;
    let depositor = Depositor::new(settings, services);

    let pending = depositor.prepare(label, &mut OsRng).await?;
    let note = pending.note.to_string();

    // shown before anything is sent
    println!("🔑 Your note: {}", note);
    if let Some(path) = flag_value(args, "--backup") {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("failed to create backup file {}", path))?;
        writeln!(file, "{}", note)?;
        println!("💾 Saved note to {}", path);
    }

    println!("📤 Depositing {} ETH from {}...", label, from);
    let outcome = depositor
        .submit(&pending, from, &FeeOverrides::default())
        .await?;
    match outcome.receipt {
        Some(receipt) => println!(
            "✅ Deposit confirmed in block {}: {}",
            receipt.block_number, outcome.tx_hash
        ),
        None => println!("⏳ Deposit submitted, no receipt yet: {}", outcome.tx_hash),
    }
    Ok(())
}
