mod deposit;
mod withdraw;

use anyhow::Context;
use std::env;
use std::fs;

use shroud_config::ShroudConfig;
use shroud_core::{EventSynchronizer, Services, Settings};
use shroud_wire::{Address, ETHER, format_units, parse_address};

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];

    match cmd.as_str() {
        "sync" => {
            let label = args.get(2).map(|s| s.as_str()).unwrap_or("all");
            if let Err(e) = sync(label).await {
                eprintln!("❌ Error syncing deposits: {:#}", e);
                std::process::exit(1);
            }
        }
        "withdraw" => {
            let parsed = match withdraw::parse_args(&args[2..]) {
                Ok(parsed) => parsed,
                Err(e) => {
                    eprintln!("❌ Error: {:#}", e);
                    println!();
                    println!("Usage: withdraw <note>... [--relayer [url] --to <address>] [--from <address>] [--dry-run] [--abort-on-error]");
                    std::process::exit(1);
                }
            };
            if let Err(e) = withdraw::run(parsed).await {
                eprintln!("❌ Error withdrawing: {:#}", e);
                std::process::exit(1);
            }
        }
        "deposit" => {
            let Some(label) = args.get(2) else {
                println!("Usage: deposit <amount> [--from <address>] [--backup <file>]");
                println!("  amount - Pool denomination in ETH (0.1, 1, 10, 100)");
                return;
            };
            if let Err(e) = deposit::run(label, &args[3..]).await {
                eprintln!("❌ Error depositing: {:#}", e);
                std::process::exit(1);
            }
        }
        "balance" => {
            let Some(address) = args.get(2) else {
                println!("Usage: balance <address>");
                return;
            };
            if let Err(e) = balance(address).await {
                eprintln!("❌ Error fetching balance: {:#}", e);
                std::process::exit(1);
            }
        }
        "config" => {
            let path = args.get(2).map(|s| s.as_str());
            if let Err(e) = write_sample_config(path) {
                eprintln!("❌ Error writing config: {:#}", e);
                std::process::exit(1);
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Shroud CLI - Shielded pool deposits and withdrawals");
    println!();
    println!("USAGE:");
    println!("  shroud <command> [args]");
    println!();
    println!("POOL COMMANDS:");
    println!("  sync [amount|all]          Fetch and validate deposit events");
    println!("  deposit <amount>           Create a note and deposit it");
    println!("  withdraw <note>...         Withdraw one or more notes");
    println!();
    println!("ACCOUNT COMMANDS:");
    println!("  balance <address>          Show the ETH balance of an address");
    println!();
    println!("OTHER COMMANDS:");
    println!("  config [file]              Print or write a sample shroud.toml");
    println!("  help                       Show this help message");
    println!();
    println!("WITHDRAW OPTIONS:");
    println!("  --from <address>           Account that signs and receives (direct mode)");
    println!("  --relayer [url]            Withdraw through a relayer (random pick if no url)");
    println!("  --to <address>             Recipient when using a relayer");
    println!("  --dry-run                  Prove and simulate without submitting");
    println!("  --abort-on-error           Stop at the first failing note");
    println!("  --max-fee-gwei <gwei>      Override maxFeePerGas");
    println!("  --priority-fee-gwei <gwei> Override maxPriorityFeePerGas");
    println!("  --gas-limit <gas>          Override the gas estimate");
    println!();
    println!("EXAMPLES:");
    println!("  shroud sync 0.1                              # Sync the 0.1 ETH pool");
    println!("  shroud deposit 1 --from 0xabc...             # Deposit 1 ETH");
    println!("  shroud withdraw tornado-eth-1-1-0x... --relayer --to 0xdef...");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  SHROUD_CONFIG        Path to shroud.toml");
    println!("  SHROUD_RPC_URL       Ethereum JSON-RPC endpoint");
    println!("  SHROUD_PROVER_URL    Prover service endpoint");
    println!("  SHROUD_SIGNER_URL    Signer endpoint (eth_signTransaction)");
    println!("  SHROUD_ACCOUNT       Default signing account");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}

/// Load configuration and build production collaborators
pub(crate) fn connect() -> anyhow::Result<(ShroudConfig, Settings, Services)> {
    let config = ShroudConfig::load().context("failed to load configuration")?;
    let settings = Settings::from_config(&config).context("invalid pool configuration")?;
    log::debug!(
        "node {} (chain {}), prover {}, signer {}",
        config.network.rpc_url,
        config.network.chain_id,
        config.prover.url,
        config.signer.url
    );
    let services = Services::connect(&config)?;
    Ok((config, settings, services))
}

/// `--from` if given, otherwise the configured signer account
pub(crate) fn signing_account(
    config: &ShroudConfig,
    from: Option<&str>,
) -> anyhow::Result<Address> {
    let text = from
        .or(config.signer.account.as_deref())
        .ok_or_else(|| anyhow::anyhow!("no account: pass --from or set SHROUD_ACCOUNT"))?;
    parse_address(text).with_context(|| format!("invalid account address '{}'", text))
}

/// Value following `flag`, if present
pub(crate) fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

async fn sync(label: &str) -> anyhow::Result<()> {
    let (_, settings, services) = connect()?;
    let synchronizer = EventSynchronizer::new(services.rpc.clone(), services.store.clone())
        .with_batch_size(settings.batch_size);
    if label != "all" {
        settings.denominations.get(label)?;
    }

    for denomination in settings.denominations.iter() {
        if label != "all" && denomination.label != label {
            continue;
        }
        println!("🔄 Syncing {} ETH pool...", denomination.label);
        let events = synchronizer
            .sync(denomination)
            .await
            .with_context(|| format!("{} ETH pool", denomination.label))?;
        println!("✅ {} deposits in the {} ETH pool", events.len(), denomination.label);
    }
    Ok(())
}

async fn balance(address: &str) -> anyhow::Result<()> {
    let (_, _, services) = connect()?;
    let address =
        parse_address(address).with_context(|| format!("invalid address '{}'", address))?;
    let wei = services.rpc.balance(&address).await?;
    println!("💰 {} ETH", format_units(&wei, ETHER));
    Ok(())
}

fn write_sample_config(path: Option<&str>) -> anyhow::Result<()> {
    let sample = ShroudConfig::generate_sample();
    match path {
        Some(path) => {
            if fs::metadata(path).is_ok() {
                anyhow::bail!("{} already exists. Remove it first or use a different filename.", path);
            }
            fs::write(path, sample).with_context(|| format!("failed to write {}", path))?;
            println!("✅ Wrote sample config to {}", path);
        }
        None => print!("{}", sample),
    }
    Ok(())
}
