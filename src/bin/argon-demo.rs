#![forbid(unsafe_code)]
use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use argonchain::cli::{load_ledger_from_config, short_address, LedgerOverrides};
use argonchain::config::parse_amount;
use argonchain::miner::MiningControl;
use argonchain::node::Node;
use argonchain::transaction::Amount;
use argonchain::wallet::Wallet;

/// Mines a few blocks and moves funds between two fresh wallets on a local ledger.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the configured difficulty
    #[arg(long)]
    difficulty: Option<u32>,
    /// Override the configured mining reward, as a decimal such as 12.5
    #[arg(long, value_parser = parse_amount)]
    reward: Option<Amount>,
    /// Use the cheapest Argon2 parameters so blocks mine in seconds
    #[arg(long)]
    light: bool,
    /// Give up on a block after this many attempts
    #[arg(long)]
    max_attempts: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let ledger = load_ledger_from_config(args.config.as_deref())?;
    let config = ledger.config.clone();
    let overrides = LedgerOverrides {
        difficulty: args.difficulty,
        mining_reward: args.reward,
        light: args.light,
    };

    let (blockchain, persistence) = ledger.with_overrides(&overrides)?;
    let hasher = blockchain.hasher().clone();
    let mut node = Node::new(blockchain);
    if let Some(persistence) = persistence {
        node = node.with_persistence(persistence);
    }

    let codec = config.build_codec()?;
    let alice = Wallet::new(&codec)?;
    let bob = Wallet::new(&codec)?;

    println!("{}", "⛓️  ArgonChain demo".bright_cyan().bold());
    println!(
        "  difficulty {}, reward {}, {} block(s) on chain",
        node.with_chain(|c| c.difficulty()),
        node.with_chain(|c| c.mining_reward()),
        node.chain_len()
    );
    println!();

    let control = || match args.max_attempts {
        Some(max) => MiningControl::bounded(max),
        None => MiningControl::new(),
    };

    mine(&node, &alice.address(), control()).await?;

    let reward = node.with_chain(|c| c.mining_reward());
    let half = reward / Amount::from_num(2);
    let tx = alice.create_transaction(&bob.address(), half, &hasher)?;
    node.add_transaction(tx)?;
    println!("{} {} → {}", "📤 Sent".green(), half, short_address(&bob.address()));

    let overspend = alice.create_transaction(&bob.address(), reward, &hasher)?;
    match node.add_transaction(overspend) {
        Ok(()) => println!("{}", "unexpected: overspend admitted".red()),
        Err(e) => println!("{} {}", "🚫 Rejected".yellow(), e),
    }

    mine(&node, &alice.address(), control()).await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Wallet")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Address")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Balance")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
        ]);
    for (name, wallet) in [("alice", &alice), ("bob", &bob)] {
        table.add_row(vec![
            Cell::new(name).fg(TableColor::White),
            Cell::new(short_address(&wallet.address())).fg(TableColor::Grey),
            Cell::new(node.get_balance(&wallet.address())).fg(TableColor::Green),
        ]);
    }
    println!();
    println!("{}", table);

    let valid = node.is_valid_chain();
    println!(
        "{} {} blocks, chain {}",
        "📊".bright_blue(),
        node.chain_len(),
        if valid { "valid".green() } else { "INVALID".red() }
    );
    Ok(())
}

async fn mine(
    node: &Node,
    miner: &str,
    control: MiningControl,
) -> Result<(), Box<dyn std::error::Error>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.set_message(format!("⛏️  mining block {}", node.chain_len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = node.mine_pending(miner, control).await;
    spinner.finish_and_clear();

    let (block, stats) = result?;
    println!(
        "{} #{} {} ({} attempts in {}, {:.1} H/s)",
        "✅ Mined".bright_green(),
        block.index,
        block.hash.dimmed(),
        stats.attempts,
        humantime::format_duration(Duration::from_millis(stats.elapsed.as_millis() as u64)),
        stats.hash_rate()
    );
    Ok(())
}
