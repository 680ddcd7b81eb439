#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use argonchain::config::{load_config, parse_amount};
use argonchain::transaction::Amount;
use argonchain::wallet::Wallet;

#[derive(Parser)]
#[command(author, version, about = "ArgonChain wallet tool", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generates a new wallet and prints its mnemonic, address and private key
    New {
        /// Entropy size in bits (128, 160, 192, 224 or 256)
        #[arg(long)]
        bits: Option<usize>,
        /// Print the export as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rebuilds a wallet from its mnemonic phrase
    Restore {
        /// The space-separated mnemonic phrase
        mnemonic: String,
        #[arg(long)]
        json: bool,
    },
    /// Signs a transfer with an exported private key and prints it as JSON
    Sign {
        /// Base64 PKCS#8 private key
        #[arg(long)]
        key: String,
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Amount to send, as a decimal such as 0.1
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::New { bits, json } => {
            let codec = config.build_codec()?;
            let wallet = Wallet::with_entropy(&codec, bits.unwrap_or(config.wallet.entropy_bits))?;
            print_wallet(&wallet, json)?;
        }
        Commands::Restore { mnemonic, json } => {
            let codec = config.build_codec()?;
            let wallet = Wallet::restore(&codec, &mnemonic)?;
            print_wallet(&wallet, json)?;
        }
        Commands::Sign { key, to, amount } => {
            let wallet = Wallet::import(&key)?;
            let hasher = config.build_hasher()?;
            let tx = wallet.create_transaction(&to, amount, &hasher)?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
    }

    Ok(())
}

fn print_wallet(wallet: &Wallet, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let export = wallet.export()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&export)?);
        return Ok(());
    }

    println!("{}", "🔑 Wallet".bright_cyan().bold());
    println!();
    if let Some(mnemonic) = &export.mnemonic {
        println!("{}", "Mnemonic (write this down, it is shown only once):".yellow());
        println!("  {}", mnemonic.bright_white().bold());
        println!();
    }
    println!("{} {}", "Address:".bright_green(), export.address);
    println!("{} {}", "Private key:".bright_red(), export.private_key);
    Ok(())
}
