#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "ArgonChain CLI".bright_cyan().bold());
    println!("{}", "--------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but most functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!(
        "  - {}  {}",
        "argon-wallet".bright_white(),
        "create, restore or sign with a wallet".dimmed()
    );
    println!(
        "  - {}    {}",
        "argon-demo".bright_white(),
        "mine and transfer on a local ledger".dimmed()
    );
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --bin argon-wallet -- new".italic());
}
