//! Command interpreter behind the interactive console.
//!
//! Each input line maps to a list of typed output lines; rendering (colour,
//! tables) is the binary's business.

use crate::node::Node;
use crate::simulation::Simulation;
use serde::Serialize;

pub const WELCOME: &str = "Aetherium Nova CLI. Type 'help' to see available commands.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Input,
    Output,
    Error,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliLine {
    pub kind: OutputKind,
    pub text: String,
}

impl CliLine {
    fn new(kind: OutputKind, text: impl Into<String>) -> Self {
        CliLine {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Lines to append to the history, starting with the echoed input.
    Output(Vec<CliLine>),
    /// Wipe the history.
    Clear,
}

const HELP: &[&str] = &[
    "  help                     - Show this help message",
    "  wallet.new               - Create a new wallet (replaces the active one)",
    "  wallet.info              - Display wallet address, balance and stakes",
    "  wallet.history           - List confirmed transactions of the active wallet",
    "  wallet.send <addr> <amt> - Send AN tokens to an address",
    "  stake <addr> <amt>       - Stake AN tokens with a validator",
    "  rewards.claim            - Move accrued staking rewards into the balance",
    "  network.stats            - Show live network statistics",
    "  validators.list          - List all available validators",
    "  blocks.recent            - List the retained blocks, newest first",
    "  mempool                  - List pending transactions",
    "  clear                    - Clear the terminal",
];

/// Parses an amount argument; anything unparsable becomes NaN and is
/// refused by amount validation downstream.
fn parse_amount(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

/// Executes one console line against `node`.
pub async fn execute(node: &Node, command: &str) -> CommandResult {
    let parts: Vec<&str> = command.split_whitespace().collect();
    let Some((&cmd, args)) = parts.split_first() else {
        return CommandResult::Output(Vec::new());
    };

    let mut out = vec![CliLine::new(OutputKind::Input, format!("> {}", command.trim()))];

    match cmd {
        "help" => {
            out.push(CliLine::new(OutputKind::Info, "Available Commands:"));
            out.extend(HELP.iter().map(|line| CliLine::new(OutputKind::Output, *line)));
        }
        "wallet.new" => {
            let address = node.create_wallet().await;
            out.push(CliLine::new(
                OutputKind::Success,
                format!("New wallet created: {}", address),
            ));
        }
        "wallet.info" => out.extend(node.read(wallet_info).await),
        "wallet.history" => out.extend(node.read(wallet_history).await),
        "wallet.send" => match args {
            [recipient, amount] => {
                let outcome = node.submit_transfer(recipient, parse_amount(amount)).await;
                out.push(outcome_line(outcome.success, outcome.message));
            }
            _ => out.push(CliLine::new(
                OutputKind::Error,
                "Usage: wallet.send <address> <amount>",
            )),
        },
        "stake" => match args {
            [validator, amount] => {
                let outcome = node.submit_stake(validator, parse_amount(amount)).await;
                out.push(outcome_line(outcome.success, outcome.message));
            }
            _ => out.push(CliLine::new(
                OutputKind::Error,
                "Usage: stake <validator_publicKey> <amount>",
            )),
        },
        "rewards.claim" => {
            let outcome = node.claim_rewards().await;
            out.push(outcome_line(outcome.success, outcome.message));
        }
        "network.stats" => {
            let stats = node.network_stats().await;
            out.push(CliLine::new(
                OutputKind::Output,
                format!("Current Block: {}", stats.block_height),
            ));
            out.push(CliLine::new(OutputKind::Output, format!("TPS: {:.2}", stats.tps)));
            out.push(CliLine::new(
                OutputKind::Output,
                format!("Active Validators: {}", stats.active_validators),
            ));
            out.push(CliLine::new(
                OutputKind::Output,
                format!("Mempool: {} transactions", stats.mempool_size),
            ));
        }
        "validators.list" => {
            out.push(CliLine::new(OutputKind::Info, "Available Validators:"));
            out.extend(node.read(validator_lines).await);
        }
        "blocks.recent" => out.extend(node.read(block_lines).await),
        "mempool" => out.extend(node.read(mempool_lines).await),
        "clear" => return CommandResult::Clear,
        other => out.push(CliLine::new(
            OutputKind::Error,
            format!("Command not found: {}", other),
        )),
    }

    CommandResult::Output(out)
}

fn outcome_line(success: bool, message: String) -> CliLine {
    let kind = if success {
        OutputKind::Success
    } else {
        OutputKind::Error
    };
    CliLine::new(kind, message)
}

fn wallet_info(sim: &Simulation) -> Vec<CliLine> {
    let Some(account) = sim.wallet() else {
        return vec![CliLine::new(
            OutputKind::Error,
            "No wallet found. Run 'wallet.new' to create one.",
        )];
    };

    let mut lines = vec![
        CliLine::new(OutputKind::Output, format!("PublicKey: {}", account.public_key)),
        CliLine::new(OutputKind::Output, format!("Balance: {:.4} AN", account.balance)),
    ];
    if sim.pending_spend() > 0.0 {
        let available = sim.available_balance().unwrap_or(account.balance);
        lines.push(CliLine::new(
            OutputKind::Info,
            format!(" (Available: {:.4} AN considering mempool)", available),
        ));
    }
    for position in &account.stakes {
        let name = sim
            .state()
            .validator(&position.validator_address)
            .map(|v| v.name.as_str())
            .unwrap_or("unknown validator");
        lines.push(CliLine::new(
            OutputKind::Output,
            format!(
                "Staked: {:.4} AN with {} (rewards {:.8} AN)",
                position.amount, name, position.rewards
            ),
        ));
    }
    if !account.stakes.is_empty() {
        lines.push(CliLine::new(
            OutputKind::Info,
            format!(
                "Total Staked: {:.4} AN | Unclaimed Rewards: {:.8} AN",
                account.total_staked(),
                account.total_rewards()
            ),
        ));
    }
    lines
}

fn wallet_history(sim: &Simulation) -> Vec<CliLine> {
    let Some(address) = sim.wallet_address() else {
        return vec![CliLine::new(
            OutputKind::Error,
            "No wallet found. Run 'wallet.new' to create one.",
        )];
    };

    let lines: Vec<CliLine> = sim
        .wallet_transactions()
        .map(|tx| {
            let (direction, counterparty) = if tx.from == address {
                ("OUT", tx.to())
            } else {
                ("IN", tx.from.as_str())
            };
            CliLine::new(
                OutputKind::Output,
                format!(
                    "{} {} {}… {} AN | {}",
                    direction,
                    tx.tag(),
                    short(&tx.hash),
                    tx.amount(),
                    short(counterparty)
                ),
            )
        })
        .collect();
    if lines.is_empty() {
        return vec![CliLine::new(OutputKind::Info, "No confirmed transactions yet.")];
    }
    lines
}

fn validator_lines(sim: &Simulation) -> Vec<CliLine> {
    sim.validators()
        .iter()
        .map(|v| {
            CliLine::new(
                OutputKind::Output,
                format!("- {} ({}) | APR: {}%", v.name, v.public_key, v.apr),
            )
        })
        .collect()
}

fn block_lines(sim: &Simulation) -> Vec<CliLine> {
    sim.recent_blocks()
        .map(|block| {
            let validator = if block.is_genesis() {
                "genesis"
            } else {
                sim.state()
                    .validator(&block.header.validator)
                    .map(|v| v.name.as_str())
                    .unwrap_or("unknown")
            };
            CliLine::new(
                OutputKind::Output,
                format!(
                    "#{} {}… | {} txs | {}",
                    block.index(),
                    short(&block.hash),
                    block.transactions.len(),
                    validator
                ),
            )
        })
        .collect()
}

fn mempool_lines(sim: &Simulation) -> Vec<CliLine> {
    let lines: Vec<CliLine> = sim
        .mempool_transactions()
        .map(|tx| {
            CliLine::new(
                OutputKind::Output,
                format!(
                    "{} {}… {} -> {} ({} AN)",
                    tx.tag(),
                    short(&tx.hash),
                    short(&tx.from),
                    short(tx.to()),
                    tx.amount()
                ),
            )
        })
        .collect();
    if lines.is_empty() {
        return vec![CliLine::new(OutputKind::Info, "Mempool is empty.")];
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::persistence::MemoryWalletStore;
    use std::sync::Arc;

    fn node() -> Node {
        let mut config = Config::default();
        config.simulation.seed = Some(5);
        Node::new(&config, Arc::new(MemoryWalletStore::new())).unwrap()
    }

    async fn run(node: &Node, line: &str) -> Vec<CliLine> {
        match execute(node, line).await {
            CommandResult::Output(lines) => lines,
            CommandResult::Clear => panic!("unexpected clear"),
        }
    }

    #[tokio::test]
    async fn test_help_and_unknown() {
        let node = node();
        let lines = run(&node, "help").await;
        assert_eq!(lines[0], CliLine::new(OutputKind::Input, "> help"));
        assert_eq!(lines[1].kind, OutputKind::Info);
        assert_eq!(lines.len(), 2 + HELP.len());

        let lines = run(&node, "mine").await;
        assert_eq!(lines[1], CliLine::new(OutputKind::Error, "Command not found: mine"));

        assert!(run(&node, "   ").await.is_empty());
        assert_eq!(execute(&node, "clear").await, CommandResult::Clear);
    }

    #[tokio::test]
    async fn test_wallet_flow() {
        let node = node();
        let lines = run(&node, "wallet.info").await;
        assert_eq!(lines[1].kind, OutputKind::Error);
        let lines = run(&node, "wallet.history").await;
        assert_eq!(lines[1].kind, OutputKind::Error);

        run(&node, "wallet.new").await;
        let lines = run(&node, "wallet.history").await;
        assert_eq!(
            lines[1],
            CliLine::new(OutputKind::Info, "No confirmed transactions yet.")
        );

        let lines = run(&node, "wallet.send external-recipient-wallet 250").await;
        assert_eq!(
            lines[1],
            CliLine::new(OutputKind::Success, "Transaction submitted to mempool.")
        );

        let lines = run(&node, "wallet.info").await;
        assert_eq!(lines[2].text, "Balance: 1000.0000 AN");
        assert_eq!(
            lines[3],
            CliLine::new(OutputKind::Info, " (Available: 750.0000 AN considering mempool)")
        );

        let lines = run(&node, "wallet.send external-recipient-wallet 800").await;
        assert_eq!(
            lines[1],
            CliLine::new(
                OutputKind::Error,
                "Error: Insufficient balance (including pending transactions)."
            )
        );

        let lines = run(&node, "wallet.send short 1").await;
        assert_eq!(lines[1].text, "Error: Invalid recipient address.");

        let lines = run(&node, "wallet.send external-recipient-wallet lots").await;
        assert_eq!(lines[1].text, "Error: Please enter a valid amount.");

        let lines = run(&node, "wallet.send only-one-arg").await;
        assert_eq!(lines[1].text, "Usage: wallet.send <address> <amount>");

        let lines = run(&node, "mempool").await;
        assert_eq!(lines.len(), 2);
        assert!(lines[1].text.starts_with("TRANSFER"));
    }

    #[tokio::test]
    async fn test_stake_and_listings() {
        let node = node();
        run(&node, "wallet.new").await;

        let lines = run(&node, "validators.list").await;
        assert_eq!(lines.len(), 2 + 6);
        assert!(lines[2].text.starts_with("- Quantum Leap Validator ("));
        assert!(lines[2].text.ends_with("| APR: 5.5%"));

        let validator = node.read(|sim| sim.validators()[1].public_key.clone()).await;
        let lines = run(&node, &format!("stake {} 100", validator)).await;
        assert_eq!(lines[1].kind, OutputKind::Success);

        let lines = run(&node, "stake nobody-at-all 1").await;
        assert_eq!(lines[1].text, "Error: Validator not found.");

        node.tick_block().await.unwrap();
        let lines = run(&node, "network.stats").await;
        assert_eq!(lines[1].text, "Current Block: 1");
        assert_eq!(lines[2].text, "TPS: 0.33");
        assert_eq!(lines[3].text, "Active Validators: 6");
        assert_eq!(lines[4].text, "Mempool: 0 transactions");

        let lines = run(&node, "blocks.recent").await;
        assert_eq!(lines.len(), 3);
        assert!(lines[1].text.starts_with("#1 "));
        assert!(lines[2].text.ends_with("genesis"));

        let lines = run(&node, "wallet.info").await;
        assert!(lines[3].text.contains("Cosmic Node Solutions"));
        assert_eq!(
            lines[4],
            CliLine::new(
                OutputKind::Info,
                "Total Staked: 100.0000 AN | Unclaimed Rewards: 0.00000000 AN"
            )
        );

        let lines = run(&node, "wallet.history").await;
        assert_eq!(lines.len(), 2);
        assert!(lines[1].text.starts_with("OUT STAKE "));
        assert!(lines[1].text.contains(" 100 AN | "));

        node.tick_rewards().await;
        let lines = run(&node, "rewards.claim").await;
        assert_eq!(lines[1].kind, OutputKind::Success);
    }
}
