#![forbid(unsafe_code)]
//! Aetherium Nova node: runs the simulation and an interactive console.

use aetherium_nova::cli::{execute, CliLine, CommandResult, OutputKind, WELCOME};
use aetherium_nova::config::load_config;
use aetherium_nova::node::Node;
use aetherium_nova::persistence::{JsonWalletStore, MemoryWalletStore, WalletStore};
use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Wallet file, overriding the configured path
    #[arg(long)]
    wallet: Option<PathBuf>,
    /// Run the periodic tasks without the console; the wallet is not persisted
    #[arg(long)]
    headless: bool,
}

fn render(line: &CliLine) {
    let text = match line.kind {
        OutputKind::Input => line.text.bright_white().bold(),
        OutputKind::Output => line.text.normal(),
        OutputKind::Error => line.text.red(),
        OutputKind::Success => line.text.bright_green(),
        OutputKind::Info => line.text.bright_cyan(),
    };
    println!("{}", text);
}

async fn render_validators(node: &Node) {
    let rows = node
        .read(|sim| {
            sim.validators()
                .iter()
                .map(|v| (v.name.clone(), v.public_key.clone(), v.total_stake, v.apr))
                .collect::<Vec<_>>()
        })
        .await;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Validator")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Public Key")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Total Stake")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("APR")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
        ]);
    for (name, public_key, total_stake, apr) in rows {
        table.add_row(vec![
            Cell::new(name).fg(TableColor::White),
            Cell::new(public_key).fg(TableColor::Grey),
            Cell::new(format!("{:.2} AN", total_stake)).fg(TableColor::Green),
            Cell::new(format!("{}%", apr)).fg(TableColor::Yellow),
        ]);
    }
    println!("{}", table);
}

fn prompt() -> std::io::Result<()> {
    print!("{} ", "aetherium>".bright_cyan().bold());
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let store: Arc<dyn WalletStore> = if cli.headless {
        Arc::new(MemoryWalletStore::new())
    } else {
        let path = cli.wallet.unwrap_or_else(|| config.wallet.path.clone());
        let store = JsonWalletStore::new(path);
        info!("Wallet file: {}", store.path().display());
        Arc::new(store)
    };

    let node = Node::new(&config, store)?;
    let handle = node.start().await;

    if cli.headless {
        info!("Running headless; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        handle.shutdown().await;
        return Ok(());
    }

    println!("{}", WELCOME.bright_cyan());
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command == "exit" || command == "quit" {
            break;
        }

        match execute(&node, command).await {
            CommandResult::Clear => {
                // ANSI: clear screen, cursor home.
                print!("\x1B[2J\x1B[H");
            }
            CommandResult::Output(output) if command == "validators.list" => {
                if let Some(echo) = output.first() {
                    render(echo);
                }
                render_validators(&node).await;
            }
            CommandResult::Output(output) => output.iter().for_each(render),
        }
        prompt()?;
    }

    handle.shutdown().await;
    Ok(())
}
