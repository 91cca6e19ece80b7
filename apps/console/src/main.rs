mod config;

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    Action, ActionError, ControllerEvent, FieldSelector, Gateway, HttpGateway,
    InteractionController, MissingGateway, SessionState,
};
use config::{Settings, WalletKind};
use rust_decimal::Decimal;
use shared::domain::{
    AccountAddress, ComponentAddress, EntityKind, PackageAddress, ResourceAddress,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wallet_integration::{LegacySdkWallet, MissingWallet, ToolkitWallet, WalletConnector};

#[derive(Parser, Debug)]
#[command(name = "gumball", about = "Drive a gumball machine component through a wallet")]
struct Cli {
    /// Config file; defaults to ./gumball.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    gateway_url: Option<String>,
    #[arg(long, global = true)]
    wallet_url: Option<String>,
    #[arg(long, global = true, value_enum)]
    wallet_mode: Option<WalletKind>,
    /// Print manifests instead of submitting them. Actions that sign nothing still run.
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(flatten)]
    seed: SessionSeed,
    #[command(subcommand)]
    command: Command,
}

/// Addresses learned in an earlier run, so single commands can act on them.
#[derive(Args, Debug, Default, Clone)]
struct SessionSeed {
    #[arg(long, global = true)]
    account: Option<String>,
    #[arg(long, global = true)]
    component: Option<String>,
    #[arg(long, global = true)]
    admin_badge: Option<String>,
    #[arg(long, global = true)]
    owner_badge: Option<String>,
}

impl SessionSeed {
    fn into_session(self) -> SessionState {
        let account = self.account.map(AccountAddress::new);
        let component = self.component.map(ComponentAddress::new);
        let admin_badge = self.admin_badge.map(ResourceAddress::new);
        let owner_badge = self.owner_badge.map(ResourceAddress::new);

        if let Some(address) = &account {
            check_kind("account", address.as_str(), address.kind(), EntityKind::Account);
        }
        if let Some(address) = &component {
            check_kind("component", address.as_str(), address.kind(), EntityKind::Component);
        }
        for (flag, badge) in [("admin-badge", &admin_badge), ("owner-badge", &owner_badge)] {
            if let Some(address) = badge {
                check_kind(flag, address.as_str(), address.kind(), EntityKind::Resource);
            }
        }

        SessionState {
            account,
            component,
            admin_badge,
            owner_badge,
            ..SessionState::default()
        }
    }
}

fn check_kind(flag: &str, address: &str, kind: EntityKind, expected: EntityKind) {
    if kind != expected {
        warn!(flag, address, ?kind, ?expected, "console: seeded address has an unexpected prefix");
    }
}

/// One console line, parsed with the same subcommands as the binary.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the wallet for an account.
    Connect,
    /// Instantiate a gumball machine from a published package.
    Instantiate {
        #[arg(long)]
        package: String,
        #[arg(long)]
        flavor: String,
        #[arg(long, default_value = "5")]
        price: Decimal,
    },
    /// Pay for a gumball; the amount defaults to the known price.
    Buy {
        #[arg(long)]
        amount: Option<Decimal>,
    },
    /// Pay an amount of any resource into a component method.
    Sell {
        #[arg(long)]
        method: String,
        #[arg(long)]
        resource: String,
        #[arg(long)]
        amount: Decimal,
    },
    SetPrice {
        price: Decimal,
    },
    WithdrawEarnings,
    MintStaffBadge {
        name: String,
    },
    /// Read the price from component state.
    GetPrice {
        #[arg(long)]
        field_index: Option<usize>,
    },
    /// Show what the session has learned so far.
    Session,
    Manifest {
        #[command(subcommand)]
        command: ManifestCommand,
    },
    /// Interactive console; one command per line.
    Console,
}

#[derive(Subcommand, Debug)]
enum ManifestCommand {
    /// Parse a manifest file and print it normalized.
    Check { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.gateway_url {
        settings.gateway_url = Some(url);
    }
    if let Some(url) = cli.wallet_url {
        settings.wallet_url = Some(url);
    }
    if let Some(mode) = cli.wallet_mode {
        settings.wallet_mode = mode;
    }
    settings.validate()?;

    let mut controller = InteractionController::new(
        build_wallet(&settings),
        build_gateway(&settings),
        settings.controller_settings(),
    )
    .with_session(cli.seed.into_session());
    let mut events = controller.subscribe_events();
    info!(
        gateway = settings.gateway_url.as_deref().unwrap_or("-"),
        wallet = settings.wallet_url.as_deref().unwrap_or("-"),
        mode = ?settings.wallet_mode,
        "console: ready"
    );

    match cli.command {
        Command::Console => run_console(&mut controller, &mut events, &settings, cli.dry_run).await,
        command => run_command(&mut controller, &mut events, &settings, command, cli.dry_run).await,
    }
}

fn build_wallet(settings: &Settings) -> Arc<dyn WalletConnector> {
    match (&settings.wallet_url, settings.wallet_mode) {
        (None, _) => Arc::new(MissingWallet),
        (Some(url), WalletKind::Toolkit) => Arc::new(ToolkitWallet::new(
            url.clone(),
            settings.dapp_definition.clone(),
        )),
        (Some(url), WalletKind::Legacy) => Arc::new(LegacySdkWallet::new(url.clone())),
    }
}

fn build_gateway(settings: &Settings) -> Arc<dyn Gateway> {
    match &settings.gateway_url {
        Some(url) => Arc::new(HttpGateway::new(url.clone())),
        None => Arc::new(MissingGateway),
    }
}

fn to_action(command: &Command, settings: &Settings) -> Option<Action> {
    let action = match command {
        Command::Connect => Action::connect(),
        Command::Instantiate {
            package,
            flavor,
            price,
        } => Action::instantiate_gumball_machine(
            PackageAddress::new(package.clone()),
            *price,
            flavor.clone(),
        ),
        Command::Buy { amount } => Action::buy_gumball(*amount),
        Command::Sell {
            method,
            resource,
            amount,
        } => Action::Invoke {
            method: method.clone(),
            resource: Some(ResourceAddress::new(resource.clone())),
            amount: Some(*amount),
        },
        Command::SetPrice { price } => Action::set_price(*price),
        Command::WithdrawEarnings => Action::withdraw_earnings(),
        Command::MintStaffBadge { name } => Action::mint_staff_badge(name.clone()),
        Command::GetPrice { field_index } => Action::get_price(match field_index {
            Some(index) => FieldSelector::Index(*index),
            None => FieldSelector::Named(settings.price_field.clone()),
        }),
        Command::Session | Command::Manifest { .. } | Command::Console => return None,
    };
    Some(action)
}

async fn run_command(
    controller: &mut InteractionController,
    events: &mut broadcast::Receiver<ControllerEvent>,
    settings: &Settings,
    command: Command,
    dry_run: bool,
) -> Result<()> {
    match &command {
        Command::Session => {
            for (label, value) in controller.session().describe() {
                println!("{label:>14}: {value}");
            }
            return Ok(());
        }
        Command::Manifest {
            command: ManifestCommand::Check { file },
        } => return check_manifest(file).await,
        Command::Console => {
            println!("already in the console");
            return Ok(());
        }
        _ => {}
    }

    let Some(action) = to_action(&command, settings) else {
        return Ok(());
    };

    let label = action.label();
    let result = run_action(controller, action, dry_run).await;
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
    if let Some(text) = result.with_context(|| format!("{label} failed"))? {
        print!("{text}");
    }
    Ok(())
}

/// Returns the manifest text instead of submitting when `dry_run` is set.
/// Connect and queries sign nothing, so they always run.
async fn run_action(
    controller: &mut InteractionController,
    action: Action,
    dry_run: bool,
) -> Result<Option<String>, ActionError> {
    if dry_run {
        if let Some(text) = controller.preview(&action)? {
            return Ok(Some(text));
        }
    }
    controller.dispatch(action).await?;
    Ok(None)
}

fn parse_console_line(line: &str) -> Result<Command> {
    let words = shell_words::split(line).context("could not split console line")?;
    Ok(ConsoleLine::try_parse_from(words)?.command)
}

async fn run_console(
    controller: &mut InteractionController,
    events: &mut broadcast::Receiver<ControllerEvent>,
    settings: &Settings,
    dry_run: bool,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("gumball> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let command = match parse_console_line(line) {
            Ok(command) => command,
            Err(err) => {
                match err.downcast_ref::<clap::Error>() {
                    Some(usage) => {
                        let _ = usage.print();
                    }
                    None => println!("error: {err:#}"),
                }
                continue;
            }
        };
        if let Err(err) = run_command(controller, events, settings, command, dry_run).await {
            println!("error: {err:#}");
        }
    }
    Ok(())
}

async fn check_manifest(file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read '{}'", file.display()))?;
    let parsed = manifest::parse_manifest(&raw)
        .with_context(|| format!("'{}' is not a valid manifest", file.display()))?;
    println!(
        "{}: {} instruction(s)",
        file.display(),
        parsed.instructions().len()
    );
    print!("{parsed}");
    Ok(())
}

fn print_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::AccountConnected { address, label } => {
            println!("connected account {address} ({label})");
        }
        ControllerEvent::ComponentInstantiated {
            intent_hash,
            addresses,
        } => {
            println!("instantiated in {intent_hash}");
            println!("  component     {}", addresses.component);
            println!("  admin badge   {}", addresses.admin_badge);
            println!("  owner badge   {}", addresses.owner_badge);
            println!("  item resource {}", addresses.item_resource);
        }
        ControllerEvent::TransactionCommitted {
            action,
            intent_hash,
            status,
        } => println!("{action}: {intent_hash} {status:?}"),
        ControllerEvent::QueryAnswered { field, value } => println!("{field} = {value}"),
        // reported through the returned error
        ControllerEvent::ActionFailed { .. } => {}
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
