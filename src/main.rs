//! `stellar-ballot` command-line front end.
//!
//! ```text
//!   CLI args + config file
//!       │
//!       ▼
//!   VotingClient ──▶ TransactionWorkflow ──┬──▶ StellarRpcClient (Horizon, Soroban RPC)
//!                                          └──▶ WalletBridge (external signer)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use stellar_ballot::config::{load_or_default, BallotConfig};
use stellar_ballot::observability::logging::init_logging;
use stellar_ballot::stellar::{StellarRpcClient, WalletBridge};
use stellar_ballot::workflow::{ErrorKind, TransactionWorkflow, WorkflowError};
use stellar_ballot::VotingClient;

#[derive(Parser)]
#[command(name = "stellar-ballot")]
#[command(about = "Vote on a Soroban ballot contract", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Built-in testnet defaults otherwise.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the ballot's candidates
    Candidates,
    /// Show the current vote count for every candidate
    Tally {
        /// Account used as the simulation source
        #[arg(long)]
        source: String,
    },
    /// Check whether an address has already voted
    HasVoted { address: String },
    /// Cast a vote (requires wallet approval)
    Vote {
        #[arg(long)]
        candidate: u32,
        /// Voting account; defaults to the wallet's address
        #[arg(long)]
        voter: Option<String>,
    },
    /// Show the wallet bridge connection
    Wallet,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.observability);

    tracing::debug!(
        horizon_url = %config.network.horizon_url,
        contract_id = %config.network.contract_id,
        "Configuration loaded"
    );

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<WorkflowError>() {
                Some(wf) => {
                    eprintln!("Error: {}", wf);
                    if let Some(hint) = hint_for(wf) {
                        eprintln!("Hint: {}", hint);
                    }
                }
                None => eprintln!("Error: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: BallotConfig) -> CliResult {
    let bridge = WalletBridge::new(&config.signer)?;

    match command {
        Commands::Candidates => {
            for c in config.candidates.iter() {
                println!("{:>3}  {:<12} {}", c.id, c.name, c.description);
            }
        }
        Commands::Tally { source } => {
            let tally = voting_client(&config, &bridge)?.tally(&source).await;
            println!("{}", serde_json::to_string_pretty(&tally)?);
        }
        Commands::HasVoted { address } => {
            let voted = voting_client(&config, &bridge)?.has_voted(&address).await?;
            println!("{}", voted);
        }
        Commands::Vote { candidate, voter } => {
            let status = bridge.status().await?;
            if !status.connected {
                return Err("wallet is not connected".into());
            }
            status.ensure_network(&config.network.passphrase)?;

            let voter = match voter {
                Some(v) => v,
                None => bridge.address().await?.to_string(),
            };
            let outcome = voting_client(&config, &bridge)?.vote(&voter, candidate).await?;
            println!(
                "{} {}",
                outcome.status,
                outcome.hash.as_deref().unwrap_or("-")
            );
            if !outcome.is_success() {
                return Err(format!("vote finished with status {}", outcome.status).into());
            }
        }
        Commands::Wallet => {
            let status = bridge.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

fn voting_client(config: &BallotConfig, bridge: &WalletBridge) -> Result<VotingClient, Box<dyn std::error::Error>> {
    let rpc = StellarRpcClient::new(&config.network)?;
    let workflow = TransactionWorkflow::new(
        Arc::new(rpc),
        Arc::new(bridge.clone()),
        config.network.clone(),
        config.workflow.clone(),
    );
    Ok(VotingClient::new(workflow, config.candidates.clone()))
}

/// Human-readable hint for well-known failures.
fn hint_for(err: &WorkflowError) -> Option<&'static str> {
    match err.kind() {
        ErrorKind::ProcessingTimeout { .. } | ErrorKind::ConfirmationTimeout { .. } => {
            Some("the network did not confirm in time; check the tally before voting again")
        }
        ErrorKind::Signing(_) => Some("approve the request in your wallet and try again"),
        ErrorKind::Simulation(message) if err.function == "vote" && is_contract_trap(message) => {
            Some("the contract rejected the vote; this address may have already voted")
        }
        ErrorKind::Submission { .. } if is_underfunded(&err.to_string()) => {
            Some("insufficient balance; fund the account from the testnet friendbot")
        }
        ErrorKind::Validation(_) => Some("check the address and candidate id"),
        _ => None,
    }
}

/// A contract `panic!` surfaces from simulation as a VM trap, not as its message.
fn is_contract_trap(message: &str) -> bool {
    message.contains("HostError")
        && ["WasmVm", "InvalidAction", "UnreachableCodeReached"]
            .iter()
            .any(|marker| message.contains(marker))
}

fn is_underfunded(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("underfunded") || text.contains("insufficient")
}
