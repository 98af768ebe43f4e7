//! Command-line client for the encrypted purchase manager.
//!
//! Reads a TOML config (chain endpoint, contract address, relayer URL),
//! connects over HTTP RPC, and exposes the purchase operations: submit,
//! claim, list, and balance decryption.

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::error;

use fhe_purchase_client::adapters::ethereum_rpc::EthereumRpc;
use fhe_purchase_client::adapters::relayer::RelayerClient;
use fhe_purchase_client::config::{ClientConfig, ConfigError};
use fhe_purchase_client::workflow::{PurchaseWorkflow, WorkflowError};

#[derive(Parser)]
#[command(name = "purchase-cli")]
#[command(about = "Client for the FHE purchase manager contract", long_about = None)]
struct Cli {
    /// Path to the client configuration file.
    #[arg(long, default_value = "client.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the connected account's address.
    Address,

    /// Submit an encrypted purchase.
    Buy {
        /// Purchase amount (positive integer).
        #[arg(long)]
        value: String,
        /// Recipient address (0x-prefixed, 40 hex characters).
        #[arg(long)]
        recipient: String,
    },

    /// Claim purchases by id.
    Claim {
        /// Comma-separated purchase ids, e.g. "0,2,5".
        #[arg(long)]
        ids: String,
    },

    /// List all purchases with decrypted fields where permitted.
    List,

    /// Decrypt the connected account's balance.
    DecryptBalance,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("chain error: {0}")]
    Chain(#[from] fhe_purchase_client::ports::chain::ChainError),

    #[error("invalid id list: {0}")]
    InvalidIds(String),
}

fn parse_ids(raw: &str) -> Result<Vec<u64>, CliError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| CliError::InvalidIds(format!("'{s}' is not a purchase id")))
        })
        .collect()
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::load(&cli.config)?;

    let signer: alloy::signers::local::PrivateKeySigner = config
        .chain
        .private_key
        .parse()
        .map_err(|e| ConfigError::Validation(format!("chain.private_key: {e}")))?;

    let chain = EthereumRpc::new(
        &config.chain.rpc_url,
        &config.chain.private_key,
        config.contract.address,
    )
    .await?;
    let fhe = RelayerClient::new(&config.relayer.url);

    let workflow = PurchaseWorkflow::new(
        chain,
        fhe,
        signer,
        config.contract.address,
        config.chain.chain_id,
    )
    .with_decrypt_window_days(config.decrypt.duration_days);

    match cli.command {
        Commands::Address => {
            println!("{}", workflow.account());
        }
        Commands::Buy { value, recipient } => {
            let outcome = workflow.submit_purchase(&value, &recipient).await?;
            println!("purchase confirmed in tx {}", outcome.receipt.tx_hash);
            println!("total purchases: {}", outcome.purchases.len());
        }
        Commands::Claim { ids } => {
            let ids = parse_ids(&ids)?;
            let receipt = workflow.claim(&ids).await?;
            println!("claim confirmed in tx {}", receipt.tx_hash);
        }
        Commands::List => {
            let purchases = workflow.list_purchases().await?;
            let purchases = workflow.decrypt_purchases(purchases).await?;
            if purchases.is_empty() {
                println!("no purchases");
            }
            for p in &purchases {
                let remaining = p.remaining_plain.as_deref().unwrap_or("<encrypted>");
                let recipient = p
                    .recipient_plain
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "<encrypted>".to_string());
                println!(
                    "#{} buyer={} remaining={} recipient={}",
                    p.id, p.buyer, remaining, recipient
                );
            }
        }
        Commands::DecryptBalance => {
            let handle = workflow.encrypted_balance().await?;
            let clear = workflow.decrypt_balance().await?;
            println!("encrypted balance: {handle}");
            println!("clear balance    : {clear}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}
