//! Purchase bridge sandbox: drive the bridge against an in-process store.

mod validator;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use iap_bridge::{BridgeConfig, StoreBridge, TransactionEvent};
use iap_store::ReceiptValidator;
use iap_store_sandbox::{SandboxConfig, SandboxStore};
use iap_types::{ItemType, Purchase, Timestamp};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::validator::{LocalValidator, ValidateMode};

#[derive(Parser)]
#[command(name = "iap-sandbox", about = "Run purchase bridge flows against a sandbox store")]
struct Cli {
    /// Path to a TOML file with `[bridge]` and `[sandbox]` tables. Without
    /// one, a demo catalog is used. CLI flags and env vars override it.
    #[arg(long, env = "IAP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "IAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "IAP_LOG_FORMAT")]
    log_format: Option<String>,

    /// Sandbox notification delay in milliseconds.
    #[arg(long, env = "IAP_DELAY_MS")]
    delay_ms: Option<u64>,

    /// Print Prometheus metrics after the command.
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Look up products in the catalog.
    Products {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long, default_value = "non_consumable")]
        item_type: ItemType,
    },
    /// Buy a product.
    Purchase {
        product: String,
        #[arg(long, default_value = "non_consumable")]
        item_type: ItemType,
        /// Developer payload carried with the payment.
        #[arg(long)]
        payload: Option<String>,
        #[arg(long, value_enum)]
        validate: Option<ValidateMode>,
    },
    /// Restore everything the user owns.
    Restore {
        #[arg(long, default_value = "non_consumable")]
        item_type: ItemType,
        #[arg(long, value_enum)]
        validate: Option<ValidateMode>,
    },
    /// Buy a consumable, then try to consume it.
    Consume { product: String },
}

#[derive(Deserialize)]
struct FileConfig {
    #[serde(default)]
    bridge: BridgeConfig,
    sandbox: Option<SandboxConfig>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<(BridgeConfig, SandboxConfig)> {
    let Some(path) = path else {
        return Ok((BridgeConfig::default(), SandboxConfig::demo()));
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let file: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    let sandbox = file.sandbox.unwrap_or_else(SandboxConfig::demo);
    Ok((file.bridge, sandbox))
}

fn print_purchase(purchase: &Purchase, now: Timestamp) {
    println!(
        "{}\t{}\t{}\t{}{}",
        purchase.product_id,
        purchase.id,
        purchase.state.as_str(),
        iap_utils::format_age(purchase.purchased_at, now),
        purchase
            .developer_payload
            .as_deref()
            .map(|p| format!("\tpayload={p}"))
            .unwrap_or_default(),
    );
}

async fn run(bridge: &StoreBridge, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Products { ids, item_type } => {
            let products = bridge.fetch_products(item_type, ids).await?;
            for product in products {
                println!(
                    "{}\t{}\t{}",
                    product.id, product.formatted_price, product.title
                );
            }
        }
        Command::Purchase {
            product,
            item_type,
            payload,
            validate,
        } => {
            let validator = validate.map(LocalValidator::new);
            let result = bridge
                .purchase(
                    product.as_str(),
                    item_type,
                    payload,
                    validator.as_ref().map(|v| v as &dyn ReceiptValidator),
                )
                .await
                .with_context(|| format!("purchase of {product} failed"))?;
            match result {
                Some(purchase) => print_purchase(&purchase, Timestamp::now()),
                None => println!("{product}\treceipt rejected"),
            }
        }
        Command::Restore {
            item_type,
            validate,
        } => {
            let validator = validate.map(LocalValidator::new);
            let restored = bridge
                .get_purchases(
                    item_type,
                    validator.as_ref().map(|v| v as &dyn ReceiptValidator),
                )
                .await
                .context("restore failed")?;
            match restored {
                Some(purchases) if purchases.is_empty() => println!("nothing to restore"),
                Some(purchases) => {
                    let now = Timestamp::now();
                    for purchase in &purchases {
                        print_purchase(purchase, now);
                    }
                }
                None => println!("restore receipt rejected"),
            }
        }
        Command::Consume { product } => {
            let purchase = bridge
                .purchase(product.as_str(), ItemType::Consumable, None, None)
                .await?
                .context("purchase returned no record")?;
            print_purchase(&purchase, Timestamp::now());
            if let Err(e) = bridge.consume_purchase(&purchase).await {
                println!("{product}\tnot consumed: {e}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut bridge_config, mut sandbox_config) = load_config(cli.config.as_ref())?;
    if let Some(level) = cli.log_level {
        bridge_config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        bridge_config.log_format = format;
    }
    if let Some(delay) = cli.delay_ms {
        sandbox_config.delivery_delay_ms = delay;
    }
    bridge_config.validate()?;

    iap_bridge::init_logging(bridge_config.parsed_log_format()?, &bridge_config.log_level);
    tracing::info!(
        products = sandbox_config.products.len(),
        owned = sandbox_config.owned.len(),
        delay_ms = sandbox_config.delivery_delay_ms,
        "starting sandbox store"
    );

    let store = Arc::new(SandboxStore::new(sandbox_config)?);
    let bridge = StoreBridge::new(store.clone(), store.clone(), store.clone(), bridge_config);
    bridge.connect()?;

    let mut updates = bridge.subscribe_updates();
    let watcher = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(TransactionEvent::Settled(settlement)) => tracing::debug!(
                    product = %settlement.product_id,
                    success = settlement.success,
                    "transaction settled"
                ),
                Ok(TransactionEvent::RestoreFinished(outcome)) => {
                    tracing::debug!(?outcome, "restore finished")
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "update watcher lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = run(&bridge, cli.command).await;

    if cli.metrics {
        print!("{}", bridge.metrics().encode());
    }
    tracing::debug!(unfinished = store.unfinished_count(), "shutting down");
    bridge.dispose();
    watcher.abort();
    result
}
