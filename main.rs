use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use keepkey_signer::config::{DeviceType, LinkConfig, SessionConfig, DEFAULT_COIN_NAME};
use keepkey_signer::transport::udp::DEFAULT_EMULATOR_ADDR;
use keepkey_signer::{open_link, sign_transaction, SignInfo, SignedTransaction, TransactionTable};

#[derive(Debug, Parser)]
#[command(name = "kksign", version, about = "KeepKey signing CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask the device to sign a Bitcoin transaction using the provided information.
    BtcSignTx(BtcSignTxArgs),
}

#[derive(Debug, Args)]
struct BtcSignTxArgs {
    /// Path to JSON file with all necessary information for signing process.
    #[arg(long)]
    file: PathBuf,

    /// Device type to send instructions to, hardware wallet (USB) or emulator.
    #[arg(long, value_enum, ignore_case = true, env = "DEVICE_TYPE")]
    device_type: DeviceType,

    /// Coin name; overrides `coinName` from the file
    #[arg(long)]
    coin: Option<String>,

    /// Emulator UDP address
    #[arg(long, env = "KEEPKEY_EMULATOR_ADDR", default_value = DEFAULT_EMULATOR_ADDR)]
    emulator_addr: String,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignReport<'a> {
    #[serde(flatten)]
    signed: &'a SignedTransaction,
    txid: Option<String>,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the result
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::BtcSignTx(args) => btc_sign_tx(args),
    }
}

fn btc_sign_tx(args: BtcSignTxArgs) -> Result<()> {
    let _span = tracing::info_span!("btc_sign_tx", file = %args.file.display()).entered();

    let info = SignInfo::load(&args.file)
        .with_context(|| format!("Failed to read signing request {}", args.file.display()))?;
    let table = TransactionTable::from_sign_info(&info).context("Invalid signing request")?;

    let config = SessionConfig {
        coin_name: args
            .coin
            .or(info.coin_name)
            .unwrap_or_else(|| DEFAULT_COIN_NAME.to_string()),
    };
    let link_config = LinkConfig {
        device_type: args.device_type,
        emulator_addr: args.emulator_addr,
    };

    info!("🚀 Signing with {} device", link_config.device_type);
    let mut link = open_link(&link_config).context("Failed to open device")?;
    let signed = sign_transaction(&mut link, &table, config)?;

    if args.json {
        let report = SignReport {
            signed: &signed,
            txid: signed.txid().ok().map(|txid| txid.to_string()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Signed Transaction:\n{}", signed.to_hex());
    }
    Ok(())
}
