mod commands;

use std::{env, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xchain_connector_rs::ConnectionConfig;

use crate::commands::{block, encode, resources, verify};

pub struct Config {
    pub out_path: PathBuf,
    pub connection: ConnectionConfig,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch blocks and rebuild their transactions
    Block {
        /// First block number
        from: u64,
        /// Last block number, defaults to `from`
        #[arg(long)]
        to: Option<u64>,
        #[arg(long)]
        only_header: bool,
    },
    /// Build the request envelope for a contract call
    Encode(encode::EncodeArgs),
    /// Check a serialized request against its own method and arguments
    Verify {
        /// JSON file holding the request
        file: PathBuf,
    },
    /// List the resources registered on the proxy contract
    Resources,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "xchain_connector_cli=info,xchain_connector_rs=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let out_path = env::var("OUT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./out.json"));

    let cli = Cli::parse();

    // verify works offline, everything else needs a connection
    if let Commands::Verify { file } = &cli.command {
        return verify::run(file);
    }
    let config = Config {
        out_path,
        connection: ConnectionConfig::from_env()?,
    };
    match cli.command {
        Commands::Block {
            from,
            to,
            only_header,
        } => block::run(from, to.unwrap_or(from), only_header, config).await,
        Commands::Encode(args) => encode::run(args, config),
        Commands::Resources => resources::run(config).await,
        Commands::Verify { .. } => Ok(()),
    }
}
