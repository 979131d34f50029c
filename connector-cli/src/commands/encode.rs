use std::env;

use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use xchain_connector_rs::{
    Account, Driver, Path, SubType, TransactionContext, TransactionRequest,
    constants::{TRANSACTION_UNIQUE_ID, XA_TRANSACTION_ID, XA_TRANSACTION_SEQ},
};

use crate::{Config, commands::properties};

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Resource path, `zone.chain.resource`
    path: Path,
    method: String,
    args: Vec<String>,
    /// Build a transaction instead of a call
    #[arg(long)]
    send: bool,
    /// Address the contract directly instead of through the proxy
    #[arg(long)]
    native: bool,
    #[arg(long)]
    xa_transaction_id: Option<String>,
    #[arg(long, default_value_t = 0)]
    xa_transaction_seq: u64,
    #[arg(long)]
    unique_id: Option<String>,
}

pub fn run(args: EncodeArgs, config: Config) -> Result<()> {
    let properties = properties(&config)?;
    let sub_type = match (args.send, args.native) {
        (true, false) => SubType::SendByProxy,
        (false, false) => SubType::CallByProxy,
        (true, true) => SubType::SendNative,
        (false, true) => SubType::CallNative,
    };
    let account = if args.send {
        let key = env::var("SIGNER_KEY").context("SIGNER_KEY must be set to build a transaction")?;
        let signer: PrivateKeySigner = key.parse().context("SIGNER_KEY is not a valid key")?;
        Some(Account::public_key("cli", signer))
    } else {
        None
    };

    let mut request = TransactionRequest::new(args.method, args.args);
    if let Some(xa_transaction_id) = args.xa_transaction_id {
        request = request
            .with_option(XA_TRANSACTION_ID, xa_transaction_id)
            .with_option(XA_TRANSACTION_SEQ, args.xa_transaction_seq);
    }
    if let Some(unique_id) = args.unique_id {
        request = request.with_option(TRANSACTION_UNIQUE_ID, unique_id);
    }

    let context = TransactionContext::new(args.path, account);
    let prepared = Driver::default().prepare(&context, &request, sub_type, &properties)?;
    info!(
        "{sub_type} {} at {}, method id {}",
        request.method, prepared.params.contract_address, prepared.params.contract_method_id
    );
    let out_file = std::fs::File::create(&config.out_path)?;
    serde_json::to_writer_pretty(out_file, &prepared.params)?;
    info!("envelope saved to {:?}", config.out_path);
    Ok(())
}
