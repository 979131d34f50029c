use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;
use xchain_connector_rs::{Driver, Request, RequestVerification};

pub fn run(file: &Path) -> Result<()> {
    let data = std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
    let request: Request = serde_json::from_slice(&data).context("invalid request JSON")?;
    match Driver::default().decode_transaction_request(&request) {
        RequestVerification::NotTransaction => {
            info!("request type {} carries no transaction", request.request_type)
        }
        RequestVerification::Trusted(transaction_request) => info!(
            "trusted: {} with {} args",
            transaction_request.method,
            transaction_request.args.len()
        ),
        RequestVerification::Untrusted => bail!("encoded input does not match its request"),
    }
    Ok(())
}
