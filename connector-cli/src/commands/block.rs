use anyhow::{Result, bail};
use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use tracing::info;
use xchain_connector_rs::{Block, Driver};

use crate::{Config, commands::connect};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockRange {
    from: u64,
    to: u64,
    proxied_transactions: usize,
    blocks: Vec<Block>,
}

pub async fn run(from: u64, to: u64, only_header: bool, config: Config) -> Result<()> {
    if to < from {
        bail!("invalid block range {from}..={to}");
    }
    info!(
        "fetching blocks {from}..={to}, output will be saved to {:?}",
        config.out_path
    );
    let connection = connect(&config)?;
    let driver = Driver::default();

    let mut blocks = stream::iter(from..=to)
        .map(|number| driver.get_block(number, only_header, &connection))
        .buffer_unordered(4)
        .try_collect::<Vec<_>>()
        .await?;
    blocks.sort_by_key(|block| block.header.number);

    let proxied_transactions = blocks
        .iter()
        .flat_map(|block| &block.transactions_with_detail)
        .filter(|tx| tx.by_proxy)
        .count();
    info!(
        "fetched {} blocks, {proxied_transactions} proxied transactions",
        blocks.len()
    );

    let out_file = std::fs::File::create(&config.out_path)?;
    serde_json::to_writer_pretty(
        out_file,
        &BlockRange {
            from,
            to,
            proxied_transactions,
            blocks,
        },
    )?;
    info!("results saved to {:?}", config.out_path);
    Ok(())
}
