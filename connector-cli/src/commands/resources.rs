use anyhow::Result;
use tracing::info;
use xchain_connector_rs::Driver;

use crate::{Config, commands::connect};

pub async fn run(config: Config) -> Result<()> {
    let connection = connect(&config)?;
    let resources = Driver::default().get_resources(&connection).await;
    for resource in &resources {
        info!("{} ({})", resource.name, resource.stub_type);
    }
    let out_file = std::fs::File::create(&config.out_path)?;
    serde_json::to_writer_pretty(out_file, &resources)?;
    info!("{} resources saved to {:?}", resources.len(), config.out_path);
    Ok(())
}
