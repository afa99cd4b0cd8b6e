use anyhow::{Context, Result};
use log::info;

use spectradb::store::{MissingPolicy, Store, StoreConfig};

/// Delete stored measurements by sample identifier
pub fn run(
    store_config: StoreConfig,
    sample_ids: Vec<String>,
    policy: MissingPolicy,
) -> Result<()> {
    info!(
        "Removing {} identifiers from {}",
        sample_ids.len(),
        store_config.path.display()
    );

    let store = Store::new(store_config).context("Failed to configure store")?;
    store.open().context("Failed to open store")?;
    let report = store.remove(sample_ids.as_slice(), policy)?;
    store.close().context("Failed to close store")?;

    println!("{}", report);
    Ok(())
}
