use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use spectradb::measurement_writer::{MeasurementWriter, MeasurementWriterConfig};
use spectradb::projection::{project, write_csv};
use spectradb::schema::KEY_SOURCE_TABLE;
use spectradb::store::{Store, StoreConfig};

use super::ExportFormat;

/// Export the stored measurements to Parquet or CSV
pub fn run(
    store_config: StoreConfig,
    output: PathBuf,
    format: ExportFormat,
    compression_level: Option<i32>,
) -> Result<()> {
    let table_name = store_config.table_name.clone();

    let store = Store::new(store_config).context("Failed to configure store")?;
    store.open().context("Failed to open store")?;
    let rows = store.snapshot().context("Failed to read measurements")?;
    store.close().context("Failed to close store")?;

    info!("Exporting {} measurements to {}", rows.len(), output.display());

    match format {
        ExportFormat::Parquet => {
            let mut config =
                MeasurementWriterConfig::default().with_footer_entry(KEY_SOURCE_TABLE, table_name);
            if let Some(level) = compression_level {
                config.compression_level = level;
            }
            let mut writer = MeasurementWriter::new_file(&output, config)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            writer.write_rows(&rows)?;
            let stats = writer.finish()?;
            println!("{}", stats);
        }
        ExportFormat::Csv => {
            let file = File::create(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let batch = project(&rows)?;
            write_csv(&batch, BufWriter::new(file))?;
            println!("Wrote {} measurements", batch.num_rows());
        }
    }

    Ok(())
}
