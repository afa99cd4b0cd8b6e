use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use spectradb::formats::{decode_many, decode_path, DecodeError, DecoderKind};
use spectradb::record::{MetadataUpdate, SampleSet};
use spectradb::store::{AddReport, Store, StoreConfig};

/// Decode files and store every sample they contain
pub fn run(
    store_config: StoreConfig,
    files: Vec<PathBuf>,
    instrument: Option<DecoderKind>,
    update: MetadataUpdate,
    parallel: bool,
) -> Result<()> {
    info!("SpectraDB Ingest");
    info!("================");
    info!("Database: {}", store_config.path.display());
    info!("Files: {}", files.len());

    let start = Instant::now();
    let decoded = decode_files(&files, instrument, parallel);

    let store = Store::new(store_config).context("Failed to configure store")?;
    store.open().context("Failed to open store")?;

    let mut total = AddReport::default();
    let mut offset = 0;
    let mut failures = 0;

    for (path, result) in files.iter().zip(decoded) {
        let mut samples = match result {
            Ok(samples) => samples,
            Err(e) => {
                error!("{}: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };
        info!("{}: {} samples", path.display(), samples.len());

        if !update.is_empty() {
            samples
                .amend_all(&update)
                .with_context(|| format!("Failed to annotate {}", path.display()))?;
        }

        let report = store
            .add(samples.records_mut())
            .with_context(|| format!("Failed to store {}", path.display()))?;
        total.merge(report, offset);
        offset += samples.len();
    }

    store.close().context("Failed to close store")?;

    #[cfg(feature = "colorized_output")]
    {
        println!("{}", total.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", total);
    }

    info!("Finished in {:.2}s", start.elapsed().as_secs_f64());

    if failures > 0 {
        bail!("{} of {} files could not be decoded", failures, files.len());
    }
    Ok(())
}

fn decode_files(
    files: &[PathBuf],
    instrument: Option<DecoderKind>,
    parallel: bool,
) -> Vec<Result<SampleSet, DecodeError>> {
    if let Some(kind) = instrument {
        return files.iter().map(|path| kind.decode(path)).collect();
    }

    if parallel {
        if cfg!(not(feature = "parallel")) {
            warn!("Parallel decoding requested but the parallel feature is disabled");
        }
        decode_many(files)
    } else {
        files.iter().map(|path| decode_path(path)).collect()
    }
}
