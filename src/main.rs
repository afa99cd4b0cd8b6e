//! # SpectraDB
//!
//! A command-line tool for decoding laboratory spectrometer exports and
//! keeping them in a deduplicating SQLite database.
//!
//! ## Usage
//!
//! ```bash
//! # Decode and store a fluorescence plate export
//! spectradb --db lab.sqlite ingest plate.csv --collected-by jdoe
//!
//! # Preview the samples of a file without storing them
//! spectradb inspect plate.csv
//!
//! # Delete stored measurements
//! spectradb --db lab.sqlite remove INS_3_4 INS_3_5
//!
//! # Export the whole table
//! spectradb --db lab.sqlite export measurements.parquet
//! ```

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
