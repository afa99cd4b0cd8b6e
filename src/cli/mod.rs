use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use spectradb::formats::DecoderKind;
use spectradb::record::MetadataUpdate;
use spectradb::store::MissingPolicy;

mod config;
mod export;
mod ingest;
mod inspect;
mod remove;

use config::Config;

/// SpectraDB - Spectroscopy measurement decoder and store
#[derive(Parser)]
#[command(name = "spectradb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Database file (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Load settings from a TOML config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Decoder every input file must match. Files with another extension are
/// rejected before they are read.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum InstrumentArg {
    /// FTIR binary `.spa`
    Ftir,
    /// NMR point list `.txt`
    Nmr,
    /// Fluorescence excitation/emission `.csv`
    Fluorescence,
}

impl From<InstrumentArg> for DecoderKind {
    fn from(arg: InstrumentArg) -> Self {
        match arg {
            InstrumentArg::Ftir => DecoderKind::Ftir,
            InstrumentArg::Nmr => DecoderKind::Nmr,
            InstrumentArg::Fluorescence => DecoderKind::Fluorescence,
        }
    }
}

/// Export file format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Apache Parquet with ZSTD compression
    #[default]
    Parquet,
    /// Comma separated values with a header row
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode instrument files and store every sample they contain
    Ingest {
        /// Instrument export files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Only accept files for this decoder instead of detecting it per file
        #[arg(short, long, value_enum)]
        instrument: Option<InstrumentArg>,

        /// Sample name applied to every decoded sample
        #[arg(long)]
        sample_name: Option<String>,

        /// Internal sample code applied to every decoded sample
        #[arg(long)]
        internal_code: Option<String>,

        /// Person who collected the samples
        #[arg(long)]
        collected_by: Option<String>,

        /// Free-text comments applied to every decoded sample
        #[arg(long)]
        comments: Option<String>,

        /// Decode files in parallel (requires the parallel feature)
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },

    /// Show the samples decoded from a file without storing them
    Inspect {
        /// Instrument export file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Reject the file unless it matches this decoder
        #[arg(short, long, value_enum)]
        instrument: Option<InstrumentArg>,
    },

    /// Delete stored measurements by sample identifier
    Remove {
        /// Sample identifiers such as INS_1_4
        #[arg(value_name = "SAMPLE_ID", required = true)]
        sample_ids: Vec<String>,

        /// Fail without deleting anything if an identifier is unknown
        #[arg(long)]
        strict: bool,
    },

    /// Export every stored measurement
    Export {
        /// Output file path
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "parquet", value_enum)]
        format: ExportFormat,

        /// Compression level for ZSTD (1-22, Parquet only)
        #[arg(short = 'c', long)]
        compression_level: Option<i32>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Ingest {
            files,
            instrument,
            sample_name,
            internal_code,
            collected_by,
            comments,
            parallel,
        } => {
            let update = MetadataUpdate {
                sample_name,
                internal_code,
                collected_by: collected_by.or_else(|| config.ingest.collected_by.clone()),
                comments,
            };
            ingest::run(
                config.store_config(cli.db)?,
                files,
                instrument.map(DecoderKind::from),
                update,
                parallel || config.ingest.parallel.unwrap_or(false),
            )
        }
        Commands::Inspect { file, instrument } => {
            inspect::run(file, instrument.map(DecoderKind::from))
        }
        Commands::Remove { sample_ids, strict } => {
            let policy = if strict {
                MissingPolicy::Strict
            } else {
                MissingPolicy::Ignore
            };
            remove::run(config.store_config(cli.db)?, sample_ids, policy)
        }
        Commands::Export {
            output,
            format,
            compression_level,
        } => export::run(
            config.store_config(cli.db)?,
            output,
            format,
            compression_level.or(config.export.compression_level),
        ),
    }
}
