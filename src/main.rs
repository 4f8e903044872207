mod gui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bitpiper::{compare, compress_file, decompress_file, Codec, Config, DEFAULT_DEPTH};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bitpiper", about = "CTW + arithmetic coding file compressor")]
struct Cli {
    /// Opens the GUI when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress a file into a .bpc container.
    Compress {
        input: PathBuf,
        /// Defaults to `<input>.bpc`.
        output: Option<PathBuf>,
        /// ctw or huffman.
        #[arg(long, default_value_t = Codec::Ctw)]
        codec: Codec,
        /// Context depth for CTW.
        #[arg(long, default_value_t = DEFAULT_DEPTH)]
        depth: u8,
    },
    /// Restore a file from a .bpc container.
    Decompress { input: PathBuf, output: PathBuf },
    /// Report sizes for Huffman and CTW at several depths.
    Compare {
        input: PathBuf,
        #[arg(long, value_delimiter = ',', default_values_t = [1u8, 2, 4, 8])]
        depths: Vec<u8>,
    },
    /// Open the desktop front-end.
    Gui,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Compress {
            input,
            output,
            codec,
            depth,
        }) => run_compress(input, output, Config { codec, depth })?,
        Some(Commands::Decompress { input, output }) => {
            decompress_file(&input, &output)
                .with_context(|| format!("failed to decompress {}", input.display()))?;
        }
        Some(Commands::Compare { input, depths }) => run_compare(input, &depths)?,
        Some(Commands::Gui) | None => gui::run()?,
    }

    Ok(())
}

fn run_compress(input: PathBuf, output: Option<PathBuf>, config: Config) -> Result<()> {
    let output = output.unwrap_or_else(|| default_output(&input));
    let report = compress_file(&input, &output, &config)
        .with_context(|| format!("failed to compress {}", input.display()))?;
    println!("{report}");
    Ok(())
}

fn run_compare(input: PathBuf, depths: &[u8]) -> Result<()> {
    let data = std::fs::read(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let reports = compare(&data, depths).context("comparison failed")?;
    for report in reports {
        println!("{report}");
    }
    Ok(())
}

pub(crate) fn default_output(input: &std::path::Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".bpc");
    PathBuf::from(name)
}
