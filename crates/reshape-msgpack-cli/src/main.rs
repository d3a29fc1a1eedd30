//! [![CI Status]][workflow] [![MSRV]][repo] [![Latest Version]][crates.io] [![Rust Doc Crate]][docs.rs] [![Rust Doc Main]][docs]
//!
//! [CI Status]: https://img.shields.io/github/actions/workflow/status/juntyr/reshape-msgpack/ci.yml?branch=main
//! [workflow]: https://github.com/juntyr/reshape-msgpack/actions/workflows/ci.yml?query=branch%3Amain
//!
//! [MSRV]: https://img.shields.io/badge/MSRV-1.85.0-blue
//! [repo]: https://github.com/juntyr/reshape-msgpack
//!
//! [Latest Version]: https://img.shields.io/crates/v/reshape-msgpack-cli
//! [crates.io]: https://crates.io/crates/reshape-msgpack-cli
//!
//! [Rust Doc Crate]: https://img.shields.io/docsrs/reshape-msgpack-cli
//! [docs.rs]: https://docs.rs/reshape-msgpack-cli/
//!
//! [Rust Doc Main]: https://img.shields.io/badge/docs-main-blue
//! [docs]: https://juntyr.github.io/reshape-msgpack/reshape_msgpack_cli
//!
//! Command-line converter from channel-first MessagePack array records to
//! channel-last shape and data sequences.
//!
//! ```text
//! reshape-msgpack frame.msgpack --output frame.seq.msgpack
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(name = "reshape-msgpack", version, about)]
struct Args {
    /// Path to the MessagePack file with the `data` and `shape` record
    input: PathBuf,

    /// Path to which the shape and channel-last data are output
    ///
    /// Defaults to the input path with its extension replaced by
    /// `seq.msgpack`.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Maximum level of the logged diagnostics
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    SimpleLogger::new()
        .with_level(args.log_level.into())
        .init()
        .context("failed to install the logger")?;

    let output = args
        .output
        .unwrap_or_else(|| reshape_msgpack::default_output_path(&args.input));

    log::debug!("converting {:?} into {output:?}", args.input);

    reshape_msgpack::convert(&args.input, &output)
        .with_context(|| format!("failed to convert {:?}", args.input))?;

    Ok(())
}
