use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod emit;
pub mod monitor;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Demultiplex a stream and print log lines and decoded diagnostics.
    Monitor(MonitorArgs),
    /// Write log lines and diagnostic frames in wire format to stdout.
    Emit(EmitArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Emit(args) => emit::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Stream source: a device node, a capture file, or `-` for stdin.
    pub input: String,
    /// Bytes requested per read.
    #[arg(long, default_value_t = 4096, env = "DIAGMUX_CHUNK_SIZE")]
    pub chunk_size: usize,
    /// Treat frame lengths above this as spurious sentinels.
    #[arg(long, value_name = "BYTES", env = "DIAGMUX_MAX_PAYLOAD")]
    pub max_payload: Option<usize>,
    /// Decimal places kept for floats in diagnostic values.
    #[arg(long, default_value_t = 3)]
    pub precision: u32,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Print only log lines.
    #[arg(long, conflicts_with = "frames_only")]
    pub lines_only: bool,
    /// Print only diagnostic frames.
    #[arg(long, conflicts_with = "lines_only")]
    pub frames_only: bool,
}

#[derive(Args, Debug)]
pub struct EmitArgs {
    /// Log line to write (repeatable; written first, in order).
    #[arg(long = "line", value_name = "TEXT")]
    pub lines: Vec<String>,
    /// JSON document to write as a MessagePack diagnostic frame (repeatable).
    #[arg(long = "json", value_name = "JSON")]
    pub json: Vec<String>,
    /// Raw string to write as an undecoded frame payload (repeatable).
    #[arg(long = "raw-frame", value_name = "TEXT")]
    pub raw_frames: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
