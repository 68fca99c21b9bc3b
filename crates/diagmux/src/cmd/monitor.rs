use std::fs::File;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use diagmux_frame::{Event, FrameConfig, StreamReader};
use diagmux_payload::{DecoderConfig, DiagValue, PayloadDecoder, PayloadError};

use crate::cmd::MonitorArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_diagnostic, print_line, OutputFormat};

/// What to do with one demultiplexed event.
enum Rendered<'a> {
    Line(&'a str),
    Diagnostic { value: DiagValue, size: usize },
    Filtered,
    Undecodable { size: usize, error: PayloadError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventFilter {
    All,
    LinesOnly,
    FramesOnly,
}

impl EventFilter {
    fn from_args(args: &MonitorArgs) -> Self {
        if args.lines_only {
            Self::LinesOnly
        } else if args.frames_only {
            Self::FramesOnly
        } else {
            Self::All
        }
    }
}

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    if args.chunk_size == 0 {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }

    let source = open_input(&args.input)?;
    let config = FrameConfig {
        read_chunk_size: args.chunk_size,
        max_payload_size: args.max_payload,
        ..FrameConfig::default()
    };
    let decoder = PayloadDecoder::with_config(DecoderConfig {
        float_precision: args.precision,
        ..DecoderConfig::default()
    });
    let filter = EventFilter::from_args(&args);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    tracing::info!(input = %args.input, chunk_size = args.chunk_size, "monitoring stream");

    let mut reader = StreamReader::with_config(source, config);
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let event = match reader.read_event() {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };

        match render(&event, filter, &decoder) {
            Rendered::Line(line) => print_line(line, format),
            Rendered::Diagnostic { value, size } => print_diagnostic(&value, size, format),
            Rendered::Filtered => continue,
            Rendered::Undecodable { size, error } => {
                tracing::warn!(size, error = %error, "dropping undecodable diagnostic frame");
                continue;
            }
        }

        printed = printed.saturating_add(1);
        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    let stats = reader.stats();
    tracing::info!(
        bytes = stats.bytes_ingested,
        lines = stats.lines,
        frames = stats.frames,
        rejected_frames = stats.rejected_frames,
        printed,
        "stream finished"
    );

    Ok(SUCCESS)
}

fn render<'a>(event: &'a Event, filter: EventFilter, decoder: &PayloadDecoder) -> Rendered<'a> {
    match event {
        Event::LogLine(_) if filter == EventFilter::FramesOnly => Rendered::Filtered,
        Event::DiagnosticFrame(_) if filter == EventFilter::LinesOnly => Rendered::Filtered,
        Event::LogLine(line) => Rendered::Line(line),
        Event::DiagnosticFrame(payload) => match decoder.decode_rounded(payload) {
            Ok(value) => Rendered::Diagnostic {
                value,
                size: payload.len(),
            },
            Err(error) => Rendered::Undecodable {
                size: payload.len(),
                error,
            },
        },
    }
}

fn open_input(input: &str) -> CliResult<Box<dyn Read>> {
    if input == "-" {
        return Ok(Box::new(std::io::stdin()));
    }
    let file = File::open(input).map_err(|err| io_error(&format!("failed to open {input}"), err))?;
    Ok(Box::new(file))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
