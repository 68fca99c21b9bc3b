use std::io::Write;

use diagmux_frame::{validate_line, StreamWriter};
use diagmux_payload::PayloadDecoder;

use crate::cmd::EmitArgs;
use crate::exit::{frame_error, payload_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: EmitArgs) -> CliResult<i32> {
    let frames = resolve_frames(&args)?;
    for line in &args.lines {
        validate_line(line).map_err(|err| frame_error("--line", err))?;
    }

    let stdout = std::io::stdout();
    write_stream(stdout.lock(), &args.lines, &frames)?;

    tracing::debug!(
        lines = args.lines.len(),
        frames = frames.len(),
        "stream written"
    );
    Ok(SUCCESS)
}

/// Collect every frame payload before writing, so bad input writes nothing.
fn resolve_frames(args: &EmitArgs) -> CliResult<Vec<Vec<u8>>> {
    if args.lines.is_empty() && args.json.is_empty() && args.raw_frames.is_empty() {
        return Err(CliError::new(
            USAGE,
            "nothing to emit: pass --line, --json or --raw-frame",
        ));
    }

    let mut frames = Vec::with_capacity(args.json.len() + args.raw_frames.len());
    for json in &args.json {
        frames.push(PayloadDecoder::encode_json(json).map_err(|err| payload_error("--json", err))?);
    }
    frames.extend(args.raw_frames.iter().map(|raw| raw.as_bytes().to_vec()));
    Ok(frames)
}

fn write_stream<W: Write>(sink: W, lines: &[String], frames: &[Vec<u8>]) -> CliResult<()> {
    let mut writer = StreamWriter::new(sink);
    for line in lines {
        writer
            .write_line(line)
            .map_err(|err| frame_error("write failed", err))?;
    }
    for payload in frames {
        writer
            .write_frame(payload)
            .map_err(|err| frame_error("write failed", err))?;
    }
    Ok(())
}
