//! Replay example: writes a mixed capture, then splits it back apart.
//!
//! Run with:
//!   cargo run --example replay
//!
//! The capture is fed through the demultiplexer in 3-byte chunks to show
//! that events come out the same regardless of how the bytes arrive.

use diagmux::frame::{Demultiplexer, Event, StreamWriter};
use diagmux::payload::PayloadDecoder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = StreamWriter::new(Vec::new());
    writer.write_line("boot: firmware 2.4.1")?;
    writer.write_frame(&PayloadDecoder::encode_json(
        r#"{"uptime_ms":1500,"vbat":3.29871,"imu":{"acc":[0.0123,-9.8061,0.5]}}"#,
    )?)?;
    writer.write_line("sensor: calibrated")?;
    writer.write_frame(&[0xC1])?;
    writer.write_line("idle")?;
    let capture = writer.into_inner();

    eprintln!("capture is {} bytes", capture.len());

    let decoder = PayloadDecoder::new();
    let mut demux = Demultiplexer::new();
    for chunk in capture.chunks(3) {
        for event in demux.ingest(chunk) {
            match &event {
                Event::LogLine(line) => println!("log   {line}"),
                Event::DiagnosticFrame(payload) => match decoder.decode_rounded(payload) {
                    Ok(value) => println!("diag  {value}"),
                    Err(err) => eprintln!("skipping {}-byte frame: {err}", payload.len()),
                },
            }
        }
    }

    let stats = demux.stats();
    eprintln!(
        "{} lines, {} frames, {} bytes left over",
        stats.lines,
        stats.frames,
        demux.buffered_len()
    );
    Ok(())
}
