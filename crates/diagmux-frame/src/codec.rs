use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Marker announcing a diagnostic frame: `"---"` followed by a line feed.
pub const SENTINEL: &[u8; 4] = b"---\n";

/// Line terminator for log lines (and the last byte of [`SENTINEL`]).
pub const LINE_TERMINATOR: u8 = b'\n';

/// Size of the little-endian length prefix following the sentinel.
pub const LENGTH_SIZE: usize = 4;

/// Frame header: sentinel (4) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = SENTINEL.len() + LENGTH_SIZE;

/// Largest payload the 32-bit length prefix can describe.
pub const MAX_ENCODABLE_PAYLOAD: usize = u32::MAX as usize;

/// Default initial accumulator capacity: 8 KiB.
pub const DEFAULT_INITIAL_CAPACITY: usize = 8 * 1024;

/// Default read size used by [`StreamReader`](crate::StreamReader): 4 KiB.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4 * 1024;

/// One unit of demultiplexed output, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A text line with its terminator removed.
    LogLine(String),
    /// The opaque payload of a length-prefixed diagnostic frame.
    DiagnosticFrame(Bytes),
}

impl Event {
    /// Short name of the event kind, for logs and output.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::LogLine(_) => "log",
            Event::DiagnosticFrame(_) => "diagnostic",
        }
    }

    /// The line text, if this is a log line.
    pub fn as_log_line(&self) -> Option<&str> {
        match self {
            Event::LogLine(line) => Some(line),
            Event::DiagnosticFrame(_) => None,
        }
    }

    /// The frame payload, if this is a diagnostic frame.
    pub fn as_frame(&self) -> Option<&Bytes> {
        match self {
            Event::DiagnosticFrame(payload) => Some(payload),
            Event::LogLine(_) => None,
        }
    }
}

/// Configuration shared by the demultiplexer, reader and writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Initial accumulator capacity in bytes. Default: 8 KiB.
    pub initial_capacity: usize,
    /// Upper bound on honored frame lengths. Default: `None` (every length
    /// following a sentinel is honored).
    ///
    /// When set, a length above the bound is treated as a spurious sentinel:
    /// sentinel and length are dropped and scanning resumes. Writers refuse
    /// payloads above the bound.
    pub max_payload_size: Option<usize>,
    /// Bytes requested per `read` call by the stream reader. Default: 4 KiB.
    pub read_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_payload_size: None,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

/// Encode a diagnostic frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬──────────────────┐
/// │ Sentinel (4B)│ Length    │ Payload          │
/// │ "---\n"      │ (4B LE)   │ (Length bytes)   │
/// └──────────────┴───────────┴──────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_ENCODABLE_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_ENCODABLE_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(SENTINEL);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a log line (terminator appended) into the wire format.
///
/// Rejects text the demultiplexer would read back differently: embedded
/// line feeds, and lines ending in `---` (which would form a sentinel).
pub fn encode_line(text: &str, dst: &mut BytesMut) -> Result<()> {
    validate_line(text)?;
    dst.reserve(text.len() + 1);
    dst.put_slice(text.as_bytes());
    dst.put_u8(LINE_TERMINATOR);
    Ok(())
}

/// Check that `text` round-trips as a single log line.
///
/// Lines are delivered byte for byte apart from the terminator, so a
/// trailing `\r` survives; only a line feed or a `---` ending changes how the
/// line parses.
pub fn validate_line(text: &str) -> Result<()> {
    if text.as_bytes().contains(&LINE_TERMINATOR) {
        return Err(FrameError::InvalidLine(
            "line contains an embedded line feed".to_string(),
        ));
    }
    if text.ends_with("---") {
        return Err(FrameError::InvalidLine(
            "line ends with the frame sentinel marker \"---\"".to_string(),
        ));
    }
    Ok(())
}

/// Interpret a 4-byte little-endian length prefix.
pub fn read_length(prefix: [u8; LENGTH_SIZE]) -> u32 {
    u32::from_le_bytes(prefix)
}
