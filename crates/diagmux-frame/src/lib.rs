//! Demultiplexer for serial streams that mix text logs with binary frames.
//!
//! A producer writes newline-terminated log lines and, interleaved with them,
//! diagnostic frames announced by a textual sentinel:
//! - `"---\n"` sentinel
//! - a 4-byte little-endian payload length
//! - exactly that many payload bytes
//!
//! [`Demultiplexer`] turns arbitrarily chunked input into an ordered sequence
//! of [`Event`]s. Chunk boundaries never change the result.

pub mod codec;
pub mod demux;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::DemuxCodec;
pub use codec::{
    encode_frame, encode_line, validate_line, Event, FrameConfig, HEADER_SIZE, LENGTH_SIZE,
    SENTINEL,
};
pub use demux::{DemuxStats, Demultiplexer, Events};
pub use error::{FrameError, Result};
pub use reader::StreamReader;
pub use writer::StreamWriter;
