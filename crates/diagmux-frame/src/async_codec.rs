//! `tokio_util` decoder adapter (feature `async`).

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::{Event, FrameConfig};
use crate::demux::{DemuxStats, Demultiplexer};
use crate::error::{FrameError, Result};

/// Decoder yielding [`Event`]s from any `AsyncRead` via `FramedRead`.
///
/// Input is moved into an owned [`Demultiplexer`], so the framed read buffer
/// never holds partial state. End of stream discards a partial line or frame.
#[derive(Debug, Default)]
pub struct DemuxCodec {
    demux: Demultiplexer,
}

impl DemuxCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            demux: Demultiplexer::with_config(config),
        }
    }

    /// Counters from the underlying demultiplexer.
    pub fn stats(&self) -> DemuxStats {
        self.demux.stats()
    }
}

impl Decoder for DemuxCodec {
    type Item = Event;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Event>> {
        if !src.is_empty() {
            let chunk = src.split();
            self.demux.extend(&chunk);
        }
        Ok(self.demux.next_event())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Event>> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        self.demux.reset();
        Ok(None)
    }
}
