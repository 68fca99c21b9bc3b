use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, encode_line, FrameConfig, DEFAULT_INITIAL_CAPACITY};
use crate::error::{FrameError, Result};

/// Writes log lines and diagnostic frames to any `Write` sink.
///
/// This is the producer side of the wire format; it refuses lines the
/// demultiplexer would misread as a sentinel.
pub struct StreamWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> StreamWriter<T> {
    /// Create a new stream writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new stream writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(DEFAULT_INITIAL_CAPACITY),
            config,
        }
    }

    /// Write one log line; the terminator is appended.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        self.buf.clear();
        encode_line(text, &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and write a diagnostic frame.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        if let Some(max) = self.config.max_payload_size {
            if payload.len() > max {
                return Err(FrameError::PayloadTooLarge {
                    size: payload.len(),
                    max,
                });
            }
        }

        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }
}
