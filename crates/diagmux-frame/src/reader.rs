use std::io::{ErrorKind, Read};

use crate::codec::{Event, FrameConfig};
use crate::demux::{DemuxStats, Demultiplexer};
use crate::error::{FrameError, Result};

/// Pulls chunks from any `Read` source and yields demultiplexed events.
///
/// Handles partial reads internally. At end of stream any partial line or
/// frame is discarded and `Ok(None)` is returned.
pub struct StreamReader<T> {
    inner: T,
    demux: Demultiplexer,
    chunk: Vec<u8>,
    eof: bool,
}

impl<T: Read> StreamReader<T> {
    /// Create a new stream reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new stream reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        let chunk = vec![0u8; config.read_chunk_size.max(1)];
        Self {
            inner,
            demux: Demultiplexer::with_config(config),
            chunk,
            eof: false,
        }
    }

    /// Read the next event (blocking).
    ///
    /// Returns `Ok(None)` once the source reports end of stream.
    pub fn read_event(&mut self) -> Result<Option<Event>> {
        loop {
            if let Some(event) = self.demux.next_event() {
                return Ok(Some(event));
            }
            if self.eof {
                return Ok(None);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.eof = true;
                self.demux.reset();
                return Ok(None);
            }

            self.demux.extend(&self.chunk[..read]);
        }
    }

    /// Discard partial state, e.g. after the source was reopened.
    ///
    /// Also clears the end-of-stream flag so reading can resume.
    pub fn reset(&mut self) {
        self.demux.reset();
        self.eof = false;
    }

    /// Counters from the underlying demultiplexer.
    pub fn stats(&self) -> DemuxStats {
        self.demux.stats()
    }

    /// Borrow the demultiplexer.
    pub fn demux(&self) -> &Demultiplexer {
        &self.demux
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for StreamReader<T> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_event().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, encode_line};

    fn wire() -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_line("boot", &mut wire).unwrap();
        encode_frame(b"\x81\xA1t\x01", &mut wire).unwrap();
        encode_line("idle", &mut wire).unwrap();
        wire.to_vec()
    }

    #[test]
    fn reads_all_events_in_order() {
        let reader = StreamReader::new(Cursor::new(wire()));
        let events: Vec<Event> = reader.map(|e| e.unwrap()).collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].as_log_line(), Some("boot"));
        assert_eq!(
            events[1].as_frame().map(|b| b.as_ref()),
            Some(&b"\x81\xA1t\x01"[..])
        );
        assert_eq!(events[2].as_log_line(), Some("idle"));
    }

    #[test]
    fn partial_read_handling() {
        let source = ByteByByteReader {
            bytes: wire(),
            pos: 0,
        };
        let events: Vec<Event> = StreamReader::new(source).map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn small_read_chunks() {
        let cfg = FrameConfig {
            read_chunk_size: 3,
            ..FrameConfig::default()
        };
        let reader = StreamReader::with_config(Cursor::new(wire()), cfg);
        let events: Vec<Event> = reader.map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn eof_mid_frame_discards_partial() {
        let mut bytes = wire();
        bytes.extend_from_slice(b"---\n\x10\x00\x00\x00only-part");

        let mut reader = StreamReader::new(Cursor::new(bytes));
        let mut count = 0;
        while let Some(event) = reader.read_event().unwrap() {
            assert!(event.as_frame().map_or(true, |p| p.len() != 16));
            count += 1;
        }

        assert_eq!(count, 3);
        assert!(reader.demux().is_idle());
        assert_eq!(reader.stats().resets, 1);
        assert!(reader.read_event().unwrap().is_none());
    }

    #[test]
    fn eof_on_empty_source() {
        let mut reader = StreamReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_event().unwrap().is_none());
    }

    #[test]
    fn reset_allows_resuming_after_eof() {
        let mut reader = StreamReader::new(Cursor::new(b"first\n".to_vec()));
        assert!(reader.read_event().unwrap().is_some());
        assert!(reader.read_event().unwrap().is_none());

        reader.get_mut().get_mut().extend_from_slice(b"second\n");
        reader.reset();

        let event = reader.read_event().unwrap().unwrap();
        assert_eq!(event.as_log_line(), Some("second"));
    }

    #[test]
    fn read_error_propagates() {
        let source = WouldBlockThenData { state: 0 };
        let mut reader = StreamReader::new(source);
        let err = reader.read_event().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let source = InterruptedThenData {
            state: 0,
            bytes: b"ok\n".to_vec(),
            pos: 0,
        };
        let mut reader = StreamReader::new(source);
        let event = reader.read_event().unwrap().unwrap();
        assert_eq!(event.as_log_line(), Some("ok"));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = StreamReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct WouldBlockThenData {
        state: u8,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            Ok(0)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
