//! Incremental demultiplexer for mixed log/diagnostic serial streams.
//!
//! Bytes arrive in arbitrary chunks. The parser keeps a single accumulator
//! and a small state machine:
//! - `ScanningForSentinel`: look for a line feed; a line ending in `---`
//!   is the sentinel and is dropped along with the rest of that line
//! - `AwaitingLength`: sentinel consumed, need 4 length bytes
//! - `AwaitingPayload`: length parsed, need `expected_len` payload bytes
//!
//! # Example
//!
//! ```
//! use diagmux_frame::{Demultiplexer, Event};
//!
//! let mut demux = Demultiplexer::new();
//! let mut events: Vec<Event> = demux.ingest(b"boot\n---\n").collect();
//! events.extend(demux.ingest(&[2, 0, 0, 0, 0xAA, 0xBB]));
//!
//! assert_eq!(events[0], Event::LogLine("boot".to_string()));
//! assert_eq!(events[1].as_frame().unwrap().as_ref(), &[0xAA, 0xBB]);
//! ```

use bytes::{Buf, BytesMut};

use crate::codec::{Event, FrameConfig, LENGTH_SIZE, LINE_TERMINATOR, SENTINEL};

/// Bytes of the sentinel preceding its line feed.
const MARKER: &[u8] = b"---";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ScanningForSentinel,
    AwaitingLength,
    AwaitingPayload { expected_len: usize },
}

/// Running counters for one demultiplexer instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Total bytes handed to `ingest`/`extend`.
    pub bytes_ingested: u64,
    /// Log lines emitted.
    pub lines: u64,
    /// Diagnostic frames emitted.
    pub frames: u64,
    /// Frame headers dropped for exceeding `max_payload_size`.
    pub rejected_frames: u64,
    /// Calls to `reset`.
    pub resets: u64,
}

/// Splits a chunked byte stream into [`Event::LogLine`] and
/// [`Event::DiagnosticFrame`] events.
///
/// Never fails: malformed input is retained or skipped, never reported as an
/// error. Not reentrant; one instance per stream.
#[derive(Debug)]
pub struct Demultiplexer {
    buf: BytesMut,
    state: State,
    /// Prefix of `buf` already searched for a line feed without success.
    scanned: usize,
    config: FrameConfig,
    stats: DemuxStats,
}

impl Demultiplexer {
    /// Create a demultiplexer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a demultiplexer with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.initial_capacity),
            state: State::ScanningForSentinel,
            scanned: 0,
            config,
            stats: DemuxStats::default(),
        }
    }

    /// Append `chunk` and return an iterator over the events it completes.
    ///
    /// Events are produced lazily. Any left unpulled when the iterator is
    /// dropped stay buffered and come out first on the next pull.
    pub fn ingest(&mut self, chunk: &[u8]) -> Events<'_> {
        self.extend(chunk);
        Events { demux: self }
    }

    /// Append `chunk` to the accumulator without parsing.
    pub fn extend(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.buf.extend_from_slice(chunk);
        self.stats.bytes_ingested = self.stats.bytes_ingested.saturating_add(chunk.len() as u64);
    }

    /// Run the parse loop until it yields one event or runs out of bytes.
    pub fn next_event(&mut self) -> Option<Event> {
        loop {
            match self.state {
                State::ScanningForSentinel => {
                    let Some(offset) = self.buf[self.scanned..]
                        .iter()
                        .position(|&b| b == LINE_TERMINATOR)
                    else {
                        self.scanned = self.buf.len();
                        return None;
                    };
                    let end = self.scanned + offset;
                    self.scanned = 0;

                    if self.buf[..end].ends_with(MARKER) {
                        // The sentinel and anything ahead of it on its line
                        // leave the accumulator together.
                        let dropped = end + 1 - SENTINEL.len();
                        if dropped > 0 {
                            tracing::debug!(dropped, "discarding bytes ahead of sentinel");
                        }
                        self.buf.advance(end + 1);
                        self.state = State::AwaitingLength;
                        tracing::trace!("sentinel found, awaiting length");
                        continue;
                    }

                    let line = self.buf.split_to(end + 1);
                    return Some(self.line_event(&line[..end]));
                }

                State::AwaitingLength => {
                    if self.buf.len() < LENGTH_SIZE {
                        return None;
                    }
                    let expected_len = self.buf.get_u32_le() as usize;

                    if let Some(max) = self.config.max_payload_size {
                        if expected_len > max {
                            tracing::warn!(
                                expected_len,
                                max,
                                "frame length exceeds limit, treating sentinel as spurious"
                            );
                            self.stats.rejected_frames += 1;
                            self.state = State::ScanningForSentinel;
                            continue;
                        }
                    }

                    self.state = State::AwaitingPayload { expected_len };
                }

                State::AwaitingPayload { expected_len } => {
                    if self.buf.len() < expected_len {
                        return None;
                    }
                    let payload = self.buf.split_to(expected_len).freeze();
                    self.state = State::ScanningForSentinel;
                    self.stats.frames += 1;
                    tracing::trace!(size = payload.len(), "diagnostic frame complete");
                    return Some(Event::DiagnosticFrame(payload));
                }
            }
        }
    }

    /// Discard buffered bytes and any frame in progress.
    ///
    /// Call when the underlying connection closes or reopens.
    pub fn reset(&mut self) {
        if !self.is_idle() {
            tracing::debug!(
                discarded = self.buf.len(),
                state = self.state_name(),
                "discarding partial stream state"
            );
        }
        self.buf.clear();
        self.state = State::ScanningForSentinel;
        self.scanned = 0;
        self.stats.resets += 1;
    }

    /// Number of bytes received but not yet delivered as an event.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// True when scanning with nothing buffered.
    pub fn is_idle(&self) -> bool {
        self.state == State::ScanningForSentinel && self.buf.is_empty()
    }

    /// Declared length of the frame being collected, if any.
    pub fn pending_frame_len(&self) -> Option<usize> {
        match self.state {
            State::AwaitingPayload { expected_len } => Some(expected_len),
            _ => None,
        }
    }

    /// Name of the current parse state.
    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::ScanningForSentinel => "ScanningForSentinel",
            State::AwaitingLength => "AwaitingLength",
            State::AwaitingPayload { .. } => "AwaitingPayload",
        }
    }

    /// Counters accumulated since construction.
    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn line_event(&mut self, raw: &[u8]) -> Event {
        self.stats.lines += 1;
        let line = String::from_utf8_lossy(raw).into_owned();
        tracing::trace!(len = line.len(), "log line complete");
        Event::LogLine(line)
    }
}

impl Default for Demultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy iterator over the events available after an [`Demultiplexer::ingest`].
#[must_use = "events are produced lazily; iterate to drive the parser"]
#[derive(Debug)]
pub struct Events<'a> {
    demux: &'a mut Demultiplexer,
}

impl Iterator for Events<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.demux.next_event()
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, Bytes};

    use super::*;
    use crate::codec::encode_frame;

    fn line(text: &str) -> Event {
        Event::LogLine(text.to_string())
    }

    fn frame(payload: &'static [u8]) -> Event {
        Event::DiagnosticFrame(Bytes::from_static(payload))
    }

    fn scenario_input() -> Vec<u8> {
        let mut input = b"hello\nworld\n---\n".to_vec();
        input.extend_from_slice(&[3, 0, 0, 0]);
        input.extend_from_slice(b"abc");
        input.extend_from_slice(b"tail\n");
        input
    }

    #[test]
    fn scenario_single_chunk() {
        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(&scenario_input()).collect();

        assert_eq!(
            events,
            vec![line("hello"), line("world"), frame(b"abc"), line("tail")]
        );
        assert!(demux.is_idle());
    }

    #[test]
    fn scenario_byte_at_a_time() {
        let mut demux = Demultiplexer::new();
        let mut events = Vec::new();
        for byte in scenario_input() {
            events.extend(demux.ingest(&[byte]));
        }

        assert_eq!(
            events,
            vec![line("hello"), line("world"), frame(b"abc"), line("tail")]
        );
    }

    #[test]
    fn empty_ingest_is_a_no_op() {
        let mut demux = Demultiplexer::new();
        assert_eq!(demux.ingest(b"partial").count(), 0);

        let before = (demux.buffered_len(), demux.state_name(), demux.stats());
        assert_eq!(demux.ingest(&[]).count(), 0);
        assert_eq!(
            (demux.buffered_len(), demux.state_name(), demux.stats()),
            before
        );
    }

    #[test]
    fn zero_length_frame_is_immediate() {
        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(b"---\n\x00\x00\x00\x00").collect();

        assert_eq!(events, vec![frame(b"")]);
        assert_eq!(demux.buffered_len(), 0);
        assert_eq!(demux.state_name(), "ScanningForSentinel");
    }

    #[test]
    fn zero_length_frame_leaves_following_bytes() {
        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(b"---\n\x00\x00\x00\x00next").collect();

        assert_eq!(events, vec![frame(b"")]);
        assert_eq!(demux.buffered_len(), 4);
    }

    #[test]
    fn partial_payload_stalls_until_last_byte() {
        let mut wire = BytesMut::new();
        encode_frame(b"12345", &mut wire).unwrap();
        let (head, last) = wire.split_at(wire.len() - 1);

        let mut demux = Demultiplexer::new();
        assert_eq!(demux.ingest(head).count(), 0);
        assert_eq!(demux.pending_frame_len(), Some(5));
        assert_eq!(demux.buffered_len(), 4);

        let events: Vec<Event> = demux.ingest(last).collect();
        assert_eq!(events, vec![frame(b"12345")]);
        assert_eq!(demux.pending_frame_len(), None);
    }

    #[test]
    fn partial_length_stalls() {
        let mut demux = Demultiplexer::new();
        assert_eq!(demux.ingest(b"---\n\x02\x00").count(), 0);
        assert_eq!(demux.state_name(), "AwaitingLength");

        let events: Vec<Event> = demux.ingest(b"\x00\x00hi").collect();
        assert_eq!(events, vec![frame(b"hi")]);
    }

    #[test]
    fn sentinel_split_across_chunks() {
        let mut demux = Demultiplexer::new();
        assert_eq!(demux.ingest(b"--").count(), 0);
        assert_eq!(demux.ingest(b"-").count(), 0);
        assert_eq!(demux.state_name(), "ScanningForSentinel");

        assert_eq!(demux.ingest(b"\n").count(), 0);
        assert_eq!(demux.state_name(), "AwaitingLength");

        let events: Vec<Event> = demux.ingest(b"\x01\x00\x00\x00z").collect();
        assert_eq!(events, vec![frame(b"z")]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut demux = Demultiplexer::new();
        let mut wire = b"---\n".to_vec();
        wire.extend_from_slice(&5u32.to_le_bytes());
        wire.extend_from_slice(b"ab");

        assert_eq!(demux.ingest(&wire).count(), 0);
        assert_eq!(demux.state_name(), "AwaitingPayload");

        demux.reset();
        assert!(demux.is_idle());

        let events: Vec<Event> = demux.ingest(b"ok\n").collect();
        assert_eq!(events, vec![line("ok")]);
        assert_eq!(demux.stats().frames, 0);
        assert_eq!(demux.stats().resets, 1);
    }

    #[test]
    fn reset_discards_partial_line() {
        let mut demux = Demultiplexer::new();
        assert_eq!(demux.ingest(b"half a li").count(), 0);

        demux.reset();

        let events: Vec<Event> = demux.ingest(b"ne\n").collect();
        assert_eq!(events, vec![line("ne")]);
    }

    #[test]
    fn bytes_ahead_of_sentinel_are_dropped() {
        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(b"abc---\n\x01\x00\x00\x00!").collect();

        assert_eq!(events, vec![frame(b"!")]);
        assert_eq!(demux.stats().lines, 0);
        assert!(demux.is_idle());
    }

    #[test]
    fn dropped_prefix_does_not_touch_earlier_lines() {
        let mut demux = Demultiplexer::new();
        let mut events: Vec<Event> = demux.ingest(b"kept\npart").collect();
        events.extend(demux.ingest(b"ial---\n\x00\x00\x00\x00after\n"));

        assert_eq!(events, vec![line("kept"), frame(b""), line("after")]);
    }

    #[test]
    fn fragment_policy_is_chunk_independent() {
        let input = b"x----\n\x00\x00\x00\x00";
        let mut whole = Demultiplexer::new();
        let expected: Vec<Event> = whole.ingest(input).collect();
        assert_eq!(expected, vec![frame(b"")]);

        let mut split = Demultiplexer::new();
        let mut events: Vec<Event> = split.ingest(&input[..3]).collect();
        events.extend(split.ingest(&input[3..]));
        assert_eq!(events, expected);
    }

    #[test]
    fn dashes_not_at_line_end_are_text() {
        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(b"--- boot ---x\n--\n").collect();

        assert_eq!(events, vec![line("--- boot ---x"), line("--")]);
    }

    #[test]
    fn empty_line_and_carriage_return_kept() {
        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(b"\nwin\r\n---\r\n").collect();

        assert_eq!(events, vec![line(""), line("win\r"), line("---\r")]);
        assert!(demux.is_idle());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(b"temp \xFF ok\n").collect();

        assert_eq!(events, vec![line("temp \u{FFFD} ok")]);
    }

    #[test]
    fn unterminated_text_is_retained() {
        let mut demux = Demultiplexer::new();
        assert_eq!(demux.ingest(b"no newline yet").count(), 0);
        assert_eq!(demux.ingest(b", still none").count(), 0);
        assert_eq!(demux.buffered_len(), 26);

        let events: Vec<Event> = demux.ingest(b"\n").collect();
        assert_eq!(events, vec![line("no newline yet, still none")]);
    }

    #[test]
    fn payload_may_contain_sentinel_and_newlines() {
        let payload = b"---\n\n---\n";
        let mut wire = BytesMut::new();
        encode_frame(payload, &mut wire).unwrap();
        wire.put_slice(b"after\n");

        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(&wire).collect();

        assert_eq!(events, vec![frame(b"---\n\n---\n"), line("after")]);
    }

    #[test]
    fn spurious_sentinel_absorbs_following_bytes() {
        // A log line that happens to read "---" is trusted as a sentinel; the
        // next four bytes become a length and the region after it a payload.
        let mut demux = Demultiplexer::new();
        let events: Vec<Event> = demux.ingest(b"---\nab\n\x00line\nmore\n").collect();

        let declared = u32::from_le_bytes(*b"ab\n\x00") as usize;
        assert!(events.is_empty());
        assert_eq!(demux.pending_frame_len(), Some(declared));
    }

    #[test]
    fn oversized_length_is_rejected_when_limited() {
        let config = FrameConfig {
            max_payload_size: Some(16),
            ..FrameConfig::default()
        };
        let mut demux = Demultiplexer::with_config(config);

        let mut wire = b"---\n".to_vec();
        wire.extend_from_slice(&1000u32.to_le_bytes());
        wire.extend_from_slice(b"resync\n");

        let events: Vec<Event> = demux.ingest(&wire).collect();
        assert_eq!(events, vec![line("resync")]);
        assert_eq!(demux.stats().rejected_frames, 1);
        assert!(demux.is_idle());
    }

    #[test]
    fn length_at_limit_is_honored() {
        let config = FrameConfig {
            max_payload_size: Some(3),
            ..FrameConfig::default()
        };
        let mut demux = Demultiplexer::with_config(config);

        let events: Vec<Event> = demux.ingest(b"---\n\x03\x00\x00\x00abc").collect();
        assert_eq!(events, vec![frame(b"abc")]);
    }

    #[test]
    fn dropped_iterator_keeps_remaining_events() {
        let mut demux = Demultiplexer::new();
        let first = demux.ingest(b"a\nb\nc\n").next();
        assert_eq!(first, Some(line("a")));

        let rest: Vec<Event> = demux.ingest(&[]).collect();
        assert_eq!(rest, vec![line("b"), line("c")]);
    }

    #[test]
    fn stats_track_events() {
        let mut demux = Demultiplexer::new();
        let mut wire = BytesMut::from(&b"one\ntwo\n"[..]);
        encode_frame(b"p", &mut wire).unwrap();

        let count = demux.ingest(&wire).count();
        assert_eq!(count, 3);

        let stats = demux.stats();
        assert_eq!(stats.bytes_ingested, wire.len() as u64);
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.rejected_frames, 0);
    }

    #[test]
    fn independent_instances_do_not_share_state() {
        let mut a = Demultiplexer::new();
        let mut b = Demultiplexer::new();

        assert_eq!(a.ingest(b"---\n").count(), 0);
        let events: Vec<Event> = b.ingest(b"plain\n").collect();

        assert_eq!(events, vec![line("plain")]);
        assert_eq!(a.state_name(), "AwaitingLength");
        assert_eq!(b.state_name(), "ScanningForSentinel");
    }
}
