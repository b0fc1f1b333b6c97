//! Receive-side state machine.
//!
//! The [`Framer`] consumes one byte at a time and separates binary frames,
//! `"\tLOG"` text lines and noise. It never fails: malformed input is counted
//! in [`FramerStats`] and the machine falls back to [`FramerState::Idle`],
//! where it waits for the next `SOM`.

use bytes::{Bytes, BytesMut};

use crate::codec::{Frame, ETX, LOG_PREAMBLE, MAX_LOG_LINE, SOM, STX};

/// Parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramerState {
    #[default]
    Idle,
    LogMatching,
    ReadLen,
    ReadFlags,
    ExpectStx,
    ReadData,
    ExpectEtx,
    ReadChecksum,
}

/// A line of MCU log text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Line bytes starting at `LOG`, without the leading tab or trailing newline.
    pub text: Bytes,
    /// True if the line hit the length limit before its newline.
    pub truncated: bool,
}

impl LogLine {
    /// The line as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// Something the framer recognized in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerEvent {
    Frame(Frame),
    Log(LogLine),
}

/// Receive-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Frames delivered with a valid checksum.
    pub frames: u64,
    /// Complete log lines.
    pub log_lines: u64,
    /// Missing `STX`/`ETX`, or a zero declared length.
    pub framing_errors: u64,
    pub checksum_errors: u64,
    /// Partial frames or log lines abandoned on a read timeout.
    pub timeouts: u64,
    /// Log lines flushed at the length limit.
    pub log_overflows: u64,
    /// Bytes discarded while idle.
    pub noise_bytes: u64,
}

/// Byte-at-a-time frame and log-line parser.
#[derive(Debug, Default)]
pub struct Framer {
    state: FramerState,
    preamble_index: usize,
    length: u8,
    flags: u8,
    sum: u8,
    data: BytesMut,
    log: BytesMut,
    stats: FramerStats,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn stats(&self) -> &FramerStats {
        &self.stats
    }

    /// Advance the state machine by one byte.
    pub fn push_byte(&mut self, byte: u8) -> Option<FramerEvent> {
        match self.state {
            FramerState::Idle => {
                self.on_idle(byte);
                None
            }
            FramerState::LogMatching => self.on_log_byte(byte),
            FramerState::ReadLen => {
                self.length = byte;
                self.sum = byte;
                self.state = FramerState::ReadFlags;
                None
            }
            FramerState::ReadFlags => {
                self.flags = byte;
                self.sum = self.sum.wrapping_add(byte);
                self.state = FramerState::ExpectStx;
                None
            }
            FramerState::ExpectStx => {
                if byte != STX {
                    tracing::debug!(byte, "expected STX");
                    self.framing_error();
                } else if self.length == 0 {
                    tracing::debug!("zero-length frame");
                    self.framing_error();
                } else {
                    self.state = FramerState::ReadData;
                }
                None
            }
            FramerState::ReadData => {
                self.data.extend_from_slice(&[byte]);
                self.sum = self.sum.wrapping_add(byte);
                if self.data.len() == self.length as usize {
                    self.state = FramerState::ExpectEtx;
                }
                None
            }
            FramerState::ExpectEtx => {
                if byte == ETX {
                    self.state = FramerState::ReadChecksum;
                } else {
                    tracing::debug!(byte, "expected ETX");
                    self.framing_error();
                }
                None
            }
            FramerState::ReadChecksum => {
                self.state = FramerState::Idle;
                let expected = self.sum.wrapping_neg();
                let data = self.data.split().freeze();
                if byte == expected {
                    self.stats.frames += 1;
                    tracing::trace!(flags = self.flags, len = data.len(), "frame received");
                    Some(FramerEvent::Frame(Frame::new(self.flags, data)))
                } else {
                    self.stats.checksum_errors += 1;
                    tracing::debug!(expected, got = byte, "invalid checksum");
                    None
                }
            }
        }
    }

    /// Record a read timeout. Returns true if a partial frame or log line was
    /// abandoned.
    pub fn on_timeout(&mut self) -> bool {
        if self.state == FramerState::Idle {
            return false;
        }
        tracing::debug!(state = ?self.state, "receive timeout");
        self.stats.timeouts += 1;
        self.reset();
        true
    }

    /// Push a run of bytes, collecting every event they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<FramerEvent> {
        bytes.iter().filter_map(|b| self.push_byte(*b)).collect()
    }

    fn on_idle(&mut self, byte: u8) {
        if byte == SOM {
            self.preamble_index = 0;
            self.data.clear();
            self.state = FramerState::ReadLen;
            return;
        }

        if byte == LOG_PREAMBLE[self.preamble_index] {
            self.preamble_index += 1;
            if self.preamble_index == LOG_PREAMBLE.len() {
                self.preamble_index = 0;
                self.log.clear();
                self.log.extend_from_slice(&LOG_PREAMBLE);
                self.state = FramerState::LogMatching;
            }
            return;
        }

        // A mismatch is not rechecked as the start of a new preamble.
        self.preamble_index = 0;
        self.stats.noise_bytes += 1;
    }

    fn on_log_byte(&mut self, byte: u8) -> Option<FramerEvent> {
        if byte == b'\n' {
            self.stats.log_lines += 1;
            self.state = FramerState::Idle;
            return Some(FramerEvent::Log(self.take_log(false)));
        }

        self.log.extend_from_slice(&[byte]);
        if self.log.len() > MAX_LOG_LINE {
            self.stats.log_overflows += 1;
            self.state = FramerState::Idle;
            return Some(FramerEvent::Log(self.take_log(true)));
        }
        None
    }

    fn take_log(&mut self, truncated: bool) -> LogLine {
        // Strip the leading tab of the preamble.
        let text = self.log.split().freeze().slice(1..);
        LogLine { text, truncated }
    }

    fn framing_error(&mut self) {
        self.stats.framing_errors += 1;
        self.reset();
    }

    fn reset(&mut self) {
        self.state = FramerState::Idle;
        self.preamble_index = 0;
        self.data.clear();
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bytes::BytesMut;
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Level, Metadata};

    use super::*;
    use crate::codec::encode_frame;

    fn wire(flags: u8, data: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(flags, data, &mut buf).unwrap();
        buf.to_vec()
    }

    fn only_frame(events: Vec<FramerEvent>) -> Frame {
        assert_eq!(events.len(), 1, "events: {events:?}");
        match events.into_iter().next() {
            Some(FramerEvent::Frame(frame)) => frame,
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn encoded_frames_decode_back() {
        let mut framer = Framer::new();
        for (flags, data) in [
            (0x00u8, &b"\x05\x00hello"[..]),
            (0x01, &b"V"[..]),
            (0x03, &[0x01, 0x02, 0x03][..]),
            (0x80, &[0xFF; 255][..]),
        ] {
            let frame = only_frame(framer.feed(&wire(flags, data)));
            assert_eq!(frame.flags, flags);
            assert_eq!(frame.data.as_ref(), data);
            assert_eq!(framer.state(), FramerState::Idle);
        }
        assert_eq!(framer.stats().frames, 4);
    }

    #[test]
    fn data_bytes_matching_markers_are_payload() {
        let mut framer = Framer::new();
        let data = [SOM, STX, ETX, b'\t', b'L', b'O', b'G', b'\n'];
        let frame = only_frame(framer.feed(&wire(0x00, &data)));
        assert_eq!(frame.data.as_ref(), &data);
    }

    #[test]
    fn frame_completes_after_exactly_declared_length() {
        let mut framer = Framer::new();
        let bytes = wire(0x00, b"abc");
        // SOM, LEN, FLAGS, STX, a, b
        for b in &bytes[..6] {
            assert!(framer.push_byte(*b).is_none());
            assert_ne!(framer.state(), FramerState::ExpectEtx);
        }
        assert!(framer.push_byte(bytes[6]).is_none());
        assert_eq!(framer.state(), FramerState::ExpectEtx);
        assert!(framer.push_byte(bytes[7]).is_none());
        assert_eq!(framer.state(), FramerState::ReadChecksum);
        assert!(framer.push_byte(bytes[8]).is_some());
    }

    #[test]
    fn corrupted_checksum_is_dropped_and_stream_resyncs() {
        let mut framer = Framer::new();
        let mut bad = wire(0x00, b"first");
        let last = bad.len() - 1;
        bad[last] ^= 0x01;

        assert!(framer.feed(&bad).is_empty());
        assert_eq!(framer.stats().checksum_errors, 1);

        let frame = only_frame(framer.feed(&wire(0x00, b"second")));
        assert_eq!(frame.data.as_ref(), b"second");
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut framer = Framer::new();
        let mut bad = wire(0x01, b"payload");
        bad[5] = b'X';
        assert!(framer.feed(&bad).is_empty());
        assert_eq!(framer.stats().checksum_errors, 1);
        assert_eq!(framer.stats().frames, 0);
    }

    #[test]
    fn missing_stx_is_a_framing_error() {
        let mut framer = Framer::new();
        assert!(framer.feed(&[SOM, 0x01, 0x00, 0x7F]).is_empty());
        assert_eq!(framer.stats().framing_errors, 1);
        assert_eq!(framer.state(), FramerState::Idle);
    }

    #[test]
    fn missing_etx_returns_to_idle() {
        let mut framer = Framer::new();
        let mut bad = wire(0x00, b"ok");
        bad[6] = 0x00;
        // Checksum byte follows the bad ETX and is treated as idle noise.
        assert!(framer.feed(&bad).is_empty());
        assert_eq!(framer.stats().framing_errors, 1);
        assert_eq!(framer.state(), FramerState::Idle);

        let frame = only_frame(framer.feed(&wire(0x00, b"next")));
        assert_eq!(frame.data.as_ref(), b"next");
    }

    #[test]
    fn zero_length_frame_is_a_framing_error() {
        let mut framer = Framer::new();
        assert!(framer.feed(&[SOM, 0x00, 0x00, STX]).is_empty());
        assert_eq!(framer.stats().framing_errors, 1);
        assert_eq!(framer.state(), FramerState::Idle);
    }

    #[test]
    fn log_line_is_emitted_without_tab() {
        let mut framer = Framer::new();
        let events = framer.feed(b"\tLOG: hello mcu\n");
        assert_eq!(
            events,
            vec![FramerEvent::Log(LogLine {
                text: Bytes::from_static(b"LOG: hello mcu"),
                truncated: false,
            })]
        );
        assert_eq!(framer.stats().log_lines, 1);
        assert_eq!(framer.stats().noise_bytes, 0);
    }

    #[test]
    fn log_lines_interleave_with_frames() {
        let mut framer = Framer::new();
        let mut stream = b"\tLOG a\n".to_vec();
        stream.extend(wire(0x00, b"x"));
        stream.extend_from_slice(b"garbage\tLOG b\n");
        stream.extend(wire(0x01, b"y"));

        let events = framer.feed(&stream);
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], FramerEvent::Log(l) if l.text.as_ref() == b"LOG a"));
        assert!(matches!(&events[1], FramerEvent::Frame(f) if f.data.as_ref() == b"x"));
        assert!(matches!(&events[2], FramerEvent::Log(l) if l.text.as_ref() == b"LOG b"));
        assert!(matches!(&events[3], FramerEvent::Frame(f) if f.flags == 0x01));
        assert_eq!(framer.stats().noise_bytes, 7);
    }

    #[test]
    fn overlong_log_line_is_flushed_truncated() {
        let mut framer = Framer::new();
        let mut stream = LOG_PREAMBLE.to_vec();
        stream.extend(std::iter::repeat(b'x').take(300));

        let events = framer.feed(&stream);
        let line = match &events[..] {
            [FramerEvent::Log(line)] => line.clone(),
            other => panic!("unexpected events: {other:?}"),
        };
        assert!(line.truncated);
        assert_eq!(line.text.len(), MAX_LOG_LINE);
        assert!(line.text.starts_with(b"LOG"));
        assert_eq!(framer.stats().log_overflows, 1);
        assert_eq!(framer.stats().log_lines, 0);
        // The rest of the long line is noise.
        assert_eq!(framer.stats().noise_bytes, 300 - (MAX_LOG_LINE + 1 - 4) as u64);
    }

    /// Counts warnings raised while installed as the thread's subscriber.
    struct WarnCounter(Arc<AtomicUsize>);

    impl tracing::Subscriber for WarnCounter {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }
        fn record(&self, _: &Id, _: &Record<'_>) {}
        fn record_follows_from(&self, _: &Id, _: &Id) {}
        fn event(&self, event: &Event<'_>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        fn enter(&self, _: &Id) {}
        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn overlong_log_line_is_not_warned_by_the_framer() {
        let warnings = Arc::new(AtomicUsize::new(0));
        tracing::subscriber::with_default(WarnCounter(warnings.clone()), || {
            let mut framer = Framer::new();
            let mut stream = LOG_PREAMBLE.to_vec();
            stream.extend(std::iter::repeat(b'x').take(300));
            assert!(matches!(
                &framer.feed(&stream)[..],
                [FramerEvent::Log(line)] if line.truncated
            ));
        });
        assert_eq!(warnings.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn preamble_mismatch_does_not_recheck_byte() {
        let mut framer = Framer::new();
        // The second tab breaks the match and is not taken as a new start.
        assert!(framer.feed(b"\t\tLOG x\n").is_empty());
        assert_eq!(framer.stats().log_lines, 0);
        assert_eq!(framer.state(), FramerState::Idle);
    }

    #[test]
    fn som_inside_preamble_starts_a_frame() {
        let mut framer = Framer::new();
        let mut stream = b"\tLO".to_vec();
        stream.extend(wire(0x00, b"z"));
        let frame = only_frame(framer.feed(&stream));
        assert_eq!(frame.data.as_ref(), b"z");
    }

    #[test]
    fn timeout_abandons_partial_frame() {
        let mut framer = Framer::new();
        let bytes = wire(0x00, b"abcdef");
        framer.feed(&bytes[..6]);
        assert_eq!(framer.state(), FramerState::ReadData);

        assert!(framer.on_timeout());
        assert_eq!(framer.state(), FramerState::Idle);
        assert_eq!(framer.stats().timeouts, 1);

        let frame = only_frame(framer.feed(&wire(0x00, b"again")));
        assert_eq!(frame.data.as_ref(), b"again");
    }

    #[test]
    fn timeout_abandons_partial_log_line() {
        let mut framer = Framer::new();
        framer.feed(b"\tLOG partial");
        assert!(framer.on_timeout());
        assert_eq!(framer.stats().timeouts, 1);

        let events = framer.feed(b"\tLOG whole\n");
        assert!(matches!(&events[..], [FramerEvent::Log(l)] if l.text.as_ref() == b"LOG whole"));
    }

    #[test]
    fn idle_timeout_is_not_counted() {
        let mut framer = Framer::new();
        assert!(!framer.on_timeout());
        assert_eq!(framer.stats().timeouts, 0);
    }

    #[test]
    fn noise_is_counted_and_ignored() {
        let mut framer = Framer::new();
        assert!(framer.feed(&[0x55, 0xAA, 0x00, 0x7E]).is_empty());
        assert_eq!(framer.stats().noise_bytes, 4);
        assert_eq!(*framer.stats(), FramerStats {
            noise_bytes: 4,
            ..FramerStats::default()
        });
    }
}
