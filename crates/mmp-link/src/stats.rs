use std::sync::atomic::{AtomicU64, Ordering};

use mmp_frame::FramerStats;
use serde::Serialize;

/// Point-in-time snapshot of a link's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Valid frames received.
    pub frames: u64,
    pub log_lines: u64,
    pub framing_errors: u64,
    pub checksum_errors: u64,
    /// Partial frames abandoned on a byte timeout.
    pub rx_timeouts: u64,
    pub log_overflows: u64,
    pub noise_bytes: u64,
    /// Frames routed to the async inbox.
    pub async_frames: u64,
    /// Frames routed to the reply slot.
    pub replies: u64,
    /// Replies nobody waited for, displaced or drained before a new request.
    pub stale_replies: u64,
    pub commands_sent: u64,
    /// Replies accepted by the correlator.
    pub responses: u64,
    pub invalid_responses: u64,
    pub response_timeouts: u64,
}

/// Shared counters, written by the reader thread and the correlator.
#[derive(Debug, Default)]
pub(crate) struct LinkCounters {
    frames: AtomicU64,
    log_lines: AtomicU64,
    framing_errors: AtomicU64,
    checksum_errors: AtomicU64,
    rx_timeouts: AtomicU64,
    log_overflows: AtomicU64,
    noise_bytes: AtomicU64,
    pub(crate) async_frames: AtomicU64,
    pub(crate) replies: AtomicU64,
    pub(crate) stale_replies: AtomicU64,
    pub(crate) commands_sent: AtomicU64,
    pub(crate) responses: AtomicU64,
    pub(crate) invalid_responses: AtomicU64,
    pub(crate) response_timeouts: AtomicU64,
}

impl LinkCounters {
    /// Publish the framer's counters.
    pub(crate) fn record_framer(&self, stats: &FramerStats) {
        self.frames.store(stats.frames, Ordering::Relaxed);
        self.log_lines.store(stats.log_lines, Ordering::Relaxed);
        self.framing_errors
            .store(stats.framing_errors, Ordering::Relaxed);
        self.checksum_errors
            .store(stats.checksum_errors, Ordering::Relaxed);
        self.rx_timeouts.store(stats.timeouts, Ordering::Relaxed);
        self.log_overflows
            .store(stats.log_overflows, Ordering::Relaxed);
        self.noise_bytes.store(stats.noise_bytes, Ordering::Relaxed);
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LinkStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        LinkStats {
            frames: load(&self.frames),
            log_lines: load(&self.log_lines),
            framing_errors: load(&self.framing_errors),
            checksum_errors: load(&self.checksum_errors),
            rx_timeouts: load(&self.rx_timeouts),
            log_overflows: load(&self.log_overflows),
            noise_bytes: load(&self.noise_bytes),
            async_frames: load(&self.async_frames),
            replies: load(&self.replies),
            stale_replies: load(&self.stale_replies),
            commands_sent: load(&self.commands_sent),
            responses: load(&self.responses),
            invalid_responses: load(&self.invalid_responses),
            response_timeouts: load(&self.response_timeouts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_framer_and_link_counters() {
        let counters = LinkCounters::default();
        counters.record_framer(&FramerStats {
            frames: 3,
            checksum_errors: 1,
            timeouts: 2,
            ..FramerStats::default()
        });
        LinkCounters::bump(&counters.commands_sent);
        LinkCounters::bump(&counters.commands_sent);

        let stats = counters.snapshot();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.checksum_errors, 1);
        assert_eq!(stats.rx_timeouts, 2);
        assert_eq!(stats.commands_sent, 2);
        assert_eq!(stats.responses, 0);
    }

    #[test]
    fn stats_serialize_with_field_names() {
        let json = serde_json::to_value(LinkStats {
            noise_bytes: 7,
            ..LinkStats::default()
        })
        .unwrap();
        assert_eq!(json["noise_bytes"], 7);
        assert_eq!(json["response_timeouts"], 0);
    }
}
