use std::time::Duration;

/// Default wait for a command reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Default per-byte poll timeout of the reader thread.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(4);

/// Capacity of the asynchronous frame inbox.
pub const DEFAULT_INBOX_CAPACITY: usize = 16;

/// Link behavior configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Reader thread byte poll. A read that times out while a frame is in
    /// progress abandons that frame. Default: 4ms.
    pub poll_timeout: Duration,
    /// Reply deadline used by [`Invoke`](crate::Invoke) calls. Default: 500ms.
    pub reply_timeout: Duration,
    /// Unsolicited frames buffered before the reader blocks. Default: 16.
    pub inbox_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}
