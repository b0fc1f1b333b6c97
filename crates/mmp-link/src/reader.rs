use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mmp_frame::Framer;
use mmp_transport::Transport;

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::stats::LinkCounters;

/// Spawn the reader thread.
///
/// The thread is the only owner of the [`Framer`] and the only producer into
/// the dispatcher's queues. It exits when `alive` is cleared (checked after
/// every poll) or the transport fails, and clears `alive` on the way out.
pub(crate) fn spawn(
    mut transport: Box<dyn Transport>,
    mut dispatcher: Dispatcher,
    counters: Arc<LinkCounters>,
    alive: Arc<AtomicBool>,
    poll_timeout: Duration,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("mmp-reader".to_string())
        .spawn(move || {
            let mut framer = Framer::new();
            tracing::debug!(?poll_timeout, "reader started");

            while alive.load(Ordering::Acquire) {
                match transport.read_byte(poll_timeout) {
                    Ok(Some(byte)) => {
                        let event = framer.push_byte(byte);
                        counters.record_framer(framer.stats());
                        if let Some(event) = event {
                            dispatcher.dispatch(event);
                        }
                    }
                    Ok(None) => {
                        if framer.on_timeout() {
                            counters.record_framer(framer.stats());
                        }
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "reader stopped on transport error");
                        break;
                    }
                }
            }

            alive.store(false, Ordering::Release);
            tracing::debug!(stats = ?framer.stats(), "reader stopped");
        })
        .map_err(mmp_transport::TransportError::Io)?;
    Ok(handle)
}
