//! Scripted device on the far end of a [`MemoryTransport`] pair.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use mmp_frame::{encode_frame, Frame, Framer, FramerEvent};
use mmp_transport::{MemoryTransport, Transport};

/// Frames the device has received, in order.
pub(crate) type Seen = Arc<Mutex<Vec<Frame>>>;

/// Encode one frame to wire bytes.
pub(crate) fn wire(flags: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_frame(flags, data, &mut buf).expect("test frame should encode");
    buf.to_vec()
}

/// Run a device thread that answers each received frame with the raw byte
/// chunks returned by `respond`. The thread exits when the host end closes.
pub(crate) fn spawn_device<F>(mut end: MemoryTransport, mut respond: F) -> Seen
where
    F: FnMut(&Frame) -> Vec<Vec<u8>> + Send + 'static,
{
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    thread::spawn(move || {
        let mut framer = Framer::new();
        loop {
            match end.read_byte(Duration::from_millis(5)) {
                Ok(Some(byte)) => {
                    if let Some(FramerEvent::Frame(frame)) = framer.push_byte(byte) {
                        log.lock().expect("seen lock").push(frame.clone());
                        for chunk in respond(&frame) {
                            if end.write(&chunk).is_err() {
                                return;
                            }
                        }
                    }
                }
                Ok(None) => {
                    framer.on_timeout();
                }
                Err(_) => return,
            }
        }
    });
    seen
}
