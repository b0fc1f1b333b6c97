use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Start-of-message marker.
pub const SOM: u8 = 0x01;

/// Start-of-text marker, between header and payload.
pub const STX: u8 = 0x02;

/// End-of-text marker, between payload and checksum.
pub const ETX: u8 = 0x03;

/// Bytes that introduce a log line outside of a frame.
pub const LOG_PREAMBLE: [u8; 4] = *b"\tLOG";

/// Longest log line accepted before it is flushed as truncated.
pub const MAX_LOG_LINE: usize = 255;

/// Largest payload the 1-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Framing bytes around the payload: SOM, LEN, FLAGS, STX, ETX, CHECKSUM.
pub const FRAME_OVERHEAD: usize = 6;

/// A received or outgoing frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Routing flags, see [`crate::flags`].
    pub flags: u8,
    /// The frame payload (never empty on the wire).
    pub data: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(flags: u8, data: impl Into<Bytes>) -> Self {
        Self {
            flags,
            data: data.into(),
        }
    }

    /// Create a frame carrying UTF-8 text.
    pub fn text(flags: u8, text: &str) -> Self {
        Self::new(flags, Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Payload length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the payload is empty (such a frame cannot be encoded).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.data.len()
    }
}

/// Checksum byte for a frame: `(256 - (length + flags + Σdata)) mod 256`.
pub fn checksum(length: u8, flags: u8, data: &[u8]) -> u8 {
    data.iter()
        .fold(length.wrapping_add(flags), |sum, b| sum.wrapping_add(*b))
        .wrapping_neg()
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬─────┬───────┬──────┬──────────────┬──────┬──────────┐
/// │ SOM  │ LEN │ FLAGS │ STX  │ DATA         │ ETX  │ CHECKSUM │
/// │ 0x01 │ 1B  │ 1B    │ 0x02 │ (LEN bytes)  │ 0x03 │ 1B       │
/// └──────┴─────┴───────┴──────┴──────────────┴──────┴──────────┘
/// ```
pub fn encode_frame(flags: u8, data: &[u8], dst: &mut BytesMut) -> Result<()> {
    if data.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    if data.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: data.len(),
            max: MAX_PAYLOAD,
        });
    }

    let length = data.len() as u8;
    dst.reserve(FRAME_OVERHEAD + data.len());
    dst.put_u8(SOM);
    dst.put_u8(length);
    dst.put_u8(flags);
    dst.put_u8(STX);
    dst.put_slice(data);
    dst.put_u8(ETX);
    dst.put_u8(checksum(length, flags, data));
    Ok(())
}

/// Drives a [`Framer`](crate::Framer) from an async byte stream.
///
/// Decoding yields frames and log lines; encoding accepts frames. Read
/// timeouts are not visible to a codec, so a half-received frame is only
/// abandoned when the next `SOM` arrives after a framing error.
#[cfg(feature = "async")]
#[derive(Debug, Default)]
pub struct MmpCodec {
    framer: crate::framer::Framer,
}

#[cfg(feature = "async")]
impl MmpCodec {
    /// Create a codec with a fresh framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive-side counters.
    pub fn stats(&self) -> &crate::framer::FramerStats {
        self.framer.stats()
    }
}

#[cfg(feature = "async")]
impl tokio_util::codec::Decoder for MmpCodec {
    type Item = crate::framer::FramerEvent;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        use bytes::Buf;

        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(event) = self.framer.push_byte(byte) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}

#[cfg(feature = "async")]
impl tokio_util::codec::Encoder<Frame> for MmpCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(item.flags, &item.data, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_lays_out_markers() {
        let mut buf = BytesMut::new();
        encode_frame(0x01, b"V", &mut buf).unwrap();

        assert_eq!(buf.len(), FRAME_OVERHEAD + 1);
        assert_eq!(buf[0], SOM);
        assert_eq!(buf[1], 1);
        assert_eq!(buf[2], 0x01);
        assert_eq!(buf[3], STX);
        assert_eq!(buf[4], b'V');
        assert_eq!(buf[5], ETX);
    }

    #[test]
    fn checksum_cancels_header_and_payload() {
        let data = b"\x05\x00hello";
        let mut buf = BytesMut::new();
        encode_frame(0x00, data, &mut buf).unwrap();

        let sum: u32 = 7 + data.iter().map(|b| *b as u32).sum::<u32>();
        let expected = ((256 - (sum % 256)) % 256) as u8;
        assert_eq!(*buf.last().unwrap(), expected);
        assert_eq!(checksum(7, 0, data), expected);
    }

    #[test]
    fn checksum_of_zero_sum_is_zero() {
        assert_eq!(checksum(1, 0xFF, &[0x00]), 0x00);
        assert_eq!(checksum(0x80, 0x40, &[0x40]), 0x00);
    }

    #[test]
    fn empty_payload_is_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_frame(0x00, b"", &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::EmptyPayload));
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_frame(0x00, &[0u8; 256], &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge {
                size: 256,
                max: 255
            }
        ));
    }

    #[test]
    fn max_payload_fits() {
        let mut buf = BytesMut::new();
        encode_frame(0x00, &[0xAA; MAX_PAYLOAD], &mut buf).unwrap();
        assert_eq!(buf[1], 0xFF);
        assert_eq!(buf.len(), FRAME_OVERHEAD + MAX_PAYLOAD);
    }

    #[test]
    fn text_frame_carries_utf8_bytes() {
        let frame = Frame::text(0x00, "héllo");
        assert_eq!(frame.data.as_ref(), "héllo".as_bytes());
        assert_eq!(frame.wire_size(), FRAME_OVERHEAD + 6);
    }

    #[cfg(feature = "async")]
    #[test]
    fn codec_decodes_frames_and_logs() {
        use tokio_util::codec::{Decoder, Encoder};

        use crate::framer::FramerEvent;

        let mut codec = MmpCodec::new();
        let mut wire = BytesMut::new();
        wire.extend_from_slice(b"\tLOG boot\n");
        codec
            .encode(Frame::new(0x00, &b"async"[..]), &mut wire)
            .unwrap();

        match codec.decode(&mut wire).unwrap() {
            Some(FramerEvent::Log(line)) => assert_eq!(line.text.as_ref(), b"LOG boot"),
            other => panic!("expected log line, got {other:?}"),
        }
        match codec.decode(&mut wire).unwrap() {
            Some(FramerEvent::Frame(frame)) => assert_eq!(frame.data.as_ref(), b"async"),
            other => panic!("expected frame, got {other:?}"),
        }
        assert!(codec.decode(&mut wire).unwrap().is_none());
        assert_eq!(codec.stats().frames, 1);
    }
}
