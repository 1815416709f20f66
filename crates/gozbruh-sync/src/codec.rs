//! Length-prefixed framing.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::error::SyncError;
use crate::messages::Frame;

/// Default cap on a single frame.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// [`Frame`] codec over a 4-byte big-endian length prefix.
#[derive(Debug)]
pub struct FrameCodec {
    length_codec: LengthDelimitedCodec,
    max_frame_length: usize,
}

impl FrameCodec {
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            length_codec: LengthDelimitedCodec::builder()
                .max_frame_length(max_frame_length)
                .new_codec(),
            max_frame_length,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = SyncError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let frame = match self.length_codec.decode(src) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(SyncError::FrameTooLarge {
                    max: self.max_frame_length,
                })
            }
            Err(e) => return Err(e.into()),
        };

        Frame::parse(&frame).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = SyncError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = item.to_bytes()?;
        if payload.len() > self.max_frame_length {
            return Err(SyncError::FrameTooLarge {
                max: self.max_frame_length,
            });
        }

        self.length_codec.encode(payload, dst).map_err(SyncError::Io)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use gozbruh_core::ObjData;
    use tokio_test::io::Builder;
    use tokio_util::codec::FramedRead;

    use super::*;

    fn manifest() -> Frame {
        Frame::Manifest(ObjData::new(vec![(
            "Body".into(),
            vec!["Body".into(), "Arm".into()],
        )]))
    }

    #[test]
    fn test_length_prefix() {
        let mut buffer = BytesMut::new();
        FrameCodec::default()
            .encode(Frame::Probe, &mut buffer)
            .unwrap();
        assert_eq!(&buffer[..], b"\x00\x00\x00\x05check");
    }

    #[test]
    fn test_partial_frame_waits() {
        let mut codec = FrameCodec::default();
        let mut buffer = BytesMut::from(&b"\x00\x00\x00\x05che"[..]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());
        buffer.extend_from_slice(b"ck");
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(Frame::Probe));
    }

    #[test]
    fn test_oversized_frame_is_refused() {
        let mut codec = FrameCodec::new(8);
        let mut buffer = BytesMut::new();
        assert!(matches!(
            codec.encode(manifest(), &mut buffer),
            Err(SyncError::FrameTooLarge { max: 8 })
        ));
        assert!(buffer.is_empty());

        let mut inbound = BytesMut::from(&b"\x00\x00\x01\x00"[..]);
        assert!(matches!(
            codec.decode(&mut inbound),
            Err(SyncError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_frame_stream() {
        let mut buffer = BytesMut::new();
        let mut codec = FrameCodec::default();
        codec.encode(Frame::Probe, &mut buffer).unwrap();
        codec.encode(manifest(), &mut buffer).unwrap();

        let mut stream = Builder::new().read(&buffer.freeze()).build();
        let mut framed = FramedRead::new(&mut stream, FrameCodec::default());

        assert_eq!(framed.next().await.unwrap().unwrap(), Frame::Probe);
        assert_eq!(framed.next().await.unwrap().unwrap(), manifest());
        assert!(framed.next().await.is_none());
    }
}
