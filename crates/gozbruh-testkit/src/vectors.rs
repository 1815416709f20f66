//! Golden wire vectors.
//!
//! Exact bytes of each frame as it appears on the socket, length prefix
//! included. A peer speaking the protocol must produce and accept these.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use gozbruh_core::ObjData;
use gozbruh_sync::{Frame, FrameCodec};

/// A golden wire vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The frame.
    pub frame: Frame,
    /// Expected bytes on the wire.
    pub wire: &'static [u8],
}

/// Get all golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "probe",
            frame: Frame::Probe,
            wire: b"\x00\x00\x00\x05check",
        },
        GoldenVector {
            name: "probe ack",
            frame: Frame::ProbeAck,
            wire: b"\x00\x00\x00\x02ok",
        },
        GoldenVector {
            name: "shutdown",
            frame: Frame::Shutdown,
            wire: b"\x00\x00\x00\x04EXIT",
        },
        GoldenVector {
            name: "loaded",
            frame: Frame::Loaded,
            wire: b"\x00\x00\x00\x06loaded",
        },
        GoldenVector {
            name: "one tool, two objects",
            frame: Frame::Manifest(ObjData::new(vec![(
                "Sphere1".into(),
                vec!["Sphere1".into(), "Sphere2".into()],
            )])),
            wire: b"\x00\x00\x00\x3e{\"command\":\"open\",\"objData\":{\"Sphere1\":[\"Sphere1\",\"Sphere2\"]}}",
        },
        GoldenVector {
            name: "two tools, order kept",
            frame: Frame::Manifest(ObjData::new(vec![
                ("Body".into(), vec!["Body".into(), "Arm".into()]),
                ("Head".into(), vec!["Eye".into()]),
            ])),
            wire: b"\x00\x00\x00\x43{\"command\":\"open\",\"objData\":{\"Body\":[\"Body\",\"Arm\"],\"Head\":[\"Eye\"]}}",
        },
    ]
}

/// Encode and decode every vector, returning the first mismatch.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let mut codec = FrameCodec::default();

        let mut encoded = BytesMut::new();
        codec
            .encode(vector.frame.clone(), &mut encoded)
            .map_err(|e| format!("{}: encode failed: {}", vector.name, e))?;
        if &encoded[..] != vector.wire {
            return Err(format!("{}: encoded bytes differ", vector.name));
        }

        let mut inbound = BytesMut::from(vector.wire);
        match codec.decode(&mut inbound) {
            Ok(Some(frame)) if frame == vector.frame => {}
            Ok(other) => return Err(format!("{}: decoded {:?}", vector.name, other)),
            Err(e) => return Err(format!("{}: decode failed: {}", vector.name, e)),
        }
    }
    Ok(())
}
