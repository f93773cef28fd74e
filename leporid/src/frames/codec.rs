//! Frame encoder and decoder for use with `tokio_util` framed transports

use bytes::BytesMut;
use leporid_types::codec::{FieldGet, FieldPut};
use leporid_types::method::Method;
use tokio_util::codec::{Decoder, Encoder};

use super::{
    ContentHeader, Error, Frame, FrameBody, FRAME_BODY, FRAME_END, FRAME_HEADER, FRAME_HEARTBEAT,
    FRAME_METHOD,
};

/// Encoder and decoder of AMQP 0-9-1 frames.
///
/// The decoder is incremental: it returns `Ok(None)` until a complete
/// frame, including the trailing end octet, has been buffered.
#[derive(Debug)]
pub struct FrameCodec {
    /// Negotiated maximum frame size including the 8 envelope octets;
    /// zero disables the limit
    max_frame_size: usize,
}

impl FrameCodec {
    /// Creates a codec enforcing `max_frame_size` on inbound frames
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let Frame { channel, body } = item;

        // Body frames carry their payload by ownership and already know
        // its length; everything else is measured through a scratch
        // buffer first.
        let (frame_type, payload) = match body {
            FrameBody::Method(method) => {
                let mut buf = BytesMut::new();
                method.encode(&mut buf)?;
                (FRAME_METHOD, buf.freeze())
            }
            FrameBody::Header(header) => {
                let mut buf = BytesMut::new();
                header.encode(&mut buf)?;
                (FRAME_HEADER, buf.freeze())
            }
            FrameBody::Body(payload) => (FRAME_BODY, payload),
            FrameBody::Heartbeat => (FRAME_HEARTBEAT, crate::Payload::new()),
        };

        dst.reserve(payload.len() + 8);
        dst.put_octet(frame_type);
        dst.put_short(channel);
        dst.put_long(payload.len() as u32);
        dst.extend_from_slice(&payload);
        dst.put_octet(FRAME_END);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 7 {
            return Ok(None);
        }

        // Payload size sits at offset 3; peek it without consuming so a
        // partial frame stays in the buffer untouched.
        let size = u32::from_be_bytes([src[3], src[4], src[5], src[6]]) as usize;
        let total = size + 8;
        if self.max_frame_size != 0 && total > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size: total,
                max: self.max_frame_size,
            });
        }
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        let frame_type = frame.get_octet()?;
        let channel = frame.get_short()?;
        let _size = frame.get_long()?;
        let mut payload = frame.split_to(size);
        if frame.get_octet()? != FRAME_END {
            return Err(Error::MissingFrameEnd);
        }

        let body = match frame_type {
            FRAME_METHOD => FrameBody::Method(Method::decode(&mut payload)?),
            FRAME_HEADER => FrameBody::Header(ContentHeader::decode(&mut payload)?),
            FRAME_BODY => FrameBody::Body(payload.freeze()),
            FRAME_HEARTBEAT => FrameBody::Heartbeat,
            other => return Err(Error::InvalidFrameType(other)),
        };
        Ok(Some(Frame { channel, body }))
    }
}
