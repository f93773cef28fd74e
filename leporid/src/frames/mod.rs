//! AMQP 0-9-1 frame types and the corresponding encoder and decoder
//!
//! Every frame on the wire is `type (u8) + channel (u16) + size (u32) +
//! payload + 0xCE`. The frame type selects how the payload is
//! interpreted: a method with typed arguments, a content header, a raw
//! chunk of content body, or a heartbeat with no payload at all.

use bytes::BytesMut;
use leporid_types::codec::{FieldGet, FieldPut};
use leporid_types::method::Method;
use leporid_types::BasicProperties;

use crate::Payload;

mod codec;
mod error;

pub use codec::FrameCodec;
pub use error::Error;

/// Frame type octet of a method frame.
pub const FRAME_METHOD: u8 = 1;
/// Frame type octet of a content header frame.
pub const FRAME_HEADER: u8 = 2;
/// Frame type octet of a content body frame.
pub const FRAME_BODY: u8 = 3;
/// Frame type octet of a heartbeat frame.
pub const FRAME_HEARTBEAT: u8 = 8;
/// Sentinel octet terminating every frame.
pub const FRAME_END: u8 = 0xCE;

/// An AMQP 0-9-1 frame
#[derive(Debug)]
pub struct Frame {
    /// Channel the frame belongs to; zero is the connection channel
    pub channel: u16,

    /// Frame payload
    pub body: FrameBody,
}

impl Frame {
    /// Creates a new frame on `channel`
    pub fn new(channel: u16, body: impl Into<FrameBody>) -> Self {
        Self {
            channel,
            body: body.into(),
        }
    }

    /// Get the channel of the frame
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Consume the frame to get the frame body
    pub fn into_body(self) -> FrameBody {
        self.body
    }
}

/// AMQP 0-9-1 frame body
pub enum FrameBody {
    /// A method frame: class id, method id and typed arguments
    Method(Method),

    /// A content header frame announcing body size and properties
    Header(ContentHeader),

    /// One chunk of content body bytes
    Body(Payload),

    /// A heartbeat frame; carries nothing and is only valid on channel 0
    Heartbeat,
}

impl std::fmt::Debug for FrameBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Method(arg0) => f.debug_tuple("Method").field(arg0).finish(),
            Self::Header(arg0) => f.debug_tuple("Header").field(arg0).finish(),
            Self::Body(arg0) => f
                .debug_struct("Body")
                .field("payload.len", &arg0.len())
                .finish(),
            Self::Heartbeat => write!(f, "Heartbeat"),
        }
    }
}

impl From<Method> for FrameBody {
    fn from(method: Method) -> Self {
        Self::Method(method)
    }
}

impl From<ContentHeader> for FrameBody {
    fn from(header: ContentHeader) -> Self {
        Self::Header(header)
    }
}

/// Content header frame payload.
///
/// The weight field mandated by the specification is always zero and is
/// not represented.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentHeader {
    /// Class of the method frame the content follows
    pub class_id: u16,

    /// Total size of the content body in bytes, across all body frames
    pub body_size: u64,

    /// Content properties
    pub properties: BasicProperties,
}

impl ContentHeader {
    /// Creates a new content header
    pub fn new(class_id: u16, body_size: u64, properties: BasicProperties) -> Self {
        Self {
            class_id,
            body_size,
            properties,
        }
    }

    /// Encodes the header payload into `buf`
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(self.class_id);
        buf.put_short(0); // weight
        buf.put_longlong(self.body_size);
        self.properties.encode(buf)?;
        Ok(())
    }

    /// Decodes a header payload from `buf`
    pub fn decode<B: FieldGet>(buf: &mut B) -> Result<Self, Error> {
        let class_id = buf.get_short()?;
        let _weight = buf.get_short()?;
        let body_size = buf.get_longlong()?;
        let properties = BasicProperties::decode(buf)?;
        Ok(Self {
            class_id,
            body_size,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use leporid_types::method::basic;

    use super::*;

    #[test]
    fn test_content_header_layout() {
        let properties = BasicProperties {
            content_type: Some(String::from("text.plain")),
            ..Default::default()
        };
        let header = ContentHeader::new(basic::CLASS_ID, 5, properties);

        let mut buf = BytesMut::new();
        header.encode(&mut buf).unwrap();

        assert_eq!(
            &buf[..],
            &[
                0x00, 0x3c, // class 60
                0x00, 0x00, // weight
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, // body size
                0x80, 0x00, // property flags: content-type only
                0x0a, b't', b'e', b'x', b't', b'.', b'p', b'l', b'a', b'i', b'n',
            ]
        );
    }

    #[test]
    fn test_content_header_roundtrip() {
        let properties = BasicProperties {
            content_type: Some(String::from("application/json")),
            delivery_mode: Some(2),
            message_id: Some(String::from("0")),
            ..Default::default()
        };
        let header = ContentHeader::new(basic::CLASS_ID, 1024, properties);

        let mut buf = BytesMut::new();
        header.encode(&mut buf).unwrap();
        let decoded = ContentHeader::decode(&mut buf).unwrap();

        assert_eq!(decoded, header);
    }
}
