//! Basic class methods (class id 60): publish, consume, deliver, and the
//! acknowledgement family.

use bytes::{Buf, BytesMut};

use crate::codec::{Error, FieldGet, FieldPut};
use crate::value::FieldTable;

/// Class id of the basic class.
pub const CLASS_ID: u16 = 60;
/// Method id of basic.consume.
pub const CONSUME: u16 = 20;
/// Method id of basic.consume-ok.
pub const CONSUME_OK: u16 = 21;
/// Method id of basic.publish.
pub const PUBLISH: u16 = 40;
/// Method id of basic.return.
pub const RETURN: u16 = 50;
/// Method id of basic.deliver.
pub const DELIVER: u16 = 60;
/// Method id of basic.get.
pub const GET: u16 = 70;
/// Method id of basic.get-ok.
pub const GET_OK: u16 = 71;
/// Method id of basic.get-empty.
pub const GET_EMPTY: u16 = 72;
/// Method id of basic.ack.
pub const ACK: u16 = 80;
/// Method id of basic.nack.
pub const NACK: u16 = 120;

/// Flags carried by [`Consume`], packed into one octet on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeOptions {
    /// Do not deliver messages published on this connection
    pub no_local: bool,
    /// Deliveries need no acknowledgement
    pub no_ack: bool,
    /// Request exclusive consumer access
    pub exclusive: bool,
    /// Do not wait for consume-ok
    pub no_wait: bool,
}

impl ConsumeOptions {
    /// Packs the flags into their wire octet (bit 0 = no-local).
    pub fn to_octet(self) -> u8 {
        u8::from(self.no_local)
            | u8::from(self.no_ack) << 1
            | u8::from(self.exclusive) << 2
            | u8::from(self.no_wait) << 3
    }

    /// Unpacks the flags from their wire octet.
    pub fn from_octet(octet: u8) -> Self {
        Self {
            no_local: octet & 0x01 != 0,
            no_ack: octet & 0x02 != 0,
            exclusive: octet & 0x04 != 0,
            no_wait: octet & 0x08 != 0,
        }
    }
}

/// basic.consume
///
/// Starts a consumer. An empty consumer tag asks the server to generate
/// one; the tag in use comes back in [`ConsumeOk`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consume {
    /// Queue to consume from
    pub queue: String,
    /// Consumer tag, possibly empty
    pub consumer_tag: String,
    /// Consumer flags
    pub options: ConsumeOptions,
    /// Server-specific consume arguments
    pub arguments: FieldTable,
}

impl Consume {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.queue)?;
        buf.put_shortstr(&self.consumer_tag)?;
        buf.put_octet(self.options.to_octet());
        buf.put_table(&self.arguments)
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            queue: buf.get_shortstr()?,
            consumer_tag: buf.get_shortstr()?,
            options: ConsumeOptions::from_octet(buf.get_octet()?),
            arguments: buf.get_table()?,
        })
    }
}

/// basic.consume-ok
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeOk {
    /// Consumer tag in effect for the new consumer
    pub consumer_tag: String,
}

impl ConsumeOk {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_shortstr(&self.consumer_tag)
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            consumer_tag: buf.get_shortstr()?,
        })
    }
}

/// Flags carried by [`Publish`], packed into one octet on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Return the message if it cannot be routed to any queue
    pub mandatory: bool,
    /// Return the message if it cannot be delivered immediately
    pub immediate: bool,
}

impl PublishOptions {
    /// Packs the flags into their wire octet (bit 0 = mandatory).
    pub fn to_octet(self) -> u8 {
        u8::from(self.mandatory) | u8::from(self.immediate) << 1
    }

    /// Unpacks the flags from their wire octet.
    pub fn from_octet(octet: u8) -> Self {
        Self {
            mandatory: octet & 0x01 != 0,
            immediate: octet & 0x02 != 0,
        }
    }
}

/// basic.publish
///
/// The method frame is followed by a content header frame and zero or more
/// content body frames carrying the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Publish {
    /// Exchange to publish to; empty means the default exchange
    pub exchange: String,
    /// Routing key
    pub routing_key: String,
    /// Publication flags
    pub options: PublishOptions,
}

impl Publish {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.exchange)?;
        buf.put_shortstr(&self.routing_key)?;
        buf.put_octet(self.options.to_octet());
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            exchange: buf.get_shortstr()?,
            routing_key: buf.get_shortstr()?,
            options: PublishOptions::from_octet(buf.get_octet()?),
        })
    }
}

/// basic.return
///
/// Returns an undeliverable published message to the client, ahead of its
/// content header and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Return {
    /// Reply code explaining the return
    pub reply_code: u16,
    /// Human-readable reply text
    pub reply_text: String,
    /// Exchange the message was published to
    pub exchange: String,
    /// Routing key of the publication
    pub routing_key: String,
}

impl Return {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(self.reply_code);
        buf.put_shortstr(&self.reply_text)?;
        buf.put_shortstr(&self.exchange)?;
        buf.put_shortstr(&self.routing_key)
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            reply_code: buf.get_short()?,
            reply_text: buf.get_shortstr()?,
            exchange: buf.get_shortstr()?,
            routing_key: buf.get_shortstr()?,
        })
    }
}

/// basic.deliver
///
/// Pushes a message to a consumer, ahead of its content header and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deliver {
    /// Tag of the consumer the delivery is for
    pub consumer_tag: String,
    /// Server-assigned channel-local delivery tag
    pub delivery_tag: u64,
    /// True if the message may have been delivered before
    pub redelivered: bool,
    /// Exchange the message was published to
    pub exchange: String,
    /// Routing key of the publication
    pub routing_key: String,
}

impl Deliver {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_shortstr(&self.consumer_tag)?;
        buf.put_longlong(self.delivery_tag);
        buf.put_bool(self.redelivered);
        buf.put_shortstr(&self.exchange)?;
        buf.put_shortstr(&self.routing_key)
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            consumer_tag: buf.get_shortstr()?,
            delivery_tag: buf.get_longlong()?,
            redelivered: buf.get_bool()?,
            exchange: buf.get_shortstr()?,
            routing_key: buf.get_shortstr()?,
        })
    }
}

/// basic.get
///
/// Synchronous one-shot fetch; answered by [`GetOk`] or [`GetEmpty`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Get {
    /// Queue to fetch from
    pub queue: String,
    /// The fetched message needs no acknowledgement
    pub no_ack: bool,
}

impl Get {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.queue)?;
        buf.put_bool(self.no_ack);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            queue: buf.get_shortstr()?,
            no_ack: buf.get_bool()?,
        })
    }
}

/// basic.get-ok
///
/// Carries the fetched message, ahead of its content header and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOk {
    /// Server-assigned channel-local delivery tag
    pub delivery_tag: u64,
    /// True if the message may have been delivered before
    pub redelivered: bool,
    /// Exchange the message was published to
    pub exchange: String,
    /// Routing key of the publication
    pub routing_key: String,
    /// Number of messages remaining in the queue
    pub message_count: u32,
}

impl GetOk {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_longlong(self.delivery_tag);
        buf.put_bool(self.redelivered);
        buf.put_shortstr(&self.exchange)?;
        buf.put_shortstr(&self.routing_key)?;
        buf.put_long(self.message_count);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            delivery_tag: buf.get_longlong()?,
            redelivered: buf.get_bool()?,
            exchange: buf.get_shortstr()?,
            routing_key: buf.get_shortstr()?,
            message_count: buf.get_long()?,
        })
    }
}

/// basic.get-empty
///
/// The wire layout carries one reserved short string and nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetEmpty;

impl GetEmpty {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_shortstr("") // reserved-1
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_shortstr()?;
        Ok(GetEmpty)
    }
}

/// basic.ack
///
/// Sent by the client to acknowledge deliveries, and by the broker to
/// confirm publications when publisher confirms are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ack {
    /// Delivery tag being acknowledged; zero means "all outstanding"
    /// when `multiple` is set
    pub delivery_tag: u64,
    /// Acknowledge every tag up to and including `delivery_tag`
    pub multiple: bool,
}

impl Ack {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_longlong(self.delivery_tag);
        buf.put_bool(self.multiple);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            delivery_tag: buf.get_longlong()?,
            multiple: buf.get_bool()?,
        })
    }
}

/// basic.nack
///
/// Negative acknowledgement; a RabbitMQ extension to the basic class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nack {
    /// Delivery tag being rejected
    pub delivery_tag: u64,
    /// Reject every tag up to and including `delivery_tag`
    pub multiple: bool,
    /// Requeue the rejected message instead of discarding it
    pub requeue: bool,
}

impl Nack {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_longlong(self.delivery_tag);
        buf.put_octet(u8::from(self.multiple) | u8::from(self.requeue) << 1);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let delivery_tag = buf.get_longlong()?;
        let flags = buf.get_octet()?;
        Ok(Self {
            delivery_tag,
            multiple: flags & 0x01 != 0,
            requeue: flags & 0x02 != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn test_publish_args_layout() {
        let publish = Publish {
            exchange: "logs".to_string(),
            routing_key: "info".to_string(),
            options: PublishOptions {
                mandatory: true,
                immediate: false,
            },
        };
        let mut buf = BytesMut::new();
        publish.encode_args(&mut buf).unwrap();
        let expected = &[
            0x00, 0x00, // reserved-1
            0x04, b'l', b'o', b'g', b's', // exchange
            0x04, b'i', b'n', b'f', b'o', // routing key
            0x01, // mandatory
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn test_ack_args_layout() {
        let ack = Ack {
            delivery_tag: 3,
            multiple: true,
        };
        let mut buf = BytesMut::new();
        ack.encode_args(&mut buf).unwrap();
        assert_eq!(
            &buf[..],
            &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x01]
        );
    }

    #[test]
    fn test_deliver_roundtrip() {
        let deliver = Deliver {
            consumer_tag: "ctag-1".to_string(),
            delivery_tag: 42,
            redelivered: true,
            exchange: "logs".to_string(),
            routing_key: "info".to_string(),
        };
        let mut buf = BytesMut::new();
        deliver.encode_args(&mut buf).unwrap();
        assert_eq!(Deliver::decode_args(&mut buf.freeze()).unwrap(), deliver);
    }

    #[test]
    fn test_get_empty_consumes_reserved_shortstr() {
        let mut buf = BytesMut::new();
        GetEmpty.encode_args(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00]);

        let mut src = buf.freeze();
        GetEmpty::decode_args(&mut src).unwrap();
        assert!(src.is_empty());
    }

    #[test]
    fn test_nack_flag_octet() {
        let nack = Nack {
            delivery_tag: 1,
            multiple: false,
            requeue: true,
        };
        let mut buf = BytesMut::new();
        nack.encode_args(&mut buf).unwrap();
        assert_eq!(buf[8], 0x02);

        let decoded = Nack::decode_args(&mut buf.freeze()).unwrap();
        assert!(!decoded.multiple);
        assert!(decoded.requeue);
    }
}
