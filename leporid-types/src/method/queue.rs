//! Queue class methods (class id 50).

use bytes::{Buf, BytesMut};

use crate::codec::{Error, FieldGet, FieldPut};
use crate::value::FieldTable;

/// Class id of the queue class.
pub const CLASS_ID: u16 = 50;
/// Method id of queue.declare.
pub const DECLARE: u16 = 10;
/// Method id of queue.declare-ok.
pub const DECLARE_OK: u16 = 11;
/// Method id of queue.bind.
pub const BIND: u16 = 20;
/// Method id of queue.bind-ok.
pub const BIND_OK: u16 = 21;
/// Method id of queue.purge.
pub const PURGE: u16 = 30;
/// Method id of queue.purge-ok.
pub const PURGE_OK: u16 = 31;
/// Method id of queue.delete.
pub const DELETE: u16 = 40;
/// Method id of queue.delete-ok.
pub const DELETE_OK: u16 = 41;
/// Method id of queue.unbind.
pub const UNBIND: u16 = 50;
/// Method id of queue.unbind-ok.
pub const UNBIND_OK: u16 = 51;

/// Flags carried by [`Declare`], packed into one octet on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclareOptions {
    /// Do not create; the declare fails unless the queue already exists
    pub passive: bool,
    /// Survive a broker restart
    pub durable: bool,
    /// Only accessible on the declaring connection, deleted when it closes
    pub exclusive: bool,
    /// Delete when the last consumer cancels
    pub auto_delete: bool,
    /// Do not wait for declare-ok
    pub no_wait: bool,
}

impl DeclareOptions {
    /// Packs the flags into their wire octet (bit 0 = passive).
    pub fn to_octet(self) -> u8 {
        u8::from(self.passive)
            | u8::from(self.durable) << 1
            | u8::from(self.exclusive) << 2
            | u8::from(self.auto_delete) << 3
            | u8::from(self.no_wait) << 4
    }

    /// Unpacks the flags from their wire octet.
    pub fn from_octet(octet: u8) -> Self {
        Self {
            passive: octet & 0x01 != 0,
            durable: octet & 0x02 != 0,
            exclusive: octet & 0x04 != 0,
            auto_delete: octet & 0x08 != 0,
            no_wait: octet & 0x10 != 0,
        }
    }
}

/// queue.declare
///
/// An empty queue name asks the server to assign one; the assigned name
/// comes back in [`DeclareOk`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declare {
    /// Queue name, possibly empty
    pub queue: String,
    /// Declaration flags
    pub options: DeclareOptions,
    /// Server-specific declaration arguments
    pub arguments: FieldTable,
}

impl Declare {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.queue)?;
        buf.put_octet(self.options.to_octet());
        buf.put_table(&self.arguments)
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            queue: buf.get_shortstr()?,
            options: DeclareOptions::from_octet(buf.get_octet()?),
            arguments: buf.get_table()?,
        })
    }
}

/// queue.declare-ok
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclareOk {
    /// Queue name, server-assigned when the declare left it empty
    pub queue: String,
    /// Number of messages in the queue
    pub message_count: u32,
    /// Number of active consumers
    pub consumer_count: u32,
}

impl DeclareOk {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_shortstr(&self.queue)?;
        buf.put_long(self.message_count);
        buf.put_long(self.consumer_count);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            queue: buf.get_shortstr()?,
            message_count: buf.get_long()?,
            consumer_count: buf.get_long()?,
        })
    }
}

/// queue.bind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bind {
    /// Queue name
    pub queue: String,
    /// Exchange to bind to
    pub exchange: String,
    /// Routing key for the binding
    pub routing_key: String,
    /// Do not wait for bind-ok
    pub no_wait: bool,
    /// Binding arguments, used by the headers exchange type
    pub arguments: FieldTable,
}

impl Bind {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.queue)?;
        buf.put_shortstr(&self.exchange)?;
        buf.put_shortstr(&self.routing_key)?;
        buf.put_bool(self.no_wait);
        buf.put_table(&self.arguments)
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            queue: buf.get_shortstr()?,
            exchange: buf.get_shortstr()?,
            routing_key: buf.get_shortstr()?,
            no_wait: buf.get_bool()?,
            arguments: buf.get_table()?,
        })
    }
}

/// queue.bind-ok
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindOk;

impl BindOk {
    /// Encodes the (empty) argument section.
    pub fn encode_args(&self, _buf: &mut BytesMut) -> Result<(), Error> {
        Ok(())
    }

    /// Decodes the (empty) argument section.
    pub fn decode_args<B: Buf>(_buf: &mut B) -> Result<Self, Error> {
        Ok(BindOk)
    }
}

/// queue.purge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Purge {
    /// Queue name
    pub queue: String,
    /// Do not wait for purge-ok
    pub no_wait: bool,
}

impl Purge {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.queue)?;
        buf.put_bool(self.no_wait);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            queue: buf.get_shortstr()?,
            no_wait: buf.get_bool()?,
        })
    }
}

/// queue.purge-ok
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeOk {
    /// Number of messages discarded
    pub message_count: u32,
}

impl PurgeOk {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_long(self.message_count);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            message_count: buf.get_long()?,
        })
    }
}

/// Flags carried by [`Delete`], packed into one octet on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Only delete if the queue has no consumers
    pub if_unused: bool,
    /// Only delete if the queue has no messages
    pub if_empty: bool,
    /// Do not wait for delete-ok
    pub no_wait: bool,
}

impl DeleteOptions {
    /// Packs the flags into their wire octet (bit 0 = if-unused).
    pub fn to_octet(self) -> u8 {
        u8::from(self.if_unused) | u8::from(self.if_empty) << 1 | u8::from(self.no_wait) << 2
    }

    /// Unpacks the flags from their wire octet.
    pub fn from_octet(octet: u8) -> Self {
        Self {
            if_unused: octet & 0x01 != 0,
            if_empty: octet & 0x02 != 0,
            no_wait: octet & 0x04 != 0,
        }
    }
}

/// queue.delete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delete {
    /// Queue name
    pub queue: String,
    /// Deletion flags
    pub options: DeleteOptions,
}

impl Delete {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.queue)?;
        buf.put_octet(self.options.to_octet());
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            queue: buf.get_shortstr()?,
            options: DeleteOptions::from_octet(buf.get_octet()?),
        })
    }
}

/// queue.delete-ok
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOk {
    /// Number of messages deleted with the queue
    pub message_count: u32,
}

impl DeleteOk {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_long(self.message_count);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            message_count: buf.get_long()?,
        })
    }
}

/// queue.unbind
///
/// Unlike queue.bind this method carries no no-wait flag; the flag octet is
/// absent from the wire layout entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unbind {
    /// Queue name
    pub queue: String,
    /// Exchange to unbind from
    pub exchange: String,
    /// Routing key of the binding
    pub routing_key: String,
    /// Binding arguments
    pub arguments: FieldTable,
}

impl Unbind {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.queue)?;
        buf.put_shortstr(&self.exchange)?;
        buf.put_shortstr(&self.routing_key)?;
        buf.put_table(&self.arguments)
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            queue: buf.get_shortstr()?,
            exchange: buf.get_shortstr()?,
            routing_key: buf.get_shortstr()?,
            arguments: buf.get_table()?,
        })
    }
}

/// queue.unbind-ok
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnbindOk;

impl UnbindOk {
    /// Encodes the (empty) argument section.
    pub fn encode_args(&self, _buf: &mut BytesMut) -> Result<(), Error> {
        Ok(())
    }

    /// Decodes the (empty) argument section.
    pub fn decode_args<B: Buf>(_buf: &mut B) -> Result<Self, Error> {
        Ok(UnbindOk)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn test_declare_args_layout() {
        let declare = Declare {
            queue: "tasks".to_string(),
            options: DeclareOptions {
                exclusive: true,
                auto_delete: true,
                ..Default::default()
            },
            arguments: FieldTable::new(),
        };
        let mut buf = BytesMut::new();
        declare.encode_args(&mut buf).unwrap();
        let expected = &[
            0x00, 0x00, // reserved-1
            0x05, b't', b'a', b's', b'k', b's', // queue
            0x0c, // exclusive | auto-delete
            0x00, 0x00, 0x00, 0x00, // arguments
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn test_declare_ok_decode() {
        let mut buf = BytesMut::new();
        DeclareOk {
            queue: "amq.gen-x".to_string(),
            message_count: 3,
            consumer_count: 1,
        }
        .encode_args(&mut buf)
        .unwrap();

        let decoded = DeclareOk::decode_args(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.queue, "amq.gen-x");
        assert_eq!(decoded.message_count, 3);
        assert_eq!(decoded.consumer_count, 1);
    }

    #[test]
    fn test_delete_options_octet() {
        let options = DeleteOptions {
            if_unused: true,
            if_empty: true,
            no_wait: true,
        };
        assert_eq!(options.to_octet(), 0x07);
        assert!(!DeleteOptions::from_octet(0x05).if_empty);
    }

    #[test]
    fn test_unbind_has_no_flag_octet() {
        let bind = Bind {
            queue: "q".to_string(),
            exchange: "e".to_string(),
            routing_key: "k".to_string(),
            no_wait: false,
            arguments: FieldTable::new(),
        };
        let unbind = Unbind {
            queue: "q".to_string(),
            exchange: "e".to_string(),
            routing_key: "k".to_string(),
            arguments: FieldTable::new(),
        };

        let mut bind_buf = BytesMut::new();
        bind.encode_args(&mut bind_buf).unwrap();
        let mut unbind_buf = BytesMut::new();
        unbind.encode_args(&mut unbind_buf).unwrap();

        assert_eq!(bind_buf.len(), unbind_buf.len() + 1);
    }
}
