//! Exchange class methods (class id 40).

use bytes::{Buf, BytesMut};

use crate::codec::{Error, FieldGet, FieldPut};
use crate::value::FieldTable;

/// Class id of the exchange class.
pub const CLASS_ID: u16 = 40;
/// Method id of exchange.declare.
pub const DECLARE: u16 = 10;
/// Method id of exchange.declare-ok.
pub const DECLARE_OK: u16 = 11;
/// Method id of exchange.delete.
pub const DELETE: u16 = 20;
/// Method id of exchange.delete-ok.
pub const DELETE_OK: u16 = 21;

/// Flags carried by [`Declare`], packed into one octet on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclareOptions {
    /// Do not create; the declare fails unless the exchange already exists
    pub passive: bool,
    /// Survive a broker restart
    pub durable: bool,
    /// Delete when the last binding is removed
    pub auto_delete: bool,
    /// May only be published to by other exchanges
    pub internal: bool,
    /// Do not wait for declare-ok
    pub no_wait: bool,
}

impl DeclareOptions {
    /// Packs the flags into their wire octet (bit 0 = passive).
    pub fn to_octet(self) -> u8 {
        u8::from(self.passive)
            | u8::from(self.durable) << 1
            | u8::from(self.auto_delete) << 2
            | u8::from(self.internal) << 3
            | u8::from(self.no_wait) << 4
    }

    /// Unpacks the flags from their wire octet.
    pub fn from_octet(octet: u8) -> Self {
        Self {
            passive: octet & 0x01 != 0,
            durable: octet & 0x02 != 0,
            auto_delete: octet & 0x04 != 0,
            internal: octet & 0x08 != 0,
            no_wait: octet & 0x10 != 0,
        }
    }
}

/// exchange.declare
///
/// Creates an exchange, or verifies an existing one against the requested
/// type and options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declare {
    /// Exchange name
    pub exchange: String,
    /// Exchange type: "direct", "fanout", "topic", or "headers"
    pub kind: String,
    /// Declaration flags
    pub options: DeclareOptions,
    /// Server-specific declaration arguments
    pub arguments: FieldTable,
}

impl Declare {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.exchange)?;
        buf.put_shortstr(&self.kind)?;
        buf.put_octet(self.options.to_octet());
        buf.put_table(&self.arguments)
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            exchange: buf.get_shortstr()?,
            kind: buf.get_shortstr()?,
            options: DeclareOptions::from_octet(buf.get_octet()?),
            arguments: buf.get_table()?,
        })
    }
}

/// exchange.declare-ok
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclareOk;

impl DeclareOk {
    /// Encodes the (empty) argument section.
    pub fn encode_args(&self, _buf: &mut BytesMut) -> Result<(), Error> {
        Ok(())
    }

    /// Decodes the (empty) argument section.
    pub fn decode_args<B: Buf>(_buf: &mut B) -> Result<Self, Error> {
        Ok(DeclareOk)
    }
}

/// Flags carried by [`Delete`], packed into one octet on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Only delete if the exchange has no bindings
    pub if_unused: bool,
    /// Do not wait for delete-ok
    pub no_wait: bool,
}

impl DeleteOptions {
    /// Packs the flags into their wire octet (bit 0 = if-unused).
    pub fn to_octet(self) -> u8 {
        u8::from(self.if_unused) | u8::from(self.no_wait) << 1
    }

    /// Unpacks the flags from their wire octet.
    pub fn from_octet(octet: u8) -> Self {
        Self {
            if_unused: octet & 0x01 != 0,
            no_wait: octet & 0x02 != 0,
        }
    }
}

/// exchange.delete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delete {
    /// Exchange name
    pub exchange: String,
    /// Deletion flags
    pub options: DeleteOptions,
}

impl Delete {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(0); // reserved-1
        buf.put_shortstr(&self.exchange)?;
        buf.put_octet(self.options.to_octet());
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let _reserved = buf.get_short()?;
        Ok(Self {
            exchange: buf.get_shortstr()?,
            options: DeleteOptions::from_octet(buf.get_octet()?),
        })
    }
}

/// exchange.delete-ok
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOk;

impl DeleteOk {
    /// Encodes the (empty) argument section.
    pub fn encode_args(&self, _buf: &mut BytesMut) -> Result<(), Error> {
        Ok(())
    }

    /// Decodes the (empty) argument section.
    pub fn decode_args<B: Buf>(_buf: &mut B) -> Result<Self, Error> {
        Ok(DeleteOk)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn test_declare_args_layout() {
        let declare = Declare {
            exchange: "logs".to_string(),
            kind: "fanout".to_string(),
            options: DeclareOptions {
                durable: true,
                ..Default::default()
            },
            arguments: FieldTable::new(),
        };
        let mut buf = BytesMut::new();
        declare.encode_args(&mut buf).unwrap();
        let expected = &[
            0x00, 0x00, // reserved-1
            0x04, b'l', b'o', b'g', b's', // exchange
            0x06, b'f', b'a', b'n', b'o', b'u', b't', // type
            0x02, // durable
            0x00, 0x00, 0x00, 0x00, // arguments
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn test_declare_options_octet() {
        let options = DeclareOptions {
            passive: true,
            durable: false,
            auto_delete: true,
            internal: false,
            no_wait: true,
        };
        assert_eq!(options.to_octet(), 0b10101);
        assert_eq!(DeclareOptions::from_octet(0b10101), options);
    }

    #[test]
    fn test_delete_args_layout() {
        let delete = Delete {
            exchange: "logs".to_string(),
            options: DeleteOptions {
                if_unused: true,
                no_wait: true,
            },
        };
        let mut buf = BytesMut::new();
        delete.encode_args(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00, 0x04, b'l', b'o', b'g', b's', 0x03]);
    }
}
