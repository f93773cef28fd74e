//! Confirm class methods (class id 85), a RabbitMQ extension enabling
//! publisher confirms on a channel.

use bytes::{Buf, BytesMut};

use crate::codec::{Error, FieldGet, FieldPut};

/// Class id of the confirm class.
pub const CLASS_ID: u16 = 85;
/// Method id of confirm.select.
pub const SELECT: u16 = 10;
/// Method id of confirm.select-ok.
pub const SELECT_OK: u16 = 11;

/// confirm.select
///
/// Puts the channel into confirm mode. Once enabled the broker acknowledges
/// every publication with basic.ack or basic.nack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Select {
    /// Do not wait for select-ok
    pub no_wait: bool,
}

impl Select {
    /// Encodes the argument section.
    pub fn encode_args(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_bool(self.no_wait);
        Ok(())
    }

    /// Decodes the argument section.
    pub fn decode_args<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        Ok(Self {
            no_wait: buf.get_bool()?,
        })
    }
}

/// confirm.select-ok
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOk;

impl SelectOk {
    /// Encodes the (empty) argument section.
    pub fn encode_args(&self, _buf: &mut BytesMut) -> Result<(), Error> {
        Ok(())
    }

    /// Decodes the (empty) argument section.
    pub fn decode_args<B: Buf>(_buf: &mut B) -> Result<Self, Error> {
        Ok(SelectOk)
    }
}
