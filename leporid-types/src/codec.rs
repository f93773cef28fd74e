//! Primitive field encoding and decoding for AMQP 0-9-1 frame payloads.
//!
//! The wire grammar is positional: every method lays its arguments out as a
//! fixed sequence of octets, shorts, longs, short strings, long strings, and
//! field tables. [`FieldGet`] and [`FieldPut`] extend the [`Buf`]/[`BufMut`]
//! traits with those reads and writes; all multi-octet integers are network
//! byte order.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::value::{DecimalValue, FieldTable, FieldValue};

/// Errors raised while encoding or decoding wire fields.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Buffer ended in the middle of a field
    #[error("Unexpected end of buffer")]
    UnexpectedEnd,

    /// Short strings carry a single length octet
    #[error("Short string exceeds 255 bytes")]
    ShortStringTooLong,

    /// Long strings, tables, and arrays carry a 32-bit length prefix
    #[error("Field section exceeds the u32 length prefix")]
    SectionTooLong,

    /// Found invalid UTF-8 encoding
    #[error("Invalid UTF-8 encoding")]
    InvalidUtf8Encoding,

    /// Unknown field-value type tag inside a table or array
    #[error("Unknown field value tag 0x{0:02x}")]
    UnknownFieldTag(u8),

    /// The (class-id, method-id) pair is not part of the supported surface
    #[error("Unknown method {0}:{1}")]
    UnknownMethod(u16, u16),
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}

/// Checked field reads over any [`Buf`].
///
/// A buffer that ends mid-field yields [`Error::UnexpectedEnd`] instead of
/// panicking, so partially received payloads surface as errors the caller
/// can log and drop.
pub trait FieldGet: Buf {
    /// Reads one octet.
    fn get_octet(&mut self) -> Result<u8, Error> {
        if self.remaining() < 1 {
            return Err(Error::UnexpectedEnd);
        }
        Ok(self.get_u8())
    }

    /// Reads a 16-bit unsigned integer.
    fn get_short(&mut self) -> Result<u16, Error> {
        if self.remaining() < 2 {
            return Err(Error::UnexpectedEnd);
        }
        Ok(self.get_u16())
    }

    /// Reads a 32-bit unsigned integer.
    fn get_long(&mut self) -> Result<u32, Error> {
        if self.remaining() < 4 {
            return Err(Error::UnexpectedEnd);
        }
        Ok(self.get_u32())
    }

    /// Reads a 64-bit unsigned integer.
    fn get_longlong(&mut self) -> Result<u64, Error> {
        if self.remaining() < 8 {
            return Err(Error::UnexpectedEnd);
        }
        Ok(self.get_u64())
    }

    /// Reads one octet as a boolean. Any non-zero value is `true`.
    fn get_bool(&mut self) -> Result<bool, Error> {
        Ok(self.get_octet()? != 0)
    }

    /// Reads a length-prefixed short string (single length octet, UTF-8).
    fn get_shortstr(&mut self) -> Result<String, Error> {
        let len = self.get_octet()? as usize;
        if self.remaining() < len {
            return Err(Error::UnexpectedEnd);
        }
        let bytes = self.copy_to_bytes(len);
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Reads a length-prefixed long string (32-bit length, raw octets).
    fn get_longstr(&mut self) -> Result<Bytes, Error> {
        let len = self.get_long()? as usize;
        if self.remaining() < len {
            return Err(Error::UnexpectedEnd);
        }
        Ok(self.copy_to_bytes(len))
    }

    /// Reads a field table: a 32-bit byte length followed by name/value pairs.
    fn get_table(&mut self) -> Result<FieldTable, Error> {
        let len = self.get_long()? as usize;
        if self.remaining() < len {
            return Err(Error::UnexpectedEnd);
        }
        let mut section = self.copy_to_bytes(len);
        let mut table = FieldTable::new();
        while section.has_remaining() {
            let name = section.get_shortstr()?;
            let value = section.get_field_value()?;
            table.insert(name, value);
        }
        Ok(table)
    }

    /// Reads one tagged field value.
    fn get_field_value(&mut self) -> Result<FieldValue, Error> {
        let tag = self.get_octet()?;
        let value = match tag {
            b't' => FieldValue::Boolean(self.get_bool()?),
            b'b' => FieldValue::ShortShortInt(self.get_octet()? as i8),
            b'B' => FieldValue::ShortShortUint(self.get_octet()?),
            b's' => FieldValue::ShortInt(self.get_short()? as i16),
            b'u' => FieldValue::ShortUint(self.get_short()?),
            b'I' => FieldValue::LongInt(self.get_long()? as i32),
            b'i' => FieldValue::LongUint(self.get_long()?),
            b'l' => FieldValue::LongLongInt(self.get_longlong()? as i64),
            b'f' => FieldValue::Float(f32::from_bits(self.get_long()?)),
            b'd' => FieldValue::Double(f64::from_bits(self.get_longlong()?)),
            b'D' => FieldValue::Decimal(DecimalValue {
                scale: self.get_octet()?,
                value: self.get_long()?,
            }),
            b'S' => FieldValue::LongString(String::from_utf8(self.get_longstr()?.to_vec())?),
            b'A' => {
                let len = self.get_long()? as usize;
                if self.remaining() < len {
                    return Err(Error::UnexpectedEnd);
                }
                let mut section = self.copy_to_bytes(len);
                let mut items = Vec::new();
                while section.has_remaining() {
                    items.push(section.get_field_value()?);
                }
                FieldValue::Array(items)
            }
            b'T' => FieldValue::Timestamp(self.get_longlong()?),
            b'F' => FieldValue::Table(self.get_table()?),
            b'V' => FieldValue::Void,
            b'x' => FieldValue::ByteArray(self.get_longstr()?),
            _ => return Err(Error::UnknownFieldTag(tag)),
        };
        Ok(value)
    }
}

impl<B: Buf> FieldGet for B {}

/// Field writes over any [`BufMut`].
pub trait FieldPut: BufMut {
    /// Writes one octet.
    fn put_octet(&mut self, value: u8) {
        self.put_u8(value);
    }

    /// Writes a 16-bit unsigned integer.
    fn put_short(&mut self, value: u16) {
        self.put_u16(value);
    }

    /// Writes a 32-bit unsigned integer.
    fn put_long(&mut self, value: u32) {
        self.put_u32(value);
    }

    /// Writes a 64-bit unsigned integer.
    fn put_longlong(&mut self, value: u64) {
        self.put_u64(value);
    }

    /// Writes a boolean as one octet.
    fn put_bool(&mut self, value: bool) {
        self.put_u8(u8::from(value));
    }

    /// Writes a short string (single length octet, UTF-8 payload).
    fn put_shortstr(&mut self, value: &str) -> Result<(), Error> {
        if value.len() > u8::MAX as usize {
            return Err(Error::ShortStringTooLong);
        }
        self.put_u8(value.len() as u8);
        self.put_slice(value.as_bytes());
        Ok(())
    }

    /// Writes a long string (32-bit length prefix, raw octets).
    fn put_longstr(&mut self, value: &[u8]) -> Result<(), Error> {
        let len = u32::try_from(value.len()).map_err(|_| Error::SectionTooLong)?;
        self.put_u32(len);
        self.put_slice(value);
        Ok(())
    }

    /// Writes a field table with its 32-bit byte-length prefix.
    ///
    /// The length is only known after the entries are laid out, so entries
    /// are staged in a scratch buffer first.
    fn put_table(&mut self, table: &FieldTable) -> Result<(), Error> {
        let mut section = BytesMut::new();
        for (name, value) in table.iter() {
            section.put_shortstr(name)?;
            section.put_field_value(value)?;
        }
        let len = u32::try_from(section.len()).map_err(|_| Error::SectionTooLong)?;
        self.put_u32(len);
        self.put_slice(&section);
        Ok(())
    }

    /// Writes one tagged field value.
    fn put_field_value(&mut self, value: &FieldValue) -> Result<(), Error> {
        match value {
            FieldValue::Boolean(v) => {
                self.put_u8(b't');
                self.put_bool(*v);
            }
            FieldValue::ShortShortInt(v) => {
                self.put_u8(b'b');
                self.put_i8(*v);
            }
            FieldValue::ShortShortUint(v) => {
                self.put_u8(b'B');
                self.put_u8(*v);
            }
            FieldValue::ShortInt(v) => {
                self.put_u8(b's');
                self.put_i16(*v);
            }
            FieldValue::ShortUint(v) => {
                self.put_u8(b'u');
                self.put_u16(*v);
            }
            FieldValue::LongInt(v) => {
                self.put_u8(b'I');
                self.put_i32(*v);
            }
            FieldValue::LongUint(v) => {
                self.put_u8(b'i');
                self.put_u32(*v);
            }
            FieldValue::LongLongInt(v) => {
                self.put_u8(b'l');
                self.put_i64(*v);
            }
            FieldValue::Float(v) => {
                self.put_u8(b'f');
                self.put_u32(v.to_bits());
            }
            FieldValue::Double(v) => {
                self.put_u8(b'd');
                self.put_u64(v.to_bits());
            }
            FieldValue::Decimal(v) => {
                self.put_u8(b'D');
                self.put_u8(v.scale);
                self.put_u32(v.value);
            }
            FieldValue::LongString(v) => {
                self.put_u8(b'S');
                self.put_longstr(v.as_bytes())?;
            }
            FieldValue::Array(items) => {
                self.put_u8(b'A');
                let mut section = BytesMut::new();
                for item in items {
                    section.put_field_value(item)?;
                }
                let len = u32::try_from(section.len()).map_err(|_| Error::SectionTooLong)?;
                self.put_u32(len);
                self.put_slice(&section);
            }
            FieldValue::Timestamp(v) => {
                self.put_u8(b'T');
                self.put_u64(*v);
            }
            FieldValue::Table(v) => {
                self.put_u8(b'F');
                self.put_table(v)?;
            }
            FieldValue::Void => {
                self.put_u8(b'V');
            }
            FieldValue::ByteArray(v) => {
                self.put_u8(b'x');
                self.put_longstr(v)?;
            }
        }
        Ok(())
    }
}

impl<B: BufMut> FieldPut for B {}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use super::*;

    #[test]
    fn test_shortstr_encoding() {
        let mut buf = BytesMut::new();
        buf.put_shortstr("amq.topic").unwrap();
        assert_eq!(
            &buf[..],
            &[0x09, b'a', b'm', b'q', b'.', b't', b'o', b'p', b'i', b'c']
        );

        let mut src = buf.freeze();
        assert_eq!(src.get_shortstr().unwrap(), "amq.topic");
    }

    #[test]
    fn test_shortstr_over_255_bytes_is_rejected() {
        let long = "x".repeat(256);
        let mut buf = BytesMut::new();
        assert!(matches!(
            buf.put_shortstr(&long),
            Err(Error::ShortStringTooLong)
        ));
    }

    #[test]
    fn test_truncated_field_yields_unexpected_end() {
        let mut src = Bytes::from_static(&[0x05, b'a', b'b']);
        assert!(matches!(src.get_shortstr(), Err(Error::UnexpectedEnd)));

        let mut src = Bytes::from_static(&[0x00, 0x00, 0x01]);
        assert!(matches!(src.get_long(), Err(Error::UnexpectedEnd)));
    }

    #[test]
    fn test_empty_table_is_four_zero_octets() {
        let mut buf = BytesMut::new();
        buf.put_table(&FieldTable::new()).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_table_roundtrip_preserves_insertion_order() {
        let mut table = FieldTable::new();
        table.insert("x-match".to_string(), FieldValue::from("all"));
        table.insert("x-expires".to_string(), FieldValue::LongInt(60_000));
        table.insert("nested".to_string(), FieldValue::Table(FieldTable::new()));

        let mut buf = BytesMut::new();
        buf.put_table(&table).unwrap();
        let mut src = buf.freeze();
        let decoded = src.get_table().unwrap();

        assert_eq!(decoded, table);
        let keys: Vec<&String> = decoded.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["x-match", "x-expires", "nested"]);
    }

    #[test]
    fn test_table_byte_layout() {
        let mut table = FieldTable::new();
        table.insert("a".to_string(), FieldValue::Boolean(true));

        let mut buf = BytesMut::new();
        buf.put_table(&table).unwrap();
        // length 4: shortstr "a" (2) + tag 't' (1) + octet (1)
        assert_eq!(&buf[..], &[0x00, 0x00, 0x00, 0x04, 0x01, b'a', b't', 0x01]);
    }

    #[test]
    fn test_unknown_field_tag() {
        let mut src = Bytes::from_static(&[0x00, 0x00, 0x00, 0x03, 0x01, b'a', b'Z']);
        assert!(matches!(
            src.get_table(),
            Err(Error::UnknownFieldTag(b'Z'))
        ));
    }
}
