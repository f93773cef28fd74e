//! Content-header properties of the basic class.
//!
//! A content header frame carries a 16-bit property-flags word followed by
//! the values of exactly the properties whose flag bit is set, in flag-bit
//! order from the most significant bit down. The least significant bit is a
//! continuation bit that the basic class never uses.

use bytes::{Buf, BytesMut};

use crate::codec::{Error, FieldGet, FieldPut};
use crate::value::FieldTable;

const CONTENT_TYPE: u16 = 1 << 15;
const CONTENT_ENCODING: u16 = 1 << 14;
const HEADERS: u16 = 1 << 13;
const DELIVERY_MODE: u16 = 1 << 12;
const PRIORITY: u16 = 1 << 11;
const CORRELATION_ID: u16 = 1 << 10;
const REPLY_TO: u16 = 1 << 9;
const EXPIRATION: u16 = 1 << 8;
const MESSAGE_ID: u16 = 1 << 7;
const TIMESTAMP: u16 = 1 << 6;
const KIND: u16 = 1 << 5;
const USER_ID: u16 = 1 << 4;
const APP_ID: u16 = 1 << 3;
const CLUSTER_ID: u16 = 1 << 2;

/// Properties carried in a basic content header. Every property is
/// optional; an unset property occupies no space on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicProperties {
    /// MIME content type of the payload
    pub content_type: Option<String>,
    /// MIME content encoding of the payload
    pub content_encoding: Option<String>,
    /// Application headers
    pub headers: Option<FieldTable>,
    /// 1 = transient, 2 = persistent
    pub delivery_mode: Option<u8>,
    /// Message priority, 0 to 9
    pub priority: Option<u8>,
    /// Application correlation identifier
    pub correlation_id: Option<String>,
    /// Address to reply to
    pub reply_to: Option<String>,
    /// Message expiration, in milliseconds as a string
    pub expiration: Option<String>,
    /// Application message identifier
    pub message_id: Option<String>,
    /// Message timestamp, POSIX seconds
    pub timestamp: Option<u64>,
    /// Message type name (the `type` property)
    pub kind: Option<String>,
    /// Creating user id, validated by the broker
    pub user_id: Option<String>,
    /// Creating application id
    pub app_id: Option<String>,
    /// Reserved, unused by current brokers
    pub cluster_id: Option<String>,
}

impl BasicProperties {
    /// Returns `self` with every property that is set in `overrides`
    /// replaced by the override value. Used to layer caller-supplied
    /// properties over publication defaults.
    pub fn merge(self, overrides: BasicProperties) -> BasicProperties {
        BasicProperties {
            content_type: overrides.content_type.or(self.content_type),
            content_encoding: overrides.content_encoding.or(self.content_encoding),
            headers: overrides.headers.or(self.headers),
            delivery_mode: overrides.delivery_mode.or(self.delivery_mode),
            priority: overrides.priority.or(self.priority),
            correlation_id: overrides.correlation_id.or(self.correlation_id),
            reply_to: overrides.reply_to.or(self.reply_to),
            expiration: overrides.expiration.or(self.expiration),
            message_id: overrides.message_id.or(self.message_id),
            timestamp: overrides.timestamp.or(self.timestamp),
            kind: overrides.kind.or(self.kind),
            user_id: overrides.user_id.or(self.user_id),
            app_id: overrides.app_id.or(self.app_id),
            cluster_id: overrides.cluster_id.or(self.cluster_id),
        }
    }

    fn flags(&self) -> u16 {
        let mut flags = 0;
        if self.content_type.is_some() {
            flags |= CONTENT_TYPE;
        }
        if self.content_encoding.is_some() {
            flags |= CONTENT_ENCODING;
        }
        if self.headers.is_some() {
            flags |= HEADERS;
        }
        if self.delivery_mode.is_some() {
            flags |= DELIVERY_MODE;
        }
        if self.priority.is_some() {
            flags |= PRIORITY;
        }
        if self.correlation_id.is_some() {
            flags |= CORRELATION_ID;
        }
        if self.reply_to.is_some() {
            flags |= REPLY_TO;
        }
        if self.expiration.is_some() {
            flags |= EXPIRATION;
        }
        if self.message_id.is_some() {
            flags |= MESSAGE_ID;
        }
        if self.timestamp.is_some() {
            flags |= TIMESTAMP;
        }
        if self.kind.is_some() {
            flags |= KIND;
        }
        if self.user_id.is_some() {
            flags |= USER_ID;
        }
        if self.app_id.is_some() {
            flags |= APP_ID;
        }
        if self.cluster_id.is_some() {
            flags |= CLUSTER_ID;
        }
        flags
    }

    /// Encodes the property-flags word and the set property values.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(self.flags());
        if let Some(v) = &self.content_type {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = &self.content_encoding {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = &self.headers {
            buf.put_table(v)?;
        }
        if let Some(v) = self.delivery_mode {
            buf.put_octet(v);
        }
        if let Some(v) = self.priority {
            buf.put_octet(v);
        }
        if let Some(v) = &self.correlation_id {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = &self.reply_to {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = &self.expiration {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = &self.message_id {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = self.timestamp {
            buf.put_longlong(v);
        }
        if let Some(v) = &self.kind {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = &self.user_id {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = &self.app_id {
            buf.put_shortstr(v)?;
        }
        if let Some(v) = &self.cluster_id {
            buf.put_shortstr(v)?;
        }
        Ok(())
    }

    /// Decodes the property-flags word and the property values it lists.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let flags = buf.get_short()?;
        let mut properties = BasicProperties::default();
        if flags & CONTENT_TYPE != 0 {
            properties.content_type = Some(buf.get_shortstr()?);
        }
        if flags & CONTENT_ENCODING != 0 {
            properties.content_encoding = Some(buf.get_shortstr()?);
        }
        if flags & HEADERS != 0 {
            properties.headers = Some(buf.get_table()?);
        }
        if flags & DELIVERY_MODE != 0 {
            properties.delivery_mode = Some(buf.get_octet()?);
        }
        if flags & PRIORITY != 0 {
            properties.priority = Some(buf.get_octet()?);
        }
        if flags & CORRELATION_ID != 0 {
            properties.correlation_id = Some(buf.get_shortstr()?);
        }
        if flags & REPLY_TO != 0 {
            properties.reply_to = Some(buf.get_shortstr()?);
        }
        if flags & EXPIRATION != 0 {
            properties.expiration = Some(buf.get_shortstr()?);
        }
        if flags & MESSAGE_ID != 0 {
            properties.message_id = Some(buf.get_shortstr()?);
        }
        if flags & TIMESTAMP != 0 {
            properties.timestamp = Some(buf.get_longlong()?);
        }
        if flags & KIND != 0 {
            properties.kind = Some(buf.get_shortstr()?);
        }
        if flags & USER_ID != 0 {
            properties.user_id = Some(buf.get_shortstr()?);
        }
        if flags & APP_ID != 0 {
            properties.app_id = Some(buf.get_shortstr()?);
        }
        if flags & CLUSTER_ID != 0 {
            properties.cluster_id = Some(buf.get_shortstr()?);
        }
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn test_encode_sets_only_listed_flags() {
        let properties = BasicProperties {
            content_type: Some("text.plain".to_string()),
            delivery_mode: Some(2),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        properties.encode(&mut buf).unwrap();

        let mut expected = vec![0x90, 0x00, 0x0a];
        expected.extend_from_slice(b"text.plain");
        expected.push(0x02);
        assert_eq!(&buf[..], &expected[..]);
    }

    #[test]
    fn test_decode_reads_fields_in_flag_order() {
        let properties = BasicProperties {
            content_encoding: Some("utf-8".to_string()),
            priority: Some(4),
            timestamp: Some(1_700_000_000),
            app_id: Some("worker".to_string()),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        properties.encode(&mut buf).unwrap();

        let decoded = BasicProperties::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, properties);
    }

    #[test]
    fn test_empty_properties_is_a_zero_flags_word() {
        let mut buf = BytesMut::new();
        BasicProperties::default().encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00]);
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let defaults = BasicProperties {
            content_type: Some("text.plain".to_string()),
            content_encoding: Some("utf-8".to_string()),
            message_id: Some("0".to_string()),
            ..Default::default()
        };
        let overrides = BasicProperties {
            message_id: Some("m-17".to_string()),
            reply_to: Some("replies".to_string()),
            ..Default::default()
        };

        let merged = defaults.merge(overrides);
        assert_eq!(merged.content_type.as_deref(), Some("text.plain"));
        assert_eq!(merged.message_id.as_deref(), Some("m-17"));
        assert_eq!(merged.reply_to.as_deref(), Some("replies"));
    }
}
