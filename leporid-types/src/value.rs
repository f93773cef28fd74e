//! Field values and field tables.
//!
//! Tables appear in method arguments (declare arguments, binding arguments)
//! and in the `headers` property of a content header. Value tags follow the
//! RabbitMQ dialect of AMQP 0-9-1, which differs from the published
//! specification for several integer types.

use bytes::Bytes;
use indexmap::IndexMap;

pub use indexmap::map::{IntoIter, Iter, IterMut, Keys, Values};

/// An exact decimal value as transmitted: a scale octet and an unscaled
/// 32-bit value. No arithmetic is provided; the value is carried through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalValue {
    /// Number of decimal digits to the right of the point
    pub scale: u8,
    /// The unscaled value
    pub value: u32,
}

/// A single value inside a [`FieldTable`] or field array.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// `t`: boolean
    Boolean(bool),
    /// `b`: short-short-int
    ShortShortInt(i8),
    /// `B`: short-short-uint
    ShortShortUint(u8),
    /// `s`: short-int
    ShortInt(i16),
    /// `u`: short-uint
    ShortUint(u16),
    /// `I`: long-int
    LongInt(i32),
    /// `i`: long-uint
    LongUint(u32),
    /// `l`: long-long-int
    LongLongInt(i64),
    /// `f`: single-precision float
    Float(f32),
    /// `d`: double-precision float
    Double(f64),
    /// `D`: decimal value
    Decimal(DecimalValue),
    /// `S`: long string
    LongString(String),
    /// `A`: field array
    Array(Vec<FieldValue>),
    /// `T`: POSIX timestamp in seconds
    Timestamp(u64),
    /// `F`: nested field table
    Table(FieldTable),
    /// `V`: no value
    Void,
    /// `x`: byte array
    ByteArray(Bytes),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i8> for FieldValue {
    fn from(value: i8) -> Self {
        Self::ShortShortInt(value)
    }
}

impl From<i16> for FieldValue {
    fn from(value: i16) -> Self {
        Self::ShortInt(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::LongInt(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::LongLongInt(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::LongString(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::LongString(value)
    }
}

impl From<FieldTable> for FieldValue {
    fn from(value: FieldTable) -> Self {
        Self::Table(value)
    }
}

/// A wrapper around [`IndexMap`] keyed by field name.
///
/// Encoding order is insertion order, and equality is order-sensitive to
/// match the wire representation. Inserting an existing key overwrites its
/// value in place.
#[derive(Debug, Clone, Default)]
pub struct FieldTable(IndexMap<String, FieldValue>);

impl FieldTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inserts a name/value pair, returning the previous value if any.
    pub fn insert(&mut self, name: String, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(name, value)
    }

    /// Looks up a value by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Returns true if the table contains the name.
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> Iter<'_, String, FieldValue> {
        self.0.iter()
    }

    /// Borrows the inner [`IndexMap`].
    pub fn as_inner(&self) -> &IndexMap<String, FieldValue> {
        &self.0
    }

    /// Consumes the wrapper and returns the inner [`IndexMap`].
    pub fn into_inner(self) -> IndexMap<String, FieldValue> {
        self.0
    }
}

impl From<IndexMap<String, FieldValue>> for FieldTable {
    fn from(map: IndexMap<String, FieldValue>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, FieldValue)> for FieldTable {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(IndexMap::from_iter(iter))
    }
}

impl IntoIterator for FieldTable {
    type Item = (String, FieldValue);
    type IntoIter = IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldTable {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// IndexMap equality ignores order; the wire form does not.
impl PartialEq for FieldTable {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut table = FieldTable::new();
        table.insert("a".to_string(), FieldValue::from(1i32));
        table.insert("b".to_string(), FieldValue::from(2i32));
        table.insert("a".to_string(), FieldValue::from(3i32));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a"), Some(&FieldValue::LongInt(3)));
        let keys: Vec<&String> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let ab: FieldTable = [
            ("a".to_string(), FieldValue::Void),
            ("b".to_string(), FieldValue::Void),
        ]
        .into_iter()
        .collect();
        let ba: FieldTable = [
            ("b".to_string(), FieldValue::Void),
            ("a".to_string(), FieldValue::Void),
        ]
        .into_iter()
        .collect();

        assert_ne!(ab, ba);
    }
}
