//! Row keys and cells.

use std::fmt;

use bytes::Bytes;

use crate::display::escape_bytes;

/// Opaque row key. Ordering is lexicographic over the raw bytes, which is
/// the store-wide sort order used for routing and scan boundaries.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(Bytes);

impl RowKey {
    /// Wrap raw bytes as a row key.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        RowKey(bytes.into())
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the key has zero length. As a scan boundary the empty key
    /// stands for "unbounded".
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cheap clone of the underlying buffer.
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl fmt::Debug for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowKey(\"{}\")", escape_bytes(&self.0))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape_bytes(&self.0))
    }
}

impl From<&str> for RowKey {
    fn from(value: &str) -> Self {
        RowKey(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for RowKey {
    fn from(value: String) -> Self {
        RowKey(Bytes::from(value))
    }
}

impl From<&[u8]> for RowKey {
    fn from(value: &[u8]) -> Self {
        RowKey(Bytes::copy_from_slice(value))
    }
}

impl From<Vec<u8>> for RowKey {
    fn from(value: Vec<u8>) -> Self {
        RowKey(Bytes::from(value))
    }
}

impl From<Bytes> for RowKey {
    fn from(value: Bytes) -> Self {
        RowKey(value)
    }
}

impl AsRef<[u8]> for RowKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Timestamp placeholder meaning "let the store assign the write time".
pub const LATEST_TIMESTAMP: u64 = u64::MAX;

/// One `(family, qualifier, timestamp, value)` unit of data within a row.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Row the cell belongs to.
    pub row: RowKey,
    /// Column family.
    pub family: Bytes,
    /// Column qualifier within the family.
    pub qualifier: Bytes,
    /// Write timestamp in milliseconds, or [`LATEST_TIMESTAMP`] when unset.
    pub timestamp: u64,
    /// Cell payload.
    pub value: Bytes,
}

impl Cell {
    /// Build a cell from anything convertible into bytes.
    pub fn new(
        row: impl Into<RowKey>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        timestamp: u64,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            value: value.into(),
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}/{}",
            escape_bytes(self.row.as_bytes()),
            escape_bytes(&self.family),
            escape_bytes(&self.qualifier),
            self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RowKey;

    #[test]
    fn lexicographic_order() {
        let mut keys: Vec<RowKey> = ["row_10", "row_2", "row_1", "row_"]
            .into_iter()
            .map(RowKey::from)
            .collect();
        keys.sort();
        let sorted: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(sorted, vec!["row_", "row_1", "row_10", "row_2"]);
    }

    #[test]
    fn binary_keys_escape_in_display() {
        let key = RowKey::from(vec![b'a', 0x00, 0xff]);
        assert_eq!(key.to_string(), "a\\x00\\xFF");
        assert!(RowKey::default().is_empty());
    }
}
