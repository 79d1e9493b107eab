//! Partition keys and the selector callers pass to resolve a table.

use std::fmt;

/// Opaque identifier of one data slice; maps 1:1 to a partition table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartitionKey {
    Int(i64),
    Text(String),
}

impl PartitionKey {
    /// True for a text key with no characters. Such a key would name the mask
    /// itself and is rejected before any DDL is issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PartitionKey {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PartitionKey {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for PartitionKey {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for PartitionKey {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for PartitionKey {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Which table(s) a caller wants to read.
///
/// Construction normalises the input:
/// - no keys (absent or empty list) selects the aggregate union,
/// - a scalar key *or a one-element list* selects that single partition,
/// - two or more keys select an ad-hoc union over exactly those partitions.
///
/// A one-element list is deliberately indistinguishable from the scalar key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    Aggregate,
    Single(PartitionKey),
    Many(Vec<PartitionKey>),
}

impl KeySelector {
    /// Build a selector from any list of keys, applying the normalisation
    /// rules above.
    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PartitionKey>,
    {
        let mut keys: Vec<PartitionKey> = keys.into_iter().map(Into::into).collect();
        match keys.len() {
            0 => Self::Aggregate,
            1 => Self::Single(keys.remove(0)),
            _ => Self::Many(keys),
        }
    }

    /// The keys named by this selector, in caller order.
    #[must_use]
    pub fn keys(&self) -> &[PartitionKey] {
        match self {
            Self::Aggregate => &[],
            Self::Single(key) => std::slice::from_ref(key),
            Self::Many(keys) => keys,
        }
    }
}

impl From<PartitionKey> for KeySelector {
    fn from(key: PartitionKey) -> Self {
        Self::Single(key)
    }
}

impl From<i64> for KeySelector {
    fn from(v: i64) -> Self {
        Self::Single(v.into())
    }
}

impl From<i32> for KeySelector {
    fn from(v: i32) -> Self {
        Self::Single(v.into())
    }
}

impl From<&str> for KeySelector {
    fn from(v: &str) -> Self {
        Self::Single(v.into())
    }
}

impl From<String> for KeySelector {
    fn from(v: String) -> Self {
        Self::Single(v.into())
    }
}

impl<K: Into<PartitionKey>> From<Vec<K>> for KeySelector {
    fn from(keys: Vec<K>) -> Self {
        Self::from_keys(keys)
    }
}

impl<K: Into<PartitionKey>, const N: usize> From<[K; N]> for KeySelector {
    fn from(keys: [K; N]) -> Self {
        Self::from_keys(keys)
    }
}

impl<T: Into<Self>> From<Option<T>> for KeySelector {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Aggregate, Into::into)
    }
}
