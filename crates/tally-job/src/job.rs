//! Map and reduce contracts

use std::iter::Peekable;

use crate::error::JobError;

/// Key as seen by the shuffle: opaque bytes, compared bytewise.
pub type ShuffleKey = Vec<u8>;

/// Unit exchanged between map and reduce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue<V> {
    pub key: ShuffleKey,
    pub value: V,
}

impl<V> KeyValue<V> {
    pub fn new(key: ShuffleKey, value: V) -> Self {
        Self { key, value }
    }
}

/// One distinct key and its number of occurrences across the whole input.
///
/// Keys are raw input bytes and order bytewise, which for UTF-8 text is
/// code point order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResultRecord {
    pub key: Vec<u8>,
    pub count: u64,
}

impl ResultRecord {
    pub fn new(key: impl Into<Vec<u8>>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Map side of a job.
///
/// Invocations run concurrently on disjoint input records and must not share
/// mutable state.
pub trait Mapper: Send + Sync {
    type Value: Send;

    /// Emit key-value pairs for one input record.
    ///
    /// Records are raw bytes: the partitioner may split a multibyte
    /// character across two records.
    fn map(&self, record: &[u8]) -> Result<Vec<KeyValue<Self::Value>>, JobError>;
}

/// Reduce side of a job.
///
/// Receives one shuffle partition, sorted by key, holding every value for
/// each of its keys. Emits one result per key; never aggregates across keys.
pub trait Reducer: Mapper {
    fn reduce(&self, partition: Vec<KeyValue<Self::Value>>)
        -> Result<Vec<ResultRecord>, JobError>;
}

/// Group adjacent pairs with equal keys.
///
/// Input must be sorted (or at least clustered) by key.
pub fn group_by_key<V>(
    pairs: impl IntoIterator<Item = KeyValue<V>>,
) -> impl Iterator<Item = (ShuffleKey, Vec<V>)> {
    GroupByKey {
        inner: pairs.into_iter().peekable(),
    }
}

struct GroupByKey<I: Iterator> {
    inner: Peekable<I>,
}

impl<V, I> Iterator for GroupByKey<I>
where
    I: Iterator<Item = KeyValue<V>>,
{
    type Item = (ShuffleKey, Vec<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.inner.next()?;
        let mut values = vec![first.value];
        while let Some(kv) = self.inner.next_if(|kv| kv.key == first.key) {
            values.push(kv.value);
        }
        Some((first.key, values))
    }
}
