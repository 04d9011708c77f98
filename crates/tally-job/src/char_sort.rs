//! Character-granularity sort and count

use std::sync::LazyLock;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::codec::{CharCodec, KeyCodec};
use crate::error::JobError;
use crate::job::{KeyValue, Mapper, Reducer, ResultRecord, group_by_key};

/// ASCII letters (lowercase, then uppercase) followed by the digits 0-9.
pub static ALPHANUMERIC: LazyLock<Vec<char>> =
    LazyLock::new(|| ('a'..='z').chain('A'..='Z').chain('0'..='9').collect());

/// Counts every character of the input.
///
/// A character is one input byte, so ASCII text counts its characters and a
/// multibyte UTF-8 character counts as each of its bytes. Counts stay exact
/// wherever the partitioner split the stream.
///
/// Each record counts `repetition` times, which amplifies skew for test
/// corpora; use 1 for exact counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharSortJob {
    pub repetition: usize,
}

impl CharSortJob {
    pub const DEFAULT_REPETITION: usize = 10;

    pub fn new(repetition: usize) -> Self {
        Self { repetition }
    }
}

impl Default for CharSortJob {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REPETITION)
    }
}

impl Mapper for CharSortJob {
    type Value = u64;

    /// Emits each distinct byte of the record once, with its count in the
    /// record expanded `repetition` times.
    fn map(&self, record: &[u8]) -> Result<Vec<KeyValue<u64>>, JobError> {
        let mut counts = [0u64; 256];
        for &b in record {
            counts[b as usize] += 1;
        }
        let repetition = self.repetition as u64;
        let mut pairs: Vec<KeyValue<u64>> = (0..=u8::MAX)
            .zip(counts)
            .filter(|&(_, n)| n > 0 && repetition > 0)
            .map(|(b, n)| KeyValue::new(CharCodec.encode(&b), n * repetition))
            .collect();
        // the shuffle must not depend on map-local order
        pairs.shuffle(&mut rand::rng());
        Ok(pairs)
    }
}

impl Reducer for CharSortJob {
    fn reduce(&self, partition: Vec<KeyValue<u64>>) -> Result<Vec<ResultRecord>, JobError> {
        group_by_key(partition)
            .map(|(key, counts)| -> Result<ResultRecord, JobError> {
                let b = CharCodec.decode(&key)?;
                Ok(ResultRecord::new([b], counts.iter().sum()))
            })
            .collect()
    }
}
