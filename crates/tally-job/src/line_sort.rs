//! Line-granularity sort and count

use serde::{Deserialize, Serialize};

use crate::codec::{KeyCodec, LineCodec};
use crate::error::JobError;
use crate::job::{KeyValue, Mapper, Reducer, ResultRecord, group_by_key};

/// Counts every distinct line of the input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSortJob;

impl Mapper for LineSortJob {
    type Value = u64;

    fn map(&self, record: &[u8]) -> Result<Vec<KeyValue<u64>>, JobError> {
        Ok(vec![KeyValue::new(LineCodec.encode(record), 1)])
    }
}

impl Reducer for LineSortJob {
    fn reduce(&self, mut partition: Vec<KeyValue<u64>>) -> Result<Vec<ResultRecord>, JobError> {
        // stable, so output is deterministic whatever order the shuffle delivers
        partition.sort_by(|a, b| a.key.cmp(&b.key));
        group_by_key(partition)
            .map(|(key, counts)| -> Result<ResultRecord, JobError> {
                let line = LineCodec.decode(&key)?;
                Ok(ResultRecord::new(line, counts.iter().sum()))
            })
            .collect()
    }
}
