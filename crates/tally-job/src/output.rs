//! Result writers

use std::io::Write;

use csv::{QuoteStyle, WriterBuilder};

use crate::error::JobError;
use crate::job::ResultRecord;

/// Write `(key, count)` rows as CSV, quoting keys and leaving counts bare.
///
/// Quoting is by content, so a key that parses as a number is left unquoted.
/// Key bytes are written as they are, valid UTF-8 or not.
pub fn write_csv<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a ResultRecord>,
) -> Result<usize, JobError> {
    let mut csv = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(writer);
    let mut rows = 0;
    for record in records {
        csv.write_record([record.key.as_slice(), record.count.to_string().as_bytes()])?;
        rows += 1;
    }
    csv.flush()?;
    Ok(rows)
}

/// Write one `key<TAB>count` line per record, key bytes unchanged.
pub fn write_tsv<'a, W: Write>(
    mut writer: W,
    records: impl IntoIterator<Item = &'a ResultRecord>,
) -> Result<usize, JobError> {
    let mut rows = 0;
    for record in records {
        writer.write_all(&record.key)?;
        writeln!(writer, "\t{}", record.count)?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}
