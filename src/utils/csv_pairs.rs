//! Reader for `from,to` CSV files used by bulk import.
//!
//! Fields follow RFC 4180 quoting: a field wrapped in double quotes may hold
//! commas and line breaks, and `""` inside it is a literal quote. Columns
//! beyond the second are ignored; a missing second column yields an empty
//! destination so the row is reported by the importer instead of dropped.

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("Malformed CSV: {0}")]
    Read(#[from] csv::Error),
}

/// Parses CSV text into `(from, to)` pairs, skipping blank lines.
pub fn parse_pairs(input: &str) -> Result<Vec<(String, String)>, CsvError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let from = record.get(0).unwrap_or_default().to_string();
        let to = record.get(1).unwrap_or_default().to_string();
        pairs.push((from, to));
    }

    Ok(pairs)
}
