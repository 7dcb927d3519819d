//! Decode error types

use thiserror::Error;

/// Errors raised while decoding a logger file.
///
/// All variants are structural (`malformed-input`); semantic
/// degeneracies such as an all-zero channel are not errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No row in the leading scan window qualified as a header row.
    #[error("no header row found in the first 30 rows")]
    NoHeaderRow,

    /// A header row was found but nothing below it parsed as data.
    #[error("no data rows found after the header row")]
    NoDataRows,

    /// The byte stream could not be tokenised at all.
    #[error("csv tokenisation failed: {0}")]
    Csv(#[from] csv::Error),
}
