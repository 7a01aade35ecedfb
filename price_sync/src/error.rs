//! Error types for price_sync
//!
//! Each layer has its own error enum. Per-line [`RowError`]s are counted by the
//! pipeline and never escalate; everything else aborts the request.

use rust_decimal::Decimal;
use thiserror::Error;

/// Failure to open or build an archive container
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Container kind other than `zip` or `tar`
    #[error("unknown archive type: {0}")]
    UnknownKind(String),
    /// Container bytes could not be parsed
    #[error("invalid archive: {0}")]
    Format(String),
    /// No member with the tabular file extension
    #[error("no .csv file found in archive")]
    MemberNotFound,
    /// Zip writer failure
    #[error("zip write error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream-level failure of the tabular parser
#[derive(Debug, Error)]
pub enum ParseError {
    /// Empty stream, unreadable stream or malformed header line
    #[error("failed to read CSV header: {0}")]
    Header(String),
    /// Unrecoverable read fault after the header
    #[error("failed to read CSV stream: {0}")]
    Read(#[from] csv::Error),
}

/// Why a single data line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("invalid name: name must not be empty")]
    InvalidName,
    #[error("invalid category: category must not be empty")]
    InvalidCategory,
    #[error("invalid price: {0}")]
    InvalidPrice(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("record is not valid UTF-8")]
    Encoding,
}

/// Failure to serialize records to CSV
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV sink error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure in the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Price cannot be represented as integer cents
    #[error("price out of range: {0}")]
    PriceOutOfRange(Decimal),
    #[error("database I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Unified error type for price_sync operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A query filter bound that does not parse
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the request itself was at fault (bad archive, bad header,
    /// bad filter) rather than the store or the host.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::Archive(
                ArchiveError::UnknownKind(_) | ArchiveError::Format(_) | ArchiveError::MemberNotFound
            ) | Error::Parse(ParseError::Header(_))
                | Error::InvalidFilter(_)
        )
    }
}

/// Result alias for price_sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias for persistence operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_classified() {
        assert!(Error::from(ArchiveError::MemberNotFound).is_input_error());
        assert!(Error::from(ArchiveError::Format("bad".into())).is_input_error());
        assert!(Error::from(ParseError::Header("empty".into())).is_input_error());
        assert!(Error::InvalidFilter("min".into()).is_input_error());
    }

    #[test]
    fn store_errors_are_not_input_errors() {
        let err = Error::from(StoreError::PriceOutOfRange(Decimal::MAX));
        assert!(!err.is_input_error());

        let err = Error::from(std::io::Error::other("disk full"));
        assert!(!err.is_input_error());
    }

    #[test]
    fn row_error_messages_name_the_field() {
        assert_eq!(RowError::InvalidId("abc".into()).to_string(), "invalid id: abc");
        assert_eq!(
            RowError::FieldCount {
                expected: 5,
                found: 4
            }
            .to_string(),
            "expected 5 fields, found 4"
        );
    }
}
