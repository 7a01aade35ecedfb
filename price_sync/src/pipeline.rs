//! Ingest and export pipelines
//!
//! Ingest: archive -> CSV parser -> batch insert -> store totals.
//! Export: filtered select -> CSV writer -> zip.
//!
//! Each call is one self-contained unit of work. Parsing buffers every valid
//! record before the batch insert starts, because the insert is
//! all-or-nothing and must see its whole row set.

use crate::archive::{self, ArchiveKind};
use crate::database;
use crate::error::Result;
use crate::models::{FilterCriteria, IngestOutcome};
use crate::tabular;
use rusqlite::Connection;

/// Name of the CSV member inside export archives
pub const EXPORT_MEMBER_NAME: &str = "data.csv";

/// Ingest an uploaded archive into the store
///
/// Archive and header failures return before anything is written. A failed
/// batch insert leaves no rows behind.
pub fn ingest(conn: &mut Connection, kind: ArchiveKind, archive: &[u8]) -> Result<IngestOutcome> {
    let stream = archive::open(kind, archive)?;

    let mut records = Vec::new();
    let mut malformed = 0;
    let rows_read = tabular::parse(stream, |line, result| match result {
        Ok(record) => records.push(record),
        Err(e) => {
            malformed += 1;
            log::warn!("line {} rejected: {}", line, e);
        }
    })?;
    log::debug!(
        "Parsed {} lines ({} valid, {} malformed)",
        rows_read,
        records.len(),
        malformed
    );

    let stats = database::insert_batch(conn, &records)?;
    let totals = database::store_totals(conn)?;

    let outcome = IngestOutcome {
        rows_read,
        inserted: stats.inserted,
        duplicates: stats.duplicates,
        malformed,
        totals,
    };
    log::info!(
        "Processed {} rows ({} inserted, {} duplicates, {} malformed)",
        outcome.rows_read,
        outcome.inserted,
        outcome.duplicates,
        outcome.malformed
    );
    Ok(outcome)
}

/// Export the records matching `criteria` as a zip holding one CSV member
pub fn export(conn: &Connection, criteria: &FilterCriteria) -> Result<Vec<u8>> {
    if criteria.is_unbounded() {
        log::info!("Exporting all records (no filter bounds)");
    } else {
        log::debug!("Exporting records matching {:?}", criteria);
    }
    let records = database::select_by_filter(conn, criteria)?;
    let csv = tabular::write_records(Vec::new(), &records)?;
    let archive = archive::write_zip(EXPORT_MEMBER_NAME, &csv)?;

    log::info!(
        "Exported {} records ({} byte archive)",
        records.len(),
        archive.len()
    );
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArchiveError, Error, ParseError};

    #[test]
    fn ingest_counts_duplicate_rows() {
        let mut conn = database::open_in_memory_store().unwrap();
        let csv = "id,name,category,price,created_at\n\
                   1,Widget,Tools,9.99,2024-01-05\n\
                   2,Widget,Tools,9.99,2024-01-05\n";
        let upload = archive::write_zip("prices.csv", csv.as_bytes()).unwrap();

        let outcome = ingest(&mut conn, ArchiveKind::Zip, &upload).unwrap();

        assert_eq!(outcome.rows_read, 2);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.malformed, 0);
        assert_eq!(outcome.totals.total_items, 1);
        assert_eq!(outcome.totals.total_categories, 1);
        assert_eq!(outcome.totals.total_price.to_string(), "9.99");
    }

    #[test]
    fn missing_member_aborts_without_writes() {
        let mut conn = database::open_in_memory_store().unwrap();
        let upload = archive::write_zip("notes.txt", b"nothing here").unwrap();

        let err = ingest(&mut conn, ArchiveKind::Zip, &upload).unwrap_err();
        assert!(matches!(err, Error::Archive(ArchiveError::MemberNotFound)));
        assert_eq!(database::total_item_count(&conn).unwrap(), 0);
    }

    #[test]
    fn empty_csv_is_header_error() {
        let mut conn = database::open_in_memory_store().unwrap();
        let upload = archive::write_zip("prices.csv", b"").unwrap();

        let err = ingest(&mut conn, ArchiveKind::Zip, &upload).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Header(_))));
    }

    #[test]
    fn export_of_empty_store_has_header_only() {
        let conn = database::open_in_memory_store().unwrap();
        let bytes = export(&conn, &FilterCriteria::default()).unwrap();

        let mut stream = archive::open(ArchiveKind::Zip, &bytes).unwrap();
        let mut text = String::new();
        std::io::Read::read_to_string(&mut stream, &mut text).unwrap();
        assert_eq!(text, "id,name,category,price,created_at\n");
    }
}
