//! Package an export into a single-member zip

use crate::error::ArchiveError;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Build a zip archive holding one member named `member_name`.
pub fn write_zip(member_name: &str, bytes: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(member_name, options)?;
    writer.write_all(bytes)?;
    let archive = writer.finish()?.into_inner();

    log::debug!(
        "Packaged {} ({} bytes) into {} byte zip",
        member_name,
        bytes.len(),
        archive.len()
    );
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{open, ArchiveKind};
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn written_member_round_trips_through_reader() {
        let content = b"id,name,category,price,created_at\n1,Widget,Tools,9.99,2024-01-05\n";
        let archive = write_zip("data.csv", content).unwrap();

        let mut stream = open(ArchiveKind::Zip, &archive).unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, content);
    }

    #[test]
    fn archive_holds_exactly_one_named_member() {
        let archive = write_zip("data.csv", b"x").unwrap();

        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 1);
        let member = zip.by_index(0).unwrap();
        assert_eq!(member.name(), "data.csv");
    }

    #[test]
    fn empty_content_is_allowed() {
        let archive = write_zip("empty.csv", b"").unwrap();

        let mut stream = open(ArchiveKind::Zip, &archive).unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
