//! Locate the tabular member inside an uploaded archive

use crate::error::ArchiveError;
use flate2::read::DeflateDecoder;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::str::FromStr;
use zip::{CompressionMethod, ZipArchive};

/// Extension of the member the reader looks for
pub const TABULAR_EXTENSION: &str = ".csv";

/// Supported container formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Random-access container, located through the central directory
    #[default]
    Zip,
    /// Sequential container, walked entry by entry
    Tar,
}

impl ArchiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::Tar => "tar",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveKind {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveKind::Zip),
            "tar" => Ok(ArchiveKind::Tar),
            _ => Err(ArchiveError::UnknownKind(s.to_string())),
        }
    }
}

/// Readable body of the tabular member
///
/// Borrows from the upload buffer and decodes on demand, so opening a member
/// never allocates its uncompressed size up front.
#[derive(Debug)]
pub enum TabularStream<'a> {
    /// Stored zip member or tar entry body, sliced straight out of the upload
    Plain(&'a [u8]),
    /// Deflated zip member, inflated as it is read
    Inflate(DeflateDecoder<&'a [u8]>),
}

impl Read for TabularStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            TabularStream::Plain(body) => body.read(buf),
            TabularStream::Inflate(decoder) => decoder.read(buf),
        }
    }
}

/// Open the first `.csv` member of an archive.
///
/// Later matching members are ignored.
pub fn open(kind: ArchiveKind, bytes: &[u8]) -> Result<TabularStream<'_>, ArchiveError> {
    log::debug!("Opening {} archive ({} bytes)", kind, bytes.len());
    match kind {
        ArchiveKind::Zip => open_zip(bytes),
        ArchiveKind::Tar => open_tar(bytes),
    }
}

fn open_zip(bytes: &[u8]) -> Result<TabularStream<'_>, ArchiveError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ArchiveError::Format(e.to_string()))?;

    for index in 0..archive.len() {
        let member = archive
            .by_index_raw(index)
            .map_err(|e| ArchiveError::Format(e.to_string()))?;

        if member.is_dir() || !member.name().ends_with(TABULAR_EXTENSION) {
            continue;
        }
        if member.encrypted() {
            return Err(ArchiveError::Format(format!(
                "zip member {} is encrypted",
                member.name()
            )));
        }

        log::debug!(
            "Using zip member {} ({:?}, {} bytes compressed)",
            member.name(),
            member.compression(),
            member.compressed_size()
        );
        let body = member_slice(bytes, member.data_start(), member.compressed_size())?;
        return match member.compression() {
            CompressionMethod::Stored => Ok(TabularStream::Plain(body)),
            CompressionMethod::Deflated => Ok(TabularStream::Inflate(DeflateDecoder::new(body))),
            other => Err(ArchiveError::Format(format!(
                "unsupported zip compression method: {}",
                other
            ))),
        };
    }

    Err(ArchiveError::MemberNotFound)
}

fn open_tar(bytes: &[u8]) -> Result<TabularStream<'_>, ArchiveError> {
    let mut archive = tar::Archive::new(bytes);
    let entries = archive
        .entries()
        .map_err(|e| ArchiveError::Format(e.to_string()))?;

    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::Format(e.to_string()))?;

        if !entry.header().entry_type().is_file()
            || !entry.path_bytes().ends_with(TABULAR_EXTENSION.as_bytes())
        {
            continue;
        }

        log::debug!(
            "Using tar member {}",
            String::from_utf8_lossy(&entry.path_bytes())
        );
        let body = member_slice(bytes, entry.raw_file_position(), entry.size())?;
        return Ok(TabularStream::Plain(body));
    }

    Err(ArchiveError::MemberNotFound)
}

/// Bytes `[start, start + len)` of the upload, or a format error when the
/// member claims to extend past the end of it.
fn member_slice(bytes: &[u8], start: u64, len: u64) -> Result<&[u8], ArchiveError> {
    let start = usize::try_from(start).map_err(|e| ArchiveError::Format(e.to_string()))?;
    let len = usize::try_from(len).map_err(|e| ArchiveError::Format(e.to_string()))?;
    start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| ArchiveError::Format("archive member extends past end of archive".into()))
}
