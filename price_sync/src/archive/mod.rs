//! Archive containers for price uploads and exports
//!
//! Uploads arrive as `zip` or `tar`; exports are always `zip`.

mod reader;
mod writer;

pub use reader::{open, ArchiveKind, TabularStream, TABULAR_EXTENSION};
pub use writer::write_zip;
