//! Streaming CSV parser with per-line fault isolation
//!
//! A bad data line becomes a [`RowError`] for that line only. The stream as a
//! whole fails only when the header is missing or malformed, or when the
//! underlying reader breaks.

use super::{FIELD_COUNT, HEADER};
use crate::error::{ParseError, RowError};
use crate::models::{parse_date, PriceRecord};
use csv::ByteRecord;
use rust_decimal::{Decimal, RoundingStrategy};
use std::io::Read;
use std::str::FromStr;

/// Prices must stay below this (the store holds at most 8 integer digits)
const PRICE_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Outcome of one data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// 1-based, header excluded
    pub line: usize,
    pub result: Result<PriceRecord, RowError>,
}

/// Lazy cursor over the data lines of a price CSV
///
/// Yields one [`ParsedLine`] per data line in source order. An `Err` item is
/// only produced for an unrecoverable read fault, after which the cursor is
/// exhausted.
pub struct PriceReader<R: Read> {
    reader: csv::Reader<R>,
    record: ByteRecord,
    line: usize,
    done: bool,
}

impl<R: Read> PriceReader<R> {
    /// Read and validate the header line.
    pub fn new(source: R) -> Result<Self, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(source);

        let mut header = ByteRecord::new();
        match reader.read_byte_record(&mut header) {
            Ok(true) if header.len() == FIELD_COUNT => {}
            Ok(true) => {
                return Err(ParseError::Header(format!(
                    "expected {} columns, found {}",
                    FIELD_COUNT,
                    header.len()
                )))
            }
            Ok(false) => return Err(ParseError::Header("stream is empty".to_string())),
            Err(e) => return Err(ParseError::Header(e.to_string())),
        }

        let names_match = header
            .iter()
            .zip(HEADER)
            .all(|(got, want)| got.eq_ignore_ascii_case(want.as_bytes()));
        if !names_match {
            log::warn!(
                "Unexpected CSV header {:?}, reading columns positionally",
                String::from_utf8_lossy(header.as_slice())
            );
        }

        Ok(Self {
            reader,
            record: ByteRecord::new(),
            line: 0,
            done: false,
        })
    }
}

impl<R: Read> Iterator for PriceReader<R> {
    type Item = Result<ParsedLine, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => {
                self.line += 1;
                Some(Ok(ParsedLine {
                    line: self.line,
                    result: parse_row(&self.record),
                }))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(ParseError::Read(e)))
            }
        }
    }
}

/// Parse a price CSV, calling `handler` exactly once per data line.
///
/// Returns the number of data lines seen. Malformed lines are reported to the
/// handler and never abort the stream.
pub fn parse<R, F>(source: R, mut handler: F) -> Result<usize, ParseError>
where
    R: Read,
    F: FnMut(usize, Result<PriceRecord, RowError>),
{
    let mut lines = 0;
    for parsed in PriceReader::new(source)? {
        let parsed = parsed?;
        lines = parsed.line;
        handler(parsed.line, parsed.result);
    }
    Ok(lines)
}

fn parse_row(record: &ByteRecord) -> Result<PriceRecord, RowError> {
    if record.len() != FIELD_COUNT {
        return Err(RowError::FieldCount {
            expected: FIELD_COUNT,
            found: record.len(),
        });
    }

    let fields = record
        .iter()
        .map(std::str::from_utf8)
        .collect::<Result<Vec<&str>, _>>()
        .map_err(|_| RowError::Encoding)?;
    let &[id, name, category, price, created_at] = fields.as_slice() else {
        return Err(RowError::FieldCount {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    };

    let id = id
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| RowError::InvalidId(id.to_string()))?;

    if name.is_empty() {
        return Err(RowError::InvalidName);
    }
    if category.is_empty() {
        return Err(RowError::InvalidCategory);
    }

    let price = parse_price(price).ok_or_else(|| RowError::InvalidPrice(price.to_string()))?;

    let created_at =
        parse_date(created_at).ok_or_else(|| RowError::InvalidDate(created_at.to_string()))?;

    Ok(PriceRecord {
        id,
        name: name.to_string(),
        category: category.to_string(),
        price,
        created_at,
    })
}

/// Parse a non-negative price and round it to cents (half away from zero).
///
/// The limit applies to the rounded value, the one that gets stored.
fn parse_price(raw: &str) -> Option<Decimal> {
    let price = Decimal::from_str(raw).ok()?;
    if price < Decimal::ZERO {
        return None;
    }
    let mut price = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if price >= PRICE_LIMIT {
        return None;
    }
    price.rescale(2);
    Some(price)
}
