//! Serialize price records to CSV

use super::HEADER;
use crate::error::WriteError;
use crate::models::{PriceRecord, DATE_FORMAT};
use rust_decimal::{Decimal, RoundingStrategy};
use std::io::{self, Write};

/// Format a price with exactly two fractional digits
pub fn format_price(price: Decimal) -> String {
    let mut price = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    price.rescale(2);
    price.to_string()
}

/// Write the header and one line per record, in input order.
///
/// Returns the flushed sink. Output already written before a failure is left
/// in the sink.
pub fn write_records<W: Write>(sink: W, records: &[PriceRecord]) -> Result<W, WriteError> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(HEADER)?;

    for record in records {
        let id = record.id.to_string();
        let price = format_price(record.price);
        let created_at = record.created_at.format(DATE_FORMAT).to_string();
        writer.write_record([
            id.as_str(),
            record.name.as_str(),
            record.category.as_str(),
            price.as_str(),
            created_at.as_str(),
        ])?;
    }

    writer.into_inner().map_err(|e| {
        let cause = e.error();
        WriteError::Io(io::Error::new(cause.kind(), cause.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: i64, name: &str, price: Decimal) -> PriceRecord {
        PriceRecord {
            id,
            name: name.to_string(),
            category: "Tools".to_string(),
            price,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        }
    }

    /// Sink that refuses every write
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn format_price_pads_to_two_digits() {
        assert_eq!(format_price(Decimal::new(10, 0)), "10.00");
        assert_eq!(format_price(Decimal::new(99, 1)), "9.90");
        assert_eq!(format_price(Decimal::new(999, 2)), "9.99");
        assert_eq!(format_price(Decimal::ZERO), "0.00");
    }

    #[test]
    fn writes_header_and_rows_in_order() {
        let records = vec![
            record(2, "Widget", Decimal::new(999, 2)),
            record(1, "Gadget", Decimal::new(10, 0)),
        ];
        let out = write_records(Vec::new(), &records).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,name,category,price,created_at\n\
             2,Widget,Tools,9.99,2024-01-05\n\
             1,Gadget,Tools,10.00,2024-01-05\n"
        );
    }

    #[test]
    fn empty_input_writes_header_only() {
        let out = write_records(Vec::new(), &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,name,category,price,created_at\n"
        );
    }

    #[test]
    fn quotes_fields_with_commas() {
        let out = write_records(Vec::new(), &[record(1, "Widget, large", Decimal::ONE)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1,\"Widget, large\",Tools,1.00,2024-01-05"));
    }

    #[test]
    fn failing_sink_is_write_error() {
        let result = write_records(FullDisk, &[record(1, "Widget", Decimal::ONE)]);
        assert!(result.is_err());
    }
}
