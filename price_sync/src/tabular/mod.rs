//! CSV format for price records
//!
//! Both directions use the header `id,name,category,price,created_at`,
//! prices with two fractional digits and `YYYY-MM-DD` dates.

mod parser;
mod writer;

pub use parser::{parse, ParsedLine, PriceReader};
pub use writer::{format_price, write_records};

/// Column names, in file order
pub const HEADER: [&str; 5] = ["id", "name", "category", "price", "created_at"];

/// Number of fields on every line
pub const FIELD_COUNT: usize = HEADER.len();
