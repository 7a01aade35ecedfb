//! Database operations for price records
//!
//! Uses parameterized queries exclusively. The export filter is assembled from
//! fixed SQL fragments and numbered placeholders, never from caller text.
//! Batch writes are transactional: a batch either commits whole or not at all.

use crate::error::{StoreError, StoreResult};
use crate::models::{FilterCriteria, InsertStats, PriceRecord, StoreTotals};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::path::Path;

const SELECT_PRICES: &str = "SELECT id, name, category, price, create_date FROM prices";

/// Initialize the database schema
///
/// Creates the `prices` table if it doesn't exist. Prices are stored as
/// integer cents so the uniqueness constraint compares exact values.
pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS prices (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL CHECK (name <> ''),
            category TEXT NOT NULL CHECK (category <> ''),
            price INTEGER NOT NULL CHECK (price >= 0),
            create_date TEXT NOT NULL,
            CONSTRAINT unique_price_row UNIQUE (name, category, price, create_date)
        );

        CREATE INDEX IF NOT EXISTS idx_prices_create_date ON prices(create_date);
        CREATE INDEX IF NOT EXISTS idx_prices_price ON prices(price);
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Open (or create) the database file and initialize the schema
pub fn open_store(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            log::info!("Created directory: {}", parent.display());
        }
    }

    let conn = Connection::open(path)?;
    log::info!("Opened database: {}", path.display());
    init_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory database with the schema initialized
pub fn open_in_memory_store() -> StoreResult<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Insert a batch of records in a single transaction
///
/// A record whose dedup key (or id) already exists is skipped and counted as
/// a duplicate. Any other failure rolls back the whole batch.
pub fn insert_batch(conn: &mut Connection, records: &[PriceRecord]) -> StoreResult<InsertStats> {
    let tx = conn.transaction()?;
    let stats = insert_batch_tx(&tx, records)?;
    tx.commit()?;

    log::info!(
        "Committed batch of {} records ({} inserted, {} duplicates)",
        records.len(),
        stats.inserted,
        stats.duplicates
    );
    Ok(stats)
}

fn insert_batch_tx(tx: &Transaction<'_>, records: &[PriceRecord]) -> StoreResult<InsertStats> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO prices (id, name, category, price, create_date)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT DO NOTHING",
    )?;

    let mut stats = InsertStats::default();
    for record in records {
        let (name, category, price, created_at) = record.dedup_key();
        let changed = stmt.execute(params![
            record.id,
            name,
            category,
            to_cents(price)?,
            created_at,
        ])?;

        if changed > 0 {
            stats.inserted += 1;
        } else {
            log::debug!(
                "Duplicate record skipped: id {} ({}, {}, {}, {})",
                record.id,
                name,
                category,
                price,
                created_at
            );
            stats.duplicates += 1;
        }
    }

    Ok(stats)
}

/// Get total count of persisted records
pub fn total_item_count(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM prices", [], |row| row.get(0))?)
}

/// Get count of distinct categories
pub fn total_category_count(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(DISTINCT category) FROM prices", [], |row| {
        row.get(0)
    })?)
}

/// Get the sum of all prices (zero when the store is empty)
pub fn total_price_sum(conn: &Connection) -> StoreResult<Decimal> {
    let cents: i64 =
        conn.query_row("SELECT COALESCE(SUM(price), 0) FROM prices", [], |row| {
            row.get(0)
        })?;
    Ok(from_cents(cents))
}

/// Collect all store-wide aggregates
pub fn store_totals(conn: &Connection) -> StoreResult<StoreTotals> {
    Ok(StoreTotals {
        total_items: total_item_count(conn)?,
        total_categories: total_category_count(conn)?,
        total_price: total_price_sum(conn)?,
    })
}

/// Select records matching every present bound, ordered by id
pub fn select_by_filter(
    conn: &Connection,
    criteria: &FilterCriteria,
) -> StoreResult<Vec<PriceRecord>> {
    let query = build_filter_query(criteria);
    log::debug!("Filter query: {} ({} params)", query.sql, query.params.len());

    let mut stmt = conn.prepare(&query.sql)?;
    let results: rusqlite::Result<Vec<PriceRecord>> = stmt
        .query_map(params_from_iter(query.params.iter()), |row| {
            Ok(PriceRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                category: row.get(2)?,
                price: from_cents(row.get(3)?),
                created_at: row.get(4)?,
            })
        })?
        .collect();
    Ok(results?)
}

/// SQL text plus positional parameters for an export query
#[derive(Debug)]
struct FilterQuery {
    sql: String,
    params: Vec<Value>,
}

/// Build the WHERE clause from the bounds that are present.
///
/// An absent bound contributes neither SQL nor a placeholder.
fn build_filter_query(criteria: &FilterCriteria) -> FilterQuery {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    push_range(
        &mut clauses,
        &mut params,
        "create_date",
        criteria.start.map(|d| Value::Text(d.to_string())),
        criteria.end.map(|d| Value::Text(d.to_string())),
    );
    push_range(
        &mut clauses,
        &mut params,
        "price",
        criteria.min.map(|m| Value::Integer(lower_bound_cents(m))),
        criteria.max.map(|m| Value::Integer(upper_bound_cents(m))),
    );

    let mut sql = String::from(SELECT_PRICES);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY id ASC");

    FilterQuery { sql, params }
}

fn push_range(
    clauses: &mut Vec<String>,
    params: &mut Vec<Value>,
    column: &str,
    lower: Option<Value>,
    upper: Option<Value>,
) {
    let next = params.len() + 1;
    match (lower, upper) {
        (Some(lo), Some(hi)) => {
            clauses.push(format!("{} BETWEEN ?{} AND ?{}", column, next, next + 1));
            params.push(lo);
            params.push(hi);
        }
        (Some(lo), None) => {
            clauses.push(format!("{} >= ?{}", column, next));
            params.push(lo);
        }
        (None, Some(hi)) => {
            clauses.push(format!("{} <= ?{}", column, next));
            params.push(hi);
        }
        (None, None) => {}
    }
}

fn to_cents(price: Decimal) -> StoreResult<i64> {
    let mut cents = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    i64::try_from(cents.mantissa()).map_err(|_| StoreError::PriceOutOfRange(price))
}

fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Smallest whole cent amount `>= bound`
fn lower_bound_cents(bound: Decimal) -> i64 {
    bound
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|c| c.ceil().to_i64())
        .unwrap_or(if bound.is_sign_negative() { i64::MIN } else { i64::MAX })
}

/// Largest whole cent amount `<= bound`
fn upper_bound_cents(bound: Decimal) -> i64 {
    bound
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|c| c.floor().to_i64())
        .unwrap_or(if bound.is_sign_negative() { i64::MIN } else { i64::MAX })
}
