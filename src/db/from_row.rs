//! Row mapping trait and helpers for reducing boilerplate in queries.

use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use rust_decimal::Decimal;

use crate::models::*;

/// Parse a decimal string column, converting parse errors to rusqlite errors
/// instead of panicking on a corrupted value.
fn parse_decimal(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(&row.get::<_, String>(col)?).map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const PURCHASE_COLS: &str =
    "id, user_id, animation_id, stripe_session_id, amount_paid, created_at";

pub const CART_ITEM_COLS: &str = "animation_id, created_at";

pub const CUSTOM_REQUEST_COLS: &str =
    "id, name, email, project_type, description, budget, created_at";

// ============ FromRow Implementations ============

impl FromRow for PurchaseRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PurchaseRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            animation_id: row.get(2)?,
            stripe_session_id: row.get(3)?,
            amount_paid: parse_decimal(row, 4, "amount_paid")?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for CartItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CartItem {
            animation_id: row.get(0)?,
            created_at: row.get(1)?,
        })
    }
}

impl FromRow for CustomRequest {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CustomRequest {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            project_type: row.get(3)?,
            description: row.get(4)?,
            budget: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}
