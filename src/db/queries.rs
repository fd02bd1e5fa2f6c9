use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::PurchaseDedup;
use super::from_row::{CART_ITEM_COLS, CUSTOM_REQUEST_COLS, PURCHASE_COLS, query_all, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Purchases ============

/// Record every entitlement from one confirmed checkout as a single batch.
///
/// All rows commit together or not at all. Under [`PurchaseDedup::Unique`]
/// rows whose `(stripe_session_id, animation_id)` already exist are skipped,
/// so the return value (rows actually written) can be lower than the input.
pub fn insert_purchases(
    conn: &mut Connection,
    purchases: &[NewPurchase],
    dedup: PurchaseDedup,
) -> Result<usize> {
    let sql = match dedup {
        PurchaseDedup::AtLeastOnce => {
            "INSERT INTO purchases (id, user_id, animation_id, stripe_session_id, amount_paid, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        }
        PurchaseDedup::Unique => {
            "INSERT OR IGNORE INTO purchases (id, user_id, animation_id, stripe_session_id, amount_paid, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        }
    };

    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(sql)?;
        let now = now();
        for purchase in purchases {
            inserted += stmt.execute(params![
                gen_id(),
                &purchase.user_id,
                &purchase.animation_id,
                &purchase.stripe_session_id,
                purchase.amount_paid.to_string(),
                now,
            ])?;
        }
    }
    tx.commit()?;

    Ok(inserted)
}

pub fn list_purchases_for_session(
    conn: &Connection,
    stripe_session_id: &str,
) -> Result<Vec<PurchaseRecord>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM purchases WHERE stripe_session_id = ?1 ORDER BY rowid",
            PURCHASE_COLS
        ),
        &[&stripe_session_id],
    )
}

/// A user's entitlements, newest first.
pub fn list_purchases_for_user(conn: &Connection, user_id: &str) -> Result<Vec<PurchaseRecord>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM purchases WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            PURCHASE_COLS
        ),
        &[&user_id],
    )
}

pub fn user_owns_animation(conn: &Connection, user_id: &str, animation_id: &str) -> Result<bool> {
    let owned: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = ?1 AND animation_id = ?2)",
        params![user_id, animation_id],
        |row| row.get(0),
    )?;
    Ok(owned)
}

pub fn count_purchases(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM purchases", [], |row| row.get(0))?;
    Ok(count)
}

// ============ Cart Items ============

/// Add an animation to a user's cart. Returns false if it was already there.
pub fn add_cart_item(conn: &Connection, user_id: &str, animation_id: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO cart_items (id, user_id, animation_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![gen_id(), user_id, animation_id, now()],
    )?;
    Ok(inserted > 0)
}

/// Cart contents in the order items were added.
pub fn list_cart_items(conn: &Connection, user_id: &str) -> Result<Vec<CartItem>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM cart_items WHERE user_id = ?1 ORDER BY created_at, rowid",
            CART_ITEM_COLS
        ),
        &[&user_id],
    )
}

pub fn remove_cart_item(conn: &Connection, user_id: &str, animation_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM cart_items WHERE user_id = ?1 AND animation_id = ?2",
        params![user_id, animation_id],
    )?;
    Ok(deleted > 0)
}

pub fn clear_cart_items(conn: &Connection, user_id: &str) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM cart_items WHERE user_id = ?1", params![user_id])?;
    Ok(deleted)
}

// ============ Custom Requests ============

pub fn create_custom_request(
    conn: &Connection,
    input: &CreateCustomRequest,
) -> Result<CustomRequest> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO custom_requests (id, name, email, project_type, description, budget, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            &input.name,
            &input.email,
            &input.project_type,
            &input.description,
            &input.budget,
            now
        ],
    )?;

    Ok(CustomRequest {
        id,
        name: input.name.clone(),
        email: input.email.clone(),
        project_type: input.project_type.clone(),
        description: input.description.clone(),
        budget: input.budget.clone(),
        created_at: now,
    })
}

pub fn get_custom_request(conn: &Connection, id: &str) -> Result<Option<CustomRequest>> {
    query_one(
        conn,
        &format!("SELECT {} FROM custom_requests WHERE id = ?1", CUSTOM_REQUEST_COLS),
        &[&id],
    )
}
