use rusqlite::Connection;

/// Initialize the entitlement store schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Purchases (entitlements: who owns what)
        -- amount_paid is a decimal string with two fractional digits
        CREATE TABLE IF NOT EXISTS purchases (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            animation_id TEXT NOT NULL,
            stripe_session_id TEXT NOT NULL,
            amount_paid TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_purchases_user ON purchases(user_id);
        CREATE INDEX IF NOT EXISTS idx_purchases_session ON purchases(stripe_session_id);

        -- Cart items for logged-in users (guests keep their cart in the browser)
        CREATE TABLE IF NOT EXISTS cart_items (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            animation_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(user_id, animation_id)
        );
        CREATE INDEX IF NOT EXISTS idx_cart_items_user ON cart_items(user_id);

        -- Custom animation requests from the intake form
        CREATE TABLE IF NOT EXISTS custom_requests (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            project_type TEXT NOT NULL,
            description TEXT NOT NULL,
            budget TEXT,
            created_at INTEGER NOT NULL
        );
        "#,
    )
}

/// Make `(stripe_session_id, animation_id)` unique so redelivered webhooks
/// cannot record the same entitlement twice.
///
/// Fails if the table already holds duplicates.
pub fn enforce_unique_purchases(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_purchases_session_animation
         ON purchases(stripe_session_id, animation_id);",
    )
}
