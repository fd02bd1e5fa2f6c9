use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::models::PurchaseRecord;

/// Everything a user has bought, newest first.
pub async fn list_purchases(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PurchaseRecord>>> {
    let conn = state.db.get()?;
    let purchases = queries::list_purchases_for_user(&conn, &user_id)?;
    Ok(Json(purchases))
}
