use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::CreateCustomRequest;

#[derive(Debug, Serialize)]
pub struct CustomRequestCreated {
    pub id: String,
}

/// Store a bespoke capture request from the intake form.
pub async fn submit_custom_request(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomRequest>,
) -> Result<(StatusCode, Json<CustomRequestCreated>)> {
    let input = input.normalized()?;
    let conn = state.db.get()?;
    let request = queries::create_custom_request(&conn, &input)?;

    tracing::info!(request_id = %request.id, project_type = %request.project_type, "Custom request received");

    Ok((StatusCode::CREATED, Json(CustomRequestCreated { id: request.id })))
}
