//! Shape lookup endpoint.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{error::AppError, models::shape::RecordShape, state::AppState};

/// Return a registered record shape by name.
///
/// # Endpoint
///
/// `GET /api/v1/shapes/{name}`
///
/// # Response
///
/// - **Success (200 OK)**: Field declarations and constraints of the shape
/// - **Error (400)**: No shape is registered under `name`
pub async fn get_shape(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RecordShape>, AppError> {
    let shape = state
        .shapes
        .get(&name)
        .ok_or_else(|| AppError::InvalidRequest(format!("Unknown shape {name}")))?;

    Ok(Json(shape.as_ref().clone()))
}
