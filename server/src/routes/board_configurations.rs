//! CRUD for named board layouts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    errors::{ServerResult, WithStatus},
    models::board_configuration::{self, CreateBoardConfiguration},
    state::AppState,
};

pub async fn list_board_configurations(
    State(state): State<AppState>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    let rows = board_configuration::get_all_board_configurations(&state.db)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(rows))
}

pub async fn create_board_configuration(
    State(state): State<AppState>,
    Json(request): Json<CreateBoardConfiguration>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    let created = board_configuration::create_board_configuration(&state.db, request)
        .await
        .with_status(StatusCode::BAD_REQUEST)?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_board_configuration(
    State(state): State<AppState>,
    Path(board_configuration_id): Path<Uuid>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    board_configuration::delete_board_configuration(&state.db, board_configuration_id)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
