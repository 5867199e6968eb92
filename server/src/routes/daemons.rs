//! CRUD for daemon side-cars.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    errors::{ServerResult, WithStatus},
    models::daemon::{self, CreateDaemon},
    state::AppState,
};

pub async fn list_daemons(State(state): State<AppState>) -> ServerResult<impl IntoResponse, StatusCode> {
    let daemons = daemon::get_all_daemons(&state.db)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(daemons))
}

pub async fn create_daemon(
    State(state): State<AppState>,
    Json(request): Json<CreateDaemon>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    let created = daemon::create_daemon(&state.db, request)
        .await
        .with_status(StatusCode::BAD_REQUEST)?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_daemon(
    State(state): State<AppState>,
    Path(daemon_id): Path<Uuid>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    daemon::delete_daemon(&state.db, daemon_id)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
