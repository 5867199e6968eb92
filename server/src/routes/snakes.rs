//! CRUD for registered competitors. No per-user ownership — this crate has
//! no auth.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    errors::{ServerResult, WithStatus},
    models::snake::{self, CreateSnake, SnakeRow, UpdateSnake},
    state::AppState,
};

pub async fn list_snakes(State(state): State<AppState>) -> ServerResult<impl IntoResponse, StatusCode> {
    let snakes = snake::get_all_snakes(&state.db)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(snakes))
}

pub async fn get_snake(
    State(state): State<AppState>,
    Path(snake_id): Path<Uuid>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    let found = snake::get_snake_by_id(&state.db, snake_id)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| cja::color_eyre::eyre::eyre!("snake not found"))
        .with_status(StatusCode::NOT_FOUND)?;

    Ok(Json(found))
}

pub async fn create_snake(
    State(state): State<AppState>,
    Json(request): Json<CreateSnake>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    let created: SnakeRow = snake::create_snake(&state.db, request)
        .await
        .with_status(StatusCode::BAD_REQUEST)?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_snake(
    State(state): State<AppState>,
    Path(snake_id): Path<Uuid>,
    Json(request): Json<UpdateSnake>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    let updated = snake::update_snake(&state.db, snake_id, request)
        .await
        .with_status(StatusCode::BAD_REQUEST)?;

    Ok(Json(updated))
}

pub async fn delete_snake(
    State(state): State<AppState>,
    Path(snake_id): Path<Uuid>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    snake::delete_snake(&state.db, snake_id)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
