//! Thin HTTP/websocket wiring onto [`crate::manager::Manager`]. The
//! Runner/Manager are the product; this is just enough surface to drive
//! them from a real process — no auth, no HTML rendering.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    engine::rules::GameRules,
    errors::{ServerResult, WithStatus},
    game_channels::PushEvent,
    models::{
        game::{self, Game},
        game_snake,
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    #[serde(default)]
    pub rules: GameRules,
    pub daemon_id: Option<Uuid>,
    pub board_configuration_id: Option<Uuid>,
    #[serde(default)]
    pub snake_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GameResponse {
    #[serde(flatten)]
    pub game: Game,
    pub snakes: Vec<game_snake::GameSnakeWithDetails>,
}

pub async fn create_game(
    State(state): State<AppState>,
    Json(request): Json<CreateGameRequest>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    let game = game::create_game(
        &state.db,
        game::CreateGame {
            rules: request.rules,
            daemon_id: request.daemon_id,
            board_configuration_id: request.board_configuration_id,
        },
    )
    .await
    .with_status(StatusCode::BAD_REQUEST)?;

    for snake_id in request.snake_ids {
        game_snake::add_snake_to_game(&state.db, game.game_id, snake_id)
            .await
            .with_status(StatusCode::BAD_REQUEST)?;
    }

    let snakes = game_snake::get_snakes_by_game_id(&state.db, game.game_id)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(GameResponse { game, snakes })))
}

pub async fn list_games(State(state): State<AppState>) -> ServerResult<impl IntoResponse, StatusCode> {
    let games = game::get_all_games(&state.db)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(games))
}

pub async fn show_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    let game = game::get_game_by_id(&state.db, game_id)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or_else(|| cja::color_eyre::eyre::eyre!("game not found"))
        .with_status(StatusCode::NOT_FOUND)?;

    let snakes = game_snake::get_snakes_by_game_id(&state.db, game_id)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(GameResponse { game, snakes }))
}

pub async fn add_snake(
    State(state): State<AppState>,
    Path((game_id, snake_id)): Path<(Uuid, Uuid)>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    game_snake::add_snake_to_game(&state.db, game_id, snake_id)
        .await
        .with_status(StatusCode::BAD_REQUEST)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_snake(
    State(state): State<AppState>,
    Path((game_id, snake_id)): Path<(Uuid, Uuid)>,
) -> ServerResult<impl IntoResponse, StatusCode> {
    game_snake::remove_snake_from_game(&state.db, game_id, snake_id)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_game(State(state): State<AppState>, Path(game_id): Path<Uuid>) -> StatusCode {
    state.manager.start_game(game_id).await;
    StatusCode::ACCEPTED
}

pub async fn pause_game(State(state): State<AppState>, Path(game_id): Path<Uuid>) -> StatusCode {
    state.manager.pause_game(game_id).await;
    StatusCode::ACCEPTED
}

pub async fn restart_game(State(state): State<AppState>, Path(game_id): Path<Uuid>) -> StatusCode {
    state.manager.restart_game(game_id).await;
    StatusCode::ACCEPTED
}

pub async fn step_game(State(state): State<AppState>, Path(game_id): Path<Uuid>) -> StatusCode {
    state.manager.step_game(game_id).await;
    StatusCode::ACCEPTED
}

pub async fn toggle_game_mode(State(state): State<AppState>, Path(game_id): Path<Uuid>) -> StatusCode {
    state.manager.toggle_game_mode(game_id).await;
    StatusCode::ACCEPTED
}

pub async fn apply_daemon_update(State(state): State<AppState>, Path(game_id): Path<Uuid>) -> StatusCode {
    state.manager.apply_daemon_update(game_id).await;
    StatusCode::ACCEPTED
}

/// GET /games/{id}/watch — spectator push stream. One frame per
/// `PushEvent`, serialized as `{"type": ..., ...fields}`.
pub async fn watch_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_watch_socket(socket, state, game_id))
}

async fn handle_watch_socket(socket: WebSocket, state: AppState, game_id: Uuid) {
    let mut events = match state.manager.watch_game(game_id).await {
        Ok(events) => events,
        Err(err) => {
            tracing::warn!(game_id = %game_id, error = ?err, "rejected watch connection");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let payload = push_event_to_json(event);
                    if sender.send(Message::Text(payload.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(game_id = %game_id, lagged = n, "watcher lagged behind game updates");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    state.manager.disconnect_game(game_id).await;
}

fn push_event_to_json(event: PushEvent) -> serde_json::Value {
    match event {
        PushEvent::Update { board, errors, viewers } => json!({
            "type": "update",
            "board": board,
            "errors": errors,
            "viewers": viewers,
        }),
        PushEvent::Redirect { game_id } => json!({
            "type": "redirect",
            "game_id": game_id,
        }),
        PushEvent::ViewerCount { count } => json!({
            "type": "viewer_count",
            "count": count,
        }),
        PushEvent::Message { text } => json!({
            "type": "message",
            "text": text,
        }),
        PushEvent::Error { message } => json!({
            "type": "error",
            "message": message,
        }),
    }
}
