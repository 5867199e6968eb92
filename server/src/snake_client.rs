//! HTTP client for talking to remote snake and daemon endpoints. Every
//! call gets its own deadline and a timeout never aborts the tick — a
//! non-responding snake just loses its turn.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::engine::board::Board;
use crate::engine::position::Position;
use crate::engine::serializer;
use crate::engine::snake::Snake;
use crate::engine::Dialect;

#[derive(Debug, Error)]
pub enum SnakeClientError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("http status {0}")]
    BadStatus(StatusCode),
    #[error("invalid json: {0}")]
    InvalidJson(String),
}

#[derive(Debug, Deserialize)]
struct MoveResponseBody {
    #[serde(rename = "move")]
    direction: String,
    #[serde(default)]
    taunt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StartResponseBody {
    #[serde(default)]
    taunt: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    secondary_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DaemonUpdateResponse {
    #[serde(rename = "$spawn.walls", default)]
    pub spawn_walls: Vec<Position>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What a `/move` call told us, or failed to.
pub struct MoveOutcome {
    pub snake_id: String,
    pub result: Result<(String, Option<String>), SnakeClientError>,
    pub latency: Duration,
}

async fn post_json(
    client: &Client,
    url: &str,
    body: &Value,
    timeout: Duration,
) -> Result<Value, SnakeClientError> {
    let response = tokio::time::timeout(timeout, client.post(url).json(body).send())
        .await
        .map_err(|_| SnakeClientError::Timeout(timeout))?
        .map_err(|e| SnakeClientError::Connection(e.to_string()))?;

    if !response.status().is_success() {
        return Err(SnakeClientError::BadStatus(response.status()));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| SnakeClientError::InvalidJson(e.to_string()))
}

async fn post_fire_and_forget(client: &Client, url: &str, body: &Value, timeout: Duration) {
    match tokio::time::timeout(timeout, client.post(url).json(body).send()).await {
        Ok(Ok(response)) if response.status().is_success() => {}
        Ok(Ok(response)) => {
            tracing::warn!(url, status = %response.status(), "non-2xx response");
        }
        Ok(Err(e)) => {
            tracing::warn!(url, error = %e, "connection error");
        }
        Err(_) => {
            tracing::warn!(url, timeout_ms = timeout.as_millis(), "timed out");
        }
    }
}

/// `POST /start`, deadline `2 × responseTime`. Applies the response to
/// `snake` in place; a failure is logged and leaves the snake untouched
/// (spec: nothing a remote endpoint does is fatal to the tick).
pub async fn request_start(
    client: &Client,
    snake: &mut Snake,
    game_id: &str,
    width: i32,
    height: i32,
    dev_mode: bool,
    deadline: Duration,
) {
    let url = format!("{}/start", snake.get_url(dev_mode).trim_end_matches('/'));
    let body = serializer::start_request(game_id, width, height, dialect_of(snake));

    match post_json(client, &url, &body, deadline).await {
        Ok(json) => {
            let parsed: StartResponseBody = serde_json::from_value(json).unwrap_or_default();
            snake.handle_start_response(parsed.taunt, parsed.name, parsed.color, parsed.secondary_color);
        }
        Err(e) => {
            tracing::warn!(snake_id = %snake.id, error = %e, "failed to call /start");
        }
    }
}

/// `POST /move`, deadline `responseTime`. Does not mutate `snake` — the
/// caller applies the outcome so it can also be recorded in the tick's
/// `errors` map.
pub async fn request_move(
    client: &Client,
    snake: &Snake,
    board: &Board,
    game_id: &str,
    turn_number: u32,
    turn_limit: Option<u32>,
    dev_mode: bool,
    deadline: Duration,
) -> MoveOutcome {
    let url = format!("{}/move", snake.get_url(dev_mode).trim_end_matches('/'));
    let body = serializer::move_request(board, game_id, turn_number, turn_limit, snake, dialect_of(snake));

    let start = Instant::now();
    let result = post_json(client, &url, &body, deadline).await.and_then(|json| {
        serde_json::from_value::<MoveResponseBody>(json)
            .map(|parsed| (parsed.direction, parsed.taunt))
            .map_err(|e| SnakeClientError::InvalidJson(e.to_string()))
    });
    let latency = start.elapsed();

    if let Err(ref e) = result {
        tracing::warn!(snake_id = %snake.id, error = %e, "failed to call /move");
    }

    MoveOutcome {
        snake_id: snake.id.clone(),
        result,
        latency,
    }
}

/// `POST /end`, fire-and-forget, deadline `responseTime`.
pub async fn request_end(
    client: &Client,
    snake: &Snake,
    game_id: &str,
    winner_id: Option<&str>,
    dev_mode: bool,
    deadline: Duration,
) {
    let url = format!("{}/end", snake.get_url(dev_mode).trim_end_matches('/'));
    let body = serde_json::json!({ "winner_id": winner_id, "you": snake.id, "gameId": game_id });
    post_fire_and_forget(client, &url, &body, deadline).await;
}

/// `POST /bounty/check`, fire-and-forget, deadline `responseTime`.
pub async fn request_bounty_check(
    client: &Client,
    snake: &Snake,
    game_id: &str,
    dev_mode: bool,
    deadline: Duration,
) {
    let url = format!("{}/bounty/check", snake.get_url(dev_mode).trim_end_matches('/'));
    let body = serde_json::json!({ "gameId": game_id, "id": snake.id });
    post_fire_and_forget(client, &url, &body, deadline).await;
}

/// `POST` the full board snapshot to an optional per-game daemon side-car.
/// Deadline `responseTime`. `None` on any transient failure — logged, not
/// propagated.
pub async fn request_daemon_update(
    client: &Client,
    daemon_url: &str,
    board: &Board,
    deadline: Duration,
) -> Option<(DaemonUpdateResponse, Duration)> {
    let body = serializer::board_to_json(board, Dialect::Client);
    let start = Instant::now();

    match post_json(client, daemon_url, &body, deadline).await {
        Ok(json) => {
            let elapsed = start.elapsed();
            match serde_json::from_value::<DaemonUpdateResponse>(json) {
                Ok(parsed) => Some((parsed, elapsed)),
                Err(e) => {
                    tracing::warn!(error = %e, "invalid daemon response json");
                    None
                }
            }
        }
        Err(e) => {
            tracing::warn!(url = daemon_url, error = %e, "daemon update failed");
            None
        }
    }
}

/// `/move` for every snake (alive or dead — a dead snake is still asked,
/// per spec §4.3 step 4) in parallel. Order of the returned vec matches
/// `board.snakes`.
pub async fn request_moves_parallel(
    client: &Client,
    board: &Board,
    game_id: &str,
    turn_number: u32,
    turn_limit: Option<u32>,
    dev_mode: bool,
    deadline: Duration,
) -> Vec<MoveOutcome> {
    let futures = board
        .snakes
        .iter()
        .map(|snake| request_move(client, snake, board, game_id, turn_number, turn_limit, dev_mode, deadline));

    futures::future::join_all(futures).await
}

/// `/start` for every snake in parallel. Mutation happens inside each
/// future since `request_start` needs `&mut Snake`, so snakes are taken by
/// value and handed back.
pub async fn request_start_parallel(
    client: &Client,
    mut snakes: Vec<Snake>,
    game_id: &str,
    width: i32,
    height: i32,
    dev_mode: bool,
    deadline: Duration,
) -> Vec<Snake> {
    let futures = snakes.iter_mut().map(|snake| async {
        request_start(client, snake, game_id, width, height, dev_mode, deadline).await;
    });
    futures::future::join_all(futures).await;
    snakes
}

pub async fn request_end_parallel(
    client: &Client,
    board: &Board,
    game_id: &str,
    winner_id: Option<&str>,
    dev_mode: bool,
    deadline: Duration,
) {
    let futures = board
        .snakes
        .iter()
        .map(|snake| request_end(client, snake, game_id, winner_id, dev_mode, deadline));
    futures::future::join_all(futures).await;
}

pub async fn request_bounty_checks_parallel<'a>(
    client: &Client,
    bounty_snakes: impl Iterator<Item = &'a Snake>,
    game_id: &str,
    dev_mode: bool,
    deadline: Duration,
) {
    let futures = bounty_snakes.map(|snake| request_bounty_check(client, snake, game_id, dev_mode, deadline));
    futures::future::join_all(futures).await;
}

fn dialect_of(snake: &Snake) -> Dialect {
    match snake.api_version {
        crate::engine::ApiVersion::V2016 => Dialect::V2016,
        crate::engine::ApiVersion::V2017 => Dialect::V2017,
        crate::engine::ApiVersion::V2018 => Dialect::V2018,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_of_maps_every_api_version() {
        let mut snake = Snake::new("s", "s", "http://example.test");
        snake.api_version = crate::engine::ApiVersion::V2017;
        assert_eq!(dialect_of(&snake), Dialect::V2017);
        snake.api_version = crate::engine::ApiVersion::V2018;
        assert_eq!(dialect_of(&snake), Dialect::V2018);
    }
}
