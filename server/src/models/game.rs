//! The `games` table: one row per tournament match.

use std::str::FromStr;

use color_eyre::eyre::Context as _;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::engine::rules::{GameRules, GameType};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Created,
    Started,
    InProgress,
    Stopped,
    Restarted,
    Completed,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Created => "CREATED",
            GameStatus::Started => "STARTED",
            GameStatus::InProgress => "IN_PROGRESS",
            GameStatus::Stopped => "STOPPED",
            GameStatus::Restarted => "RESTARTED",
            GameStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for GameStatus {
    type Err = color_eyre::eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(GameStatus::Created),
            "STARTED" => Ok(GameStatus::Started),
            "IN_PROGRESS" => Ok(GameStatus::InProgress),
            "STOPPED" => Ok(GameStatus::Stopped),
            "RESTARTED" => Ok(GameStatus::Restarted),
            "COMPLETED" => Ok(GameStatus::Completed),
            other => Err(color_eyre::eyre::eyre!("invalid game status: {other}")),
        }
    }
}

/// A persisted game row. `rules` holds the board shape, spawn policy, and
/// timing knobs as one JSON blob rather than a column per knob, since the
/// engine already treats them as one typed value ([`GameRules`]).
#[derive(Debug, Serialize, Deserialize)]
pub struct Game {
    pub game_id: Uuid,
    pub status: GameStatus,
    pub rules: GameRules,
    pub turn_number: i32,
    pub daemon_id: Option<Uuid>,
    pub board_configuration_id: Option<Uuid>,
    pub parent_game_id: Option<Uuid>,
    pub child_game_id: Option<Uuid>,
    pub auto_mode: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateGame {
    pub rules: GameRules,
    pub daemon_id: Option<Uuid>,
    pub board_configuration_id: Option<Uuid>,
}

struct GameRow {
    game_id: Uuid,
    status: String,
    rules: serde_json::Value,
    turn_number: i32,
    daemon_id: Option<Uuid>,
    board_configuration_id: Option<Uuid>,
    parent_game_id: Option<Uuid>,
    child_game_id: Option<Uuid>,
    auto_mode: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl GameRow {
    fn into_game(self) -> cja::Result<Game> {
        Ok(Game {
            game_id: self.game_id,
            status: GameStatus::from_str(&self.status)
                .wrap_err_with(|| format!("invalid game status: {}", self.status))?,
            rules: serde_json::from_value(self.rules).wrap_err("invalid stored game rules")?,
            turn_number: self.turn_number,
            daemon_id: self.daemon_id,
            board_configuration_id: self.board_configuration_id,
            parent_game_id: self.parent_game_id,
            child_game_id: self.child_game_id,
            auto_mode: self.auto_mode,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn get_all_games(pool: &PgPool) -> cja::Result<Vec<Game>> {
    let rows = sqlx::query_as!(
        GameRow,
        r#"
        SELECT
            game_id,
            status,
            rules,
            turn_number,
            daemon_id,
            board_configuration_id,
            parent_game_id,
            child_game_id,
            auto_mode,
            created_at,
            updated_at
        FROM games
        ORDER BY created_at DESC
        "#
    )
    .fetch_all(pool)
    .await
    .wrap_err("failed to fetch games from database")?;

    rows.into_iter().map(GameRow::into_game).collect()
}

pub async fn get_game_by_id(pool: &PgPool, game_id: Uuid) -> cja::Result<Option<Game>> {
    let row = sqlx::query_as!(
        GameRow,
        r#"
        SELECT
            game_id,
            status,
            rules,
            turn_number,
            daemon_id,
            board_configuration_id,
            parent_game_id,
            child_game_id,
            auto_mode,
            created_at,
            updated_at
        FROM games
        WHERE game_id = $1
        "#,
        game_id
    )
    .fetch_optional(pool)
    .await
    .wrap_err("failed to fetch game from database")?;

    row.map(GameRow::into_game).transpose()
}

pub async fn create_game(pool: &PgPool, data: CreateGame) -> cja::Result<Game> {
    let rules_json = serde_json::to_value(&data.rules).wrap_err("failed to serialize game rules")?;
    let status_str = GameStatus::Created.as_str();

    let row = sqlx::query_as!(
        GameRow,
        r#"
        INSERT INTO games (status, rules, turn_number, daemon_id, board_configuration_id, auto_mode)
        VALUES ($1, $2, 0, $3, $4, false)
        RETURNING
            game_id,
            status,
            rules,
            turn_number,
            daemon_id,
            board_configuration_id,
            parent_game_id,
            child_game_id,
            auto_mode,
            created_at,
            updated_at
        "#,
        status_str,
        rules_json,
        data.daemon_id,
        data.board_configuration_id,
    )
    .fetch_one(pool)
    .await
    .wrap_err("failed to create game in database")?;

    row.into_game()
}

pub async fn set_status(pool: &PgPool, game_id: Uuid, status: GameStatus) -> cja::Result<Game> {
    let status_str = status.as_str();

    let row = sqlx::query_as!(
        GameRow,
        r#"
        UPDATE games
        SET status = $2
        WHERE game_id = $1
        RETURNING
            game_id,
            status,
            rules,
            turn_number,
            daemon_id,
            board_configuration_id,
            parent_game_id,
            child_game_id,
            auto_mode,
            created_at,
            updated_at
        "#,
        game_id,
        status_str
    )
    .fetch_one(pool)
    .await
    .wrap_err_with(|| format!("failed to update status for game {game_id}"))?;

    row.into_game()
}

pub async fn set_turn_number(pool: &PgPool, game_id: Uuid, turn_number: i32) -> cja::Result<()> {
    sqlx::query!(
        r#"
        UPDATE games
        SET turn_number = $2
        WHERE game_id = $1
        "#,
        game_id,
        turn_number
    )
    .execute(pool)
    .await
    .wrap_err_with(|| format!("failed to update turn number for game {game_id}"))?;

    Ok(())
}

pub async fn set_auto_mode(pool: &PgPool, game_id: Uuid, auto_mode: bool) -> cja::Result<()> {
    sqlx::query!(
        r#"
        UPDATE games
        SET auto_mode = $2
        WHERE game_id = $1
        "#,
        game_id,
        auto_mode
    )
    .execute(pool)
    .await
    .wrap_err_with(|| format!("failed to update auto_mode for game {game_id}"))?;

    Ok(())
}

pub async fn set_child_game_id(pool: &PgPool, game_id: Uuid, child_game_id: Uuid) -> cja::Result<()> {
    sqlx::query!(
        r#"
        UPDATE games
        SET child_game_id = $2
        WHERE game_id = $1
        "#,
        game_id,
        child_game_id
    )
    .execute(pool)
    .await
    .wrap_err_with(|| format!("failed to set child game for game {game_id}"))?;

    Ok(())
}

/// Creates a new game row copying `rules`/`daemon_id`/`board_configuration_id`
/// from `parent_game_id`, links the two games in both directions, and
/// copies the parent's snake roster (without placements) in one
/// transaction.
pub async fn clone_game(pool: &PgPool, parent_game_id: Uuid) -> cja::Result<Game> {
    let parent = get_game_by_id(pool, parent_game_id)
        .await?
        .ok_or_else(|| cja::color_eyre::eyre::eyre!("game not found"))?;

    let mut tx = pool.begin().await.wrap_err("failed to start database transaction")?;

    let rules_json = serde_json::to_value(&parent.rules).wrap_err("failed to serialize game rules")?;
    let status_str = GameStatus::Created.as_str();

    let row = sqlx::query_as!(
        GameRow,
        r#"
        INSERT INTO games (status, rules, turn_number, daemon_id, board_configuration_id, parent_game_id, auto_mode)
        VALUES ($1, $2, 0, $3, $4, $5, false)
        RETURNING
            game_id,
            status,
            rules,
            turn_number,
            daemon_id,
            board_configuration_id,
            parent_game_id,
            child_game_id,
            auto_mode,
            created_at,
            updated_at
        "#,
        status_str,
        rules_json,
        parent.daemon_id,
        parent.board_configuration_id,
        parent_game_id,
    )
    .fetch_one(&mut *tx)
    .await
    .wrap_err("failed to create cloned game in database")?;

    sqlx::query!(
        r#"
        INSERT INTO game_snakes (game_id, snake_id)
        SELECT $2, snake_id FROM game_snakes WHERE game_id = $1
        "#,
        parent_game_id,
        row.game_id,
    )
    .execute(&mut *tx)
    .await
    .wrap_err("failed to copy snake roster into cloned game")?;

    sqlx::query!(
        r#"
        UPDATE games
        SET child_game_id = $2
        WHERE game_id = $1
        "#,
        parent_game_id,
        row.game_id,
    )
    .execute(&mut *tx)
    .await
    .wrap_err("failed to link parent game to its clone")?;

    tx.commit().await.wrap_err("failed to commit database transaction")?;

    row.into_game()
}

pub async fn delete_game(pool: &PgPool, game_id: Uuid) -> cja::Result<()> {
    sqlx::query!(
        r#"
        DELETE FROM games
        WHERE game_id = $1
        "#,
        game_id
    )
    .execute(pool)
    .await
    .wrap_err("failed to delete game from database")?;

    Ok(())
}

/// `GameType::Score`/`GameType::Placement` live on [`GameRules`] already;
/// this just re-exports the type so callers don't need to reach into
/// `crate::engine` for a value that's conceptually part of the game row.
pub type PersistedGameType = GameType;
