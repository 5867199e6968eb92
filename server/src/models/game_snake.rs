//! The `game_snakes` join table: which snakes are in a game, and where
//! they placed. Caps a game at 4 snakes and validates placement.

use color_eyre::eyre::Context as _;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct GameSnake {
    pub game_snake_id: Uuid,
    pub game_id: Uuid,
    pub snake_id: Uuid,
    pub place: Option<i32>,
    pub death_turn: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameSnakeWithDetails {
    pub game_snake_id: Uuid,
    pub game_id: Uuid,
    pub snake_id: Uuid,
    pub place: Option<i32>,
    pub death_turn: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub name: String,
    pub url: String,
    pub dev_url: Option<String>,
    pub head_image_url: Option<String>,
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SetPlace {
    pub place: i32,
    pub death_turn: Option<i32>,
}

pub async fn get_snakes_by_game_id(pool: &PgPool, game_id: Uuid) -> cja::Result<Vec<GameSnakeWithDetails>> {
    let snakes = sqlx::query_as!(
        GameSnakeWithDetails,
        r#"
        SELECT
            gs.game_snake_id,
            gs.game_id,
            gs.snake_id,
            gs.place,
            gs.death_turn,
            gs.created_at,
            gs.updated_at,
            s.name,
            s.url,
            s.dev_url,
            s.head_image_url,
            s.api_version
        FROM game_snakes gs
        JOIN snakes s ON gs.snake_id = s.snake_id
        WHERE gs.game_id = $1
        ORDER BY gs.place NULLS LAST, gs.created_at ASC
        "#,
        game_id
    )
    .fetch_all(pool)
    .await
    .wrap_err("failed to fetch snakes for game from database")?;

    Ok(snakes)
}

/// Add a snake to a game. Games top out at 4 snakes, mirroring the
/// engine's board placement limit.
pub async fn add_snake_to_game(pool: &PgPool, game_id: Uuid, snake_id: Uuid) -> cja::Result<GameSnake> {
    let count = sqlx::query!(
        r#"
        SELECT COUNT(*) as count
        FROM game_snakes
        WHERE game_id = $1
        "#,
        game_id
    )
    .fetch_one(pool)
    .await
    .wrap_err("failed to count snakes in game")?;

    if count.count.unwrap_or(0) >= 4 {
        return Err(cja::color_eyre::eyre::eyre!("game already has the maximum of 4 snakes"));
    }

    let game_snake = sqlx::query_as!(
        GameSnake,
        r#"
        INSERT INTO game_snakes (game_id, snake_id)
        VALUES ($1, $2)
        RETURNING
            game_snake_id,
            game_id,
            snake_id,
            place,
            death_turn,
            created_at,
            updated_at
        "#,
        game_id,
        snake_id
    )
    .fetch_one(pool)
    .await
    .wrap_err("failed to add snake to game")?;

    Ok(game_snake)
}

pub async fn remove_snake_from_game(pool: &PgPool, game_id: Uuid, snake_id: Uuid) -> cja::Result<()> {
    sqlx::query!(
        r#"
        DELETE FROM game_snakes
        WHERE game_id = $1 AND snake_id = $2
        "#,
        game_id,
        snake_id
    )
    .execute(pool)
    .await
    .wrap_err("failed to remove snake from game")?;

    Ok(())
}

/// Record final standing for a snake at game end. `place` must be 1-4.
pub async fn set_place(
    pool: &PgPool,
    game_id: Uuid,
    snake_id: Uuid,
    data: SetPlace,
) -> cja::Result<GameSnake> {
    if data.place < 1 || data.place > 4 {
        return Err(cja::color_eyre::eyre::eyre!("place must be between 1 and 4"));
    }

    let game_snake = sqlx::query_as!(
        GameSnake,
        r#"
        UPDATE game_snakes
        SET place = $3, death_turn = $4
        WHERE game_id = $1 AND snake_id = $2
        RETURNING
            game_snake_id,
            game_id,
            snake_id,
            place,
            death_turn,
            created_at,
            updated_at
        "#,
        game_id,
        snake_id,
        data.place,
        data.death_turn,
    )
    .fetch_one(pool)
    .await
    .wrap_err("failed to set game result")?;

    Ok(game_snake)
}
