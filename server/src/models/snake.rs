//! The `snakes` table: a registered competitor, independent of any one
//! game. Carries opaque display fields (`head_image_url`) a viewer UI
//! needs per game.

use color_eyre::eyre::Context as _;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct SnakeRow {
    pub snake_id: Uuid,
    pub name: String,
    pub url: String,
    pub dev_url: Option<String>,
    pub head_image_url: Option<String>,
    pub api_version: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateSnake {
    pub name: String,
    pub url: String,
    pub dev_url: Option<String>,
    pub head_image_url: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpdateSnake {
    pub name: String,
    pub url: String,
    pub dev_url: Option<String>,
    pub head_image_url: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_api_version() -> String {
    "2018".to_string()
}

pub async fn get_all_snakes(pool: &PgPool) -> cja::Result<Vec<SnakeRow>> {
    let snakes = sqlx::query_as!(
        SnakeRow,
        r#"
        SELECT
            snake_id,
            name,
            url,
            dev_url,
            head_image_url,
            api_version,
            created_at,
            updated_at
        FROM snakes
        ORDER BY name ASC
        "#
    )
    .fetch_all(pool)
    .await
    .wrap_err("failed to fetch snakes from database")?;

    Ok(snakes)
}

pub async fn get_snake_by_id(pool: &PgPool, snake_id: Uuid) -> cja::Result<Option<SnakeRow>> {
    let snake = sqlx::query_as!(
        SnakeRow,
        r#"
        SELECT
            snake_id,
            name,
            url,
            dev_url,
            head_image_url,
            api_version,
            created_at,
            updated_at
        FROM snakes
        WHERE snake_id = $1
        "#,
        snake_id
    )
    .fetch_optional(pool)
    .await
    .wrap_err("failed to fetch snake from database")?;

    Ok(snake)
}

pub async fn create_snake(pool: &PgPool, data: CreateSnake) -> cja::Result<SnakeRow> {
    let snake = sqlx::query_as!(
        SnakeRow,
        r#"
        INSERT INTO snakes (name, url, dev_url, head_image_url, api_version)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING
            snake_id,
            name,
            url,
            dev_url,
            head_image_url,
            api_version,
            created_at,
            updated_at
        "#,
        data.name,
        data.url,
        data.dev_url,
        data.head_image_url,
        data.api_version,
    )
    .fetch_one(pool)
    .await
    .wrap_err("failed to create snake in database")?;

    Ok(snake)
}

pub async fn update_snake(pool: &PgPool, snake_id: Uuid, data: UpdateSnake) -> cja::Result<SnakeRow> {
    let snake = sqlx::query_as!(
        SnakeRow,
        r#"
        UPDATE snakes
        SET
            name = $2,
            url = $3,
            dev_url = $4,
            head_image_url = $5,
            api_version = $6
        WHERE snake_id = $1
        RETURNING
            snake_id,
            name,
            url,
            dev_url,
            head_image_url,
            api_version,
            created_at,
            updated_at
        "#,
        snake_id,
        data.name,
        data.url,
        data.dev_url,
        data.head_image_url,
        data.api_version,
    )
    .fetch_one(pool)
    .await
    .wrap_err("failed to update snake in database")?;

    Ok(snake)
}

pub async fn delete_snake(pool: &PgPool, snake_id: Uuid) -> cja::Result<()> {
    sqlx::query!(
        r#"
        DELETE FROM snakes
        WHERE snake_id = $1
        "#,
        snake_id
    )
    .execute(pool)
    .await
    .wrap_err("failed to delete snake from database")?;

    Ok(())
}
