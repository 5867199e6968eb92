//! The `board_configurations` table: a named, reusable pinned board layout
//! (fixed food/gold/wall/teleporter/snake-start placements), persisted as
//! JSON and handed to [`crate::engine::board::Board::from_configuration`]
//! when a game starts.

use color_eyre::eyre::Context as _;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::engine::board::BoardConfiguration;

#[derive(Debug, Serialize, Deserialize)]
pub struct BoardConfigurationRow {
    pub board_configuration_id: Uuid,
    pub name: String,
    pub configuration: BoardConfiguration,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateBoardConfiguration {
    pub name: String,
    pub configuration: BoardConfiguration,
}

struct BoardConfigurationRowRaw {
    board_configuration_id: Uuid,
    name: String,
    configuration: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl BoardConfigurationRowRaw {
    fn into_row(self) -> cja::Result<BoardConfigurationRow> {
        Ok(BoardConfigurationRow {
            board_configuration_id: self.board_configuration_id,
            name: self.name,
            configuration: serde_json::from_value(self.configuration)
                .wrap_err("invalid stored board configuration")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn get_all_board_configurations(pool: &PgPool) -> cja::Result<Vec<BoardConfigurationRow>> {
    let rows = sqlx::query_as!(
        BoardConfigurationRowRaw,
        r#"
        SELECT board_configuration_id, name, configuration, created_at, updated_at
        FROM board_configurations
        ORDER BY name ASC
        "#
    )
    .fetch_all(pool)
    .await
    .wrap_err("failed to fetch board configurations from database")?;

    rows.into_iter().map(BoardConfigurationRowRaw::into_row).collect()
}

pub async fn get_board_configuration_by_id(
    pool: &PgPool,
    board_configuration_id: Uuid,
) -> cja::Result<Option<BoardConfigurationRow>> {
    let row = sqlx::query_as!(
        BoardConfigurationRowRaw,
        r#"
        SELECT board_configuration_id, name, configuration, created_at, updated_at
        FROM board_configurations
        WHERE board_configuration_id = $1
        "#,
        board_configuration_id
    )
    .fetch_optional(pool)
    .await
    .wrap_err("failed to fetch board configuration from database")?;

    row.map(BoardConfigurationRowRaw::into_row).transpose()
}

pub async fn create_board_configuration(
    pool: &PgPool,
    data: CreateBoardConfiguration,
) -> cja::Result<BoardConfigurationRow> {
    let configuration_json =
        serde_json::to_value(&data.configuration).wrap_err("failed to serialize board configuration")?;

    let row = sqlx::query_as!(
        BoardConfigurationRowRaw,
        r#"
        INSERT INTO board_configurations (name, configuration)
        VALUES ($1, $2)
        RETURNING board_configuration_id, name, configuration, created_at, updated_at
        "#,
        data.name,
        configuration_json,
    )
    .fetch_one(pool)
    .await
    .wrap_err("failed to create board configuration in database")?;

    row.into_row()
}

pub async fn delete_board_configuration(pool: &PgPool, board_configuration_id: Uuid) -> cja::Result<()> {
    sqlx::query!(
        r#"
        DELETE FROM board_configurations
        WHERE board_configuration_id = $1
        "#,
        board_configuration_id
    )
    .execute(pool)
    .await
    .wrap_err("failed to delete board configuration from database")?;

    Ok(())
}
