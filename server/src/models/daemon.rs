//! The `daemons` table: registered side-car URLs a game can be configured
//! to POST board snapshots to each tick.

use color_eyre::eyre::Context as _;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Daemon {
    pub daemon_id: Uuid,
    pub name: String,
    pub url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateDaemon {
    pub name: String,
    pub url: String,
}

pub async fn get_all_daemons(pool: &PgPool) -> cja::Result<Vec<Daemon>> {
    let daemons = sqlx::query_as!(
        Daemon,
        r#"
        SELECT daemon_id, name, url, created_at, updated_at
        FROM daemons
        ORDER BY name ASC
        "#
    )
    .fetch_all(pool)
    .await
    .wrap_err("failed to fetch daemons from database")?;

    Ok(daemons)
}

pub async fn get_daemon_by_id(pool: &PgPool, daemon_id: Uuid) -> cja::Result<Option<Daemon>> {
    let daemon = sqlx::query_as!(
        Daemon,
        r#"
        SELECT daemon_id, name, url, created_at, updated_at
        FROM daemons
        WHERE daemon_id = $1
        "#,
        daemon_id
    )
    .fetch_optional(pool)
    .await
    .wrap_err("failed to fetch daemon from database")?;

    Ok(daemon)
}

pub async fn create_daemon(pool: &PgPool, data: CreateDaemon) -> cja::Result<Daemon> {
    let daemon = sqlx::query_as!(
        Daemon,
        r#"
        INSERT INTO daemons (name, url)
        VALUES ($1, $2)
        RETURNING daemon_id, name, url, created_at, updated_at
        "#,
        data.name,
        data.url,
    )
    .fetch_one(pool)
    .await
    .wrap_err("failed to create daemon in database")?;

    Ok(daemon)
}

pub async fn delete_daemon(pool: &PgPool, daemon_id: Uuid) -> cja::Result<()> {
    sqlx::query!(
        r#"
        DELETE FROM daemons
        WHERE daemon_id = $1
        "#,
        daemon_id
    )
    .execute(pool)
    .await
    .wrap_err("failed to delete daemon from database")?;

    Ok(())
}

impl Daemon {
    pub fn into_descriptor(self) -> crate::engine::rules::DaemonDescriptor {
        crate::engine::rules::DaemonDescriptor {
            id: self.daemon_id.to_string(),
            name: self.name,
            url: self.url,
        }
    }
}
