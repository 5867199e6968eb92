use std::sync::Arc;

use color_eyre::eyre::{Context as _, eyre};
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::cache::{InMemoryViewerCache, ViewerCache};
use crate::game_channels::GameChannels;
use crate::manager::Manager;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::Pool<sqlx::Postgres>,
    /// Required by `cja::app_state::AppState`; this crate has no sessions
    /// or auth, so it's otherwise unused.
    pub cookie_key: cja::server::cookies::CookieKey,
    /// Broadcast channels for live game updates
    pub game_channels: GameChannels,
    /// HTTP client for calling snake APIs
    pub http_client: reqwest::Client,
    /// Viewer counts and daemon latency stats, keyed by game id
    pub viewer_cache: Arc<dyn ViewerCache>,
    /// Process-wide directory of live game Runners
    pub manager: Manager,
}

impl AppState {
    pub async fn from_env() -> cja::Result<Self> {
        #[tracing::instrument(err)]
        pub async fn setup_db_pool() -> cja::Result<PgPool> {
            const MIGRATION_LOCK_ID: i64 = 0xDB_DB_DB_DB_DB_DB_DB;

            let database_url =
                std::env::var("DATABASE_URL").wrap_err("DATABASE_URL must be set")?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            sqlx::query!("SELECT pg_advisory_lock($1)", MIGRATION_LOCK_ID)
                .execute(&pool)
                .await?;

            sqlx::migrate!("../migrations").run(&pool).await?;

            let unlock_result = sqlx::query!("SELECT pg_advisory_unlock($1)", MIGRATION_LOCK_ID)
                .fetch_one(&pool)
                .await?
                .pg_advisory_unlock;

            match unlock_result {
                Some(b) => {
                    if b {
                        tracing::info!("Migration lock unlocked");
                    } else {
                        tracing::info!("Failed to unlock migration lock");
                    }
                }
                None => return Err(eyre!("Failed to unlock migration lock")),
            }

            Ok(pool)
        }

        let pool = setup_db_pool().await?;

        let cookie_key = cja::server::cookies::CookieKey::from_env_or_generate()?;

        // HTTP client for calling snake APIs. Per-request deadlines are
        // enforced by the runner with `tokio::time::timeout`, so this is
        // just a generous backstop against a hung connection.
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .build()
            .wrap_err("Failed to create HTTP client")?;
        tracing::info!("HTTP client initialized for snake API calls");

        let game_channels = GameChannels::new();
        let viewer_cache: Arc<dyn ViewerCache> = Arc::new(InMemoryViewerCache::new());
        let manager = Manager::new(pool.clone(), http_client.clone(), viewer_cache.clone(), game_channels.clone());

        Ok(Self {
            db: pool,
            cookie_key,
            game_channels,
            http_client,
            viewer_cache,
            manager,
        })
    }
}

impl cja::app_state::AppState for AppState {
    fn version(&self) -> &str {
        env!("VERGEN_GIT_SHA")
    }

    fn db(&self) -> &sqlx::PgPool {
        &self.db
    }

    fn cookie_key(&self) -> &cja::server::cookies::CookieKey {
        &self.cookie_key
    }
}
