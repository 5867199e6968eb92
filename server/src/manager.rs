//! The process-wide game directory: creates, routes commands to, and
//! garbage-collects idle Runners. A `tokio::sync::Mutex<HashMap<...>>`
//! over `RunnerHandle`s, matching the handle/worker split in
//! `crate::runner`.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use sqlx::PgPool;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::cache::ViewerCache;
use crate::commands::Command;
use crate::game_channels::{GameChannels, PushEvent};
use crate::runner::{self, RunnerHandle};

/// Soft cap on concurrently-live Runners. Spec §4.4: enforcement is left
/// to policy, so we only log when it's exceeded.
const MAXIMUM_CONCURRENT_GAMES: usize = 5;

#[derive(Clone)]
pub struct Manager {
    db: PgPool,
    http_client: Client,
    viewer_cache: Arc<dyn ViewerCache>,
    game_channels: GameChannels,
    runners: Arc<Mutex<HashMap<Uuid, RunnerHandle>>>,
}

impl Manager {
    pub fn new(db: PgPool, http_client: Client, viewer_cache: Arc<dyn ViewerCache>, game_channels: GameChannels) -> Self {
        Self {
            db,
            http_client,
            viewer_cache,
            game_channels,
            runners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the live runner for `game_id`, spawning one if absent or if
    /// the previous one idle-exited. Returns whether a fresh Runner was
    /// created, mirroring spec's `(runner, created)` tuple.
    pub async fn find_or_create_game(&self, game_id: Uuid) -> (RunnerHandle, bool) {
        self.find_or_create_game_preserving(game_id, None).await
    }

    async fn find_or_create_game_preserving(
        &self,
        game_id: Uuid,
        preserved: Option<runner::PreservedState>,
    ) -> (RunnerHandle, bool) {
        let mut runners = self.runners.lock().await;

        if let Some(handle) = runners.get(&game_id) {
            if !handle.is_stopped() {
                return (handle.clone(), false);
            }
        }

        if runners.len() >= MAXIMUM_CONCURRENT_GAMES {
            tracing::warn!(
                count = runners.len(),
                limit = MAXIMUM_CONCURRENT_GAMES,
                "exceeding soft concurrent game limit"
            );
        }

        self.viewer_cache.reset_viewer_count(game_id).await;

        let handle = runner::spawn(
            game_id,
            self.db.clone(),
            self.http_client.clone(),
            self.viewer_cache.clone(),
            self.game_channels.clone(),
            preserved,
        );

        runners.insert(game_id, handle.clone());
        (handle, true)
    }

    /// `step_game` is the one path spec §4.4 asks to preserve board and
    /// turn_number across a recreate: if the existing handle's worker
    /// already idle-exited, its last board/turn_number snapshot is handed
    /// to the fresh Runner instead of re-running `initialize_game`.
    async fn recreate_for_step(&self, game_id: Uuid) -> RunnerHandle {
        let existing = self.runners.lock().await.get(&game_id).cloned();

        let preserved = match &existing {
            Some(handle) if handle.is_stopped() => handle.take_preserved_state().await,
            _ => None,
        };

        self.find_or_create_game_preserving(game_id, preserved).await.0
    }

    pub async fn start_game(&self, game_id: Uuid) {
        let (handle, _created) = self.find_or_create_game(game_id).await;
        handle.enqueue(Command::Start).await;
    }

    pub async fn pause_game(&self, game_id: Uuid) {
        let (handle, _created) = self.find_or_create_game(game_id).await;
        handle.enqueue(Command::Pause).await;
    }

    pub async fn restart_game(&self, game_id: Uuid) {
        let (handle, _created) = self.find_or_create_game(game_id).await;
        handle.enqueue(Command::Restart).await;
    }

    pub async fn step_game(&self, game_id: Uuid) {
        let handle = self.recreate_for_step(game_id).await;
        handle.enqueue(Command::Step { allow_stepping: false }).await;
    }

    pub async fn toggle_game_mode(&self, game_id: Uuid) {
        let (handle, _created) = self.find_or_create_game(game_id).await;
        handle.enqueue(Command::ToggleMode).await;
    }

    pub async fn apply_daemon_update(&self, game_id: Uuid) {
        let (handle, _created) = self.find_or_create_game(game_id).await;
        handle.enqueue(Command::ApplyDaemonUpdate).await;
    }

    /// Subscribes to the game's push channel and bumps viewer counts,
    /// updating `game:max_viewer_count:{id}` to the max of itself and the
    /// post-increment count.
    pub async fn watch_game(&self, game_id: Uuid) -> cja::Result<broadcast::Receiver<PushEvent>> {
        let receiver = runner::watch(&self.db, self.viewer_cache.as_ref(), &self.game_channels, game_id).await?;
        self.viewer_cache.bump_max_viewer_count(game_id).await;
        Ok(receiver)
    }

    pub async fn disconnect_game(&self, game_id: Uuid) {
        runner::disconnect(self.viewer_cache.as_ref(), &self.game_channels, game_id).await;
    }
}
