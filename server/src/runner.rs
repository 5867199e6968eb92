//! The Game Runner: one actor per live game.
//!
//! The Board is owned outright by the worker (no back-references),
//! commands are a tagged enum instead of bound methods, and the worker is
//! a `tokio::spawn`ed task rather than a thread with a blocking queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use crate::cache::ViewerCache;
use crate::commands::{Command, CommandQueue};
use crate::engine::board::{Board, FoodStrategy, Wall, MAX_WALL_DENSITY};
use crate::engine::rules::{GameType, WALL_SPAWN_RATE};
use crate::engine::serializer;
use crate::engine::snake::Snake;
use crate::engine::Dialect;
use crate::game_channels::{GameChannels, PushEvent};
use crate::models;
use crate::models::game::{Game, GameStatus};
use crate::models::game_snake::SetPlace;
use crate::snake_client;

const IDLE_TIMEOUT: Duration = Duration::from_secs(5);
const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Auto,
    Manual,
}

/// A handle external callers (the Manager, route handlers) hold. Never
/// touches Runner state directly — every mutation goes through the queue,
/// consumed by the single worker task spawned in [`spawn`].
#[derive(Clone)]
pub struct RunnerHandle {
    pub game_id: Uuid,
    queue: Arc<Mutex<CommandQueue>>,
    notify: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    last_state: Arc<Mutex<Option<PreservedState>>>,
}

impl RunnerHandle {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub async fn enqueue(&self, command: Command) {
        self.queue.lock().await.push(command);
        self.notify.notify_one();
    }

    /// Board and turn number the worker left behind on idle exit, if any.
    /// Used by the Manager to resume a recreated Runner on the
    /// `step_game` path per spec §4.4.
    pub async fn take_preserved_state(&self) -> Option<PreservedState> {
        self.last_state.lock().await.take()
    }
}

/// Board + turn number preserved across a `step_game`-triggered recreation
/// of an idle-exited Runner, per spec §4.4.
pub type PreservedState = (Board, i32);

/// Spawns the worker task and returns a handle to it. When `preserved` is
/// supplied the worker skips `initialize_game` and resumes from that board
/// and turn number instead.
pub fn spawn(
    game_id: Uuid,
    db: PgPool,
    http_client: Client,
    viewer_cache: Arc<dyn ViewerCache>,
    game_channels: GameChannels,
    preserved: Option<PreservedState>,
) -> RunnerHandle {
    let queue = Arc::new(Mutex::new(CommandQueue::new()));
    let notify = Arc::new(Notify::new());
    let stopped = Arc::new(AtomicBool::new(false));
    let last_state = Arc::new(Mutex::new(None));

    let (board, turn_number) = match preserved {
        Some((board, turn_number)) => (Some(board), turn_number),
        None => (None, 0),
    };

    let worker = RunnerWorker {
        game_id,
        db,
        http_client,
        viewer_cache,
        game_channels,
        queue: queue.clone(),
        notify: notify.clone(),
        stopped: stopped.clone(),
        last_state: last_state.clone(),
        game: None,
        board,
        turn_number,
        mode: Mode::Manual,
        history: Vec::new(),
    };

    tokio::spawn(worker.run());

    RunnerHandle {
        game_id,
        queue,
        notify,
        stopped,
        last_state,
    }
}

/// External-cache viewer-count bookkeeping, per spec §4.3's `watch`/
/// `disconnect`. These don't touch Board/Snake state, so they bypass the
/// action queue entirely and are safe to call straight from a route
/// handler or the Manager.
pub async fn watch(
    db: &PgPool,
    viewer_cache: &dyn ViewerCache,
    game_channels: &GameChannels,
    game_id: Uuid,
) -> cja::Result<broadcast::Receiver<PushEvent>> {
    let receiver = game_channels.subscribe(game_id).await;

    if let Ok(Some(game)) = models::game::get_game_by_id(db, game_id).await {
        if game.status == GameStatus::Completed {
            let redirect = game.child_game_id.unwrap_or(game_id);
            game_channels
                .notify(game_id, PushEvent::Redirect { game_id: redirect })
                .await;
            return Ok(receiver);
        }
    }

    let count = viewer_cache.incr_viewer_count(game_id).await;
    viewer_cache.bump_max_viewer_count(game_id).await;
    game_channels
        .notify(game_id, PushEvent::ViewerCount { count })
        .await;

    Ok(receiver)
}

pub async fn disconnect(viewer_cache: &dyn ViewerCache, game_channels: &GameChannels, game_id: Uuid) {
    let count = viewer_cache.decr_viewer_count(game_id).await;
    game_channels
        .notify(game_id, PushEvent::ViewerCount { count })
        .await;
}

struct RunnerWorker {
    game_id: Uuid,
    db: PgPool,
    http_client: Client,
    viewer_cache: Arc<dyn ViewerCache>,
    game_channels: GameChannels,
    queue: Arc<Mutex<CommandQueue>>,
    notify: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    last_state: Arc<Mutex<Option<PreservedState>>>,
    game: Option<Game>,
    board: Option<Board>,
    turn_number: i32,
    mode: Mode,
    /// In-memory per-game snapshot history. Not persisted — spec's
    /// Non-goals rule out replay storage beyond this.
    history: Vec<Value>,
}

impl RunnerWorker {
    async fn run(mut self) {
        if self.board.is_none() {
            if let Err(error) = self.initialize_game(true).await {
                tracing::error!(game_id = %self.game_id, %error, "failed to initialize game");
                self.stopped.store(true, Ordering::SeqCst);
                return;
            }
        } else if let Err(error) = self.initialize_game(false).await {
            tracing::error!(game_id = %self.game_id, %error, "failed to load game record");
            self.stopped.store(true, Ordering::SeqCst);
            return;
        }

        let mut last_activity = Instant::now();
        loop {
            let command = self.queue.lock().await.pop();
            match command {
                Some(command) => {
                    last_activity = Instant::now();
                    self.execute(command).await;
                }
                None => {
                    if last_activity.elapsed() >= IDLE_TIMEOUT {
                        break;
                    }
                    let _ = timeout(COMMAND_POLL_INTERVAL, self.notify.notified()).await;
                }
            }
        }

        if let Some(board) = self.board.clone() {
            *self.last_state.lock().await = Some((board, self.turn_number));
        }
        self.stopped.store(true, Ordering::SeqCst);
        tracing::debug!(game_id = %self.game_id, "runner idle, stopping");
    }

    async fn execute(&mut self, command: Command) {
        let result = match command {
            Command::Start => self.start_game().await,
            Command::Pause => self.pause_game().await,
            Command::Restart => self.restart_game().await,
            Command::ToggleMode => self.toggle_mode().await,
            Command::ApplyDaemonUpdate => {
                self.poll_daemon().await;
                Ok(())
            }
            Command::Step { allow_stepping } => self.step_game(allow_stepping).await,
        };

        if let Err(error) = result {
            tracing::error!(game_id = %self.game_id, %error, "runner command failed");
            self.game_channels
                .notify(
                    self.game_id,
                    PushEvent::Error {
                        message: error.to_string(),
                    },
                )
                .await;
        }
    }

    fn is_in_progress(&self) -> bool {
        matches!(self.game.as_ref().map(|g| g.status), Some(GameStatus::InProgress))
    }

    async fn set_status(&mut self, status: GameStatus) -> cja::Result<()> {
        let game = models::game::set_status(&self.db, self.game_id, status).await?;
        self.game = Some(game);
        Ok(())
    }

    /// Pulls the DB game record. No-op on a COMPLETED game. When
    /// `override_board` is set, (re)builds the Board from scratch and
    /// kicks off `/start` for every snake; otherwise just refreshes the
    /// cached record.
    async fn initialize_game(&mut self, override_board: bool) -> cja::Result<()> {
        let game = models::game::get_game_by_id(&self.db, self.game_id)
            .await?
            .ok_or_else(|| cja::color_eyre::eyre::eyre!("game {} not found", self.game_id))?;

        if game.status == GameStatus::Completed {
            self.game = Some(game);
            return Ok(());
        }

        if !override_board {
            self.game = Some(game);
            return Ok(());
        }

        let game_snakes = models::game_snake::get_snakes_by_game_id(&self.db, self.game_id).await?;
        let snakes: Vec<Snake> = game_snakes
            .iter()
            .map(|gs| {
                let mut snake = Snake::new(gs.game_snake_id.to_string(), gs.name.clone(), gs.url.clone());
                snake.dev_url = gs.dev_url.clone();
                if let Some(api_version) = crate::engine::snake::ApiVersion::from_str(&gs.api_version) {
                    snake.api_version = api_version;
                }
                snake
            })
            .collect();

        let board_configuration = match game.board_configuration_id {
            Some(id) => match models::board_configuration::get_board_configuration_by_id(&self.db, id).await {
                Ok(row) => row.map(|row| row.configuration),
                Err(error) => {
                    tracing::warn!(%error, "invalid stored board configuration, treating as absent");
                    None
                }
            },
            None => None,
        };

        let mut board = match &board_configuration {
            Some(config) => Board::from_configuration(snakes, config),
            None => Board::new(game.rules.board_columns, game.rules.board_rows, snakes),
        };
        board.pin_tail = game.rules.pin_tail;

        let configured_food = game.rules.food_count;
        let visible = board.visible_food_count();
        if visible < configured_food {
            let deficit = configured_food - visible;
            match game.rules.food_strategy {
                FoodStrategy::Random => board.spawn_food(deficit, None),
                FoodStrategy::Static => {
                    for _ in 0..deficit {
                        if !board.reveal_static_food() {
                            break;
                        }
                    }
                }
                FoodStrategy::DontRespawn => {}
            }
        }

        if game.rules.has_gold && board.gold_count() < game.rules.gold_count {
            board.spawn_gold(game.rules.gold_count - board.gold_count(), None);
        }

        let target_teleporters = game.rules.teleporter_pairs * 2;
        if game.rules.has_teleporters && board.teleporter_count() < target_teleporters {
            let missing_pairs = (target_teleporters - board.teleporter_count()) / 2;
            if missing_pairs > 0 {
                board.spawn_teleporters(missing_pairs, None);
            }
        }

        board.snakes = snake_client::request_start_parallel(
            &self.http_client,
            board.snakes,
            &self.game_id.to_string(),
            board.width,
            board.height,
            game.rules.dev_mode,
            game.rules.start_deadline(),
        )
        .await;

        self.board = Some(board);
        self.turn_number = 0;
        self.history.clear();
        self.game = Some(game);

        self.push_snapshot(HashMap::new()).await;

        Ok(())
    }

    async fn push_snapshot(&self, errors: HashMap<String, String>) {
        let Some(board) = &self.board else { return };
        let snapshot = serializer::board_to_json(board, Dialect::Client);
        let viewers = self.viewer_cache.viewer_count(self.game_id).await;
        self.game_channels
            .notify(
                self.game_id,
                PushEvent::Update {
                    board: snapshot,
                    errors,
                    viewers,
                },
            )
            .await;
    }

    async fn ensure_in_progress(&mut self) -> cja::Result<()> {
        if !self.is_in_progress() {
            self.set_status(GameStatus::InProgress).await?;
        }
        Ok(())
    }

    /// Handles both `start_game` and `play_game`: a game already
    /// IN_PROGRESS just flips to AUTO and resumes ticking; a fresh game
    /// transitions status, snapshots history, and ticks once.
    async fn start_game(&mut self) -> cja::Result<()> {
        if self.is_in_progress() {
            self.mode = Mode::Auto;
            return self.step_game(true).await;
        }

        self.set_status(GameStatus::InProgress).await?;
        if let Some(board) = &self.board {
            self.history.push(serializer::board_to_json(board, Dialect::Client));
        }
        self.step_game(true).await
    }

    async fn pause_game(&mut self) -> cja::Result<()> {
        self.set_status(GameStatus::Stopped).await
    }

    async fn restart_game(&mut self) -> cja::Result<()> {
        self.set_status(GameStatus::Restarted).await?;
        self.turn_number = 0;
        models::game::set_turn_number(&self.db, self.game_id, 0).await?;
        self.initialize_game(true).await
    }

    async fn toggle_mode(&mut self) -> cja::Result<()> {
        self.mode = match self.mode {
            Mode::Auto => Mode::Manual,
            Mode::Manual => Mode::Auto,
        };
        models::game::set_auto_mode(&self.db, self.game_id, matches!(self.mode, Mode::Auto)).await?;

        if matches!(self.mode, Mode::Auto) {
            self.queue.lock().await.push(Command::Step { allow_stepping: true });
            self.notify.notify_one();
        }

        Ok(())
    }

    async fn poll_daemon(&mut self) {
        let Some(daemon_id) = self.game.as_ref().and_then(|g| g.daemon_id) else {
            return;
        };
        let Some(daemon) = models::daemon::get_daemon_by_id(&self.db, daemon_id)
            .await
            .ok()
            .flatten()
        else {
            return;
        };
        let deadline = match &self.game {
            Some(game) => game.rules.response_time,
            None => return,
        };
        let Some(board) = &self.board else { return };

        if let Some((update, latency)) =
            snake_client::request_daemon_update(&self.http_client, &daemon.url, board, deadline).await
        {
            self.viewer_cache
                .record_daemon_latency(&daemon.daemon_id.to_string(), latency.as_secs_f64() * 1000.0)
                .await;

            if !update.spawn_walls.is_empty() {
                if let Some(board) = &mut self.board {
                    for pos in &update.spawn_walls {
                        board.walls.push(Wall { x: pos.x, y: pos.y });
                    }
                }
            }

            if let Some(message) = update.message {
                self.game_channels
                    .notify(self.game_id, PushEvent::Message { text: message })
                    .await;
            }
        }
    }

    async fn poll_bounty_snakes(&self) {
        let (dev_mode, deadline) = match &self.game {
            Some(game) => (game.rules.dev_mode, game.rules.response_time),
            None => return,
        };
        let Some(board) = &self.board else { return };

        let bounty_snakes = board.snakes.iter().filter(|s| s.is_bounty_snake);
        snake_client::request_bounty_checks_parallel(
            &self.http_client,
            bounty_snakes,
            &self.game_id.to_string(),
            dev_mode,
            deadline,
        )
        .await;
    }

    /// `/move` fan-out. A failed call leaves the snake's `next_move`
    /// untouched and records the failure both on the snake and in the
    /// returned errors map for the push event.
    async fn poll_moves(&mut self) -> HashMap<String, String> {
        let mut errors = HashMap::new();

        let (turn_limit, dev_mode, deadline) = match &self.game {
            Some(game) => (game.rules.turn_limit, game.rules.dev_mode, game.rules.response_time),
            None => return errors,
        };

        let outcomes = match &self.board {
            Some(board) => {
                snake_client::request_moves_parallel(
                    &self.http_client,
                    board,
                    &self.game_id.to_string(),
                    self.turn_number as u32,
                    turn_limit,
                    dev_mode,
                    deadline,
                )
                .await
            }
            None => return errors,
        };

        let Some(board) = self.board.as_mut() else {
            return errors;
        };

        for outcome in outcomes {
            let Some(snake) = board.snakes.iter_mut().find(|s| s.id == outcome.snake_id) else {
                continue;
            };

            match outcome.result {
                Ok((direction, taunt)) => {
                    if !snake.handle_move_response(&direction, taunt) {
                        errors.insert(outcome.snake_id.clone(), format!("invalid move: {direction}"));
                    }
                }
                Err(error) => {
                    let message = error.to_string();
                    snake.error = Some(message.clone());
                    errors.insert(outcome.snake_id.clone(), message);
                }
            }
        }

        errors
    }

    fn top_up_food(&mut self) {
        let (configured, strategy) = match &self.game {
            Some(game) => (game.rules.food_count, game.rules.food_strategy),
            None => return,
        };
        let Some(board) = &mut self.board else { return };

        let visible = board.visible_food_count();
        if visible >= configured {
            return;
        }
        let deficit = configured - visible;

        match strategy {
            FoodStrategy::Random => board.spawn_food(deficit, None),
            FoodStrategy::Static => {
                for _ in 0..deficit {
                    if !board.reveal_static_food() {
                        break;
                    }
                }
            }
            FoodStrategy::DontRespawn => {}
        }
    }

    fn top_up_gold(&mut self) {
        let (has_gold, target, interval) = match &self.game {
            Some(game) => (game.rules.has_gold, game.rules.gold_count, game.rules.gold_respawn_interval),
            None => return,
        };
        if !has_gold {
            return;
        }
        let Some(board) = &mut self.board else { return };
        if board.gold_count() >= target {
            return;
        }

        let ready = board.last_gold_spawn.map(|t| t.elapsed() >= interval).unwrap_or(true);
        if ready {
            board.spawn_gold(1, None);
        }
    }

    fn top_up_walls(&mut self) {
        let has_walls = match &self.game {
            Some(game) => game.rules.has_walls,
            None => return,
        };
        if !has_walls {
            return;
        }
        let Some(board) = &mut self.board else { return };
        if board.wall_density() >= MAX_WALL_DENSITY {
            return;
        }

        let ready = board
            .last_wall_spawn
            .map(|t| t.elapsed() >= WALL_SPAWN_RATE)
            .unwrap_or(true);
        if ready {
            board.spawn_walls(1, None);
        }
    }

    /// Persists the turn's frame snapshot and each living snake's chosen
    /// direction, for reconnect catch-up. Best-effort: a failure here is
    /// logged but does not halt the tick, since it is ancillary to the
    /// simulation itself.
    async fn persist_turn(&self, snapshot: &Value) {
        let Some(board) = &self.board else { return };

        let turn = match models::turn::create_turn(&self.db, self.game_id, self.turn_number, Some(snapshot.clone())).await {
            Ok(turn) => turn,
            Err(error) => {
                tracing::error!(game_id = %self.game_id, %error, "failed to persist turn");
                return;
            }
        };

        for snake in &board.snakes {
            let Ok(game_snake_id) = Uuid::parse_str(&snake.id) else {
                continue;
            };
            if let Err(error) =
                models::turn::create_snake_turn(&self.db, turn.turn_id, game_snake_id, snake.next_move.as_str()).await
            {
                tracing::error!(game_id = %self.game_id, %error, "failed to persist snake turn");
            }
        }
    }

    fn win_condition_met(&self) -> bool {
        let Some(game) = &self.game else { return false };
        let Some(board) = &self.board else { return false };

        if let Some(limit) = game.rules.turn_limit {
            if limit != 0 && self.turn_number as u32 >= limit {
                return true;
            }
        }

        if board.snakes.iter().all(|s| !s.is_alive()) {
            return true;
        }

        if let Some(threshold) = game.rules.board_gold_winning_threshold {
            if board.snakes.iter().any(|s| s.gold >= threshold) {
                return true;
            }
        }

        false
    }

    /// One tick, per spec §4.3 step_game: daemon update, bounty checks,
    /// moves, Board tick, spawn top-ups, push + history, win check, and
    /// (in AUTO mode) self-rescheduling after a `tickRate` sleep.
    async fn step_game(&mut self, allow_stepping: bool) -> cja::Result<()> {
        self.ensure_in_progress().await?;

        self.poll_daemon().await;
        self.poll_bounty_snakes().await;
        let errors = self.poll_moves().await;

        {
            let board = self.board.as_mut().ok_or_else(|| cja::color_eyre::eyre::eyre!("runner has no board"))?;
            board.update(true);
        }

        self.top_up_food();
        self.top_up_gold();
        self.top_up_walls();

        self.turn_number += 1;
        models::game::set_turn_number(&self.db, self.game_id, self.turn_number).await?;

        let snapshot = {
            let board = self.board.as_ref().ok_or_else(|| cja::color_eyre::eyre::eyre!("runner has no board"))?;
            serializer::board_to_json(board, Dialect::Client)
        };

        self.persist_turn(&snapshot).await;

        let viewers = self.viewer_cache.viewer_count(self.game_id).await;
        self.game_channels
            .notify(
                self.game_id,
                PushEvent::Update {
                    board: snapshot.clone(),
                    errors,
                    viewers,
                },
            )
            .await;
        self.history.push(snapshot);

        if self.win_condition_met() {
            self.finish_game().await?;
        } else if allow_stepping && matches!(self.mode, Mode::Auto) && self.is_in_progress() {
            let tick_rate = self.game.as_ref().map(|g| g.rules.tick_rate).unwrap_or(Duration::from_millis(300));
            sleep(tick_rate).await;
            self.queue.lock().await.push(Command::Step { allow_stepping: true });
            self.notify.notify_one();
        }

        Ok(())
    }

    /// Marks the game COMPLETED, persists final placement, best-effort
    /// notifies every snake's `/end`, and redirects viewers to a child
    /// game (cloning one if none exists yet).
    async fn finish_game(&mut self) -> cja::Result<()> {
        self.set_status(GameStatus::Completed).await?;

        let (game_type, dev_mode, deadline) = match &self.game {
            Some(game) => (game.rules.game_type, game.rules.dev_mode, game.rules.response_time),
            None => return Ok(()),
        };

        let Some(board) = self.board.clone() else { return Ok(()) };

        let mut ranked: Vec<&Snake> = board.snakes.iter().collect();
        match game_type {
            GameType::Score => {
                ranked.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
            }
            GameType::Placement => {
                ranked.sort_by(|a, b| {
                    let death_a = a.death.as_ref().map(|d| d.turn).unwrap_or(0);
                    let death_b = b.death.as_ref().map(|d| d.turn).unwrap_or(0);
                    death_b.cmp(&death_a)
                });
            }
        }

        for (index, snake) in ranked.iter().enumerate() {
            let Ok(game_snake_id) = Uuid::parse_str(&snake.id) else {
                continue;
            };
            let place = (index + 1) as i32;
            let death_turn = snake.death.as_ref().map(|d| d.turn as i32);

            if let Err(error) = models::game_snake::set_place(
                &self.db,
                self.game_id,
                game_snake_id,
                SetPlace { place, death_turn },
            )
            .await
            {
                tracing::error!(game_id = %self.game_id, %error, "failed to persist snake placement");
            }
        }

        let winner_id = ranked.first().map(|s| s.id.as_str());
        snake_client::request_end_parallel(
            &self.http_client,
            &board,
            &self.game_id.to_string(),
            winner_id,
            dev_mode,
            deadline,
        )
        .await;

        let child_game_id = self.game.as_ref().and_then(|g| g.child_game_id);
        let redirect_to = match child_game_id {
            Some(id) => id,
            None => {
                let clone = models::game::clone_game(&self.db, self.game_id).await?;
                clone.game_id
            }
        };

        self.game_channels
            .notify(self.game_id, PushEvent::Redirect { game_id: redirect_to })
            .await;

        Ok(())
    }
}
