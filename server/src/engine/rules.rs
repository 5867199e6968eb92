//! Per-game configuration: board shape, spawn policy, and win conditions,
//! collected into one typed config instead of a raw dict.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::board::{FoodStrategy, DEFAULT_DIMENSIONS};

pub const WALL_SPAWN_RATE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    Score,
    Placement,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Score => "SCORE",
            GameType::Placement => "PLACEMENT",
        }
    }
}

impl std::str::FromStr for GameType {
    type Err = color_eyre::eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCORE" => Ok(GameType::Score),
            "PLACEMENT" => Ok(GameType::Placement),
            other => Err(color_eyre::eyre::eyre!("invalid game type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRules {
    pub board_columns: i32,
    pub board_rows: i32,

    pub has_gold: bool,
    pub has_teleporters: bool,
    pub has_walls: bool,

    pub food_strategy: FoodStrategy,
    pub food_count: usize,

    pub gold_respawn_interval: Duration,
    pub gold_count: usize,
    pub board_gold_winning_threshold: Option<u32>,

    pub teleporter_pairs: usize,

    pub tick_rate: Duration,
    pub response_time: Duration,
    pub turn_limit: Option<u32>,

    pub game_type: GameType,
    pub dev_mode: bool,
    pub pin_tail: bool,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            board_columns: DEFAULT_DIMENSIONS,
            board_rows: DEFAULT_DIMENSIONS,
            has_gold: false,
            has_teleporters: false,
            has_walls: false,
            food_strategy: FoodStrategy::Random,
            food_count: 1,
            gold_respawn_interval: Duration::from_secs(30),
            gold_count: 1,
            board_gold_winning_threshold: None,
            teleporter_pairs: 0,
            tick_rate: Duration::from_millis(300),
            response_time: Duration::from_millis(500),
            turn_limit: None,
            game_type: GameType::Score,
            dev_mode: false,
            pin_tail: false,
        }
    }
}

impl GameRules {
    /// Deadline for `/start`: twice the per-move response budget.
    pub fn start_deadline(&self) -> Duration {
        self.response_time * 2
    }

    pub fn move_deadline(&self) -> Duration {
        self.response_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonDescriptor {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_deadline_is_double_response_time() {
        let rules = GameRules {
            response_time: Duration::from_millis(250),
            ..GameRules::default()
        };
        assert_eq!(rules.start_deadline(), Duration::from_millis(500));
    }
}
