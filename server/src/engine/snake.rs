//! Per-agent simulation state: position, health, death reason, kills,
//! gold, API dialect, dev URL selection.

use serde::{Deserialize, Serialize};

use super::position::{Direction, Position};

pub const STARTING_HEALTH: i32 = 100;

/// Wire dialect a snake's remote endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    #[serde(rename = "2016")]
    V2016,
    #[serde(rename = "2017")]
    V2017,
    #[serde(rename = "2018")]
    V2018,
}

impl ApiVersion {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "2016" => Some(ApiVersion::V2016),
            "2017" => Some(ApiVersion::V2017),
            "2018" => Some(ApiVersion::V2018),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V2016 => "2016",
            ApiVersion::V2017 => "2017",
            ApiVersion::V2018 => "2018",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathReason {
    #[serde(rename = "oob")]
    OutOfBounds,
    Wall,
    Collision,
    Killed,
}

impl DeathReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeathReason::OutOfBounds => "oob",
            DeathReason::Wall => "wall",
            DeathReason::Collision => "collision",
            DeathReason::Killed => "killed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Death {
    pub turn: u32,
    pub reason: DeathReason,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub killer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snake {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub secondary_color: Option<String>,

    /// Head-first body. Always non-empty while alive.
    pub body: Vec<Position>,

    pub health: i32,
    pub score: f64,
    pub gold: u32,
    pub kills: u32,

    pub next_move: Direction,

    pub death: Option<Death>,
    pub error: Option<String>,
    pub taunt: String,

    pub api_version: ApiVersion,
    pub url: String,
    pub dev_url: Option<String>,
    pub is_bounty_snake: bool,
}

impl Snake {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: "#000000".to_string(),
            secondary_color: None,
            body: Vec::new(),
            health: STARTING_HEALTH,
            score: 0.0,
            gold: 0,
            kills: 0,
            next_move: Direction::Up,
            death: None,
            error: None,
            taunt: String::new(),
            api_version: ApiVersion::V2018,
            url: url.into(),
            dev_url: None,
            is_bounty_snake: false,
        }
    }

    pub fn head(&self) -> &Position {
        &self.body[0]
    }

    pub fn length(&self) -> usize {
        self.body.len()
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0 && self.death.is_none()
    }

    /// `dev_url` wins only while `dev_mode` is on and it is non-empty.
    pub fn get_url(&self, dev_mode: bool) -> &str {
        if dev_mode {
            if let Some(dev_url) = self.dev_url.as_deref() {
                if !dev_url.is_empty() {
                    return dev_url;
                }
            }
        }
        &self.url
    }

    /// Resets the per-game counters a fresh board placement implies,
    /// without touching identity fields or the body just placed.
    pub fn reset_for_new_game(&mut self) {
        self.gold = 0;
        self.health = STARTING_HEALTH;
        self.next_move = Direction::Up;
        self.score = 0.0;
        self.taunt.clear();
    }

    pub fn reset(&mut self, starting_health: i32) {
        self.body.clear();
        self.death = None;
        self.error = None;
        self.kills = 0;
        self.gold = 0;
        self.health = starting_health;
        self.next_move = Direction::Up;
        self.score = 0.0;
        self.taunt.clear();
    }

    pub fn kill(&mut self, turn: u32, reason: DeathReason, killer_id: Option<String>) {
        self.health = 0;
        self.death = Some(Death {
            turn,
            reason,
            killer_id,
        });
    }

    pub fn incr_gold(&mut self) {
        self.gold += 1;
    }

    pub fn incr_kills(&mut self) {
        self.kills += 1;
    }

    /// Apply a `/move` response. Clears any previous error. The "2017"
    /// dialect also carries an updated taunt alongside the move.
    pub fn handle_move_response(&mut self, move_str: &str, taunt: Option<String>) -> bool {
        self.error = None;
        if self.api_version == ApiVersion::V2017 {
            if let Some(taunt) = taunt {
                self.taunt = taunt;
            }
        }
        match Direction::from_str(move_str) {
            Some(direction) => {
                self.next_move = direction;
                true
            }
            None => false,
        }
    }

    /// Apply a `/start` response. The "2018" dialect lets the snake rename
    /// itself and pick its own colors.
    pub fn handle_start_response(
        &mut self,
        taunt: Option<String>,
        name: Option<String>,
        color: Option<String>,
        secondary_color: Option<String>,
    ) {
        self.taunt = taunt.unwrap_or_default();

        if self.api_version == ApiVersion::V2018 {
            if let Some(name) = name {
                self.name = name;
            }
            if let Some(color) = color {
                self.color = color;
            }
            if secondary_color.is_some() {
                self.secondary_color = secondary_color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snake() -> Snake {
        let mut s = Snake::new("s1", "Test Snake", "http://snake.example");
        s.body = vec![Position::new(5, 5), Position::new(5, 6), Position::new(5, 7)];
        s
    }

    #[test]
    fn is_alive_requires_positive_health_and_no_death() {
        let mut s = snake();
        assert!(s.is_alive());
        s.kill(3, DeathReason::Wall, None);
        assert!(!s.is_alive());
        assert_eq!(s.health, 0);
    }

    #[test]
    fn get_url_prefers_dev_url_only_in_dev_mode() {
        let mut s = snake();
        s.dev_url = Some("http://dev.example".to_string());
        assert_eq!(s.get_url(false), "http://snake.example");
        assert_eq!(s.get_url(true), "http://dev.example");

        s.dev_url = Some(String::new());
        assert_eq!(s.get_url(true), "http://snake.example");
    }

    #[test]
    fn reset_clears_transient_state_but_not_identity() {
        let mut s = snake();
        s.score = 12.0;
        s.gold = 3;
        s.kills = 1;
        s.taunt = "hi".to_string();
        s.reset(100);

        assert_eq!(s.health, 100);
        assert_eq!(s.score, 0.0);
        assert_eq!(s.gold, 0);
        assert_eq!(s.kills, 0);
        assert!(s.taunt.is_empty());
        assert!(s.body.is_empty());
        assert_eq!(s.id, "s1");
    }

    #[test]
    fn handle_move_response_keeps_previous_move_on_garbage_input() {
        let mut s = snake();
        s.next_move = Direction::Left;
        assert!(!s.handle_move_response("sideways", None));
        assert_eq!(s.next_move, Direction::Left);

        assert!(s.handle_move_response("down", None));
        assert_eq!(s.next_move, Direction::Down);
    }

    #[test]
    fn handle_start_response_only_renames_on_2018() {
        let mut s = snake();
        s.api_version = ApiVersion::V2017;
        s.handle_start_response(Some("taunt".into()), Some("New Name".into()), None, None);
        assert_eq!(s.taunt, "taunt");
        assert_eq!(s.name, "Test Snake");

        s.api_version = ApiVersion::V2018;
        s.handle_start_response(None, Some("New Name".into()), Some("#fff".into()), Some("#000".into()));
        assert_eq!(s.name, "New Name");
        assert_eq!(s.color, "#fff");
        assert_eq!(s.secondary_color.as_deref(), Some("#000"));
    }
}
