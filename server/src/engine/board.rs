//! The simulated board: food, gold, walls, teleporters and the per-tick
//! resolution algorithm. Snakes live in one owned `Vec<Snake>` arena rather
//! than a dict keyed by id — see `engine/mod.rs`.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::position::Position;
use super::snake::{DeathReason, Snake};

pub const DEFAULT_DIMENSIONS: i32 = 20;
pub const START_LENGTH: usize = 3;
pub const MAX_WALL_DENSITY: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub hidden: bool,
}

impl Food {
    pub fn visible(x: i32, y: i32) -> Self {
        Self { x, y, hidden: false }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gold {
    pub x: i32,
    pub y: i32,
}

impl Gold {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub x: i32,
    pub y: i32,
}

impl Wall {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Teleporter {
    pub x: i32,
    pub y: i32,
    pub channel: u32,
}

impl Teleporter {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// What occupies a cell, in spatial-query priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOccupant {
    Snake(usize),
    Food(usize),
    Gold(usize),
    Wall(usize),
    Teleporter(usize),
    Empty,
}

/// Food spawn policy. Gold and walls are always RANDOM; only food has a
/// STATIC/DONT_RESPAWN mode in the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FoodStrategy {
    Random,
    Static,
    DontRespawn,
}

/// Pre-seeded layout a board can be initialized from, carrying pinned snake
/// placements and/or pre-placed food/gold/walls/teleporters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardConfiguration {
    pub board_columns: Option<i32>,
    pub board_rows: Option<i32>,
    #[serde(default)]
    pub food: Vec<Food>,
    #[serde(default)]
    pub gold: Vec<Gold>,
    #[serde(default)]
    pub teleporters: Vec<Teleporter>,
    #[serde(default)]
    pub walls: Vec<Wall>,
    /// Pinned snake bodies, matched by id first, then by ordinal.
    #[serde(default)]
    pub snakes: Vec<PinnedSnake>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinnedSnake {
    pub id: Option<String>,
    pub number: Option<usize>,
    pub coords: Vec<Position>,
}

#[derive(Debug, Clone)]
pub struct Board {
    pub width: i32,
    pub height: i32,
    pub snakes: Vec<Snake>,
    pub food: Vec<Food>,
    pub gold: Vec<Gold>,
    pub walls: Vec<Wall>,
    pub teleporters: Vec<Teleporter>,
    pub last_wall_spawn: Option<std::time::Instant>,
    pub last_gold_spawn: Option<std::time::Instant>,
    pub pin_tail: bool,
}

/// Per-tick outcome for a single snake, surfaced so the Runner can log and
/// persist without re-deriving it from the resulting state.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    AteFood { snake_id: String },
    AteGold { snake_id: String },
    Teleported { snake_id: String },
    Died { snake_id: String, reason: DeathReason, killer_id: Option<String> },
    Moved { snake_id: String },
}

impl Board {
    pub fn new(width: i32, height: i32, snakes: Vec<Snake>) -> Self {
        let mut board = Self {
            width,
            height,
            snakes,
            food: Vec::new(),
            gold: Vec::new(),
            walls: Vec::new(),
            teleporters: Vec::new(),
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        };
        board.initialize_snakes(None);
        board
    }

    pub fn from_configuration(snakes: Vec<Snake>, config: &BoardConfiguration) -> Self {
        let mut board = Self {
            width: config.board_columns.unwrap_or(DEFAULT_DIMENSIONS),
            height: config.board_rows.unwrap_or(DEFAULT_DIMENSIONS),
            snakes,
            food: config.food.clone(),
            gold: config.gold.clone(),
            walls: config.walls.clone(),
            teleporters: config.teleporters.clone(),
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        };
        board.initialize_snakes(Some(config));
        board
    }

    pub fn clear(&mut self) {
        self.food.clear();
        self.gold.clear();
        self.walls.clear();
        self.teleporters.clear();
        self.initialize_snakes(None);
    }

    /// Spatial query in fixed priority order: snake, food, gold, wall,
    /// teleporter, else empty. `exclude` skips bodies belonging to those
    /// snake ids (used so a mover doesn't collide with its own segments
    /// before its move is resolved).
    pub fn cell_at(&self, pos: Position, exclude: &[&str]) -> CellOccupant {
        for (idx, snake) in self.snakes.iter().enumerate() {
            if exclude.contains(&snake.id.as_str()) {
                continue;
            }
            if snake.body.iter().any(|seg| seg.same_cell(&pos)) {
                return CellOccupant::Snake(idx);
            }
        }
        if let Some(idx) = self.food.iter().position(|f| f.position().same_cell(&pos)) {
            return CellOccupant::Food(idx);
        }
        if let Some(idx) = self.gold.iter().position(|g| g.position().same_cell(&pos)) {
            return CellOccupant::Gold(idx);
        }
        if let Some(idx) = self.walls.iter().position(|w| w.position().same_cell(&pos)) {
            return CellOccupant::Wall(idx);
        }
        if let Some(idx) = self
            .teleporters
            .iter()
            .position(|t| t.position().same_cell(&pos))
        {
            return CellOccupant::Teleporter(idx);
        }
        CellOccupant::Empty
    }

    fn is_empty(&self, pos: Position) -> bool {
        matches!(self.cell_at(pos, &[]), CellOccupant::Empty)
    }

    /// If `candidates` is supplied, tries them in random order and returns
    /// the first empty one; otherwise rejection-samples a uniform random
    /// cell.
    pub fn random_empty_position(&self, candidates: Option<&[Position]>) -> Position {
        if let Some(candidates) = candidates {
            let mut shuffled: Vec<Position> = candidates.to_vec();
            shuffled.shuffle(&mut rand::thread_rng());
            for candidate in &shuffled {
                if self.is_empty(*candidate) {
                    return *candidate;
                }
            }
        }

        let mut rng = rand::thread_rng();
        loop {
            let x = rng.gen_range(0..self.width);
            let y = rng.gen_range(0..self.height);
            let pos = Position::new(x, y);
            if self.is_empty(pos) {
                return pos;
            }
        }
    }

    fn initialize_snakes(&mut self, config: Option<&BoardConfiguration>) {
        let width = self.width;
        let height = self.height;

        let pinned: Vec<Option<Vec<Position>>> = (0..self.snakes.len())
            .map(|index| {
                let id = self.snakes[index].id.clone();
                config.and_then(|cfg| {
                    cfg.snakes
                        .iter()
                        .find(|p| p.id.as_deref() == Some(id.as_str()))
                        .or_else(|| cfg.snakes.iter().find(|p| p.number == Some(index)))
                        .filter(|p| !p.coords.is_empty())
                        .map(|p| p.coords.clone())
                })
            })
            .collect();

        for (index, pinned_body) in pinned.into_iter().enumerate() {
            if let Some(body) = pinned_body {
                self.snakes[index].body = body;
                continue;
            }

            let head = self.random_empty_position(None);
            let mut body = vec![head];
            let mut rng = rand::thread_rng();

            while body.len() < START_LENGTH {
                let tail = *body.last().unwrap();
                let mut options: Vec<Position> = tail
                    .neighbors(width, height)
                    .into_iter()
                    .filter(|candidate| !body.iter().any(|seg| seg.same_cell(candidate)))
                    .collect();

                if options.is_empty() {
                    break;
                }
                options.shuffle(&mut rng);
                body.push(options[0]);
            }

            self.snakes[index].body = body;
        }

        for snake in &mut self.snakes {
            snake.reset_for_new_game();
        }
    }

    pub fn food_count(&self) -> usize {
        self.food.len()
    }

    /// Food actually in play; pre-seeded `hidden=true` items under the
    /// STATIC strategy don't count until [`Board::reveal_static_food`]
    /// surfaces one.
    pub fn visible_food_count(&self) -> usize {
        self.food.iter().filter(|f| !f.hidden).count()
    }

    /// STATIC strategy top-up: reveal one pre-seeded hidden food item, if
    /// any remain. No-op otherwise.
    pub fn reveal_static_food(&mut self) -> bool {
        if let Some(food) = self.food.iter_mut().find(|f| f.hidden) {
            food.hidden = false;
            true
        } else {
            false
        }
    }

    pub fn gold_count(&self) -> usize {
        self.gold.len()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn teleporter_count(&self) -> usize {
        self.teleporters.len()
    }

    pub fn spawn_food(&mut self, count: usize, candidates: Option<&[Position]>) {
        for _ in 0..count {
            let pos = self.random_empty_position(candidates);
            self.food.push(Food::visible(pos.x, pos.y));
        }
    }

    pub fn spawn_gold(&mut self, count: usize, candidates: Option<&[Position]>) {
        for _ in 0..count {
            let pos = self.random_empty_position(candidates);
            self.gold.push(Gold { x: pos.x, y: pos.y });
            self.last_gold_spawn = Some(std::time::Instant::now());
        }
    }

    pub fn spawn_walls(&mut self, count: usize, candidates: Option<&[Position]>) {
        for _ in 0..count {
            let pos = self.random_empty_position(candidates);
            self.walls.push(Wall { x: pos.x, y: pos.y });
            self.last_wall_spawn = Some(std::time::Instant::now());
        }
    }

    /// Teleporters spawn in same-channel pairs; `count` is the number of
    /// pairs, so `count * 2` cells are placed.
    pub fn spawn_teleporters(&mut self, count: usize, candidates: Option<&[Position]>) {
        let channel = ((count as f64) / 2.0).ceil() as u32;
        for _ in 0..(count * 2) {
            let pos = self.random_empty_position(candidates);
            self.teleporters.push(Teleporter {
                x: pos.x,
                y: pos.y,
                channel,
            });
        }
    }

    pub fn total_cells(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn wall_density(&self) -> f64 {
        self.walls.len() as f64 / self.total_cells() as f64
    }

    /// Runs one full tick: advance every snake's head simultaneously, then
    /// resolve each head's collision in iteration order. Dead snakes remain
    /// in `self.snakes` but no longer occupy cells from the next tick on
    /// (their bodies are left in place for rendering the turn they died).
    pub fn update(&mut self, tick_snakes: bool) -> Vec<TickEvent> {
        let mut events = Vec::new();
        if !tick_snakes {
            return events;
        }

        // Pass 1: advance every head. No collision checks here so all
        // snakes move simultaneously regardless of iteration order.
        let mut new_heads = Vec::with_capacity(self.snakes.len());
        for snake in &mut self.snakes {
            if !snake.is_alive() {
                new_heads.push(None);
                continue;
            }
            snake.health -= 1;
            let next_head = snake.head().apply_direction(snake.next_move);
            new_heads.push(Some(next_head));
        }

        for (index, new_head) in new_heads.into_iter().enumerate() {
            let Some(new_head) = new_head else { continue };
            let snake_id = self.snakes[index].id.clone();

            if !new_head.in_bounds(self.width, self.height) {
                self.snakes[index].kill(0, DeathReason::OutOfBounds, None);
                events.push(TickEvent::Died {
                    snake_id,
                    reason: DeathReason::OutOfBounds,
                    killer_id: None,
                });
                continue;
            }

            let occupant = self.cell_at(new_head, &[snake_id.as_str()]);

            match occupant {
                CellOccupant::Food(food_idx) => {
                    self.snakes[index].health = 100;
                    self.snakes[index].body.insert(0, new_head);
                    self.food.remove(food_idx);
                    events.push(TickEvent::AteFood { snake_id });
                }
                CellOccupant::Gold(gold_idx) => {
                    self.snakes[index].score += 5.0;
                    self.snakes[index].incr_gold();
                    self.snakes[index].body.insert(0, new_head);
                    self.gold.remove(gold_idx);
                    events.push(TickEvent::AteGold { snake_id });
                }
                CellOccupant::Wall(_) => {
                    self.snakes[index].kill(0, DeathReason::Wall, None);
                    events.push(TickEvent::Died {
                        snake_id,
                        reason: DeathReason::Wall,
                        killer_id: None,
                    });
                }
                CellOccupant::Teleporter(tp_idx) => {
                    let channel = self.teleporters[tp_idx].channel;
                    let origin = self.teleporters[tp_idx].position();
                    let others: Vec<Position> = self
                        .teleporters
                        .iter()
                        .filter(|t| t.channel == channel && t.position() != origin)
                        .map(|t| t.position())
                        .collect();

                    if let Some(destination) = others.choose(&mut rand::thread_rng()) {
                        self.snakes[index].body.insert(0, *destination);
                        events.push(TickEvent::Teleported { snake_id });
                    } else {
                        self.snakes[index].body.insert(0, new_head);
                        events.push(TickEvent::Moved { snake_id });
                    }
                }
                CellOccupant::Snake(other_idx) => {
                    let other_head_matches =
                        self.snakes[other_idx].head().same_cell(&new_head);

                    if other_head_matches {
                        let self_len = self.snakes[index].length() + 1;
                        let other_len = self.snakes[other_idx].length();
                        let other_id = self.snakes[other_idx].id.clone();

                        if self_len > other_len {
                            self.snakes[index].score += 1.0;
                            self.snakes[index].incr_kills();
                            self.snakes[index].body.insert(0, new_head);
                            self.snakes[other_idx].kill(
                                0,
                                DeathReason::Killed,
                                Some(snake_id.clone()),
                            );
                            events.push(TickEvent::Died {
                                snake_id: other_id,
                                reason: DeathReason::Killed,
                                killer_id: Some(snake_id),
                            });
                        } else {
                            self.snakes[index].kill(0, DeathReason::Killed, Some(other_id.clone()));
                            events.push(TickEvent::Died {
                                snake_id,
                                reason: DeathReason::Killed,
                                killer_id: Some(other_id),
                            });
                        }
                    } else {
                        let other_id = self.snakes[other_idx].id.clone();
                        self.snakes[index].kill(0, DeathReason::Collision, Some(other_id.clone()));
                        events.push(TickEvent::Died {
                            snake_id,
                            reason: DeathReason::Collision,
                            killer_id: Some(other_id),
                        });
                    }
                }
                CellOccupant::Empty => {
                    self.snakes[index].score += 0.1;
                    self.snakes[index].body.insert(0, new_head);
                    if !self.pin_tail {
                        self.snakes[index].body.pop();
                    }
                    events.push(TickEvent::Moved { snake_id });
                }
            }
        }

        events
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(rename = "2016")]
    V2016,
    #[serde(rename = "2017")]
    V2017,
    #[serde(rename = "2018")]
    V2018,
    Client,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::position::Direction;

    fn snake(id: &str, body: Vec<(i32, i32)>) -> Snake {
        let mut s = Snake::new(id, id, "http://example.test");
        s.body = body.into_iter().map(|(x, y)| Position::new(x, y)).collect();
        s
    }

    #[test]
    fn food_pickup_heals_and_grows() {
        let mut s = snake("a", vec![(5, 5), (5, 6), (5, 7)]);
        s.next_move = Direction::Up;
        s.health = 50;
        let mut board = Board {
            width: 10,
            height: 10,
            snakes: vec![s],
            food: vec![Food::visible(5, 4)],
            gold: vec![],
            walls: vec![],
            teleporters: vec![],
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        };

        let events = board.update(true);
        assert_eq!(board.snakes[0].body[0], Position::new(5, 4));
        assert_eq!(board.snakes[0].body.len(), 4);
        assert_eq!(board.snakes[0].health, 100);
        assert!(board.food.is_empty());
        assert!(matches!(events[0], TickEvent::AteFood { .. }));
    }

    #[test]
    fn out_of_bounds_kills_with_oob_reason() {
        let mut s = snake("a", vec![(0, 0), (0, 1)]);
        s.next_move = Direction::Down;
        let mut board = Board {
            width: 10,
            height: 10,
            snakes: vec![s],
            food: vec![],
            gold: vec![],
            walls: vec![],
            teleporters: vec![],
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        };
        board.update(true);
        assert!(!board.snakes[0].is_alive());
        assert_eq!(board.snakes[0].death.as_ref().unwrap().reason, DeathReason::OutOfBounds);
    }

    #[test]
    fn longer_snake_wins_head_to_head() {
        let mut long = snake("long", vec![(5, 5), (5, 6), (5, 7), (5, 8)]);
        long.next_move = Direction::Right;
        let mut short = snake("short", vec![(6, 5), (6, 6)]);
        short.next_move = Direction::Left;

        let mut board = Board {
            width: 10,
            height: 10,
            snakes: vec![long, short],
            food: vec![],
            gold: vec![],
            walls: vec![],
            teleporters: vec![],
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        };

        board.update(true);
        assert!(board.snakes[0].is_alive());
        assert_eq!(board.snakes[0].score, 1.0);
        assert_eq!(board.snakes[0].kills, 1);
        assert!(!board.snakes[1].is_alive());
        assert_eq!(
            board.snakes[1].death.as_ref().unwrap().killer_id.as_deref(),
            Some("long")
        );
    }

    #[test]
    fn equal_length_head_to_head_current_mover_dies() {
        let mut a = snake("a", vec![(5, 5), (5, 6)]);
        a.next_move = Direction::Right;
        let mut b = snake("b", vec![(6, 5), (6, 6)]);
        b.next_move = Direction::Left;

        let mut board = Board {
            width: 10,
            height: 10,
            snakes: vec![a, b],
            food: vec![],
            gold: vec![],
            walls: vec![],
            teleporters: vec![],
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        };

        board.update(true);
        assert!(!board.snakes[0].is_alive());
        assert!(!board.snakes[1].is_alive());
    }

    #[test]
    fn empty_move_advances_and_pops_tail_unless_pinned() {
        let mut s = snake("a", vec![(5, 5), (5, 6), (5, 7)]);
        s.next_move = Direction::Up;
        let mut board = Board {
            width: 10,
            height: 10,
            snakes: vec![s],
            food: vec![],
            gold: vec![],
            walls: vec![],
            teleporters: vec![],
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        };
        board.update(true);
        assert_eq!(board.snakes[0].body.len(), 3);
        assert_eq!(board.snakes[0].body[0], Position::new(5, 6));
        assert!((board.snakes[0].score - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn pin_tail_keeps_snake_growing_on_empty_moves() {
        let mut s = snake("a", vec![(5, 5), (5, 6), (5, 7)]);
        s.next_move = Direction::Up;
        let mut board = Board {
            width: 10,
            height: 10,
            snakes: vec![s],
            food: vec![],
            gold: vec![],
            walls: vec![],
            teleporters: vec![],
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: true,
        };
        board.update(true);
        assert_eq!(board.snakes[0].body.len(), 4);
    }

    #[test]
    fn wall_density_never_exceeds_cap() {
        let board = Board {
            width: 10,
            height: 10,
            snakes: vec![],
            food: vec![],
            gold: vec![],
            walls: (0..9).map(|x| Wall { x, y: 0 }).collect(),
            teleporters: vec![],
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        };
        assert!(board.wall_density() < MAX_WALL_DENSITY);
    }
}
