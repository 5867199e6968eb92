//! Persistence: prepared-statement-style functions over the games/snakes
//! schema, one file per table, no separate `queries.rs`.

pub mod board_configuration;
pub mod daemon;
pub mod game;
pub mod game_snake;
pub mod snake;
pub mod turn;

pub use board_configuration::BoardConfigurationRow;
pub use daemon::Daemon;
pub use game::{Game, GameStatus};
pub use game_snake::GameSnake;
pub use snake::SnakeRow;
pub use turn::{SnakeTurn, Turn};
