//! The simulation core: positions, snakes, the board tick algorithm, and
//! wire serialization. Everything here is pure state — no I/O, no
//! `AppState`, no database. The Runner (`crate::runner`) drives it.

pub mod board;
pub mod position;
pub mod rules;
pub mod serializer;
pub mod snake;

pub use board::{Board, BoardConfiguration, CellOccupant, Dialect, Food, Gold, TickEvent, Wall};
pub use position::{Direction, Position};
pub use rules::{DaemonDescriptor, GameRules, GameType};
pub use snake::{ApiVersion, Death, DeathReason, Snake};
