#![warn(clippy::all)]
#![deny(rust_2018_idioms)]

pub mod board;
pub mod coords;
pub mod game;
pub mod snapshot;
pub mod types;

pub use board::Board;
pub use game::{Action, ActionKind, EngineError, GameConfig, GameEvent, GameFlow, GameState, Phase};
pub use snapshot::GameSnapshot;
pub use types::{Color, EdgeId, HexId, PlayerId, Resource, Terrain, VertexId};
