pub mod action;
pub mod bank;
pub mod error;
pub mod event;
pub mod flow;
mod handler;
pub mod phase;
pub mod player;
pub mod resources;
pub mod setup;
pub mod state;
pub mod trade;

pub use action::{Action, ActionKind};
pub use error::EngineError;
pub use event::GameEvent;
pub use flow::GameFlow;
pub use phase::Phase;
pub use state::{GameConfig, GameState};
pub use trade::Trade;
