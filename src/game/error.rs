use uuid::Uuid;

use crate::types::{EdgeId, HexId, PlayerId, VertexId};
use crate::game::phase::Phase;

/// Domain rejections: expected rule violations surfaced to callers with
/// the state guaranteed unchanged. Anything that indicates a programming
/// defect (dangling ids inside the engine, impossible phase combinations)
/// panics instead of appearing here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("game is over")]
    GameOver,
    #[error("unknown player {0}")]
    NoSuchPlayer(PlayerId),
    #[error("action by {actual} but it is {expected}'s turn")]
    NotYourTurn { expected: PlayerId, actual: PlayerId },
    #[error("action not allowed during the {0} phase")]
    WrongPhase(Phase),
    #[error("insufficient resources")]
    InsufficientResources,
    #[error("bank cannot cover the request")]
    BankShortfall,
    #[error("no {0:?} pieces left to place")]
    InventoryExhausted(crate::types::BuildingKind),
    #[error("no road pieces left to place")]
    NoRoadPieces,
    #[error("vertex {0} does not exist on this board")]
    UnknownVertex(VertexId),
    #[error("edge {0} does not exist on this board")]
    UnknownEdge(EdgeId),
    #[error("hex {0} does not exist or cannot hold the robber")]
    UnknownHex(HexId),
    #[error("vertex {0} is already occupied")]
    VertexOccupied(VertexId),
    #[error("a building sits too close to vertex {0}")]
    DistanceRuleViolation(VertexId),
    #[error("placement is not connected to your network")]
    NotConnected,
    #[error("edge {0} already carries a road")]
    EdgeOccupied(EdgeId),
    #[error("edge {0} is open sea")]
    EdgeNotBuildable(EdgeId),
    #[error("no settlement of yours to upgrade at vertex {0}")]
    NoSettlementToUpgrade(VertexId),
    #[error("development card draw pile is empty")]
    DrawPileEmpty,
    #[error("no playable card of that kind in hand")]
    CardNotPlayable,
    #[error("dice pair {0:?} is not a roll of two six-sided dice")]
    InvalidDice((u8, u8)),
    #[error("robber must move to a different hex")]
    RobberMustMove,
    #[error("{0} cannot be robbed right now")]
    InvalidStealTarget(PlayerId),
    #[error("no discard is owed by {0}")]
    NoDiscardOwed(PlayerId),
    #[error("cannot trade a resource for itself")]
    SelfTrade,
    #[error("no port grants that trade ratio")]
    NoPortAccess,
    #[error("trade {0} not found")]
    TradeNotFound(Uuid),
    #[error("trade {0} has expired")]
    TradeExpired(Uuid),
    #[error("trade {0} is not addressed to this player")]
    TradeNotAddressed(Uuid),
    #[error("trade offer must move resources in both directions")]
    EmptyTrade,
    #[error("nothing to undo")]
    NothingToUndo,
}
