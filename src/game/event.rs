use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::resources::ResourceBundle;
use crate::game::trade::Trade;
use crate::types::{BuildingKind, DevCardKind, EdgeId, HexId, PlayerId, Resource, VertexId};

/// Observable effects of an applied action, in the order they happened.
/// Downstream consumers (persistence, realtime broadcast, AI) react to
/// these instead of diffing states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    DiceRolled {
        player: PlayerId,
        dice: (u8, u8),
        sum: u8,
    },
    ResourcesGained {
        player: PlayerId,
        bundle: ResourceBundle,
    },
    ResourceDiscarded {
        player: PlayerId,
        resource: Resource,
    },
    BuildingPlaced {
        player: PlayerId,
        vertex: VertexId,
        kind: BuildingKind,
    },
    RoadPlaced {
        player: PlayerId,
        edge: EdgeId,
    },
    RobberMoved {
        player: PlayerId,
        hex: HexId,
    },
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Resource,
    },
    DevelopmentCardBought {
        player: PlayerId,
    },
    DevelopmentCardPlayed {
        player: PlayerId,
        kind: DevCardKind,
    },
    /// A bank or port trade that settled the moment it was made.
    TradeExecuted {
        trade: Trade,
    },
    TradeOpened {
        trade: Trade,
    },
    TradeAccepted {
        trade_id: Uuid,
        initiator: PlayerId,
        acceptor: PlayerId,
    },
    TradeRejected {
        trade_id: Uuid,
    },
    TradeCancelled {
        trade_id: Uuid,
    },
    TradeExpired {
        trade_id: Uuid,
    },
    LongestRoadChanged {
        holder: Option<PlayerId>,
        length: u8,
    },
    LargestArmyChanged {
        holder: Option<PlayerId>,
        knights: u8,
    },
    SetupCompleted,
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },
    GameEnded {
        winner: PlayerId,
    },
}
