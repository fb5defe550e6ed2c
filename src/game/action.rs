use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::resources::ResourceBundle;
use crate::types::{EdgeId, HexId, PlayerId, Resource, VertexId};

/// A player request against the engine: who is acting plus what they want
/// to do. Every variant is matched exhaustively by the action processor,
/// so adding a variant without a handler fails to compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub actor: PlayerId,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(actor: PlayerId, kind: ActionKind) -> Self {
        Self { actor, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Roll for production. `dice: None` rolls with the game RNG; a fixed
    /// pair is accepted for replays and tests.
    RollDice { dice: Option<(u8, u8)> },
    BuildSettlement { vertex: VertexId },
    BuildRoad { edge: EdgeId },
    BuildCity { vertex: VertexId },
    BuyDevelopmentCard,
    PlayKnight,
    PlayRoadBuilding,
    PlayYearOfPlenty {
        first: Resource,
        second: Option<Resource>,
    },
    PlayMonopoly { resource: Resource },
    /// Give up one card while over the hand limit after a seven.
    DiscardResource { resource: Resource },
    MoveRobber { hex: HexId },
    StealResource { victim: PlayerId },
    BankTrade { give: Resource, receive: Resource },
    PortTrade { give: Resource, receive: Resource },
    OfferTrade {
        offer: ResourceBundle,
        request: ResourceBundle,
        /// `None` is an open offer any opponent may accept.
        target: Option<PlayerId>,
        /// Turns until expiry; `None` uses the game config default.
        expires_in: Option<u32>,
    },
    AcceptTrade { trade: Uuid },
    RejectTrade { trade: Uuid },
    CancelTrade { trade: Uuid },
    EndTurn,
}

impl ActionKind {
    /// Actions a player may submit outside their own turn.
    pub fn allowed_out_of_turn(&self) -> bool {
        matches!(
            self,
            ActionKind::AcceptTrade { .. }
                | ActionKind::RejectTrade { .. }
                | ActionKind::DiscardResource { .. }
        )
    }
}
