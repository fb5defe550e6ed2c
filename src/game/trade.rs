use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::resources::ResourceBundle;
use crate::types::{PlayerId, Resource, TradeKind, TradeStatus};

/// One trade, whether settled instantly (bank/port) or left pending for a
/// counterparty (player-to-player). Pending trades live in
/// `GameState::trades` and are removed on any terminal status; expiration
/// is checked lazily since the engine has no scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub kind: TradeKind,
    pub initiator: PlayerId,
    /// `None` is an open offer any opponent may accept.
    pub target: Option<PlayerId>,
    /// What the initiator gives away.
    pub offering: ResourceBundle,
    /// What the initiator wants back.
    pub requesting: ResourceBundle,
    pub status: TradeStatus,
    /// Maritime ratio for bank/port trades, `None` for player trades.
    pub ratio: Option<u8>,
    pub port_resource: Option<Resource>,
    pub created_turn: u32,
    /// First turn on which the trade counts as expired.
    pub expires_turn: u32,
}

impl Trade {
    pub fn player_offer(
        initiator: PlayerId,
        target: Option<PlayerId>,
        offering: ResourceBundle,
        requesting: ResourceBundle,
        created_turn: u32,
        ttl_turns: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TradeKind::Player,
            initiator,
            target,
            offering,
            requesting,
            status: TradeStatus::Pending,
            ratio: None,
            port_resource: None,
            created_turn,
            expires_turn: created_turn.saturating_add(ttl_turns),
        }
    }

    /// Record for a maritime trade that settled the moment it was made.
    pub fn settled_maritime(
        kind: TradeKind,
        initiator: PlayerId,
        offering: ResourceBundle,
        requesting: ResourceBundle,
        ratio: u8,
        port_resource: Option<Resource>,
        turn: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            initiator,
            target: None,
            offering,
            requesting,
            status: TradeStatus::Accepted,
            ratio: Some(ratio),
            port_resource,
            created_turn: turn,
            expires_turn: turn,
        }
    }

    pub fn is_expired(&self, turn: u32) -> bool {
        self.status == TradeStatus::Pending && turn >= self.expires_turn
    }

    /// May `player` accept or reject this offer?
    pub fn addressed_to(&self, player: PlayerId) -> bool {
        match self.target {
            Some(target) => target == player,
            None => player != self.initiator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(target: Option<PlayerId>) -> Trade {
        Trade::player_offer(
            PlayerId(0),
            target,
            ResourceBundle::single(Resource::Wood, 2),
            ResourceBundle::single(Resource::Ore, 1),
            5,
            3,
        )
    }

    #[test]
    fn expiry_is_turn_based() {
        let trade = offer(None);
        assert!(!trade.is_expired(5));
        assert!(!trade.is_expired(7));
        assert!(trade.is_expired(8));
    }

    #[test]
    fn open_offers_exclude_the_initiator() {
        let trade = offer(None);
        assert!(trade.addressed_to(PlayerId(2)));
        assert!(!trade.addressed_to(PlayerId(0)));
    }

    #[test]
    fn targeted_offers_bind_the_target() {
        let trade = offer(Some(PlayerId(1)));
        assert!(trade.addressed_to(PlayerId(1)));
        assert!(!trade.addressed_to(PlayerId(2)));
    }
}
