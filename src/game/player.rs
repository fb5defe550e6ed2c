use serde::{Deserialize, Serialize};

use crate::game::resources::ResourceBundle;
use crate::types::{Color, DevCardKind, PlayerId};

pub const MAX_ROADS: u8 = 15;
pub const MAX_SETTLEMENTS: u8 = 5;
pub const MAX_CITIES: u8 = 4;

/// One development card in a player's hand. Cards bought this turn may not
/// be played until the next turn, with the explicit exception of knights
/// (house variant carried over from the original ruleset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevCard {
    pub id: u32,
    pub kind: DevCardKind,
    pub purchased_turn: u32,
    pub played_turn: Option<u32>,
}

impl DevCard {
    pub fn playable_on(&self, turn: u32) -> bool {
        if self.played_turn.is_some() || self.kind == DevCardKind::VictoryPoint {
            return false;
        }
        self.kind == DevCardKind::Knight || self.purchased_turn < turn
    }
}

/// Remaining building pieces. Counts only ever go down: upgrading a
/// settlement to a city does not return the settlement piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingInventory {
    pub roads: u8,
    pub settlements: u8,
    pub cities: u8,
}

impl Default for BuildingInventory {
    fn default() -> Self {
        Self {
            roads: MAX_ROADS,
            settlements: MAX_SETTLEMENTS,
            cities: MAX_CITIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    /// Points visible to every player: buildings plus bonus flags.
    pub public: u8,
    /// Victory point cards held in hand.
    pub hidden: u8,
    pub total: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub resources: ResourceBundle,
    pub dev_cards: Vec<DevCard>,
    pub inventory: BuildingInventory,
    pub score: Score,
    pub knights_played: u8,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
    pub played_dev_card_this_turn: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, color: Color) -> Self {
        Self {
            id,
            name: name.into(),
            color,
            resources: ResourceBundle::zero(),
            dev_cards: Vec::new(),
            inventory: BuildingInventory::default(),
            score: Score::default(),
            knights_played: 0,
            has_longest_road: false,
            has_largest_army: false,
            played_dev_card_this_turn: false,
        }
    }

    pub fn reset_for_new_turn(&mut self) {
        self.played_dev_card_this_turn = false;
    }

    pub fn hand_size(&self) -> u32 {
        self.resources.total()
    }

    pub fn victory_point_cards(&self) -> u8 {
        self.dev_cards
            .iter()
            .filter(|card| card.kind == DevCardKind::VictoryPoint)
            .count() as u8
    }

    /// First unplayed card of the given kind that is mature enough to play.
    pub fn playable_card(&self, kind: DevCardKind, turn: u32) -> Option<&DevCard> {
        if self.played_dev_card_this_turn {
            return None;
        }
        self.dev_cards
            .iter()
            .find(|card| card.kind == kind && card.playable_on(turn))
    }

    pub(crate) fn mark_card_played(&mut self, card_id: u32, turn: u32) {
        let card = self
            .dev_cards
            .iter_mut()
            .find(|card| card.id == card_id)
            .expect("played card missing from hand");
        assert!(card.played_turn.is_none(), "card played twice");
        card.played_turn = Some(turn);
        self.played_dev_card_this_turn = true;
        if card.kind == DevCardKind::Knight {
            self.knights_played += 1;
        }
    }

    pub(crate) fn take_road_piece(&mut self) -> bool {
        if self.inventory.roads == 0 {
            return false;
        }
        self.inventory.roads -= 1;
        true
    }

    pub(crate) fn take_settlement_piece(&mut self) -> bool {
        if self.inventory.settlements == 0 {
            return false;
        }
        self.inventory.settlements -= 1;
        true
    }

    pub(crate) fn take_city_piece(&mut self) -> bool {
        if self.inventory.cities == 0 {
            return false;
        }
        self.inventory.cities -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cards_mature_next_turn_except_knights() {
        let knight = DevCard {
            id: 0,
            kind: DevCardKind::Knight,
            purchased_turn: 3,
            played_turn: None,
        };
        let monopoly = DevCard {
            id: 1,
            kind: DevCardKind::Monopoly,
            purchased_turn: 3,
            played_turn: None,
        };
        assert!(knight.playable_on(3));
        assert!(!monopoly.playable_on(3));
        assert!(monopoly.playable_on(4));
    }

    #[test]
    fn victory_point_cards_are_never_played() {
        let card = DevCard {
            id: 0,
            kind: DevCardKind::VictoryPoint,
            purchased_turn: 0,
            played_turn: None,
        };
        assert!(!card.playable_on(10));
    }

    #[test]
    fn inventory_is_monotonic() {
        let mut player = Player::new(PlayerId(0), "Ada", Color::Red);
        for _ in 0..MAX_SETTLEMENTS {
            assert!(player.take_settlement_piece());
        }
        assert!(!player.take_settlement_piece());
        assert_eq!(player.inventory.settlements, 0);
    }
}
