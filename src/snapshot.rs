//! Flat, serde-friendly capture of a full game. The board's adjacency
//! tables are not serialized; restoration re-derives them from the hex
//! records, so a snapshot stays small and cannot smuggle in a board whose
//! topology disagrees with its hexes.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, Building, Hex, Road};
use crate::game::bank::Bank;
use crate::game::phase::Phase;
use crate::game::player::Player;
use crate::game::setup::SetupTracker;
use crate::game::state::{GameConfig, GameState};
use crate::game::trade::Trade;
use crate::types::{EdgeId, HexId, PlayerId, Resource, VertexId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: Uuid,
    pub config: GameConfig,
    pub hexes: Vec<Hex>,
    /// Port resource assignment in coastal slot order.
    pub harbors: Vec<Option<Resource>>,
    pub robber_hex: HexId,
    pub buildings: Vec<(VertexId, Building)>,
    pub roads: Vec<(EdgeId, Road)>,
    pub players: Vec<Player>,
    pub turn_order: Vec<PlayerId>,
    pub bank: Bank,
    pub phase: Phase,
    pub setup: SetupTracker,
    pub turn: u32,
    pub current_player: PlayerId,
    pub turn_owner: PlayerId,
    pub last_roll: Option<(u8, u8)>,
    pub trades: Vec<Trade>,
    pub winner: Option<PlayerId>,
    pub created_at: u64,
    pub updated_at: u64,
    pub discard_queue: Vec<PlayerId>,
    pub discard_remaining: Vec<(PlayerId, u8)>,
    pub free_roads: u8,
    pub next_dev_card_id: u32,
    pub rng: ChaCha8Rng,
}

impl GameSnapshot {
    pub fn capture(state: &GameState) -> Self {
        let board = &state.board;
        Self {
            id: state.id,
            config: state.config.clone(),
            hexes: board.hexes.values().cloned().collect(),
            harbors: board.ports.iter().map(|p| p.harbor.resource).collect(),
            robber_hex: board.robber_hex,
            buildings: board
                .vertices
                .values()
                .filter_map(|v| v.building.map(|b| (v.id, b)))
                .collect(),
            roads: board
                .edges
                .values()
                .filter_map(|e| e.road.map(|r| (e.id, r)))
                .collect(),
            players: state.players.values().cloned().collect(),
            turn_order: state.turn_order.clone(),
            bank: state.bank.clone(),
            phase: state.phase,
            setup: state.setup.clone(),
            turn: state.turn,
            current_player: state.current_player,
            turn_owner: state.turn_owner,
            last_roll: state.last_roll,
            trades: state.trades.clone(),
            winner: state.winner,
            created_at: state.created_at,
            updated_at: state.updated_at,
            discard_queue: state.discard_queue.iter().copied().collect(),
            discard_remaining: state
                .discard_remaining
                .iter()
                .map(|(k, v)| (*k, *v))
                .collect(),
            free_roads: state.free_roads,
            next_dev_card_id: state.next_dev_card_id,
            rng: state.rng.clone(),
        }
    }

    /// Rebuild a live state, re-deriving every board adjacency table.
    pub fn restore(self) -> GameState {
        let mut board = Board::from_hexes(self.hexes, &self.harbors, self.robber_hex);
        for (vertex, building) in self.buildings {
            board.restore_building(vertex, building);
        }
        for (edge, road) in self.roads {
            board.put_road(edge, road);
        }
        GameState {
            id: self.id,
            config: self.config,
            board,
            players: self.players.into_iter().map(|p| (p.id, p)).collect(),
            turn_order: self.turn_order,
            bank: self.bank,
            phase: self.phase,
            setup: self.setup,
            turn: self.turn,
            current_player: self.current_player,
            turn_owner: self.turn_owner,
            last_roll: self.last_roll,
            trades: self.trades,
            winner: self.winner,
            created_at: self.created_at,
            updated_at: self.updated_at,
            discard_queue: self.discard_queue.into_iter().collect(),
            discard_remaining: self.discard_remaining.into_iter().collect(),
            free_roads: self.free_roads,
            next_dev_card_id: self.next_dev_card_id,
            rng: self.rng,
        }
    }
}
