use std::collections::{BTreeMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::board::{Board, Building};
use crate::game::action::{Action, ActionKind};
use crate::game::bank::Bank;
use crate::game::event::GameEvent;
use crate::game::phase::{
    self, LARGEST_ARMY_MIN, LONGEST_ROAD_MIN, Phase, award_with_sticky_ties,
};
use crate::game::player::Player;
use crate::game::resources::{
    COST_CITY, COST_DEVELOPMENT, COST_ROAD, COST_SETTLEMENT, ResourceBundle,
};
use crate::game::setup::{SetupRound, SetupTracker};
use crate::game::trade::Trade;
use crate::types::{
    BuildingKind, Color, DevCardKind, HexId, PlayerId, Resource, TradeStatus, VertexId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub num_players: usize,
    pub vps_to_win: u8,
    pub seed: u64,
    /// Default lifetime of a player trade offer, in elapsed turns.
    pub trade_ttl_turns: u32,
    /// How many prior snapshots the flow manager keeps for undo.
    pub undo_depth: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_players: 4,
            vps_to_win: 10,
            seed: 42,
            trade_ttl_turns: 4,
            undo_depth: 64,
        }
    }
}

/// The canonical game value: board, players, bank, trades and the phase
/// machine position. Mutated only through the action processor; the flow
/// manager clones it per action so a rejected action leaves no trace.
#[derive(Debug, Clone)]
pub struct GameState {
    pub id: Uuid,
    pub config: GameConfig,
    pub board: Board,
    pub players: BTreeMap<PlayerId, Player>,
    pub turn_order: Vec<PlayerId>,
    pub bank: Bank,
    pub phase: Phase,
    pub setup: SetupTracker,
    pub turn: u32,
    pub current_player: PlayerId,
    /// Whose turn it actually is while discard/steal interrupts run.
    pub(crate) turn_owner: PlayerId,
    pub last_roll: Option<(u8, u8)>,
    pub trades: Vec<Trade>,
    pub winner: Option<PlayerId>,
    pub created_at: u64,
    pub updated_at: u64,
    pub(crate) discard_queue: VecDeque<PlayerId>,
    pub(crate) discard_remaining: BTreeMap<PlayerId, u8>,
    /// Free road placements granted by a road-building card.
    pub(crate) free_roads: u8,
    pub(crate) next_dev_card_id: u32,
    pub(crate) rng: ChaCha8Rng,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        assert!(
            (2..=Color::ORDERED.len()).contains(&config.num_players),
            "game supports between 2 and {} players",
            Color::ORDERED.len()
        );

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let board = Board::generate(&mut rng);
        let bank = Bank::standard(&mut rng);

        let turn_order: Vec<PlayerId> =
            (0..config.num_players as u8).map(PlayerId).collect();
        let players: BTreeMap<PlayerId, Player> = turn_order
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                (
                    *id,
                    Player::new(*id, format!("Player {}", idx + 1), Color::ORDERED[idx]),
                )
            })
            .collect();

        let setup = SetupTracker::new(&turn_order);
        let current_player = setup.current_player().expect("setup starts non-empty");
        let now = unix_now();

        debug!(players = config.num_players, seed = config.seed, "game created");

        Self {
            id: Uuid::new_v4(),
            config,
            board,
            players,
            turn_order,
            bank,
            phase: Phase::Setup1,
            setup,
            turn: 0,
            current_player,
            turn_owner: current_player,
            last_roll: None,
            trades: Vec::new(),
            winner: None,
            created_at: now,
            updated_at: now,
            discard_queue: VecDeque::new(),
            discard_remaining: BTreeMap::new(),
            free_roads: 0,
            next_dev_card_id: 0,
            rng,
        }
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        self.players.get_mut(&id).expect("dangling player id")
    }

    /// Pending, unexpired trades. Expired entries are skipped here and
    /// physically purged the next time a trade action runs.
    pub fn active_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades
            .iter()
            .filter(|trade| trade.status == TradeStatus::Pending && !trade.is_expired(self.turn))
    }

    pub(crate) fn purge_expired_trades(&mut self) -> Vec<GameEvent> {
        let turn = self.turn;
        let mut events = Vec::new();
        self.trades.retain(|trade| {
            if trade.is_expired(turn) {
                debug!(trade = %trade.id, "trade expired");
                events.push(GameEvent::TradeExpired { trade_id: trade.id });
                false
            } else {
                true
            }
        });
        events
    }

    pub(crate) fn remove_trade(&mut self, id: Uuid) -> Option<Trade> {
        let idx = self.trades.iter().position(|trade| trade.id == id)?;
        Some(self.trades.remove(idx))
    }

    pub(crate) fn roll_dice(&mut self) -> (u8, u8) {
        (self.rng.gen_range(1..=6), self.rng.gen_range(1..=6))
    }

    /// Take one uniformly random card from the victim's hand.
    pub(crate) fn draw_random_card(&mut self, victim: PlayerId) -> Option<Resource> {
        let hand = self.player_mut(victim).resources.flatten();
        if hand.is_empty() {
            return None;
        }
        let choice = hand[self.rng.gen_range(0..hand.len())];
        self.player_mut(victim)
            .resources
            .remove(choice, 1)
            .expect("drawn card missing from hand");
        Some(choice)
    }

    /// Opponents with a building on the robber hex and cards to lose.
    pub(crate) fn steal_candidates(&self, thief: PlayerId) -> Vec<PlayerId> {
        let mut candidates: Vec<PlayerId> = self
            .board
            .hex_vertices(self.board.robber_hex)
            .iter()
            .filter_map(|vertex| self.board.building_at(*vertex))
            .map(|building| building.owner)
            .filter(|owner| *owner != thief)
            .filter(|owner| self.players[owner].hand_size() > 0)
            .collect();
        candidates.sort();
        candidates.dedup();
        candidates
    }

    /// Pay out production for a non-seven roll. Settlements yield one
    /// card, cities two; the robber's hex and an empty bank suppress the
    /// individual grant, never the whole roll.
    pub(crate) fn distribute_production(&mut self, sum: u8) -> Vec<GameEvent> {
        let mut grants: Vec<(PlayerId, ResourceBundle)> = Vec::new();
        let hexes: Vec<HexId> = self
            .board
            .hexes
            .values()
            .filter(|hex| hex.token == Some(sum) && !hex.has_robber)
            .map(|hex| hex.id)
            .collect();
        for hex_id in hexes {
            let resource = self
                .board
                .hex(hex_id)
                .terrain
                .resource()
                .expect("numbered hex without resource");
            for vertex in self.board.hex_vertices(hex_id).to_vec() {
                let Some(Building { kind, owner }) = self.board.building_at(vertex) else {
                    continue;
                };
                let amount = match kind {
                    BuildingKind::Settlement => 1,
                    BuildingKind::City => 2,
                };
                grants.push((owner, ResourceBundle::single(resource, amount)));
            }
        }

        let mut events = Vec::new();
        for (owner, bundle) in grants {
            if self.bank.dispense(&bundle).is_ok() {
                self.player_mut(owner).resources.add_bundle(&bundle);
                events.push(GameEvent::ResourcesGained {
                    player: owner,
                    bundle,
                });
            }
        }
        events
    }

    /// Starting resources for a round-two setup settlement: one card per
    /// adjacent producing hex.
    pub(crate) fn grant_starting_resources(
        &mut self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Option<GameEvent> {
        let bundle: ResourceBundle = self
            .board
            .vertex(vertex)
            .expect("dangling vertex id")
            .hexes
            .iter()
            .filter_map(|hex| self.board.hex(*hex).terrain.resource())
            .map(|resource| (resource, 1))
            .collect();
        if bundle.is_empty() || self.bank.dispense(&bundle).is_err() {
            return None;
        }
        self.player_mut(player).resources.add_bundle(&bundle);
        Some(GameEvent::ResourcesGained { player, bundle })
    }

    pub(crate) fn begin_discard_cycle(&mut self) {
        self.discard_queue.clear();
        self.discard_remaining.clear();
        for id in self.turn_order.clone() {
            let hand = self.players[&id].hand_size();
            if hand > 7 {
                self.discard_queue.push_back(id);
                self.discard_remaining.insert(id, (hand / 2) as u8);
            }
        }
        if let Some(first) = self.discard_queue.pop_front() {
            self.phase = Phase::Discard;
            self.current_player = first;
        } else {
            self.phase = Phase::MoveRobber;
            self.current_player = self.turn_owner;
        }
    }

    pub(crate) fn advance_turn(&mut self) -> GameEvent {
        let finished = self.turn_owner;
        self.free_roads = 0;
        self.player_mut(finished).reset_for_new_turn();
        let next = self.next_in_order(finished);
        self.current_player = next;
        self.turn_owner = next;
        self.turn += 1;
        self.last_roll = None;
        self.phase = Phase::Roll;
        GameEvent::TurnEnded {
            player: finished,
            next_player: next,
        }
    }

    pub(crate) fn next_in_order(&self, after: PlayerId) -> PlayerId {
        let idx = self
            .turn_order
            .iter()
            .position(|id| *id == after)
            .expect("player missing from turn order");
        self.turn_order[(idx + 1) % self.turn_order.len()]
    }

    /// Recompute everything derived from raw state: longest road, largest
    /// army, scores and victory. Runs after every successful action.
    pub(crate) fn recompute_derived(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();

        let road_lengths: Vec<(PlayerId, u8)> = self
            .turn_order
            .iter()
            .map(|id| (*id, phase::longest_road_length(&self.board, *id)))
            .collect();
        let road_incumbent = self
            .players
            .values()
            .find(|p| p.has_longest_road)
            .map(|p| p.id);
        let road_holder =
            award_with_sticky_ties(&road_lengths, LONGEST_ROAD_MIN, road_incumbent);
        if road_holder != road_incumbent {
            for player in self.players.values_mut() {
                player.has_longest_road = Some(player.id) == road_holder;
            }
            let length = road_holder
                .and_then(|id| road_lengths.iter().find(|(p, _)| *p == id))
                .map(|(_, len)| *len)
                .unwrap_or(0);
            events.push(GameEvent::LongestRoadChanged {
                holder: road_holder,
                length,
            });
        }

        let armies: Vec<(PlayerId, u8)> = self
            .turn_order
            .iter()
            .map(|id| (*id, self.players[id].knights_played))
            .collect();
        let army_incumbent = self
            .players
            .values()
            .find(|p| p.has_largest_army)
            .map(|p| p.id);
        let army_holder = award_with_sticky_ties(&armies, LARGEST_ARMY_MIN, army_incumbent);
        if army_holder != army_incumbent {
            for player in self.players.values_mut() {
                player.has_largest_army = Some(player.id) == army_holder;
            }
            let knights = army_holder
                .map(|id| self.players[&id].knights_played)
                .unwrap_or(0);
            events.push(GameEvent::LargestArmyChanged {
                holder: army_holder,
                knights,
            });
        }

        for id in self.turn_order.clone() {
            let mut public = 0u8;
            for (_, kind) in self.board.buildings_of(id) {
                public += match kind {
                    BuildingKind::Settlement => 1,
                    BuildingKind::City => 2,
                };
            }
            let player = self.player_mut(id);
            if player.has_longest_road {
                public += 2;
            }
            if player.has_largest_army {
                public += 2;
            }
            let hidden = player.victory_point_cards();
            player.score.public = public;
            player.score.hidden = hidden;
            player.score.total = public + hidden;
        }

        if self.phase != Phase::Ended {
            let winner = self
                .turn_order
                .iter()
                .find(|id| self.players[*id].score.total >= self.config.vps_to_win)
                .copied();
            if let Some(winner) = winner {
                debug!(%winner, turn = self.turn, "game ended");
                self.phase = Phase::Ended;
                self.winner = Some(winner);
                events.push(GameEvent::GameEnded { winner });
            }
        }

        events
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = unix_now();
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl GameState {
    /// Setup placement bookkeeping shared by the two setup phases.
    pub(crate) fn setup_phase_for_round(round: SetupRound) -> Phase {
        match round {
            SetupRound::First => Phase::Setup1,
            SetupRound::Second => Phase::Setup2,
        }
    }

    /// Move the cursor to the next setup step, or out of setup entirely.
    pub(crate) fn sync_setup_position(&mut self) -> Option<GameEvent> {
        if self.setup.is_complete() {
            self.phase = Phase::Roll;
            let first = self.turn_order[0];
            self.current_player = first;
            self.turn_owner = first;
            return Some(GameEvent::SetupCompleted);
        }
        let round = self.setup.current_round().expect("incomplete setup");
        self.phase = Self::setup_phase_for_round(round);
        let player = self.setup.current_player().expect("incomplete setup");
        self.current_player = player;
        self.turn_owner = player;
        None
    }
}

impl GameState {
    /// Enumerate every action the processor would currently accept.
    /// Consumers (AI search, UIs) drive from this; the engine itself only
    /// uses it in tests to cross-check handler validation.
    pub fn legal_actions(&self) -> Vec<Action> {
        let me = self.current_player;
        let mut actions = Vec::new();
        match self.phase {
            Phase::Setup1 | Phase::Setup2 => {
                if let Some(anchor) = self.setup.road_anchor() {
                    for edge_id in self.board.vertex_edges(anchor) {
                        let edge = self.board.edge(*edge_id).expect("adjacency table edge");
                        if edge.buildable && edge.road.is_none() {
                            actions.push(Action::new(me, ActionKind::BuildRoad { edge: *edge_id }));
                        }
                    }
                } else {
                    for vertex in self.settleable_vertices() {
                        actions.push(Action::new(me, ActionKind::BuildSettlement { vertex }));
                    }
                }
            }
            Phase::Roll => {
                actions.push(Action::new(me, ActionKind::RollDice { dice: None }));
            }
            Phase::Actions => self.enumerate_turn_actions(&mut actions),
            Phase::Discard => {
                for (player, _) in &self.discard_remaining {
                    for (resource, count) in self.players[player].resources.iter() {
                        if count > 0 {
                            actions
                                .push(Action::new(*player, ActionKind::DiscardResource { resource }));
                        }
                    }
                }
            }
            Phase::MoveRobber => {
                for hex in self.board.land_hexes() {
                    if hex.id != self.board.robber_hex {
                        actions.push(Action::new(me, ActionKind::MoveRobber { hex: hex.id }));
                    }
                }
            }
            Phase::Steal => {
                for victim in self.steal_candidates(me) {
                    actions.push(Action::new(me, ActionKind::StealResource { victim }));
                }
            }
            Phase::Ended => {}
        }
        actions
    }

    /// Empty, land-touching vertices satisfying the distance rule.
    fn settleable_vertices(&self) -> Vec<VertexId> {
        self.board
            .buildable_vertices()
            .filter(|vertex| {
                vertex.building.is_none()
                    && self
                        .board
                        .vertex_neighbors(vertex.id)
                        .iter()
                        .all(|n| self.board.building_at(*n).is_none())
            })
            .map(|vertex| vertex.id)
            .collect()
    }

    fn enumerate_turn_actions(&self, actions: &mut Vec<Action>) {
        let me = self.current_player;
        let player = &self.players[&me];
        actions.push(Action::new(me, ActionKind::EndTurn));

        if player.inventory.settlements > 0 && player.resources.covers(&COST_SETTLEMENT) {
            for vertex in self.settleable_vertices() {
                let connected = self
                    .board
                    .vertex_edges(vertex)
                    .iter()
                    .any(|edge| self.board.road_at(*edge).map(|r| r.owner) == Some(me));
                if connected {
                    actions.push(Action::new(me, ActionKind::BuildSettlement { vertex }));
                }
            }
        }

        let can_pay_road = self.free_roads > 0 || player.resources.covers(&COST_ROAD);
        if player.inventory.roads > 0 && can_pay_road {
            for edge in self.board.edges.values() {
                if edge.road.is_some() || !edge.buildable {
                    continue;
                }
                let connected = [edge.vertices.0, edge.vertices.1].iter().any(|vertex| {
                    match self.board.building_at(*vertex) {
                        Some(building) => building.owner == me,
                        None => self
                            .board
                            .vertex_edges(*vertex)
                            .iter()
                            .filter(|other| **other != edge.id)
                            .any(|other| self.board.road_at(*other).map(|r| r.owner) == Some(me)),
                    }
                });
                if connected {
                    actions.push(Action::new(me, ActionKind::BuildRoad { edge: edge.id }));
                }
            }
        }

        if player.inventory.cities > 0 && player.resources.covers(&COST_CITY) {
            for (vertex, kind) in self.board.buildings_of(me) {
                if kind == BuildingKind::Settlement {
                    actions.push(Action::new(me, ActionKind::BuildCity { vertex }));
                }
            }
        }

        if self.bank.draw_pile_len() > 0 && player.resources.covers(&COST_DEVELOPMENT) {
            actions.push(Action::new(me, ActionKind::BuyDevelopmentCard));
        }

        if player.playable_card(DevCardKind::Knight, self.turn).is_some() {
            actions.push(Action::new(me, ActionKind::PlayKnight));
        }
        if player
            .playable_card(DevCardKind::RoadBuilding, self.turn)
            .is_some()
        {
            actions.push(Action::new(me, ActionKind::PlayRoadBuilding));
        }
        if player
            .playable_card(DevCardKind::YearOfPlenty, self.turn)
            .is_some()
        {
            for first in Resource::ALL {
                for second in Resource::ALL {
                    let mut wanted = ResourceBundle::single(first, 1);
                    wanted.add(second, 1);
                    if self.bank.resources().covers(&wanted) && first <= second {
                        actions.push(Action::new(
                            me,
                            ActionKind::PlayYearOfPlenty {
                                first,
                                second: Some(second),
                            },
                        ));
                    }
                }
            }
        }
        if player
            .playable_card(DevCardKind::Monopoly, self.turn)
            .is_some()
        {
            for resource in Resource::ALL {
                actions.push(Action::new(me, ActionKind::PlayMonopoly { resource }));
            }
        }

        for give in Resource::ALL {
            let ratio = self.board.trade_ratio(me, give);
            for receive in Resource::ALL {
                if give == receive || self.bank.available(receive) == 0 {
                    continue;
                }
                if player.resources.get(give) >= crate::board::BANK_RATIO {
                    actions.push(Action::new(me, ActionKind::BankTrade { give, receive }));
                }
                if ratio < crate::board::BANK_RATIO && player.resources.get(give) >= ratio {
                    actions.push(Action::new(me, ActionKind::PortTrade { give, receive }));
                }
            }
        }

        for trade in self.active_trades() {
            if trade.initiator == me {
                actions.push(Action::new(me, ActionKind::CancelTrade { trade: trade.id }));
            }
            for responder in &self.turn_order {
                if trade.addressed_to(*responder) {
                    actions.push(Action::new(
                        *responder,
                        ActionKind::RejectTrade { trade: trade.id },
                    ));
                    if self.players[responder].resources.covers(&trade.requesting)
                        && self.players[&trade.initiator]
                            .resources
                            .covers(&trade.offering)
                    {
                        actions.push(Action::new(
                            *responder,
                            ActionKind::AcceptTrade { trade: trade.id },
                        ));
                    }
                }
            }
        }
    }
}
