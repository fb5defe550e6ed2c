//! The action processor: one handler per `ActionKind`, dispatched from an
//! exhaustive match. Handlers validate first and mutate second; the flow
//! manager applies them to a clone, so an `Err` means the caller's state
//! was never touched.

use tracing::debug;
use uuid::Uuid;

use crate::board::{BANK_RATIO, Building, Road};
use crate::game::action::{Action, ActionKind};
use crate::game::error::EngineError;
use crate::game::event::GameEvent;
use crate::game::phase::Phase;
use crate::game::player::DevCard;
use crate::game::resources::{
    COST_CITY, COST_DEVELOPMENT, COST_ROAD, COST_SETTLEMENT, ResourceBundle,
};
use crate::game::state::GameState;
use crate::game::trade::Trade;
use crate::types::{
    BuildingKind, DevCardKind, EdgeId, HexId, PlayerId, Resource, TradeKind, TradeStatus, VertexId,
};

pub(crate) fn apply(state: &mut GameState, action: &Action) -> Result<Vec<GameEvent>, EngineError> {
    if state.phase == Phase::Ended {
        return Err(EngineError::GameOver);
    }
    let actor = action.actor;
    if !state.players.contains_key(&actor) {
        return Err(EngineError::NoSuchPlayer(actor));
    }
    if actor != state.current_player && !action.kind.allowed_out_of_turn() {
        return Err(EngineError::NotYourTurn {
            expected: state.current_player,
            actual: actor,
        });
    }

    debug!(%actor, ?action.kind, phase = %state.phase, "applying action");

    let mut events = match &action.kind {
        ActionKind::RollDice { dice } => roll_dice(state, actor, *dice),
        ActionKind::BuildSettlement { vertex } => build_settlement(state, actor, *vertex),
        ActionKind::BuildRoad { edge } => build_road(state, actor, *edge),
        ActionKind::BuildCity { vertex } => build_city(state, actor, *vertex),
        ActionKind::BuyDevelopmentCard => buy_development_card(state, actor),
        ActionKind::PlayKnight => play_knight(state, actor),
        ActionKind::PlayRoadBuilding => play_road_building(state, actor),
        ActionKind::PlayYearOfPlenty { first, second } => {
            play_year_of_plenty(state, actor, *first, *second)
        }
        ActionKind::PlayMonopoly { resource } => play_monopoly(state, actor, *resource),
        ActionKind::DiscardResource { resource } => discard_resource(state, actor, *resource),
        ActionKind::MoveRobber { hex } => move_robber(state, actor, *hex),
        ActionKind::StealResource { victim } => steal_resource(state, actor, *victim),
        ActionKind::BankTrade { give, receive } => bank_trade(state, actor, *give, *receive),
        ActionKind::PortTrade { give, receive } => port_trade(state, actor, *give, *receive),
        ActionKind::OfferTrade {
            offer,
            request,
            target,
            expires_in,
        } => offer_trade(state, actor, offer, request, *target, *expires_in),
        ActionKind::AcceptTrade { trade } => accept_trade(state, actor, *trade),
        ActionKind::RejectTrade { trade } => reject_trade(state, actor, *trade),
        ActionKind::CancelTrade { trade } => cancel_trade(state, actor, *trade),
        ActionKind::EndTurn => end_turn(state, actor),
    }?;

    events.extend(state.recompute_derived());
    state.touch();
    Ok(events)
}

fn require_phase(state: &GameState, expected: Phase) -> Result<(), EngineError> {
    if state.phase == expected {
        Ok(())
    } else {
        Err(EngineError::WrongPhase(state.phase))
    }
}

fn pay(state: &mut GameState, player: PlayerId, cost: &ResourceBundle) -> Result<(), EngineError> {
    state
        .player_mut(player)
        .resources
        .remove_bundle(cost)
        .map_err(|_| EngineError::InsufficientResources)?;
    state.bank.receive(cost);
    Ok(())
}

fn roll_dice(
    state: &mut GameState,
    actor: PlayerId,
    dice: Option<(u8, u8)>,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Roll)?;
    let dice = match dice {
        Some(pair) if !(1..=6).contains(&pair.0) || !(1..=6).contains(&pair.1) => {
            return Err(EngineError::InvalidDice(pair));
        }
        Some(pair) => pair,
        None => state.roll_dice(),
    };
    let sum = dice.0 + dice.1;
    state.last_roll = Some(dice);

    let mut events = vec![GameEvent::DiceRolled {
        player: actor,
        dice,
        sum,
    }];
    if sum == 7 {
        state.begin_discard_cycle();
    } else {
        events.extend(state.distribute_production(sum));
        state.phase = Phase::Actions;
    }
    Ok(events)
}

/// Distance rule: the vertex and all of its neighbors must be empty.
fn check_distance_rule(state: &GameState, vertex: VertexId) -> Result<(), EngineError> {
    if state.board.building_at(vertex).is_some() {
        return Err(EngineError::VertexOccupied(vertex));
    }
    for neighbor in state.board.vertex_neighbors(vertex) {
        if state.board.building_at(*neighbor).is_some() {
            return Err(EngineError::DistanceRuleViolation(vertex));
        }
    }
    Ok(())
}

fn check_vertex_buildable(state: &GameState, vertex: VertexId) -> Result<(), EngineError> {
    let touches_land = state
        .board
        .vertex(vertex)
        .ok_or(EngineError::UnknownVertex(vertex))?
        .hexes
        .iter()
        .any(|hex| state.board.hex(*hex).terrain.is_land());
    if touches_land {
        Ok(())
    } else {
        Err(EngineError::UnknownVertex(vertex))
    }
}

/// A settlement outside setup must touch one of the builder's roads.
fn check_road_connection(
    state: &GameState,
    actor: PlayerId,
    vertex: VertexId,
) -> Result<(), EngineError> {
    let connected = state
        .board
        .vertex_edges(vertex)
        .iter()
        .any(|edge| state.board.road_at(*edge).map(|r| r.owner) == Some(actor));
    if connected {
        Ok(())
    } else {
        Err(EngineError::NotConnected)
    }
}

fn build_settlement(
    state: &mut GameState,
    actor: PlayerId,
    vertex: VertexId,
) -> Result<Vec<GameEvent>, EngineError> {
    check_vertex_buildable(state, vertex)?;
    check_distance_rule(state, vertex)?;

    let mut events = Vec::new();
    if state.phase.is_setup() {
        if state.setup.expects_road() {
            return Err(EngineError::WrongPhase(state.phase));
        }
        if !state.player_mut(actor).take_settlement_piece() {
            return Err(EngineError::InventoryExhausted(BuildingKind::Settlement));
        }
        state.board.put_building(
            vertex,
            Building {
                kind: BuildingKind::Settlement,
                owner: actor,
            },
        );
        let grants = state.setup.grants_starting_resources();
        state.setup.record_settlement(vertex);
        events.push(GameEvent::BuildingPlaced {
            player: actor,
            vertex,
            kind: BuildingKind::Settlement,
        });
        if grants {
            events.extend(state.grant_starting_resources(actor, vertex));
        }
        return Ok(events);
    }

    require_phase(state, Phase::Actions)?;
    check_road_connection(state, actor, vertex)?;
    if state.player(actor).map(|p| p.inventory.settlements) == Some(0) {
        return Err(EngineError::InventoryExhausted(BuildingKind::Settlement));
    }
    pay(state, actor, &COST_SETTLEMENT)?;
    let took = state.player_mut(actor).take_settlement_piece();
    assert!(took, "inventory checked before payment");
    state.board.put_building(
        vertex,
        Building {
            kind: BuildingKind::Settlement,
            owner: actor,
        },
    );
    events.push(GameEvent::BuildingPlaced {
        player: actor,
        vertex,
        kind: BuildingKind::Settlement,
    });
    Ok(events)
}

/// An edge connects to the player's network through an endpoint carrying
/// their building, or an adjacent road not cut off by a foreign building.
fn check_edge_connection(
    state: &GameState,
    actor: PlayerId,
    edge_id: EdgeId,
) -> Result<(), EngineError> {
    let edge = state
        .board
        .edge(edge_id)
        .ok_or(EngineError::UnknownEdge(edge_id))?;
    for vertex in [edge.vertices.0, edge.vertices.1] {
        match state.board.building_at(vertex) {
            Some(building) if building.owner == actor => return Ok(()),
            Some(_) => continue,
            None => {}
        }
        let has_road = state
            .board
            .vertex_edges(vertex)
            .iter()
            .filter(|other| **other != edge_id)
            .any(|other| state.board.road_at(*other).map(|r| r.owner) == Some(actor));
        if has_road {
            return Ok(());
        }
    }
    Err(EngineError::NotConnected)
}

fn check_edge_placeable(state: &GameState, edge_id: EdgeId) -> Result<(), EngineError> {
    let edge = state
        .board
        .edge(edge_id)
        .ok_or(EngineError::UnknownEdge(edge_id))?;
    if edge.road.is_some() {
        return Err(EngineError::EdgeOccupied(edge_id));
    }
    if !edge.buildable {
        return Err(EngineError::EdgeNotBuildable(edge_id));
    }
    Ok(())
}

fn build_road(
    state: &mut GameState,
    actor: PlayerId,
    edge_id: EdgeId,
) -> Result<Vec<GameEvent>, EngineError> {
    check_edge_placeable(state, edge_id)?;

    if state.phase.is_setup() {
        let anchor = state
            .setup
            .road_anchor()
            .ok_or(EngineError::WrongPhase(state.phase))?;
        let edge = state.board.edge(edge_id).expect("checked above");
        if edge.vertices.0 != anchor && edge.vertices.1 != anchor {
            return Err(EngineError::NotConnected);
        }
        if !state.player_mut(actor).take_road_piece() {
            return Err(EngineError::NoRoadPieces);
        }
        state.board.put_road(edge_id, Road { owner: actor });
        state.setup.record_road();
        let mut events = vec![GameEvent::RoadPlaced {
            player: actor,
            edge: edge_id,
        }];
        events.extend(state.sync_setup_position());
        return Ok(events);
    }

    require_phase(state, Phase::Actions)?;
    check_edge_connection(state, actor, edge_id)?;
    if state.player(actor).map(|p| p.inventory.roads) == Some(0) {
        return Err(EngineError::NoRoadPieces);
    }
    if state.free_roads > 0 {
        state.free_roads -= 1;
    } else {
        pay(state, actor, &COST_ROAD)?;
    }
    let took = state.player_mut(actor).take_road_piece();
    assert!(took, "inventory checked before payment");
    state.board.put_road(edge_id, Road { owner: actor });
    Ok(vec![GameEvent::RoadPlaced {
        player: actor,
        edge: edge_id,
    }])
}

fn build_city(
    state: &mut GameState,
    actor: PlayerId,
    vertex: VertexId,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    match state.board.building_at(vertex) {
        Some(building)
            if building.owner == actor && building.kind == BuildingKind::Settlement => {}
        _ => return Err(EngineError::NoSettlementToUpgrade(vertex)),
    }
    if state.player(actor).map(|p| p.inventory.cities) == Some(0) {
        return Err(EngineError::InventoryExhausted(BuildingKind::City));
    }
    pay(state, actor, &COST_CITY)?;
    let took = state.player_mut(actor).take_city_piece();
    assert!(took, "inventory checked before payment");
    // Upgrading consumes the settlement piece for good.
    state.board.put_building(
        vertex,
        Building {
            kind: BuildingKind::City,
            owner: actor,
        },
    );
    Ok(vec![GameEvent::BuildingPlaced {
        player: actor,
        vertex,
        kind: BuildingKind::City,
    }])
}

fn buy_development_card(
    state: &mut GameState,
    actor: PlayerId,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    if state.bank.draw_pile_len() == 0 {
        return Err(EngineError::DrawPileEmpty);
    }
    pay(state, actor, &COST_DEVELOPMENT)?;
    let kind = state
        .bank
        .draw_development_card()
        .expect("pile length checked above");
    let card = DevCard {
        id: state.next_dev_card_id,
        kind,
        purchased_turn: state.turn,
        played_turn: None,
    };
    state.next_dev_card_id += 1;
    state.player_mut(actor).dev_cards.push(card);
    Ok(vec![GameEvent::DevelopmentCardBought { player: actor }])
}

/// Validate, mark played and move the card kind to the bank's discard
/// pile. The hand entry stays behind with `played_turn` set as a record.
fn play_card(
    state: &mut GameState,
    actor: PlayerId,
    kind: DevCardKind,
) -> Result<GameEvent, EngineError> {
    let card_id = state
        .player(actor)
        .and_then(|p| p.playable_card(kind, state.turn))
        .map(|card| card.id)
        .ok_or(EngineError::CardNotPlayable)?;
    let turn = state.turn;
    state.player_mut(actor).mark_card_played(card_id, turn);
    state.bank.discard_development_card(kind);
    Ok(GameEvent::DevelopmentCardPlayed {
        player: actor,
        kind,
    })
}

fn play_knight(state: &mut GameState, actor: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    let event = play_card(state, actor, DevCardKind::Knight)?;
    state.phase = Phase::MoveRobber;
    Ok(vec![event])
}

fn play_road_building(
    state: &mut GameState,
    actor: PlayerId,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    let event = play_card(state, actor, DevCardKind::RoadBuilding)?;
    state.free_roads = 2;
    Ok(vec![event])
}

fn play_year_of_plenty(
    state: &mut GameState,
    actor: PlayerId,
    first: Resource,
    second: Option<Resource>,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    let mut wanted = ResourceBundle::single(first, 1);
    if let Some(second) = second {
        wanted.add(second, 1);
    }
    if !state.bank.resources().covers(&wanted) {
        return Err(EngineError::BankShortfall);
    }
    let event = play_card(state, actor, DevCardKind::YearOfPlenty)?;
    state
        .bank
        .dispense(&wanted)
        .expect("bank stock checked above");
    state.player_mut(actor).resources.add_bundle(&wanted);
    Ok(vec![
        event,
        GameEvent::ResourcesGained {
            player: actor,
            bundle: wanted,
        },
    ])
}

fn play_monopoly(
    state: &mut GameState,
    actor: PlayerId,
    resource: Resource,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    let event = play_card(state, actor, DevCardKind::Monopoly)?;
    let mut events = vec![event];
    let victims: Vec<PlayerId> = state
        .turn_order
        .iter()
        .copied()
        .filter(|id| *id != actor)
        .collect();
    let mut haul = ResourceBundle::zero();
    for victim in victims {
        let count = state.players[&victim].resources.get(resource);
        if count == 0 {
            continue;
        }
        state
            .player_mut(victim)
            .resources
            .remove(resource, count)
            .expect("count read from the same hand");
        haul.add(resource, count);
        for _ in 0..count {
            events.push(GameEvent::ResourceStolen {
                thief: actor,
                victim,
                resource,
            });
        }
    }
    if !haul.is_empty() {
        state.player_mut(actor).resources.add_bundle(&haul);
        events.push(GameEvent::ResourcesGained {
            player: actor,
            bundle: haul,
        });
    }
    Ok(events)
}

fn discard_resource(
    state: &mut GameState,
    actor: PlayerId,
    resource: Resource,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Discard)?;
    let owed = state
        .discard_remaining
        .get(&actor)
        .copied()
        .ok_or(EngineError::NoDiscardOwed(actor))?;
    debug_assert!(owed > 0, "settled players leave the discard map");
    state
        .player_mut(actor)
        .resources
        .remove(resource, 1)
        .map_err(|_| EngineError::InsufficientResources)?;
    state.bank.receive(&ResourceBundle::single(resource, 1));

    if owed == 1 {
        state.discard_remaining.remove(&actor);
        state.discard_queue.retain(|id| *id != actor);
        if state.discard_remaining.is_empty() {
            state.phase = Phase::MoveRobber;
            state.current_player = state.turn_owner;
        } else if state.current_player == actor {
            state.current_player = state
                .discard_queue
                .pop_front()
                .or_else(|| state.discard_remaining.keys().next().copied())
                .expect("remaining map is non-empty");
        }
    } else {
        state.discard_remaining.insert(actor, owed - 1);
    }
    Ok(vec![GameEvent::ResourceDiscarded {
        player: actor,
        resource,
    }])
}

fn move_robber(
    state: &mut GameState,
    actor: PlayerId,
    hex: HexId,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::MoveRobber)?;
    let target = state
        .board
        .hexes
        .get(&hex)
        .ok_or(EngineError::UnknownHex(hex))?;
    if !target.terrain.is_land() {
        return Err(EngineError::UnknownHex(hex));
    }
    if hex == state.board.robber_hex {
        return Err(EngineError::RobberMustMove);
    }
    state.board.move_robber(hex);
    state.phase = if state.steal_candidates(actor).is_empty() {
        Phase::Actions
    } else {
        Phase::Steal
    };
    Ok(vec![GameEvent::RobberMoved { player: actor, hex }])
}

fn steal_resource(
    state: &mut GameState,
    actor: PlayerId,
    victim: PlayerId,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Steal)?;
    if !state.steal_candidates(actor).contains(&victim) {
        return Err(EngineError::InvalidStealTarget(victim));
    }
    let resource = state
        .draw_random_card(victim)
        .expect("candidates hold at least one card");
    state
        .player_mut(actor)
        .resources
        .add(resource, 1);
    state.phase = Phase::Actions;
    Ok(vec![GameEvent::ResourceStolen {
        thief: actor,
        victim,
        resource,
    }])
}

fn maritime_swap(
    state: &mut GameState,
    actor: PlayerId,
    give: Resource,
    receive: Resource,
    ratio: u8,
) -> Result<(ResourceBundle, ResourceBundle), EngineError> {
    let gave = ResourceBundle::single(give, ratio);
    let received = ResourceBundle::single(receive, 1);
    if !state.players[&actor].resources.covers(&gave) {
        return Err(EngineError::InsufficientResources);
    }
    if state.bank.available(receive) == 0 {
        return Err(EngineError::BankShortfall);
    }
    state
        .player_mut(actor)
        .resources
        .remove_bundle(&gave)
        .expect("hand checked above");
    state.bank.receive(&gave);
    state
        .bank
        .dispense(&received)
        .expect("bank stock checked above");
    state.player_mut(actor).resources.add_bundle(&received);
    Ok((gave, received))
}

fn bank_trade(
    state: &mut GameState,
    actor: PlayerId,
    give: Resource,
    receive: Resource,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    if give == receive {
        return Err(EngineError::SelfTrade);
    }
    let (gave, received) = maritime_swap(state, actor, give, receive, BANK_RATIO)?;
    let trade = Trade::settled_maritime(
        TradeKind::Bank,
        actor,
        gave,
        received,
        BANK_RATIO,
        None,
        state.turn,
    );
    Ok(vec![GameEvent::TradeExecuted { trade }])
}

fn port_trade(
    state: &mut GameState,
    actor: PlayerId,
    give: Resource,
    receive: Resource,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    if give == receive {
        return Err(EngineError::SelfTrade);
    }
    let ratio = state.board.trade_ratio(actor, give);
    if ratio >= BANK_RATIO {
        return Err(EngineError::NoPortAccess);
    }
    let (gave, received) = maritime_swap(state, actor, give, receive, ratio)?;
    let port_resource = (ratio == crate::board::SPECIFIC_RATIO).then_some(give);
    let trade = Trade::settled_maritime(
        TradeKind::Port,
        actor,
        gave,
        received,
        ratio,
        port_resource,
        state.turn,
    );
    Ok(vec![GameEvent::TradeExecuted { trade }])
}

fn offer_trade(
    state: &mut GameState,
    actor: PlayerId,
    offer: &ResourceBundle,
    request: &ResourceBundle,
    target: Option<PlayerId>,
    expires_in: Option<u32>,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    let mut events = state.purge_expired_trades();
    if offer.is_empty() || request.is_empty() {
        return Err(EngineError::EmptyTrade);
    }
    if target == Some(actor) {
        return Err(EngineError::SelfTrade);
    }
    if let Some(target) = target {
        if !state.players.contains_key(&target) {
            return Err(EngineError::NoSuchPlayer(target));
        }
    }
    if !state.players[&actor].resources.covers(offer) {
        return Err(EngineError::InsufficientResources);
    }
    let ttl = expires_in.unwrap_or(state.config.trade_ttl_turns);
    let trade = Trade::player_offer(actor, target, *offer, *request, state.turn, ttl);
    debug!(trade = %trade.id, ?target, "trade offered");
    state.trades.push(trade.clone());
    events.push(GameEvent::TradeOpened { trade });
    Ok(events)
}

fn find_pending_trade(state: &mut GameState, id: Uuid) -> Result<Trade, EngineError> {
    let trade = state
        .trades
        .iter()
        .find(|trade| trade.id == id)
        .cloned()
        .ok_or(EngineError::TradeNotFound(id))?;
    if trade.status != TradeStatus::Pending {
        return Err(EngineError::TradeNotFound(id));
    }
    if trade.is_expired(state.turn) {
        state.remove_trade(id);
        return Err(EngineError::TradeExpired(id));
    }
    Ok(trade)
}

fn accept_trade(
    state: &mut GameState,
    actor: PlayerId,
    id: Uuid,
) -> Result<Vec<GameEvent>, EngineError> {
    // Settling an offer mid-discard or mid-steal would mutate hands those
    // phases already counted, so responses wait for the action phase.
    require_phase(state, Phase::Actions)?;
    let trade = find_pending_trade(state, id)?;
    if !trade.addressed_to(actor) {
        return Err(EngineError::TradeNotAddressed(id));
    }
    // Hands may have changed since the offer was made.
    if !state.players[&trade.initiator].resources.covers(&trade.offering)
        || !state.players[&actor].resources.covers(&trade.requesting)
    {
        return Err(EngineError::InsufficientResources);
    }
    state
        .player_mut(trade.initiator)
        .resources
        .remove_bundle(&trade.offering)
        .expect("hand checked above");
    state
        .player_mut(actor)
        .resources
        .remove_bundle(&trade.requesting)
        .expect("hand checked above");
    state
        .player_mut(trade.initiator)
        .resources
        .add_bundle(&trade.requesting);
    state
        .player_mut(actor)
        .resources
        .add_bundle(&trade.offering);
    state.remove_trade(id);
    Ok(vec![GameEvent::TradeAccepted {
        trade_id: id,
        initiator: trade.initiator,
        acceptor: actor,
    }])
}

fn reject_trade(
    state: &mut GameState,
    actor: PlayerId,
    id: Uuid,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    let trade = find_pending_trade(state, id)?;
    if !trade.addressed_to(actor) {
        return Err(EngineError::TradeNotAddressed(id));
    }
    state.remove_trade(id);
    Ok(vec![GameEvent::TradeRejected { trade_id: id }])
}

fn cancel_trade(
    state: &mut GameState,
    actor: PlayerId,
    id: Uuid,
) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    let trade = find_pending_trade(state, id)?;
    if trade.initiator != actor {
        return Err(EngineError::TradeNotAddressed(id));
    }
    state.remove_trade(id);
    Ok(vec![GameEvent::TradeCancelled { trade_id: id }])
}

fn end_turn(state: &mut GameState, actor: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
    require_phase(state, Phase::Actions)?;
    let _ = actor;
    let mut events = state.purge_expired_trades();
    events.push(state.advance_turn());
    Ok(events)
}
