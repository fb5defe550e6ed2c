//! Trade lifecycle: maritime ratios, player offers, acceptance
//! re-validation, and turn-based lazy expiration.

mod common;

use settlers_core::board::Building;
use settlers_core::game::resources::ResourceBundle;
use settlers_core::game::{Action, ActionKind, EngineError, GameEvent, GameFlow};
use settlers_core::types::{BuildingKind, PlayerId, Resource};
use settlers_core::Phase;

use common::{edit_state, new_game};

/// A three-seat table forced straight into the action phase with stocked
/// hands and an empty board, so trades are the only variable.
fn trading_table(seed: u64) -> GameFlow {
    let flow = new_game(3, seed);
    edit_state(flow, |snapshot| {
        snapshot.phase = Phase::Actions;
        snapshot.turn = 1;
        snapshot.current_player = PlayerId(0);
        snapshot.turn_owner = PlayerId(0);
        for player in &mut snapshot.players {
            player.resources.add(Resource::Wood, 4);
            player.resources.add(Resource::Ore, 2);
        }
    })
}

fn opened_trade_id(events: &[GameEvent]) -> uuid::Uuid {
    events
        .iter()
        .find_map(|e| match e {
            GameEvent::TradeOpened { trade } => Some(trade.id),
            _ => None,
        })
        .expect("no TradeOpened event")
}

fn offer(actor: PlayerId, target: Option<PlayerId>) -> Action {
    Action::new(
        actor,
        ActionKind::OfferTrade {
            offer: ResourceBundle::single(Resource::Wood, 2),
            request: ResourceBundle::single(Resource::Ore, 1),
            target,
            expires_in: None,
        },
    )
}

#[test]
fn port_trade_requires_a_reachable_port() {
    let mut flow = trading_table(3);
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(0),
            ActionKind::PortTrade {
                give: Resource::Wood,
                receive: Resource::Ore,
            }
        )),
        Err(EngineError::NoPortAccess)
    ));

    // Settle a generic 3:1 port and retry.
    let port_vertex = flow
        .state()
        .board
        .ports
        .iter()
        .find(|p| p.harbor.resource.is_none())
        .unwrap()
        .vertices[0];
    let mut flow = edit_state(flow, |snapshot| {
        snapshot.buildings.push((
            port_vertex,
            Building {
                kind: BuildingKind::Settlement,
                owner: PlayerId(0),
            },
        ));
    });
    assert_eq!(
        flow.state().board.trade_ratio(PlayerId(0), Resource::Wood),
        3
    );

    let ore_before = flow.state().players[&PlayerId(0)].resources.get(Resource::Ore);
    flow.process_action(&Action::new(
        PlayerId(0),
        ActionKind::PortTrade {
            give: Resource::Wood,
            receive: Resource::Ore,
        },
    ))
    .unwrap();
    let hand = &flow.state().players[&PlayerId(0)].resources;
    assert_eq!(hand.get(Resource::Wood), 1);
    assert_eq!(hand.get(Resource::Ore), ore_before + 1);
}

#[test]
fn specific_port_trades_at_two_to_one() {
    let flow = trading_table(17);
    let port = flow
        .state()
        .board
        .ports
        .iter()
        .find(|p| p.harbor.resource.is_some())
        .unwrap();
    let resource = port.harbor.resource.unwrap();
    let vertex = port.vertices[0];
    let mut flow = edit_state(flow, |snapshot| {
        snapshot.buildings.push((
            vertex,
            Building {
                kind: BuildingKind::Settlement,
                owner: PlayerId(0),
            },
        ));
        snapshot.players[0].resources.add(resource, 2);
    });
    assert_eq!(flow.state().board.trade_ratio(PlayerId(0), resource), 2);

    let receive = Resource::ALL.into_iter().find(|r| *r != resource).unwrap();
    let before = flow.state().players[&PlayerId(0)].resources;
    flow.process_action(&Action::new(
        PlayerId(0),
        ActionKind::PortTrade {
            give: resource,
            receive,
        },
    ))
    .unwrap();
    let after = flow.state().players[&PlayerId(0)].resources;
    assert_eq!(after.get(resource) + 2, before.get(resource));
    assert_eq!(after.get(receive), before.get(receive) + 1);
}

#[test]
fn targeted_offer_transfers_atomically_on_accept() {
    let mut flow = trading_table(5);
    let events = flow
        .process_action(&offer(PlayerId(0), Some(PlayerId(1))))
        .unwrap();
    let trade_id = opened_trade_id(&events);
    assert_eq!(flow.state().active_trades().count(), 1);

    // The wrong responder is turned away.
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(2),
            ActionKind::AcceptTrade { trade: trade_id }
        )),
        Err(EngineError::TradeNotAddressed(_))
    ));

    let events = flow
        .process_action(&Action::new(
            PlayerId(1),
            ActionKind::AcceptTrade { trade: trade_id },
        ))
        .unwrap();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::TradeAccepted { .. }))
    );
    let p0 = &flow.state().players[&PlayerId(0)].resources;
    let p1 = &flow.state().players[&PlayerId(1)].resources;
    assert_eq!(p0.get(Resource::Wood), 2);
    assert_eq!(p0.get(Resource::Ore), 3);
    assert_eq!(p1.get(Resource::Wood), 6);
    assert_eq!(p1.get(Resource::Ore), 1);
    assert_eq!(flow.state().active_trades().count(), 0);
}

#[test]
fn acceptance_revalidates_both_hands() {
    let mut flow = trading_table(6);
    let events = flow.process_action(&offer(PlayerId(0), None)).unwrap();
    let trade_id = opened_trade_id(&events);

    // The initiator spends the offered wood before anyone accepts.
    flow.process_action(&Action::new(
        PlayerId(0),
        ActionKind::BankTrade {
            give: Resource::Wood,
            receive: Resource::Sheep,
        },
    ))
    .unwrap();

    let before = flow.state().players[&PlayerId(1)].resources;
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(1),
            ActionKind::AcceptTrade { trade: trade_id }
        )),
        Err(EngineError::InsufficientResources)
    ));
    assert_eq!(flow.state().players[&PlayerId(1)].resources, before);
}

#[test]
fn reject_and_cancel_are_terminal() {
    let mut flow = trading_table(7);
    let events = flow
        .process_action(&offer(PlayerId(0), Some(PlayerId(1))))
        .unwrap();
    let trade_id = opened_trade_id(&events);

    let events = flow
        .process_action(&Action::new(
            PlayerId(1),
            ActionKind::RejectTrade { trade: trade_id },
        ))
        .unwrap();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::TradeRejected { .. }))
    );
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(1),
            ActionKind::AcceptTrade { trade: trade_id }
        )),
        Err(EngineError::TradeNotFound(_))
    ));

    // Cancellation is the initiator's alone.
    let events = flow.process_action(&offer(PlayerId(0), None)).unwrap();
    let trade_id = opened_trade_id(&events);
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(1),
            ActionKind::CancelTrade { trade: trade_id }
        )),
        Err(EngineError::TradeNotAddressed(_))
    ));
    flow.process_action(&Action::new(
        PlayerId(0),
        ActionKind::CancelTrade { trade: trade_id },
    ))
    .unwrap();
    assert_eq!(flow.state().active_trades().count(), 0);
}

#[test]
fn offers_expire_after_their_ttl_in_turns() {
    let mut flow = trading_table(9);
    let events = flow
        .process_action(&Action::new(
            PlayerId(0),
            ActionKind::OfferTrade {
                offer: ResourceBundle::single(Resource::Wood, 1),
                request: ResourceBundle::single(Resource::Ore, 1),
                target: None,
                expires_in: Some(1),
            },
        ))
        .unwrap();
    let trade_id = opened_trade_id(&events);
    assert_eq!(flow.state().active_trades().count(), 1);

    // One elapsed turn pushes the offer past its expiry.
    flow.process_action(&Action::new(PlayerId(0), ActionKind::EndTurn))
        .unwrap();
    assert_eq!(flow.state().active_trades().count(), 0);
    flow.process_action(&Action::new(
        PlayerId(1),
        ActionKind::RollDice { dice: Some((2, 3)) },
    ))
    .unwrap();
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(2),
            ActionKind::AcceptTrade { trade: trade_id }
        )),
        Err(EngineError::TradeExpired(_))
    ));
}

#[test]
fn responses_wait_for_the_action_phase() {
    let mut flow = trading_table(11);
    let events = flow.process_action(&offer(PlayerId(0), None)).unwrap();
    let trade_id = opened_trade_id(&events);

    // Mid-discard, settling the offer would drain a hand whose owed count
    // was already fixed, wedging the discard cycle.
    let mut flow = edit_state(flow, |snapshot| {
        snapshot.phase = Phase::Discard;
        snapshot.current_player = PlayerId(1);
        snapshot.discard_remaining = vec![(PlayerId(1), 2)];
    });
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(1),
            ActionKind::AcceptTrade { trade: trade_id }
        )),
        Err(EngineError::WrongPhase(Phase::Discard))
    ));
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(1),
            ActionKind::RejectTrade { trade: trade_id }
        )),
        Err(EngineError::WrongPhase(Phase::Discard))
    ));

    // Nor may an acceptance empty a robbery victim's hand mid-steal.
    let mut flow = edit_state(flow, |snapshot| {
        snapshot.phase = Phase::Steal;
        snapshot.current_player = PlayerId(0);
        snapshot.discard_remaining = Vec::new();
    });
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(1),
            ActionKind::AcceptTrade { trade: trade_id }
        )),
        Err(EngineError::WrongPhase(Phase::Steal))
    ));
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(0),
            ActionKind::CancelTrade { trade: trade_id }
        )),
        Err(EngineError::WrongPhase(Phase::Steal))
    ));
    assert_eq!(flow.state().active_trades().count(), 1);
}

#[test]
fn degenerate_offers_are_rejected_up_front() {
    let mut flow = trading_table(10);
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(0),
            ActionKind::OfferTrade {
                offer: ResourceBundle::zero(),
                request: ResourceBundle::single(Resource::Ore, 1),
                target: None,
                expires_in: None,
            }
        )),
        Err(EngineError::EmptyTrade)
    ));
    assert!(matches!(
        flow.process_action(&offer(PlayerId(0), Some(PlayerId(0)))),
        Err(EngineError::SelfTrade)
    ));
    assert!(matches!(
        flow.process_action(&Action::new(
            PlayerId(0),
            ActionKind::BankTrade {
                give: Resource::Wood,
                receive: Resource::Wood,
            }
        )),
        Err(EngineError::SelfTrade)
    ));
}
