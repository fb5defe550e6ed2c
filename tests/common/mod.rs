//! Shared helpers for the integration tests: deterministic game creation,
//! scripted setup completion, and snapshot-based state surgery.

#![allow(dead_code)]

use settlers_core::game::{Action, ActionKind, GameConfig, GameFlow};
use settlers_core::snapshot::GameSnapshot;
use settlers_core::types::{PlayerId, Resource, VertexId};
use settlers_core::{GameState, Phase};

pub fn new_game(num_players: usize, seed: u64) -> GameFlow {
    GameFlow::new(GameConfig {
        num_players,
        seed,
        ..GameConfig::default()
    })
}

/// Drive the setup rounds to completion by always taking the first legal
/// placement. Panics if the engine rejects its own enumeration.
pub fn complete_setup(flow: &mut GameFlow) {
    while flow.state().phase.is_setup() {
        let action = flow.state().legal_actions().into_iter().next().unwrap();
        flow.process_action(&action).unwrap();
    }
    assert_eq!(flow.state().phase, Phase::Roll);
}

/// Complete setup placing each settlement on a vertex accepted by `pick`.
pub fn complete_setup_with(flow: &mut GameFlow, mut pick: impl FnMut(&GameState) -> VertexId) {
    while flow.state().phase.is_setup() {
        let player = flow.state().current_player;
        let action = if flow.state().setup.expects_road() {
            flow.state().legal_actions().into_iter().next().unwrap()
        } else {
            Action::new(
                player,
                ActionKind::BuildSettlement {
                    vertex: pick(flow.state()),
                },
            )
        };
        flow.process_action(&action).unwrap();
    }
}

/// Rebuild the flow after mutating its snapshot, the only sanctioned way
/// for tests to inject hands, cards, or board occupancy.
pub fn edit_state(flow: GameFlow, edit: impl FnOnce(&mut GameSnapshot)) -> GameFlow {
    let mut snapshot = GameSnapshot::capture(flow.state());
    edit(&mut snapshot);
    GameFlow::from_state(snapshot.restore())
}

pub fn give(flow: GameFlow, player: PlayerId, resource: Resource, amount: u8) -> GameFlow {
    edit_state(flow, |snapshot| {
        let entry = snapshot
            .players
            .iter_mut()
            .find(|p| p.id == player)
            .unwrap();
        entry.resources.add(resource, amount);
    })
}

/// Total cards of one type across every hand plus the bank.
pub fn circulating(state: &GameState, resource: Resource) -> u32 {
    let held: u32 = state
        .players
        .values()
        .map(|p| p.resources.get(resource) as u32)
        .sum();
    held + state.bank.available(resource) as u32
}
