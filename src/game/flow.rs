use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::game::action::Action;
use crate::game::error::EngineError;
use crate::game::event::GameEvent;
use crate::game::handler;
use crate::game::state::{GameConfig, GameState};

/// Drives a game from the outside: applies actions through the processor
/// and keeps a bounded history of prior states so the last few actions can
/// be undone in O(1).
#[derive(Debug)]
pub struct GameFlow {
    state: GameState,
    history: VecDeque<GameState>,
    undo_depth: usize,
}

impl GameFlow {
    pub fn new(config: GameConfig) -> Self {
        let undo_depth = config.undo_depth;
        Self {
            state: GameState::new(config),
            history: VecDeque::with_capacity(undo_depth),
            undo_depth,
        }
    }

    pub fn from_state(state: GameState) -> Self {
        let undo_depth = state.config.undo_depth;
        Self {
            state,
            history: VecDeque::with_capacity(undo_depth),
            undo_depth,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Apply one action. The processor works on a clone, so a rejected
    /// action leaves the visible state byte-for-byte unchanged.
    pub fn process_action(&mut self, action: &Action) -> Result<Vec<GameEvent>, EngineError> {
        let mut next = self.state.clone();
        match handler::apply(&mut next, action) {
            Ok(events) => {
                if self.history.len() == self.undo_depth {
                    self.history.pop_front();
                }
                self.history
                    .push_back(std::mem::replace(&mut self.state, next));
                debug!(actor = %action.actor, events = events.len(), "action applied");
                Ok(events)
            }
            Err(error) => {
                warn!(actor = %action.actor, %error, "action rejected");
                Err(error)
            }
        }
    }

    /// Roll back the most recent applied action.
    pub fn undo(&mut self) -> Result<(), EngineError> {
        let previous = self.history.pop_back().ok_or(EngineError::NothingToUndo)?;
        self.state = previous;
        Ok(())
    }

    pub fn undo_available(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::action::ActionKind;
    use crate::types::PlayerId;

    #[test]
    fn rejected_actions_leave_no_history() {
        let mut flow = GameFlow::new(GameConfig::default());
        // Rolling during setup is out of phase.
        let action = Action::new(flow.state().current_player, ActionKind::RollDice { dice: None });
        assert!(flow.process_action(&action).is_err());
        assert_eq!(flow.undo_available(), 0);
        assert!(matches!(flow.undo(), Err(EngineError::NothingToUndo)));
    }

    #[test]
    fn history_is_bounded() {
        let config = GameConfig {
            undo_depth: 2,
            ..GameConfig::default()
        };
        let mut flow = GameFlow::new(config);
        let mut applied = 0;
        // Walk a few setup placements to generate history entries.
        while applied < 5 {
            let player = flow.state().current_player;
            let action = if flow.state().setup.expects_road() {
                let anchor = flow.state().setup.road_anchor().unwrap();
                let edge = flow
                    .state()
                    .board
                    .vertex_edges(anchor)
                    .iter()
                    .copied()
                    .find(|id| {
                        let edge = flow.state().board.edge(*id).unwrap();
                        edge.buildable && edge.road.is_none()
                    })
                    .unwrap();
                Action::new(player, ActionKind::BuildRoad { edge })
            } else {
                let vertex = flow
                    .state()
                    .board
                    .buildable_vertices()
                    .find(|v| {
                        flow.state().board.building_at(v.id).is_none()
                            && flow
                                .state()
                                .board
                                .vertex_neighbors(v.id)
                                .iter()
                                .all(|n| flow.state().board.building_at(*n).is_none())
                    })
                    .map(|v| v.id)
                    .unwrap();
                Action::new(player, ActionKind::BuildSettlement { vertex })
            };
            flow.process_action(&action).unwrap();
            applied += 1;
        }
        assert_eq!(flow.undo_available(), 2);
    }

    #[test]
    fn undo_restores_the_previous_state() {
        let mut flow = GameFlow::new(GameConfig::default());
        let player = flow.state().current_player;
        let vertex = flow.state().board.buildable_vertices().next().unwrap().id;
        flow.process_action(&Action::new(player, ActionKind::BuildSettlement { vertex }))
            .unwrap();
        assert!(flow.state().board.building_at(vertex).is_some());
        flow.undo().unwrap();
        assert!(flow.state().board.building_at(vertex).is_none());
        assert_eq!(flow.undo_available(), 0);
    }

    #[test]
    fn unknown_player_is_rejected() {
        let mut flow = GameFlow::new(GameConfig::default());
        let action = Action::new(PlayerId(9), ActionKind::EndTurn);
        assert!(matches!(
            flow.process_action(&action),
            Err(EngineError::NoSuchPlayer(PlayerId(9)))
        ));
    }
}
