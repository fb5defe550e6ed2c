use serde::{Deserialize, Serialize};

use crate::types::{PlayerId, VertexId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupRound {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SetupStep {
    player: PlayerId,
    round: SetupRound,
}

/// Sub-state-machine for the initial placement sequence: round one in seat
/// order, round two in exact reverse. Each step is a settlement followed
/// by a road incident to it; the cursor only advances once both are down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupTracker {
    steps: Vec<SetupStep>,
    cursor: usize,
    /// Set once the step's settlement is placed; the road must attach here.
    pending_road_anchor: Option<VertexId>,
}

impl SetupTracker {
    pub fn new(order: &[PlayerId]) -> Self {
        let mut steps = Vec::with_capacity(order.len() * 2);
        for player in order {
            steps.push(SetupStep {
                player: *player,
                round: SetupRound::First,
            });
        }
        for player in order.iter().rev() {
            steps.push(SetupStep {
                player: *player,
                round: SetupRound::Second,
            });
        }
        Self {
            steps,
            cursor: 0,
            pending_road_anchor: None,
        }
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.steps.get(self.cursor).map(|step| step.player)
    }

    pub fn current_round(&self) -> Option<SetupRound> {
        self.steps.get(self.cursor).map(|step| step.round)
    }

    /// `Some(vertex)` when the settlement is down and a road is owed.
    pub fn road_anchor(&self) -> Option<VertexId> {
        self.pending_road_anchor
    }

    pub fn expects_road(&self) -> bool {
        self.pending_road_anchor.is_some()
    }

    /// Round-two settlements collect the yield of their adjacent hexes.
    pub fn grants_starting_resources(&self) -> bool {
        self.current_round() == Some(SetupRound::Second)
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    pub(crate) fn record_settlement(&mut self, vertex: VertexId) {
        assert!(
            self.pending_road_anchor.is_none(),
            "settlement recorded while a road is owed"
        );
        self.pending_road_anchor = Some(vertex);
    }

    pub(crate) fn record_road(&mut self) {
        assert!(
            self.pending_road_anchor.is_some(),
            "road recorded before its settlement"
        );
        self.pending_road_anchor = None;
        self.cursor += 1;
    }
}
