use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::board::Board;
use crate::types::{EdgeId, PlayerId, VertexId};

/// Main phase machine:
/// `Setup1 -> Setup2 -> Roll -> Actions -> {Discard | MoveRobber | Steal}
/// -> Actions -> ... -> Ended`. A seven routes through `Discard` (once per
/// over-limit player) and `MoveRobber`, optionally `Steal`, before play
/// resumes; victory can end the game after any mutating action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Setup1,
    Setup2,
    Roll,
    Actions,
    Discard,
    MoveRobber,
    Steal,
    Ended,
}

impl Phase {
    pub fn is_setup(self) -> bool {
        matches!(self, Phase::Setup1 | Phase::Setup2)
    }
}

/// Minimum path length before the longest-road bonus can be claimed.
pub const LONGEST_ROAD_MIN: u8 = 5;
/// Minimum played knights before the largest-army bonus can be claimed.
pub const LARGEST_ARMY_MIN: u8 = 3;

/// Length of the player's longest simple road path. Paths may end at an
/// opponent's building but never continue through one.
pub fn longest_road_length(board: &Board, player: PlayerId) -> u8 {
    let roads: HashSet<EdgeId> = board.roads_of(player).into_iter().collect();
    if roads.is_empty() {
        return 0;
    }
    let mut best = 0u8;
    let mut visited: HashSet<EdgeId> = HashSet::new();
    for edge_id in &roads {
        let edge = board.edge(*edge_id).expect("road on unknown edge");
        for start in [edge.vertices.0, edge.vertices.1] {
            best = best.max(extend_path(board, player, start, &roads, &mut visited));
            debug_assert!(visited.is_empty());
        }
    }
    best
}

fn extend_path(
    board: &Board,
    player: PlayerId,
    at: VertexId,
    roads: &HashSet<EdgeId>,
    visited: &mut HashSet<EdgeId>,
) -> u8 {
    let mut best = 0u8;
    for edge_id in board.vertex_edges(at) {
        if !roads.contains(edge_id) || visited.contains(edge_id) {
            continue;
        }
        let edge = board.edge(*edge_id).expect("road on unknown edge");
        let next = if edge.vertices.0 == at {
            edge.vertices.1
        } else {
            edge.vertices.0
        };
        visited.insert(*edge_id);
        let severed = board
            .building_at(next)
            .map(|b| b.owner != player)
            .unwrap_or(false);
        let depth = if severed {
            1
        } else {
            1 + extend_path(board, player, next, roads, visited)
        };
        visited.remove(edge_id);
        best = best.max(depth);
    }
    best
}

/// Strict-maximum award with sticky ties: the incumbent keeps the flag on
/// a tie, and a tie with no incumbent awards nobody.
pub fn award_with_sticky_ties(
    scores: &[(PlayerId, u8)],
    minimum: u8,
    incumbent: Option<PlayerId>,
) -> Option<PlayerId> {
    let mut best: Option<(PlayerId, u8)> = None;
    let mut tied = false;
    for (player, score) in scores.iter().copied() {
        if score < minimum {
            continue;
        }
        match best {
            None => best = Some((player, score)),
            Some((_, top)) if score > top => {
                best = Some((player, score));
                tied = false;
            }
            Some((_, top)) if score == top => tied = true,
            _ => {}
        }
    }
    match best {
        Some((leader, _)) if !tied => Some(leader),
        Some((_, top)) => {
            // On a tie the incumbent keeps the flag only while still at the top.
            incumbent.filter(|holder| {
                scores
                    .iter()
                    .any(|(p, s)| p == holder && *s == top)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_tie_keeps_incumbent() {
        let scores = [(PlayerId(0), 5), (PlayerId(1), 5)];
        assert_eq!(
            award_with_sticky_ties(&scores, 5, Some(PlayerId(1))),
            Some(PlayerId(1))
        );
        assert_eq!(award_with_sticky_ties(&scores, 5, None), None);
    }

    #[test]
    fn strict_maximum_wins() {
        let scores = [(PlayerId(0), 6), (PlayerId(1), 5)];
        assert_eq!(
            award_with_sticky_ties(&scores, 5, Some(PlayerId(1))),
            Some(PlayerId(0))
        );
    }

    #[test]
    fn below_minimum_awards_nobody() {
        let scores = [(PlayerId(0), 4), (PlayerId(1), 2)];
        assert_eq!(award_with_sticky_ties(&scores, 5, None), None);
    }
}
