//! Topology invariants checked against freshly generated boards.

mod common;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use settlers_core::board::{Board, BANK_RATIO};
use settlers_core::types::{PlayerId, Resource, Terrain};

fn board(seed: u64) -> Board {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Board::generate(&mut rng)
}

#[test]
fn generation_is_deterministic_per_seed() {
    let a = board(42);
    let b = board(42);
    let c = board(43);

    let fingerprint = |board: &Board| {
        let hexes: Vec<_> = board
            .hexes
            .values()
            .map(|h| (h.coord, h.terrain, h.token))
            .collect();
        let ports: Vec<_> = board.ports.iter().map(|p| p.harbor).collect();
        (hexes, ports, board.robber_hex)
    };
    assert_eq!(fingerprint(&a), fingerprint(&b));
    assert_ne!(fingerprint(&a), fingerprint(&c));
}

#[test]
fn every_land_hex_has_six_vertices() {
    let board = board(1);
    for hex in board.land_hexes() {
        assert_eq!(board.hex_vertices(hex.id).len(), 6, "hex {}", hex.id);
    }
}

#[test]
fn buildable_vertices_and_edges_match_the_standard_board() {
    let board = board(2);
    assert_eq!(board.buildable_vertices().count(), 54);
    assert_eq!(board.edges.values().filter(|e| e.buildable).count(), 72);
    // Every buildable edge borders land and both endpoints are on board.
    for edge in board.edges.values().filter(|e| e.buildable) {
        assert!(
            board.hex(edge.hexes.0).terrain.is_land()
                || board.hex(edge.hexes.1).terrain.is_land()
        );
        assert!(board.vertex(edge.vertices.0).is_some());
        assert!(board.vertex(edge.vertices.1).is_some());
    }
}

#[test]
fn buildable_vertices_touch_three_hexes_and_three_edges() {
    let board = board(3);
    for vertex in board.buildable_vertices() {
        assert_eq!(vertex.hexes.len(), 3, "vertex {}", vertex.id);
        assert_eq!(board.vertex_edges(vertex.id).len(), 3);
        assert_eq!(board.vertex_neighbors(vertex.id).len(), 3);
    }
}

#[test]
fn explicit_layout_places_tokens_in_order_and_skips_the_desert() {
    use Terrain::*;
    let terrains = vec![
        Forest, Forest, Forest, Forest, Pasture, Pasture, Pasture, Pasture, Fields, Desert,
        Fields, Fields, Fields, Hills, Hills, Hills, Mountains, Mountains, Mountains,
    ];
    let tokens: Vec<u8> = vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];
    let harbors = vec![
        Some(Resource::Wood),
        Some(Resource::Brick),
        Some(Resource::Sheep),
        Some(Resource::Wheat),
        Some(Resource::Ore),
        None,
        None,
        None,
        None,
    ];

    let board = Board::from_layout(&terrains, &tokens, &harbors);
    let mut seen_tokens = Vec::new();
    for hex in board.land_hexes() {
        if hex.terrain == Terrain::Desert {
            assert!(hex.token.is_none());
            assert!(hex.has_robber);
            assert_eq!(board.robber_hex, hex.id);
        } else {
            seen_tokens.push(hex.token.unwrap());
        }
    }
    // Land hexes iterate in id order, which follows sorted-coordinate order.
    assert_eq!(seen_tokens, tokens);
}

#[test]
fn trade_ratio_defaults_to_the_bank_without_buildings() {
    let board = board(4);
    for resource in Resource::ALL {
        assert_eq!(board.trade_ratio(PlayerId(0), resource), BANK_RATIO);
    }
}

#[test]
fn vertex_yields_follow_the_dice_odds() {
    let board = board(5);
    for vertex in board.buildable_vertices() {
        let yields = board.vertex_yield(vertex.id);
        let total: f32 = yields.values().sum();
        // At most three producing hexes at 5/36 each.
        assert!(total >= 0.0 && total <= 3.0 * 5.0 / 36.0 + f32::EPSILON);
    }
}
