//! Board topology: hex grid generation, derived vertices/edges, ports and
//! the robber. Vertices and edges are never stored as object references;
//! everything is an id into the lookup tables built once at generation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::coords::{self, Direction, HexCoord, sort_corner};
use crate::types::{BuildingKind, EdgeId, HexId, PlayerId, Resource, Terrain, VertexId};

/// Ring index of the outermost land hexes.
pub const LAND_RADIUS: i32 = 2;
/// Ring index of the sea ring that carries the ports.
pub const BOARD_RADIUS: i32 = 3;

pub const GENERIC_RATIO: u8 = 3;
pub const SPECIFIC_RATIO: u8 = 2;
pub const BANK_RATIO: u8 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hex {
    pub id: HexId,
    pub coord: HexCoord,
    pub terrain: Terrain,
    pub token: Option<u8>,
    pub has_robber: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub owner: PlayerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    pub owner: PlayerId,
}

/// Trade ratio granted by a port. `resource: None` is the generic 3:1 port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harbor {
    pub ratio: u8,
    pub resource: Option<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    /// Board hexes meeting at this corner, 2 or 3 of them.
    pub hexes: SmallVec<[HexId; 3]>,
    pub building: Option<Building>,
    pub port: Option<Harbor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// The two adjacent hexes this edge separates.
    pub hexes: (HexId, HexId),
    pub vertices: (VertexId, VertexId),
    pub road: Option<Road>,
    /// Roads may only sit on edges bordering at least one land hex.
    pub buildable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: u8,
    pub harbor: Harbor,
    pub vertices: [VertexId; 2],
}

/// The nine coastal port slots of the standard board: a sea hex on the
/// outer ring plus the direction of the land edge the port sits on.
static PORT_SLOTS: Lazy<[(HexCoord, Direction); 9]> = Lazy::new(|| {
    use Direction::*;
    [
        (HexCoord::new(3, -3, 0), West),
        (HexCoord::new(1, -3, 2), NorthWest),
        (HexCoord::new(-1, -2, 3), NorthWest),
        (HexCoord::new(-3, 0, 3), NorthEast),
        (HexCoord::new(-3, 2, 1), East),
        (HexCoord::new(-2, 3, -1), East),
        (HexCoord::new(0, 3, -3), SouthEast),
        (HexCoord::new(2, 1, -3), SouthWest),
        (HexCoord::new(3, -1, -2), SouthWest),
    ]
});

fn standard_terrains() -> Vec<Terrain> {
    use Terrain::*;
    let mut terrains = Vec::with_capacity(19);
    terrains.extend([Forest; 4]);
    terrains.extend([Pasture; 4]);
    terrains.extend([Fields; 4]);
    terrains.extend([Hills; 3]);
    terrains.extend([Mountains; 3]);
    terrains.push(Desert);
    terrains
}

const STANDARD_TOKENS: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

fn standard_harbors() -> Vec<Option<Resource>> {
    let mut harbors: Vec<Option<Resource>> = Resource::ALL.iter().copied().map(Some).collect();
    harbors.extend([None; 4]);
    harbors
}

static DICE_PROBABILITIES: Lazy<HashMap<u8, f32>> = Lazy::new(|| {
    let mut probas: HashMap<u8, f32> = HashMap::new();
    for i in 1..=6u8 {
        for j in 1..=6u8 {
            *probas.entry(i + j).or_insert(0.0) += 1.0 / 36.0;
        }
    }
    probas
});

#[derive(Debug, Clone)]
pub struct Board {
    pub hexes: BTreeMap<HexId, Hex>,
    pub vertices: BTreeMap<VertexId, Vertex>,
    pub edges: BTreeMap<EdgeId, Edge>,
    pub ports: Vec<Port>,
    pub robber_hex: HexId,
    hex_by_coord: HashMap<HexCoord, HexId>,
    hex_vertices: HashMap<HexId, SmallVec<[VertexId; 6]>>,
    vertex_edges: HashMap<VertexId, SmallVec<[EdgeId; 3]>>,
    vertex_neighbors: HashMap<VertexId, SmallVec<[VertexId; 3]>>,
}

impl Board {
    /// Generate a fresh standard board: terrain, number tokens and port
    /// resources shuffled with the supplied RNG, robber on the desert.
    pub fn generate(rng: &mut impl rand::Rng) -> Self {
        let mut terrains = standard_terrains();
        terrains.shuffle(rng);
        let mut tokens = STANDARD_TOKENS.to_vec();
        tokens.shuffle(rng);
        let mut harbors = standard_harbors();
        harbors.shuffle(rng);
        Self::from_layout(&terrains, &tokens, &harbors)
    }

    /// Build a board from explicit layout vectors. Terrains are assigned to
    /// the 19 land coordinates in sorted order, tokens to non-desert hexes
    /// in that same order. Panics if the multisets do not fit the board;
    /// that is a construction defect, not a recoverable condition.
    pub fn from_layout(
        terrains: &[Terrain],
        tokens: &[u8],
        harbors: &[Option<Resource>],
    ) -> Self {
        let land_coords = coords::coords_within(LAND_RADIUS);
        let sea_coords = coords::ring(BOARD_RADIUS);
        assert_eq!(terrains.len(), land_coords.len(), "terrain multiset mismatch");

        let mut hexes = Vec::with_capacity(land_coords.len() + sea_coords.len());
        let mut token_iter = tokens.iter().copied();
        for (coord, terrain) in land_coords.iter().copied().zip(terrains.iter().copied()) {
            assert!(terrain.is_land(), "sea terrain inside the land radius");
            let token = if terrain.produces() {
                Some(token_iter.next().expect("ran out of number tokens"))
            } else {
                None
            };
            hexes.push(Hex {
                id: HexId(hexes.len() as u16),
                coord,
                terrain,
                token,
                has_robber: terrain == Terrain::Desert,
            });
        }
        assert!(token_iter.next().is_none(), "number tokens left over");
        for coord in sea_coords {
            hexes.push(Hex {
                id: HexId(hexes.len() as u16),
                coord,
                terrain: Terrain::Sea,
                token: None,
                has_robber: false,
            });
        }

        let desert = hexes
            .iter()
            .find(|hex| hex.terrain == Terrain::Desert)
            .expect("board has no desert hex");
        assert!(desert.token.is_none(), "desert hex carries a number token");
        let robber_hex = desert.id;

        Self::from_hexes(hexes, harbors, robber_hex)
    }

    /// Derive vertices, edges, ports and every adjacency table from the hex
    /// list. Also the reconstruction path for deserialized snapshots.
    pub fn from_hexes(hexes: Vec<Hex>, harbors: &[Option<Resource>], robber_hex: HexId) -> Self {
        let hex_by_coord: HashMap<HexCoord, HexId> =
            hexes.iter().map(|hex| (hex.coord, hex.id)).collect();
        let hexes: BTreeMap<HexId, Hex> = hexes.into_iter().map(|hex| (hex.id, hex)).collect();

        // A corner becomes a vertex when at least two board hexes meet there.
        let corner_keys: Vec<[HexCoord; 3]> = hexes
            .values()
            .flat_map(|hex| hex.coord.corners())
            .filter(|corner| {
                corner
                    .iter()
                    .filter(|c| hex_by_coord.contains_key(c))
                    .count()
                    >= 2
            })
            .unique()
            .sorted()
            .collect();
        let vertex_by_corner: HashMap<[HexCoord; 3], VertexId> = corner_keys
            .iter()
            .enumerate()
            .map(|(idx, key)| (*key, VertexId(idx as u16)))
            .collect();

        let mut vertices: BTreeMap<VertexId, Vertex> = corner_keys
            .iter()
            .map(|key| {
                let id = vertex_by_corner[key];
                let touching: SmallVec<[HexId; 3]> = key
                    .iter()
                    .filter_map(|coord| hex_by_coord.get(coord).copied())
                    .collect();
                (
                    id,
                    Vertex {
                        id,
                        hexes: touching,
                        building: None,
                        port: None,
                    },
                )
            })
            .collect();

        // Edges: every unordered pair of adjacent board hexes.
        let pair_keys: BTreeSet<(HexCoord, HexCoord)> = hexes
            .values()
            .flat_map(|hex| {
                let coord = hex.coord;
                coord
                    .neighbors()
                    .filter(|n| hex_by_coord.contains_key(n))
                    .map(move |n| if coord < n { (coord, n) } else { (n, coord) })
            })
            .collect();

        let mut edges: BTreeMap<EdgeId, Edge> = BTreeMap::new();
        let mut edge_by_pair: HashMap<(HexCoord, HexCoord), EdgeId> = HashMap::new();
        for (idx, (a, b)) in pair_keys.iter().copied().enumerate() {
            let id = EdgeId(idx as u16);
            let endpoints: Vec<VertexId> = a
                .corners()
                .filter(|corner| corner.contains(&b))
                .filter_map(|corner| vertex_by_corner.get(&sort_corner(corner)).copied())
                .sorted()
                .collect();
            assert_eq!(endpoints.len(), 2, "edge without two endpoint vertices");
            let hex_a = hex_by_coord[&a];
            let hex_b = hex_by_coord[&b];
            let buildable =
                hexes[&hex_a].terrain.is_land() || hexes[&hex_b].terrain.is_land();
            edges.insert(
                id,
                Edge {
                    id,
                    hexes: (hex_a, hex_b),
                    vertices: (endpoints[0], endpoints[1]),
                    road: None,
                    buildable,
                },
            );
            edge_by_pair.insert((a, b), id);
        }

        let mut vertex_edges: HashMap<VertexId, SmallVec<[EdgeId; 3]>> = HashMap::new();
        let mut vertex_neighbors: HashMap<VertexId, SmallVec<[VertexId; 3]>> = HashMap::new();
        for edge in edges.values() {
            let (a, b) = edge.vertices;
            vertex_edges.entry(a).or_default().push(edge.id);
            vertex_edges.entry(b).or_default().push(edge.id);
            vertex_neighbors.entry(a).or_default().push(b);
            vertex_neighbors.entry(b).or_default().push(a);
        }

        let mut hex_vertices: HashMap<HexId, SmallVec<[VertexId; 6]>> = HashMap::new();
        for vertex in vertices.values() {
            for hex in &vertex.hexes {
                hex_vertices.entry(*hex).or_default().push(vertex.id);
            }
        }

        assert_eq!(harbors.len(), PORT_SLOTS.len(), "port multiset mismatch");
        let mut ports = Vec::with_capacity(PORT_SLOTS.len());
        for (idx, ((sea, direction), resource)) in
            PORT_SLOTS.iter().zip(harbors.iter().copied()).enumerate()
        {
            let land = sea.neighbor(*direction);
            let pair = if *sea < land { (*sea, land) } else { (land, *sea) };
            let edge_id = edge_by_pair
                .get(&pair)
                .copied()
                .expect("port slot does not map to a board edge");
            let (va, vb) = edges[&edge_id].vertices;
            let harbor = Harbor {
                ratio: if resource.is_some() {
                    SPECIFIC_RATIO
                } else {
                    GENERIC_RATIO
                },
                resource,
            };
            for v in [va, vb] {
                vertices
                    .get_mut(&v)
                    .expect("port vertex missing")
                    .port = Some(harbor);
            }
            ports.push(Port {
                id: idx as u8,
                harbor,
                vertices: [va, vb],
            });
        }

        assert!(hexes.contains_key(&robber_hex), "robber on unknown hex");

        Self {
            hexes,
            vertices,
            edges,
            ports,
            robber_hex,
            hex_by_coord,
            hex_vertices,
            vertex_edges,
            vertex_neighbors,
        }
    }

    pub fn hex(&self, id: HexId) -> &Hex {
        self.hexes.get(&id).expect("dangling hex id")
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn hex_at(&self, coord: HexCoord) -> Option<HexId> {
        self.hex_by_coord.get(&coord).copied()
    }

    pub fn land_hexes(&self) -> impl Iterator<Item = &Hex> {
        self.hexes.values().filter(|hex| hex.terrain.is_land())
    }

    /// Vertices a settlement may legally exist on: corners touching land.
    pub fn buildable_vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values().filter(|vertex| {
            vertex
                .hexes
                .iter()
                .any(|hex| self.hex(*hex).terrain.is_land())
        })
    }

    pub fn vertex_neighbors(&self, id: VertexId) -> &[VertexId] {
        self.vertex_neighbors
            .get(&id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn vertex_edges(&self, id: VertexId) -> &[EdgeId] {
        self.vertex_edges
            .get(&id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn hex_vertices(&self, id: HexId) -> &[VertexId] {
        self.hex_vertices
            .get(&id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Expected production of a vertex per roll, weighted by dice odds.
    /// Consumers (AI, UIs) use this to rank placements; the engine itself
    /// does not.
    pub fn vertex_yield(&self, id: VertexId) -> BTreeMap<Resource, f32> {
        let mut yields = BTreeMap::new();
        let Some(vertex) = self.vertices.get(&id) else {
            return yields;
        };
        for hex_id in &vertex.hexes {
            let hex = self.hex(*hex_id);
            if let (Some(resource), Some(token)) = (hex.terrain.resource(), hex.token) {
                *yields.entry(resource).or_default() +=
                    DICE_PROBABILITIES.get(&token).copied().unwrap_or(0.0);
            }
        }
        yields
    }

    pub fn building_at(&self, id: VertexId) -> Option<Building> {
        self.vertices.get(&id).and_then(|v| v.building)
    }

    pub fn road_at(&self, id: EdgeId) -> Option<Road> {
        self.edges.get(&id).and_then(|e| e.road)
    }

    pub fn roads_of(&self, owner: PlayerId) -> Vec<EdgeId> {
        self.edges
            .values()
            .filter(|edge| edge.road.map(|r| r.owner) == Some(owner))
            .map(|edge| edge.id)
            .collect()
    }

    pub fn buildings_of(&self, owner: PlayerId) -> Vec<(VertexId, BuildingKind)> {
        self.vertices
            .values()
            .filter_map(|vertex| {
                vertex
                    .building
                    .filter(|b| b.owner == owner)
                    .map(|b| (vertex.id, b.kind))
            })
            .collect()
    }

    /// Best maritime ratio the player can trade `resource` at: 2 with a
    /// matching specific port, 3 with a generic port, 4 against the bank.
    pub fn trade_ratio(&self, owner: PlayerId, resource: Resource) -> u8 {
        let mut best = BANK_RATIO;
        for port in &self.ports {
            let reachable = port.vertices.iter().any(|v| {
                self.building_at(*v)
                    .map(|b| b.owner == owner)
                    .unwrap_or(false)
            });
            if !reachable {
                continue;
            }
            match port.harbor.resource {
                Some(r) if r == resource => best = best.min(SPECIFIC_RATIO),
                None => best = best.min(GENERIC_RATIO),
                _ => {}
            }
        }
        best
    }

    pub fn has_port_access(&self, owner: PlayerId) -> bool {
        self.ports.iter().any(|port| {
            port.vertices.iter().any(|v| {
                self.building_at(*v)
                    .map(|b| b.owner == owner)
                    .unwrap_or(false)
            })
        })
    }

    /// Low-level occupancy mutators. Legality is the action processor's
    /// job; these assert the structural invariants and nothing else.
    pub(crate) fn put_building(&mut self, id: VertexId, building: Building) {
        let vertex = self.vertices.get_mut(&id).expect("dangling vertex id");
        match (vertex.building, building.kind) {
            (None, BuildingKind::Settlement) => {}
            (Some(prev), BuildingKind::City) => {
                assert_eq!(prev.owner, building.owner, "city over foreign settlement");
                assert_eq!(prev.kind, BuildingKind::Settlement, "city over city");
            }
            _ => panic!("building placement violates occupancy invariant"),
        }
        vertex.building = Some(building);
    }

    /// Snapshot restoration: occupancy is written back verbatim, cities
    /// included, onto a freshly derived empty board.
    pub(crate) fn restore_building(&mut self, id: VertexId, building: Building) {
        let vertex = self.vertices.get_mut(&id).expect("dangling vertex id");
        assert!(vertex.building.is_none(), "duplicate building record");
        vertex.building = Some(building);
    }

    pub(crate) fn put_road(&mut self, id: EdgeId, road: Road) {
        let edge = self.edges.get_mut(&id).expect("dangling edge id");
        assert!(edge.road.is_none(), "road over road");
        assert!(edge.buildable, "road on open sea");
        edge.road = Some(road);
    }

    pub(crate) fn move_robber(&mut self, to: HexId) {
        assert!(
            self.hex(to).terrain.is_land(),
            "robber may only sit on land"
        );
        let from = self.robber_hex;
        if let Some(hex) = self.hexes.get_mut(&from) {
            hex.has_robber = false;
        }
        self.hexes
            .get_mut(&to)
            .expect("dangling hex id")
            .has_robber = true;
        self.robber_hex = to;
    }
}
