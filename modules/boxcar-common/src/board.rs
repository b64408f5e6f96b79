//! The fixed board catalog: mileposts, terrain costs, named cities, major-city
//! groups, and ferry crossings. Loaded once at process start; every consumer
//! reads the same immutable `BOARD`.
//!
//! The grid is an odd-r offset hex lattice (odd rows shifted east), the usual
//! crayon-rails milepost arrangement. Water carries no milepost; ferries bridge
//! the gaps.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Fixed per-turn cap on track-construction spend, in millions. Distinct from
/// total money on hand.
pub const BUILD_BUDGET_PER_TURN: i64 = 20;

/// Movement points to ride a ferry crossing.
pub const FERRY_MOVE_COST: u32 = 2;

// --- Coordinates ---

/// One addressable milepost coordinate. `Ord` so BTree containers iterate
/// board positions in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub col: i32,
    pub row: i32,
}

impl GridCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The six offset-hex neighbor coordinates (unclipped).
    pub fn neighbors(self) -> [GridCoord; 6] {
        let (c, r) = (self.col, self.row);
        if r % 2 == 0 {
            [
                GridCoord::new(c + 1, r),
                GridCoord::new(c - 1, r),
                GridCoord::new(c, r - 1),
                GridCoord::new(c - 1, r - 1),
                GridCoord::new(c, r + 1),
                GridCoord::new(c - 1, r + 1),
            ]
        } else {
            [
                GridCoord::new(c + 1, r),
                GridCoord::new(c - 1, r),
                GridCoord::new(c + 1, r - 1),
                GridCoord::new(c, r - 1),
                GridCoord::new(c + 1, r + 1),
                GridCoord::new(c, r + 1),
            ]
        }
    }

    /// Hex distance in mileposts.
    pub fn distance(self, other: GridCoord) -> u32 {
        let (aq, ar) = self.axial();
        let (bq, br) = other.axial();
        let (dq, dr) = (aq - bq, ar - br);
        ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
    }

    fn axial(self) -> (i32, i32) {
        let q = self.col - (self.row - (self.row & 1)) / 2;
        (q, self.row)
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

// --- Terrain ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Clear,
    Forest,
    Mountain,
    Alpine,
    SmallCity,
    MediumCity,
    MajorCity,
    FerryPort,
}

impl Terrain {
    /// Cost in millions to build track into a milepost of this terrain.
    pub fn build_cost(self) -> i64 {
        match self {
            Terrain::Clear => 1,
            Terrain::Forest => 2,
            Terrain::Mountain => 2,
            Terrain::Alpine => 5,
            Terrain::SmallCity => 3,
            Terrain::MediumCity => 3,
            Terrain::MajorCity => 5,
            Terrain::FerryPort => 4,
        }
    }

    /// Movement points to enter a milepost of this terrain.
    pub fn movement_cost(self) -> u32 {
        match self {
            Terrain::Mountain => 2,
            Terrain::Alpine => 3,
            _ => 1,
        }
    }
}

// --- Board structure ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milepost {
    pub coord: GridCoord,
    pub terrain: Terrain,
    /// The named city this milepost belongs to, if any. Every milepost of a
    /// major city group carries the group name.
    pub city: Option<String>,
}

/// A named major city: a center milepost plus its ring of outposts, all
/// mutually reachable without dedicated track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorCityGroup {
    pub name: String,
    pub center: GridCoord,
    pub outposts: Vec<GridCoord>,
}

/// A ferry crossing between two ports. Riding it costs [`FERRY_MOVE_COST`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FerryCrossing {
    pub name: String,
    pub a: GridCoord,
    pub b: GridCoord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityEntry {
    pub name: String,
    pub class: Terrain,
    pub mileposts: Vec<GridCoord>,
}

#[derive(Debug, Clone)]
pub struct Board {
    mileposts: BTreeMap<GridCoord, Milepost>,
    cities: BTreeMap<String, CityEntry>,
    major_cities: Vec<MajorCityGroup>,
    ferries: Vec<FerryCrossing>,
}

impl Board {
    pub fn milepost(&self, coord: GridCoord) -> Option<&Milepost> {
        self.mileposts.get(&coord)
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.mileposts.contains_key(&coord)
    }

    /// Neighbors clipped to mileposts that exist on the board.
    pub fn neighbors(&self, coord: GridCoord) -> impl Iterator<Item = GridCoord> + '_ {
        coord
            .neighbors()
            .into_iter()
            .filter(|c| self.mileposts.contains_key(c))
    }

    pub fn are_adjacent(&self, a: GridCoord, b: GridCoord) -> bool {
        self.contains(a) && self.contains(b) && a.neighbors().contains(&b)
    }

    pub fn cities(&self) -> impl Iterator<Item = &CityEntry> {
        self.cities.values()
    }

    pub fn city(&self, name: &str) -> Option<&CityEntry> {
        self.cities.get(name)
    }

    /// All mileposts belonging to a named city (center + outposts for major
    /// cities, the single milepost otherwise).
    pub fn city_mileposts(&self, name: &str) -> &[GridCoord] {
        self.cities
            .get(name)
            .map(|c| c.mileposts.as_slice())
            .unwrap_or(&[])
    }

    pub fn city_of(&self, coord: GridCoord) -> Option<&str> {
        self.mileposts
            .get(&coord)
            .and_then(|m| m.city.as_deref())
    }

    pub fn is_major_city(&self, name: &str) -> bool {
        self.cities
            .get(name)
            .map(|c| c.class == Terrain::MajorCity)
            .unwrap_or(false)
    }

    pub fn major_cities(&self) -> &[MajorCityGroup] {
        &self.major_cities
    }

    pub fn major_city_names(&self) -> BTreeSet<&str> {
        self.major_cities.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn ferries(&self) -> &[FerryCrossing] {
        &self.ferries
    }

    pub fn movement_cost_into(&self, coord: GridCoord) -> u32 {
        self.mileposts
            .get(&coord)
            .map(|m| m.terrain.movement_cost())
            .unwrap_or(1)
    }

    pub fn build_cost_into(&self, coord: GridCoord) -> i64 {
        self.mileposts
            .get(&coord)
            .map(|m| m.terrain.build_cost())
            .unwrap_or(1)
    }
}

// --- The fixed catalog ---

const BOARD_COLS: i32 = 24;
const BOARD_ROWS: i32 = 16;

/// Water carries no milepost. Two bodies: the Vela Sound in the northwest and
/// the Marrow Bay in the southeast.
fn is_water(col: i32, row: i32) -> bool {
    let vela_sound = col <= 2 && (7..=9).contains(&row);
    let marrow_bay = (21..=22).contains(&col) && row >= 13;
    vela_sound || marrow_bay
}

fn base_terrain(col: i32, row: i32) -> Terrain {
    // The Spine: a mountain belt down the middle with an alpine core.
    if col == 11 && (9..=12).contains(&row) {
        return Terrain::Alpine;
    }
    if (10..=12).contains(&col) && row >= 7 {
        return Terrain::Mountain;
    }
    // Two forest tracts.
    if (5..=7).contains(&col) && row <= 5 {
        return Terrain::Forest;
    }
    if (15..=17).contains(&col) && (10..=13).contains(&row) {
        return Terrain::Forest;
    }
    Terrain::Clear
}

struct CitySpec {
    name: &'static str,
    class: Terrain,
    at: GridCoord,
}

const CITY_SPECS: &[CitySpec] = &[
    // Major cities
    CitySpec { name: "Port Vela", class: Terrain::MajorCity, at: GridCoord::new(2, 3) },
    CitySpec { name: "Dune Hollow", class: Terrain::MajorCity, at: GridCoord::new(4, 12) },
    CitySpec { name: "Karst", class: Terrain::MajorCity, at: GridCoord::new(9, 6) },
    CitySpec { name: "Ashfield", class: Terrain::MajorCity, at: GridCoord::new(12, 2) },
    CitySpec { name: "Meridian", class: Terrain::MajorCity, at: GridCoord::new(14, 9) },
    CitySpec { name: "Lyle", class: Terrain::MajorCity, at: GridCoord::new(18, 4) },
    CitySpec { name: "Tannery Row", class: Terrain::MajorCity, at: GridCoord::new(20, 12) },
    CitySpec { name: "Junction Flats", class: Terrain::MajorCity, at: GridCoord::new(22, 7) },
    // Medium cities
    CitySpec { name: "Halvard", class: Terrain::MediumCity, at: GridCoord::new(6, 1) },
    CitySpec { name: "Stonebridge", class: Terrain::MediumCity, at: GridCoord::new(7, 9) },
    CitySpec { name: "Velles", class: Terrain::MediumCity, at: GridCoord::new(16, 0) },
    // Small cities
    CitySpec { name: "Brine", class: Terrain::SmallCity, at: GridCoord::new(3, 10) },
    CitySpec { name: "Cinder Gap", class: Terrain::SmallCity, at: GridCoord::new(13, 13) },
    CitySpec { name: "Marrow", class: Terrain::SmallCity, at: GridCoord::new(23, 12) },
];

struct FerrySpec {
    name: &'static str,
    a: GridCoord,
    b: GridCoord,
}

const FERRY_SPECS: &[FerrySpec] = &[
    FerrySpec { name: "Vela Sound", a: GridCoord::new(2, 6), b: GridCoord::new(2, 10) },
    FerrySpec { name: "Marrow Strait", a: GridCoord::new(20, 14), b: GridCoord::new(23, 13) },
];

fn build_board() -> Board {
    let mut mileposts = BTreeMap::new();
    for row in 0..BOARD_ROWS {
        for col in 0..BOARD_COLS {
            if is_water(col, row) {
                continue;
            }
            let coord = GridCoord::new(col, row);
            mileposts.insert(
                coord,
                Milepost {
                    coord,
                    terrain: base_terrain(col, row),
                    city: None,
                },
            );
        }
    }

    for ferry in FERRY_SPECS {
        for coord in [ferry.a, ferry.b] {
            if let Some(m) = mileposts.get_mut(&coord) {
                m.terrain = Terrain::FerryPort;
            }
        }
    }

    let mut cities = BTreeMap::new();
    let mut major_cities = Vec::new();
    for spec in CITY_SPECS {
        let mut city_posts = vec![spec.at];
        if spec.class == Terrain::MajorCity {
            let outposts: Vec<GridCoord> = spec
                .at
                .neighbors()
                .into_iter()
                .filter(|c| mileposts.contains_key(c))
                .collect();
            city_posts.extend(&outposts);
            major_cities.push(MajorCityGroup {
                name: spec.name.to_string(),
                center: spec.at,
                outposts,
            });
        }
        for coord in &city_posts {
            if let Some(m) = mileposts.get_mut(coord) {
                m.terrain = spec.class;
                m.city = Some(spec.name.to_string());
            }
        }
        cities.insert(
            spec.name.to_string(),
            CityEntry {
                name: spec.name.to_string(),
                class: spec.class,
                mileposts: city_posts,
            },
        );
    }

    let ferries = FERRY_SPECS
        .iter()
        .map(|f| FerryCrossing {
            name: f.name.to_string(),
            a: f.a,
            b: f.b,
        })
        .collect();

    Board {
        mileposts,
        cities,
        major_cities,
        ferries,
    }
}

/// The process-wide board catalog.
pub static BOARD: LazyLock<Board> = LazyLock::new(build_board);
