//! Reachability over built track. An undirected adjacency structure keyed by
//! grid coordinate, built from track segments plus the implicit edges the
//! board grants for free: major-city interiors and ferry crossings.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use boxcar_common::{Board, GridCoord, TrackSegment, FERRY_MOVE_COST};

/// A connected component and the major cities it touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub mileposts: BTreeSet<GridCoord>,
    pub major_cities: BTreeSet<String>,
}

pub struct ReachabilityGraph {
    board: &'static Board,
    adjacency: BTreeMap<GridCoord, BTreeSet<GridCoord>>,
    ferry_edges: BTreeSet<(GridCoord, GridCoord)>,
}

impl ReachabilityGraph {
    /// Build from track segments. Major-city interiors join as soon as any
    /// member milepost appears; a ferry edge joins only when both of its
    /// ports already appear.
    pub fn from_segments<I>(board: &'static Board, segments: I) -> Self
    where
        I: IntoIterator<Item = TrackSegment>,
    {
        let mut adjacency: BTreeMap<GridCoord, BTreeSet<GridCoord>> = BTreeMap::new();
        let add_edge = |adj: &mut BTreeMap<GridCoord, BTreeSet<GridCoord>>,
                            a: GridCoord,
                            b: GridCoord| {
            adj.entry(a).or_default().insert(b);
            adj.entry(b).or_default().insert(a);
        };

        for seg in segments {
            add_edge(&mut adjacency, seg.from, seg.to);
        }

        // Touching any milepost of a major city connects the whole city.
        for group in board.major_cities() {
            let mut members = vec![group.center];
            members.extend(&group.outposts);
            if members.iter().any(|c| adjacency.contains_key(c)) {
                for (i, a) in members.iter().enumerate() {
                    for b in &members[i + 1..] {
                        add_edge(&mut adjacency, *a, *b);
                    }
                }
            }
        }

        let mut ferry_edges = BTreeSet::new();
        for ferry in board.ferries() {
            if adjacency.contains_key(&ferry.a) && adjacency.contains_key(&ferry.b) {
                add_edge(&mut adjacency, ferry.a, ferry.b);
                let key = if ferry.a <= ferry.b {
                    (ferry.a, ferry.b)
                } else {
                    (ferry.b, ferry.a)
                };
                ferry_edges.insert(key);
            }
        }

        Self {
            board,
            adjacency,
            ferry_edges,
        }
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.adjacency.contains_key(&coord)
    }

    /// Connected components via breadth-first traversal, in first-discovered
    /// order (stable: nodes iterate in coordinate order).
    pub fn components(&self) -> Vec<Component> {
        let mut seen: BTreeSet<GridCoord> = BTreeSet::new();
        let mut components = Vec::new();

        for &start in self.adjacency.keys() {
            if seen.contains(&start) {
                continue;
            }
            let mut mileposts = BTreeSet::new();
            let mut queue = std::collections::VecDeque::new();
            seen.insert(start);
            queue.push_back(start);
            while let Some(at) = queue.pop_front() {
                mileposts.insert(at);
                for &next in &self.adjacency[&at] {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            let major_cities = self.major_cities_in(&mileposts);
            components.push(Component {
                mileposts,
                major_cities,
            });
        }

        components
    }

    fn major_cities_in(&self, mileposts: &BTreeSet<GridCoord>) -> BTreeSet<String> {
        let mut cities = BTreeSet::new();
        for &coord in mileposts {
            if let Some(name) = self.board.city_of(coord) {
                if self.board.is_major_city(name) {
                    cities.insert(name.to_string());
                }
            }
        }
        cities
    }

    /// The component touching the most major cities. Ties break toward the
    /// first-discovered component. None when the graph is empty.
    pub fn best_component(&self) -> Option<Component> {
        let mut best: Option<Component> = None;
        for component in self.components() {
            let better = best
                .as_ref()
                .map(|b| component.major_cities.len() > b.major_cities.len())
                .unwrap_or(true);
            if better {
                best = Some(component);
            }
        }
        best
    }

    /// Major cities connected by the best subnetwork, sorted by name.
    pub fn connected_major_cities(&self) -> Vec<String> {
        self.best_component()
            .map(|c| c.major_cities.into_iter().collect())
            .unwrap_or_default()
    }

    /// Movement cost of traversing one edge: ferry fare for ferry edges,
    /// terrain entry cost for everything else.
    pub fn edge_cost(&self, from: GridCoord, to: GridCoord) -> u32 {
        let key = if from <= to { (from, to) } else { (to, from) };
        if self.ferry_edges.contains(&key) {
            FERRY_MOVE_COST
        } else {
            self.board.movement_cost_into(to)
        }
    }

    /// Shortest-cost path from `start` to any milepost of `city`, bounded by
    /// `budget` movement points. Dijkstra over terrain-cost edge weights;
    /// cost ties break by coordinate order. Returns the path (including
    /// `start`) and its total cost.
    pub fn reachable_within_budget(
        &self,
        start: GridCoord,
        city: &str,
        budget: u32,
    ) -> Option<(Vec<GridCoord>, u32)> {
        if !self.adjacency.contains_key(&start) {
            return None;
        }
        let targets: BTreeSet<GridCoord> = self
            .board
            .city_mileposts(city)
            .iter()
            .copied()
            .collect();
        if targets.is_empty() {
            return None;
        }
        if targets.contains(&start) {
            return Some((vec![start], 0));
        }

        let mut dist: BTreeMap<GridCoord, u32> = BTreeMap::new();
        let mut prev: BTreeMap<GridCoord, GridCoord> = BTreeMap::new();
        let mut heap = BinaryHeap::new();
        dist.insert(start, 0);
        heap.push(Reverse((0u32, start)));

        while let Some(Reverse((cost, at))) = heap.pop() {
            if cost > *dist.get(&at).unwrap_or(&u32::MAX) {
                continue;
            }
            if targets.contains(&at) {
                let mut path = vec![at];
                let mut cursor = at;
                while let Some(&p) = prev.get(&cursor) {
                    path.push(p);
                    cursor = p;
                }
                path.reverse();
                return Some((path, cost));
            }
            for &next in &self.adjacency[&at] {
                let next_cost = cost + self.edge_cost(at, next);
                if next_cost > budget {
                    continue;
                }
                if next_cost < *dist.get(&next).unwrap_or(&u32::MAX) {
                    dist.insert(next, next_cost);
                    prev.insert(next, at);
                    heap.push(Reverse((next_cost, next)));
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxcar_common::BOARD;

    fn seg(a: (i32, i32), b: (i32, i32)) -> TrackSegment {
        TrackSegment::new(GridCoord::new(a.0, a.1), GridCoord::new(b.0, b.1))
    }

    /// A chain of segments along consecutive coordinates.
    fn chain(points: &[(i32, i32)]) -> Vec<TrackSegment> {
        points.windows(2).map(|w| seg(w[0], w[1])).collect()
    }

    #[test]
    fn empty_graph_has_no_components() {
        let graph = ReachabilityGraph::from_segments(&BOARD, []);
        assert!(graph.components().is_empty());
        assert!(graph.connected_major_cities().is_empty());
    }

    #[test]
    fn touching_one_outpost_connects_the_whole_major_city() {
        // Karst center is (9,6); (8,6) is one of its outposts.
        let graph = ReachabilityGraph::from_segments(&BOARD, chain(&[(7, 6), (8, 6)]));
        let components = graph.components();
        assert_eq!(components.len(), 1);
        assert!(components[0].mileposts.contains(&GridCoord::new(9, 6)));
        assert_eq!(graph.connected_major_cities(), vec!["Karst".to_string()]);
    }

    #[test]
    fn two_disconnected_networks_select_the_bigger_city_count() {
        // Network A touches Karst (9,6) and Meridian (14,9); network B only
        // touches Lyle (18,4).
        let mut segments = chain(&[(9, 6), (10, 6), (11, 7), (12, 8), (13, 8), (14, 9)]);
        segments.extend(chain(&[(18, 2), (18, 3), (18, 4)]));
        let graph = ReachabilityGraph::from_segments(&BOARD, segments);
        assert_eq!(graph.components().len(), 2);
        let best = graph.best_component().unwrap();
        assert_eq!(best.major_cities.len(), 2);
        assert!(best.major_cities.contains("Karst"));
        assert!(best.major_cities.contains("Meridian"));
    }

    #[test]
    fn ferry_edge_joins_only_when_both_ports_present() {
        // Vela Sound ports: (2,6) and (2,10). Only one present → no edge.
        let graph = ReachabilityGraph::from_segments(&BOARD, chain(&[(3, 6), (2, 6)]));
        assert!(!graph.contains(GridCoord::new(2, 10)));

        // Both present → the two networks merge across the sound.
        let mut segments = chain(&[(3, 6), (2, 6)]);
        segments.extend(chain(&[(2, 10), (3, 10)]));
        let graph = ReachabilityGraph::from_segments(&BOARD, segments);
        assert_eq!(graph.components().len(), 1);
        assert_eq!(
            graph.edge_cost(GridCoord::new(2, 6), GridCoord::new(2, 10)),
            FERRY_MOVE_COST
        );
    }

    #[test]
    fn budget_bounds_the_path_search() {
        let graph = ReachabilityGraph::from_segments(
            &BOARD,
            chain(&[(5, 9), (6, 9), (7, 9)]),
        );
        // Stonebridge is at (7,9); two clear hops from (5,9).
        let (path, cost) = graph
            .reachable_within_budget(GridCoord::new(5, 9), "Stonebridge", 9)
            .unwrap();
        assert_eq!(path.first(), Some(&GridCoord::new(5, 9)));
        assert_eq!(path.last(), Some(&GridCoord::new(7, 9)));
        assert_eq!(cost, 2);

        assert!(graph
            .reachable_within_budget(GridCoord::new(5, 9), "Stonebridge", 1)
            .is_none());
    }

    #[test]
    fn mountain_hops_cost_more() {
        // (10,7) and (11,7) are in the mountain belt.
        let graph = ReachabilityGraph::from_segments(
            &BOARD,
            chain(&[(9, 7), (10, 7), (11, 7), (12, 7), (13, 7)]),
        );
        let cost = graph.edge_cost(GridCoord::new(9, 7), GridCoord::new(10, 7));
        assert_eq!(cost, 2);
    }

    #[test]
    fn start_inside_the_target_city_costs_nothing() {
        let graph = ReachabilityGraph::from_segments(&BOARD, chain(&[(9, 6), (8, 6)]));
        let (path, cost) = graph
            .reachable_within_budget(GridCoord::new(9, 6), "Karst", 9)
            .unwrap();
        assert_eq!(path, vec![GridCoord::new(9, 6)]);
        assert_eq!(cost, 0);
    }
}
