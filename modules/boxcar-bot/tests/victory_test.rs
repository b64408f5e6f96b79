//! Victory-eligibility and network-connectivity scenarios.

use boxcar_bot::testing::fixtures;
use boxcar_bot::ReachabilityGraph;
use boxcar_common::{GridCoord, TrackSegment, BOARD};

/// Track chaining the centers of seven major cities into one network.
const SEVEN_CITY_LINE: [(i32, i32); 7] = [
    (2, 3),   // Port Vela
    (9, 6),   // Karst
    (12, 2),  // Ashfield
    (14, 9),  // Meridian
    (18, 4),  // Lyle
    (20, 12), // Tannery Row
    (22, 7),  // Junction Flats
];

#[test]
fn seven_cities_without_the_cash_is_not_eligible() {
    let snapshot = fixtures::snapshot_builder()
        .with_track(&SEVEN_CITY_LINE)
        .money(200)
        .victory(7, 250)
        .build();
    let check = snapshot.victory_check();
    assert!(!check.eligible);
    assert!(check.connected_cities.len() >= 7);
    assert_eq!(check.money, 200);
}

#[test]
fn seven_cities_at_the_threshold_is_eligible() {
    let snapshot = fixtures::snapshot_builder()
        .with_track(&SEVEN_CITY_LINE)
        .money(250)
        .victory(7, 250)
        .build();
    let check = snapshot.victory_check();
    assert!(check.eligible);
    assert!(check.connected_cities.len() >= 7);
}

#[test]
fn enough_cash_without_the_cities_is_not_eligible() {
    let snapshot = fixtures::snapshot_builder()
        .with_track(&[(2, 3), (9, 6)]) // two majors only
        .money(400)
        .victory(7, 250)
        .build();
    let check = snapshot.victory_check();
    assert!(!check.eligible);
    assert_eq!(check.connected_cities.len(), 2);
}

#[test]
fn disconnected_networks_report_the_larger_component() {
    // One network touching Karst and Meridian, a separate one touching Lyle.
    let segments = vec![
        TrackSegment::new(GridCoord::new(9, 6), GridCoord::new(14, 9)),
        TrackSegment::new(GridCoord::new(18, 2), GridCoord::new(18, 4)),
    ];
    let graph = ReachabilityGraph::from_segments(&BOARD, segments);

    assert_eq!(graph.components().len(), 2);
    let connected = graph.connected_major_cities();
    assert_eq!(connected.len(), 2);
    assert!(connected.contains(&"Karst".to_string()));
    assert!(connected.contains(&"Meridian".to_string()));
}

#[test]
fn snapshot_connected_cities_come_from_the_best_component() {
    // Two-city line plus an isolated single-city stub.
    let snapshot = fixtures::snapshot_builder()
        .with_track(&[(2, 3), (9, 6)])
        .with_track(&[(18, 2), (18, 4)])
        .build();
    assert_eq!(snapshot.connected_major_cities.len(), 2);
    assert!(snapshot
        .connected_major_cities
        .contains(&"Port Vela".to_string()));
}
