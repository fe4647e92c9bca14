//! Small runs of every scenario

use std::time::Duration;

use towermesh_node::{Outcome, TowerConfig, set_test_mode};
use towermesh_simulation::{
    AnnealOptions, FloodOptions, SimulationError, Topology, journey, run_anneal, run_chain,
    run_flood,
};

const DEADLINE: Duration = Duration::from_secs(10);

fn setup() {
    set_test_mode(true);
    towermesh_logging::init_testing();
}

#[tokio::test]
async fn test_chain_round_trip() {
    setup();
    let report = run_chain(5, &TowerConfig::testing(), DEADLINE)
        .await
        .unwrap();

    assert_eq!(report.outbound.outcome, Outcome::Delivered);
    assert_eq!(report.outbound.trip, vec!["c0", "c1", "c2", "c3", "c4"]);
    assert_eq!(report.inbound.outcome, Outcome::Delivered);
    assert_eq!(report.inbound.hops, 4);
    assert!(report.routes_learned > 0);
    // The way back is already known at the tail
    assert!(report.cached_forwards >= 1);
}

#[tokio::test]
async fn test_chain_needs_two_towers() {
    setup();
    let err = run_chain(1, &TowerConfig::testing(), DEADLINE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::TooFewTowers { needed: 2, got: 1 }
    ));
}

#[tokio::test]
async fn test_journey_across_ring() {
    setup();
    let network = Topology::ring(6)
        .build("r", &TowerConfig::testing())
        .await
        .unwrap();

    let delivery = journey(&network.towers()[0], &network.towers()[3], DEADLINE)
        .await
        .unwrap();
    assert!(delivery.is_delivered());
    assert_eq!(delivery.last_hop(), Some(network.towers()[3].id()));

    network.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_journey_without_route_is_dropped() {
    setup();
    let network = Topology::isolated(2)
        .build("i", &TowerConfig::testing())
        .await
        .unwrap();

    let delivery = journey(&network.towers()[0], &network.towers()[1], DEADLINE)
        .await
        .unwrap();
    assert_eq!(delivery.outcome, Outcome::Dropped);
    assert_eq!(delivery.hop_count(), 0);

    network.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_anneal_without_exploration() {
    setup();
    // With exploration and eviction off, cached routes only ever shorten
    let report = run_anneal(&AnnealOptions {
        towers: 8,
        packets: 6,
        trials: 3,
        seed: Some(7),
        deadline: DEADLINE,
        config: TowerConfig::testing(),
    })
    .await
    .unwrap();

    assert_eq!(report.trials.len(), 3);
    for trial in &report.trials {
        assert_eq!(trial.delivered, 6);
        assert_eq!(trial.dropped, 0);
        assert!(trial.annealed);
        let shortest = trial.shortest.unwrap();
        assert!(trial.last_hops.unwrap() >= shortest);
    }
    assert_eq!(report.passed, 3);
    assert!(report.success);
}

#[tokio::test]
async fn test_anneal_with_no_trials() {
    setup();
    let report = run_anneal(&AnnealOptions {
        towers: 4,
        trials: 0,
        seed: Some(1),
        config: TowerConfig::testing(),
        ..AnnealOptions::default()
    })
    .await
    .unwrap();
    assert!(report.trials.is_empty());
    assert!(!report.success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_flood_accounts_for_every_packet() {
    setup();
    let report = run_flood(&FloodOptions {
        towers: 10,
        packets: 30,
        seed: Some(3),
        deadline: DEADLINE,
        top: 3,
        config: TowerConfig::testing(),
    })
    .await
    .unwrap();

    assert_eq!(report.delivered + report.dropped + report.lost, 30);
    assert_eq!(report.delivered, 30);
    assert!(report.max_hops >= 1);
    assert!(report.mean_hops >= 1.0);
    assert_eq!(report.busiest.len(), 3);
    assert!(report.busiest[0].1 >= report.busiest[1].1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["packets"], 30);
}

#[tokio::test]
async fn test_flood_needs_two_towers() {
    setup();
    let err = run_flood(&FloodOptions {
        towers: 1,
        config: TowerConfig::testing(),
        ..FloodOptions::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, SimulationError::TooFewTowers { .. }));
}
