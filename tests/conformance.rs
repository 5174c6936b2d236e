//! The strategies must agree with each other on every network.

mod common;

use common::{arb_topology, diverge, merge, random_settings, ring, settings, single};
use ctm_sim::conformance::{compare, DEFAULT_TOLERANCE};
use ctm_sim::{Network, Settings, Strategy, Topology};
use proptest::prelude::{prop_assert, proptest, ProptestConfig};

fn assert_conformant(topology: &Topology, settings: &Settings) {
    let network = Network::build(topology, settings).unwrap();
    let report = compare(&network, &Strategy::ALL, DEFAULT_TOLERANCE).unwrap();
    assert!(report.is_conformant(), "{:#?}", report.mismatches);
    assert_eq!(report.compared.len(), 2);
}

#[test]
fn single_segment() {
    assert_conformant(&single(1000.0, 2, 100.0, 3000.0), &settings(600, 30));
}

#[test]
fn saturated_merge() {
    assert_conformant(&merge(3600.0, 3600.0), &settings(600, 30));
}

#[test]
fn uneven_diverge() {
    assert_conformant(&diverge(2400.0, [0.25, 0.75], [1, 2]), &settings(600, 30));
}

#[test]
fn blocked_diverge() {
    assert_conformant(&diverge(2400.0, [0.5, 0.5], [1, 0]), &settings(600, 30));
}

#[test]
fn closed_ring() {
    assert_conformant(&ring(8.0), &settings(600, 30));
}

#[test]
fn lane_drop_mid_run() {
    let mut settings = Settings::default();
    settings.simulation.total_steps = 3;
    settings.simulation.step_interval = 100;
    settings.simulation.logging_interval = 20;
    let mut topology = Topology::new();
    topology
        .add_segment(
            0,
            ctm_sim::Segment::new(400.0, 3, 110.0)
                .with_border_flow(ctm_sim::ScheduleSpec::overrides([(0, 5000.0), (2, 0.0)]))
                .with_successors(&[1]),
        )
        .add_segment(
            1,
            ctm_sim::Segment::new(400.0, ctm_sim::ScheduleSpec::overrides([(0, 3), (1, 1)]), 110.0)
                .with_predecessors(&[0]),
        );
    assert_conformant(&topology, &settings);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_networks(topology in arb_topology()) {
        let network = Network::build(&topology, &random_settings()).unwrap();
        let report = compare(&network, &Strategy::ALL, DEFAULT_TOLERANCE).unwrap();
        prop_assert!(report.is_conformant(), "{:#?}", report.mismatches);
    }
}
