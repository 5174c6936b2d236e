//! Networks shared by the integration tests.

#![allow(dead_code)]

use ctm_sim::{Recorder, Segment, Settings, Simulation, Strategy, Topology};

/// Settings for a run of `seconds` seconds, logging every `logging_interval`.
pub fn settings(seconds: u32, logging_interval: u32) -> Settings {
    let mut settings = Settings::default();
    settings.simulation.total_steps = 1;
    settings.simulation.step_interval = seconds;
    settings.simulation.logging_interval = logging_interval;
    settings
}

/// A single segment fed by a border inflow in veh/h.
pub fn single(length: f64, lanes: u32, velocity: f64, border_flow: f64) -> Topology {
    let mut topology = Topology::new();
    topology.add_segment(0, Segment::new(length, lanes, velocity).with_border_flow(border_flow));
    topology
}

/// Segments 0 and 1 merging into segment 2.
pub fn merge(border_a: f64, border_c: f64) -> Topology {
    let mut topology = Topology::new();
    topology
        .add_segment(0, Segment::new(200.0, 1, 100.0).with_border_flow(border_a).with_successors(&[2]))
        .add_segment(1, Segment::new(200.0, 1, 100.0).with_border_flow(border_c).with_successors(&[2]))
        .add_segment(2, Segment::new(300.0, 1, 100.0).with_predecessors(&[0, 1]));
    topology
}

/// Segment 0 splitting into segments 1 and 2.
pub fn diverge(border_flow: f64, priorities: [f64; 2], lanes: [u32; 2]) -> Topology {
    let mut topology = Topology::new();
    topology
        .add_segment(
            0,
            Segment::new(200.0, 1, 100.0)
                .with_border_flow(border_flow)
                .with_successors(&[1, 2])
                .with_diverge_priorities(priorities),
        )
        .add_segment(1, Segment::new(300.0, lanes[0], 100.0).with_predecessors(&[0]))
        .add_segment(2, Segment::new(300.0, lanes[1], 100.0).with_predecessors(&[0]));
    topology
}

/// Three segments in a closed loop, with no way in or out.
pub fn ring(initial_occupancy: f64) -> Topology {
    let mut topology = Topology::new();
    for id in 0..3u32 {
        let segment = Segment::new(150.0, 2, 100.0)
            .with_predecessors(&[(id + 2) % 3])
            .with_successors(&[(id + 1) % 3])
            .with_initial_occupancy(if id == 0 { initial_occupancy } else { 0.0 });
        topology.add_segment(id, segment);
    }
    topology
}

/// Runs a topology to completion.
pub fn run(topology: &Topology, settings: &Settings, strategy: Strategy) -> Recorder {
    let mut sim = Simulation::from_topology(topology, settings, strategy).unwrap();
    sim.run().unwrap();
    sim.into_recorder()
}

/// Settings for the randomly generated networks: two steps of 40 s each.
pub fn random_settings() -> Settings {
    let mut settings = Settings::default();
    settings.simulation.total_steps = 2;
    settings.simulation.step_interval = 40;
    settings.simulation.logging_interval = 5;
    settings
}

/// Random chains, merges and diverges of three segments, with lane counts
/// that change between the two steps.
pub fn arb_topology() -> impl proptest::strategy::Strategy<Value = Topology> {
    use proptest::collection::vec;
    use proptest::strategy::Strategy as _;

    let segment = (50.0..400.0f64, 1..4u32, 0..4u32, 60.0..130.0f64, 0.0..4000.0f64);
    (0..3usize, vec(segment, 3), 0.1..0.9f64, 0.0..6.0f64).prop_map(|(shape, specs, p, initial)| {
        let segments: Vec<_> = specs
            .into_iter()
            .map(|(length, lanes_0, lanes_1, velocity, border)| {
                let lanes = ctm_sim::ScheduleSpec::overrides([(0, lanes_0), (1, lanes_1)]);
                (Segment::new(length, lanes, velocity).with_initial_occupancy(initial), border)
            })
            .collect();
        let [(s0, b0), (s1, b1), (s2, _)]: [(Segment, f64); 3] = segments.try_into().unwrap();

        let mut topology = Topology::new();
        match shape {
            0 => topology
                .add_segment(0, s0.with_border_flow(b0).with_successors(&[1]))
                .add_segment(1, s1.with_predecessors(&[0]).with_successors(&[2]))
                .add_segment(2, s2.with_predecessors(&[1])),
            1 => topology
                .add_segment(0, s0.with_border_flow(b0).with_successors(&[2]))
                .add_segment(1, s1.with_border_flow(b1).with_successors(&[2]))
                .add_segment(2, s2.with_predecessors(&[0, 1]).with_merge_priorities([p, 1.0 - p])),
            _ => topology
                .add_segment(
                    0,
                    s0.with_border_flow(b0)
                        .with_successors(&[1, 2])
                        .with_diverge_priorities([p, 1.0 - p]),
                )
                .add_segment(1, s1.with_predecessors(&[0]))
                .add_segment(2, s2.with_predecessors(&[0])),
        };
        topology
    })
}
