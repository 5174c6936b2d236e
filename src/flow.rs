//! The cell transmission model's flow rules.
//!
//! Every function here works on a single cell or junction. The graph
//! strategy calls them directly; the vectorized strategy applies the same
//! expressions element-wise, so both agree to the last bit on finite input.

use crate::util::mid;

/// The most a cell can send downstream this time step.
pub fn send(max_flow: f64, occupancy: f64) -> f64 {
    f64::min(max_flow, occupancy)
}

/// The most a cell can accept from upstream this time step.
///
/// # Parameters
/// * `max_flow` - The cell's flow capacity per time step.
/// * `delta` - The ratio of congestion wave speed to free-flow speed.
/// * `max_vehicle` - The number of vehicles that fit in the cell.
/// * `occupancy` - The number of vehicles currently in the cell.
pub fn receive(max_flow: f64, delta: f64, max_vehicle: f64, occupancy: f64) -> f64 {
    f64::max(0.0, f64::min(max_flow, delta * (max_vehicle - occupancy)))
}

/// Flow across an ordinary junction.
pub fn ordinary(send_up: f64, receive_down: f64) -> f64 {
    f64::min(send_up, receive_down)
}

/// Flows from the two upstream cells `a` and `c` of a merge into `b`.
///
/// When `b` cannot take everything on offer, each input gets the median of
/// its own demand, the capacity left over by the other input, and its
/// priority share of `b`'s supply.
pub fn merge(send_a: f64, send_c: f64, receive_b: f64, priorities: [f64; 2]) -> [f64; 2] {
    if merge_unconstrained(send_a, send_c, receive_b) {
        [send_a, send_c]
    } else {
        [
            merge_share(send_a, send_c, receive_b, priorities[0]),
            merge_share(send_c, send_a, receive_b, priorities[1]),
        ]
    }
}

/// Whether a merge's downstream cell can accept both inputs in full.
pub fn merge_unconstrained(send_own: f64, send_partner: f64, receive_down: f64) -> bool {
    receive_down >= send_own + send_partner
}

/// One input's allocation at a merge whose downstream cell is the bottleneck.
pub fn merge_share(send_own: f64, send_partner: f64, receive_down: f64, priority: f64) -> f64 {
    mid(send_own, receive_down - send_partner, priority * receive_down)
}

/// The resolved flows at a diverge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DivergeFlow {
    /// The flow leaving the upstream cell.
    pub total: f64,
    /// The flows entering each downstream cell.
    pub branches: [f64; 2],
}

/// Flows from `a` into the two downstream cells `b` and `c` of a diverge.
///
/// The total is throttled by whichever branch binds first, then split by
/// the priorities.
pub fn diverge(send_a: f64, receive_b: f64, receive_c: f64, priorities: [f64; 2]) -> DivergeFlow {
    let total = diverge_total(send_a, receive_b / priorities[0], receive_c / priorities[1]);
    DivergeFlow {
        total,
        branches: [priorities[0] * total, priorities[1] * total],
    }
}

/// The total flow leaving a diverge, given each branch's supply already
/// divided by its priority.
pub fn diverge_total(send_a: f64, scaled_receive_b: f64, scaled_receive_c: f64) -> f64 {
    f64::min(send_a, f64::min(scaled_receive_b, scaled_receive_c))
}

/// Flow entering the network at a boundary cell.
pub fn border_in(inflow: f64, max_flow: f64) -> f64 {
    f64::min(inflow, max_flow)
}

/// Flow leaving the network at a boundary cell.
///
/// The sink takes up to `max_flow`, drawn from the vehicles in the cell
/// after this step's inflow has arrived (`available = occupancy + inflow`).
pub fn border_out(max_flow: f64, available: f64) -> f64 {
    f64::min(max_flow, f64::max(0.0, available))
}

/// The occupancy after a time step, before clamping to the cell's capacity.
pub fn next_occupancy(occupancy: f64, inflow: f64, outflow: f64) -> f64 {
    occupancy + inflow - outflow
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn send_and_receive() {
        assert_eq!(send(0.5, 3.0), 0.5);
        assert_eq!(send(0.5, 0.2), 0.2);
        // Plenty of room: limited by capacity
        assert_eq!(receive(0.5, 0.666, 13.8, 0.0), 0.5);
        // Nearly full: limited by the backward wave
        assert_approx_eq!(receive(0.5, 0.5, 10.0, 9.5), 0.25);
        // Overfull cells never report negative supply
        assert_eq!(receive(0.5, 0.5, 10.0, 12.0), 0.0);
    }

    #[test]
    fn merge_passes_everything_when_downstream_has_room() {
        assert_eq!(merge(0.2, 0.1, 0.5, [0.5, 0.5]), [0.2, 0.1]);
    }

    #[test]
    fn merge_splits_fairly_when_both_inputs_saturate() {
        let [a, c] = merge(0.5, 0.5, 0.5, [0.5, 0.5]);
        assert_approx_eq!(a, 0.25);
        assert_approx_eq!(c, 0.25);
    }

    #[test]
    fn merge_gives_unused_share_to_the_other_input() {
        let [a, c] = merge(0.1, 0.5, 0.5, [0.5, 0.5]);
        assert_approx_eq!(a, 0.1);
        assert_approx_eq!(c, 0.4);
        assert_approx_eq!(a + c, 0.5);
    }

    #[test]
    fn merge_respects_priorities() {
        let [a, c] = merge(0.5, 0.5, 0.4, [0.75, 0.25]);
        assert_approx_eq!(a, 0.3);
        assert_approx_eq!(c, 0.1);
    }

    #[test]
    fn diverge_splits_by_priority() {
        let flow = diverge(0.4, 0.5, 0.5, [0.5, 0.5]);
        assert_approx_eq!(flow.total, 0.4);
        assert_approx_eq!(flow.branches[0], 0.2);
        assert_approx_eq!(flow.branches[1], 0.2);
    }

    #[test]
    fn blocked_branch_blocks_the_diverge() {
        let flow = diverge(0.5, 0.5, 0.0, [0.5, 0.5]);
        assert_eq!(flow.total, 0.0);
        assert_eq!(flow.branches, [0.0, 0.0]);
    }

    #[test]
    fn border_inflow_is_capped() {
        assert_eq!(border_in(1.0, 0.5), 0.5);
        assert_eq!(border_in(0.1, 0.5), 0.1);
    }

    #[test]
    fn border_outflow_includes_arrivals() {
        assert_eq!(border_out(0.5, 3.0), 0.5);
        // An empty exit cell passes on what arrives in the same step
        assert_eq!(border_out(0.5, 0.0 + 0.5), 0.5);
        assert_eq!(border_out(0.5, 0.2), 0.2);
        assert_eq!(next_occupancy(0.0, 0.5, border_out(0.5, 0.5)), 0.0);
    }
}
