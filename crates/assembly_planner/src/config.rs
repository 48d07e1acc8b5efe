//! Planner-wide tunables.
//!
//! Centralizes every knob named in the external-interfaces section of the
//! spec this crate implements, the same way `geom4::cfg` centralizes
//! tolerances for the teacher's polytope code — except these are runtime
//! values (grid resolution, timeouts, a seed), not compile-time constants,
//! so they live in one `Default`-able struct rather than `const`s.

use std::time::Duration;

/// Discretization and search tunables shared by every planner stage.
#[derive(Clone, Copy, Debug)]
pub struct PlannerConfig {
    /// Number of azimuth (φ) buckets in the direction grid, φ ∈ [0, 2π).
    pub phi_disc: usize,
    /// Number of polar (θ) buckets in the direction grid, θ ∈ [0, π).
    pub theta_disc: usize,
    /// Linear-interpolation step length (meters) used to generate waypoints
    /// along an element's deposition path.
    pub waypoint_disc_len: f64,
    /// Per-rung sampling timeout for sparse-ladder-graph Phase 1.
    pub rung_sample_timeout: Duration,
    /// Global Phase 2 (RRT*-style improvement) timeout.
    pub sparse_graph_timeout: Duration,
    /// Number of yaw samples drawn per direction when the sparse planner
    /// sweeps an orientation (spec's "yaw-sample size").
    pub yaw_sample_count: usize,
    /// Per-joint delta above which an inter-rung edge is discarded as
    /// violating a joint-velocity upper bound. `None` disables the check.
    pub joint_resolution: Option<f64>,
    /// Whether `collision_pruner::prune` also requires a collision-free IK
    /// solution to keep a direction bit set.
    pub check_ik_during_pruning: bool,
    /// Whether a caller's own `CollisionOracle` should also check robot
    /// self-collision. Per `oracles::CollisionOracle`'s contract, the oracle
    /// is "constructed once per obstacle-set change" by the caller, not by
    /// this crate — this field is never read internally. It exists so a
    /// caller building (or rebuilding) its own oracle can read
    /// `self_collision_check()` once instead of tracking the flag itself.
    pub self_collision_check: bool,
    /// RNG seed for every seeded sampling call in the sparse ladder graph.
    pub seed: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            phi_disc: 10,
            theta_disc: 10,
            waypoint_disc_len: 0.01,
            rung_sample_timeout: Duration::from_secs(10),
            sparse_graph_timeout: Duration::from_secs(60),
            yaw_sample_count: 8,
            joint_resolution: None,
            check_ik_during_pruning: true,
            self_collision_check: false,
            seed: 0,
        }
    }
}

impl PlannerConfig {
    /// Total number of discretized directions in the spherical grid.
    #[inline]
    pub fn direction_count(&self) -> usize {
        self.phi_disc * self.theta_disc
    }

    /// Pass-through read of `self_collision_check` for a caller constructing
    /// its own `CollisionOracle` (see that field's doc comment). Not
    /// consulted anywhere inside this crate.
    #[inline]
    pub fn self_collision_check(&self) -> bool {
        self.self_collision_check
    }
}
