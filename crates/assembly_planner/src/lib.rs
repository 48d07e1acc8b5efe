//! Assembly sequence planning (CSP over build order) and Cartesian
//! trajectory planning (ladder graph + sparse ladder graph) for layer-by-
//! layer robotic additive assembly.
//!
//! `plan(...)` chains the two stages: solve an assembly sequence, then solve
//! a Cartesian trajectory along it. Each stage is also usable on its own
//! through its module (`sequence_csp`, `sparse_ladder_graph`).

pub mod assembly_network;
pub mod collision_pruner;
pub mod config;
pub mod dag_search;
pub mod direction_map;
pub mod error;
pub mod export;
pub mod geometry;
pub mod ladder_graph;
pub mod oracles;
pub mod rng;
pub mod sequence_csp;
pub mod solve_log;
pub mod sparse_ladder_graph;

use std::collections::HashSet;
use std::time::Instant;

use assembly_network::AssemblyNetwork;
use config::PlannerConfig;
use error::PlanError;
use geometry::{Element, ElementId, JointVector, LayerId, NodeId, Point, RigidBody};
use oracles::{CollisionOracle, EndEffectorCollisionOracle, IkOracle};
use sequence_csp::{SearchDirection, SequenceCsp};
use solve_log::SolveLog;
use sparse_ladder_graph::{CapRungSpec, SparseLadderGraph};

/// Caller-populated shape description (spec §6): node coordinates plus a
/// ground flag, and elements as node-index pairs tagged with a build layer.
/// Shape-file parsing itself is out of scope; this is the plain data the
/// crate needs once a caller has parsed one.
pub struct ShapeInput {
    pub nodes: Vec<(Point, bool)>,
    pub elements: Vec<(NodeId, NodeId, LayerId)>,
    pub scale: f64,
}

impl ShapeInput {
    /// Split into the pieces `AssemblyNetwork::build` wants: elements (with
    /// a fresh `RigidBody` handle per element), scaled node coordinates, and
    /// the set of grounded node ids.
    fn into_parts(self) -> (Vec<Element>, Vec<Point>, HashSet<NodeId>) {
        let node_points: Vec<Point> = self.nodes.iter().map(|(p, _)| Point::from(p.coords * self.scale)).collect();
        let ground_nodes: HashSet<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, (_, grounded))| *grounded)
            .map(|(i, _)| NodeId(i as u32))
            .collect();
        let elements = self
            .elements
            .into_iter()
            .enumerate()
            .map(|(i, (a, b, layer))| Element {
                id: ElementId(i as u32),
                endpoints: (a, b),
                layer,
                body: RigidBody::new(i as u64, format!("element-{i}")),
            })
            .collect();
        (elements, node_points, ground_nodes)
    }
}

/// The result of chaining sequence planning and trajectory planning.
pub struct PlanOutput {
    pub order: Vec<ElementId>,
    pub trajectory: Vec<JointVector>,
    pub log: SolveLog,
}

/// Solve an assembly sequence over `shape`, then a Cartesian trajectory
/// along that sequence, using one `CollisionOracle` for the whole run (spec
/// §6: callers reconstruct the oracle themselves as the obstacle set grows;
/// this entry point does not attempt incremental obstacle tracking).
pub fn plan(
    shape: ShapeInput,
    direction: SearchDirection,
    ee_collision: &dyn EndEffectorCollisionOracle,
    ik: &dyn IkOracle,
    collision: &dyn CollisionOracle,
    cfg: &PlannerConfig,
) -> Result<PlanOutput, PlanError> {
    let started = Instant::now();
    let shape_name = "shape".to_string();
    let (elements, node_points, ground_nodes) = shape.into_parts();
    let element_count = elements.len();
    tracing::info!(element_count, "plan started");

    let net = AssemblyNetwork::build(elements, node_points, &ground_nodes)?;
    let grounded_count = net.grounded_count();

    let mut csp = SequenceCsp::new(&net, direction, ee_collision, ik, collision, cfg);
    let order = csp.solve(None)?;
    tracing::info!(backtracks = csp.nbacktracks(), "sequence solved");

    let mut rung_specs = Vec::with_capacity(order.len());
    for &id in &order {
        let (p1, p2) = net.element_endpoints(id);
        let path_pts = geometry::interpolate_straight_line(p1, p2, cfg.waypoint_disc_len);
        let directions = csp.feasible_directions(id);
        rung_specs.push(CapRungSpec { path_pts, directions, collision });
    }

    let mut sparse = SparseLadderGraph::new(ik.dof(), ik, cfg, rung_specs);
    sparse.find_sparse_path(cfg.rung_sample_timeout, cfg.sparse_graph_timeout)?;
    let trajectory = sparse.extract_solution()?;
    tracing::info!(waypoints = trajectory.len(), elapsed_secs = started.elapsed().as_secs_f64(), "plan finished");

    let log = SolveLog::new(
        shape_name,
        element_count,
        grounded_count,
        csp.assign_log().to_vec(),
        csp.nbacktracks(),
        started.elapsed(),
    );

    Ok(PlanOutput { order, trajectory, log })
}
