//! The sparse ladder graph (spec §4.4): samples one orientation+yaw per
//! element rather than enumerating the whole discretized direction grid,
//! then improves the sampled chain RRT*-style before extracting a full
//! per-waypoint `LadderGraph` only along the winning samples.
//!
//! Grounded in `pychoreo/choreo/sc_cartesian_planner.py`'s `CapVert`,
//! `CapRung`, `generate_sample`, `check_cap_vert_feasibility` and
//! `SparseLadderGraph.find_sparse_path`/`extract_solution`. The cap-vertex
//! parent chain is an arena of indices rather than the original's
//! `parent_vert` object reference, per this crate's indexed-arena
//! convention for search trees (see `error::CspError`'s sibling structures).

use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PlannerConfig;
use crate::dag_search::DagSearch;
use crate::direction_map::direction_to_pose;
use crate::error::{LadderGraphError, OracleError, SparseGraphError};
use crate::geometry::{JointVector, Point};
use crate::ladder_graph::{build_ladder_graph, LadderGraph};
use crate::oracles::{CollisionOracle, IkOracle};
use crate::rng::ReplayCounter;

/// Index into `SparseLadderGraph`'s vertex arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapVertexId(usize);

/// One sampled orientation+yaw at one rung, with IK solutions kept only for
/// the first and last waypoint (spec §4.4: only the boundary solutions are
/// needed to cost inter-rung edges; the full trajectory is rebuilt later for
/// whichever samples end up on the winning chain).
struct CapVertex {
    rung_id: usize,
    phi: f64,
    theta: f64,
    yaw: f64,
    start_jt: Vec<JointVector>,
    end_jt: Vec<JointVector>,
    parent: Option<CapVertexId>,
    parent_cost: f64,
}

/// One element's sampling rung: its waypoints, candidate approach
/// directions (already pruned by the direction map), and the collision
/// oracle that accounts for every obstacle placed before it.
pub struct CapRungSpec<'a> {
    pub path_pts: Vec<Point>,
    pub directions: Vec<(f64, f64)>,
    pub collision: &'a dyn CollisionOracle,
}

struct CapRung<'a> {
    spec: CapRungSpec<'a>,
    vertex_ids: Vec<CapVertexId>,
}

fn edge_cost(child: &CapVertex, parent: Option<&CapVertex>) -> f64 {
    let Some(parent) = parent else {
        return 0.0;
    };
    let dof = child.start_jt.first().map_or(0, Vec::len);
    if dof == 0 {
        return 0.0;
    }
    let mut best = f64::INFINITY;
    for end in &parent.end_jt {
        for start in &child.start_jt {
            let cost: f64 = end.iter().zip(start).map(|(a, b)| (a - b).abs()).sum();
            if cost < best {
                best = cost;
            }
        }
    }
    best
}

/// Builds and improves a sparse ladder graph, then extracts one global
/// ladder graph + shortest joint-space path over the winning samples.
pub struct SparseLadderGraph<'a> {
    dof: usize,
    ik: &'a dyn IkOracle,
    yaw_sample_count: usize,
    rungs: Vec<CapRung<'a>>,
    vertices: Vec<CapVertex>,
    rng: ReplayCounter,
}

impl<'a> SparseLadderGraph<'a> {
    pub fn new(dof: usize, ik: &'a dyn IkOracle, cfg: &PlannerConfig, rung_specs: Vec<CapRungSpec<'a>>) -> Self {
        let rungs = rung_specs
            .into_iter()
            .map(|spec| CapRung { spec, vertex_ids: Vec::new() })
            .collect();
        Self {
            dof,
            ik,
            yaw_sample_count: cfg.yaw_sample_count,
            rungs,
            vertices: Vec::new(),
            rng: ReplayCounter::new(cfg.seed),
        }
    }

    fn cost_to_root(&self, id: CapVertexId) -> f64 {
        let mut cost = 0.0;
        let mut cur = Some(id);
        while let Some(CapVertexId(i)) = cur {
            let v = &self.vertices[i];
            cost += v.parent_cost;
            cur = v.parent;
        }
        cost
    }

    fn push_vertex(&mut self, v: CapVertex) -> CapVertexId {
        let id = CapVertexId(self.vertices.len());
        self.vertices.push(v);
        id
    }

    /// Sample one direction+yaw for `rung_id`, solve IK at every waypoint,
    /// and return a `CapVertex` if every waypoint has a collision-free
    /// solution (spec's per-rung feasibility gate); `Ok(None)` means this
    /// draw was infeasible and the caller should sample again.
    ///
    /// Every solution the oracle returns is checked against `self.dof`
    /// before being kept — a misreporting oracle raises
    /// `OracleError::WrongDof` (spec §7) instead of silently corrupting
    /// `start_jt`/`end_jt`.
    fn sample_cap_vertex(&mut self, rung_id: usize) -> Result<Option<CapVertex>, OracleError> {
        let mut sample_rng = self.rng.next_rng();
        let spec = &self.rungs[rung_id].spec;
        let Some(&(phi, theta)) = spec.directions.choose(&mut sample_rng) else {
            return Ok(None);
        };
        let yaw_step = 2.0 * std::f64::consts::PI / self.yaw_sample_count.max(1) as f64;
        let yaw = sample_rng.gen_range(0..self.yaw_sample_count.max(1)) as f64 * yaw_step;

        let mut start_jt = Vec::new();
        let mut end_jt = Vec::new();
        let n_pts = spec.path_pts.len();
        for (i, &pt) in spec.path_pts.iter().enumerate() {
            let pose = direction_to_pose(pt, phi, theta, yaw);
            let solved = self.ik.solve(&pose);
            for jt in &solved {
                if jt.len() != self.dof {
                    return Err(OracleError::WrongDof { expected: self.dof, got: jt.len() });
                }
            }
            let free: Vec<JointVector> = solved.into_iter().filter(|jt| !spec.collision.in_collision(jt)).collect();
            if free.is_empty() {
                return Ok(None);
            }
            if i == 0 {
                start_jt = free.clone();
            }
            if i == n_pts - 1 {
                end_jt = free;
            }
        }

        Ok(Some(CapVertex {
            rung_id,
            phi,
            theta,
            yaw,
            start_jt,
            end_jt,
            parent: None,
            parent_cost: 0.0,
        }))
    }

    /// Phase 1 (initial chain) + Phase 2 (RRT*-style improvement, bounded by
    /// `improve_timeout`). Returns the best cost-to-root found.
    pub fn find_sparse_path(
        &mut self,
        rung_timeout: std::time::Duration,
        improve_timeout: std::time::Duration,
    ) -> Result<f64, SparseGraphError> {
        let mut prev_vert: Option<CapVertexId> = None;
        for rung_id in 0..self.rungs.len() {
            let deadline = Instant::now() + rung_timeout;
            let mut accepted = None;
            while Instant::now() < deadline {
                if let Some(mut v) = self.sample_cap_vertex(rung_id)? {
                    v.parent = prev_vert;
                    v.parent_cost = edge_cost(&v, prev_vert.map(|CapVertexId(i)| &self.vertices[i]));
                    accepted = Some(v);
                    break;
                }
            }
            match accepted {
                Some(v) => {
                    let id = self.push_vertex(v);
                    self.rungs[rung_id].vertex_ids.push(id);
                    prev_vert = Some(id);
                }
                None => return Err(SparseGraphError::RungSamplingTimeout { element_index: rung_id }),
            }
        }
        tracing::debug!(rungs = self.rungs.len(), "phase 1 initial chain sampled");

        let improve_deadline = Instant::now() + improve_timeout;
        while Instant::now() < improve_deadline && !self.rungs.is_empty() {
            let rung_id = {
                let mut r = self.rng.next_rng();
                r.gen_range(0..self.rungs.len())
            };
            let Some(mut new_vert) = self.sample_cap_vertex(rung_id)? else {
                continue;
            };

            let nearest_parent = if rung_id > 0 {
                self.rungs[rung_id - 1]
                    .vertex_ids
                    .iter()
                    .copied()
                    .min_by(|&a, &b| {
                        let ca = self.cost_to_root(a) + edge_cost(&new_vert, Some(&self.vertices[a.0]));
                        let cb = self.cost_to_root(b) + edge_cost(&new_vert, Some(&self.vertices[b.0]));
                        ca.total_cmp(&cb)
                    })
            } else {
                None
            };
            new_vert.parent = nearest_parent;
            new_vert.parent_cost = edge_cost(&new_vert, nearest_parent.map(|CapVertexId(i)| &self.vertices[i]));
            let new_id = self.push_vertex(new_vert);
            self.rungs[rung_id].vertex_ids.push(new_id);

            if rung_id + 1 < self.rungs.len() {
                let new_vert_cost = self.cost_to_root(new_id);
                for &next_id in self.rungs[rung_id + 1].vertex_ids.clone().iter() {
                    let old_cost = self.cost_to_root(next_id);
                    let candidate_cost = new_vert_cost + edge_cost(&self.vertices[next_id.0], Some(&self.vertices[new_id.0]));
                    if candidate_cost < old_cost {
                        self.vertices[next_id.0].parent = Some(new_id);
                        self.vertices[next_id.0].parent_cost =
                            edge_cost(&self.vertices[next_id.0], Some(&self.vertices[new_id.0]));
                    }
                }
            }
        }

        let Some(last_rung) = self.rungs.last() else {
            tracing::info!("sparse ladder graph has no elements; nothing to plan");
            return Ok(0.0);
        };
        let best = last_rung
            .vertex_ids
            .iter()
            .copied()
            .min_by(|&a, &b| self.cost_to_root(a).total_cmp(&self.cost_to_root(b)))
            .expect("phase 1 guarantees at least one vertex per rung");
        let best_cost = self.cost_to_root(best);
        tracing::info!(vertex_count = self.vertices.len(), best_cost, "sparse ladder graph improved");
        Ok(best_cost)
    }

    /// Walk the best last-rung vertex's parent chain back to the root,
    /// rebuild a full per-element `LadderGraph` at each visited vertex's
    /// winning direction+yaw, concatenate them, and run one final DAG
    /// search over the unified graph.
    pub fn extract_solution(&self) -> Result<Vec<JointVector>, LadderGraphError> {
        let Some(last_rung) = self.rungs.last() else {
            return Ok(Vec::new());
        };
        let mut best = last_rung
            .vertex_ids
            .iter()
            .copied()
            .min_by(|&a, &b| self.cost_to_root(a).total_cmp(&self.cost_to_root(b)));

        let mut segment_graphs: Vec<LadderGraph> = Vec::new();
        while let Some(CapVertexId(i)) = best {
            let v = &self.vertices[i];
            let spec = &self.rungs[v.rung_id].spec;
            let poses: Vec<_> = spec.path_pts.iter().map(|&pt| direction_to_pose(pt, v.phi, v.theta, v.yaw)).collect();
            let graph = build_ladder_graph(&poses, self.ik, spec.collision, None)?;
            segment_graphs.insert(0, graph);
            best = v.parent;
        }

        let mut unified = LadderGraph::new(self.dof);
        for g in segment_graphs {
            unified.append(g)?;
        }

        let mut search = DagSearch::new(&unified);
        search.run();
        Ok(search.shortest_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracles::mocks::{MockCollisionOracle, MockIkOracle};
    use std::time::Duration;

    fn cfg_with_seed(seed: u64) -> PlannerConfig {
        PlannerConfig {
            yaw_sample_count: 4,
            seed,
            ..PlannerConfig::default()
        }
    }

    fn rung<'a>(collision: &'a MockCollisionOracle, x0: f64) -> CapRungSpec<'a> {
        CapRungSpec {
            path_pts: vec![Point::new(x0, 0.0, 0.0), Point::new(x0 + 1.0, 0.0, 0.0)],
            directions: vec![(0.1, 0.2), (0.3, 0.4), (0.5, 0.6)],
            collision,
        }
    }

    #[test]
    fn zero_timeout_after_phase1_equals_initial_cost() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let free = MockCollisionOracle::free();
        let specs = vec![rung(&free, 0.0), rung(&free, 2.0)];
        let cfg = cfg_with_seed(7);
        let mut sg = SparseLadderGraph::new(2, &ik, &cfg, specs);
        let cost = sg.find_sparse_path(Duration::from_millis(50), Duration::from_millis(0)).unwrap();
        assert!(cost.is_finite());
        assert_eq!(sg.rungs[0].vertex_ids.len(), 1, "no phase 2 budget means no extra samples");
        assert_eq!(sg.rungs[1].vertex_ids.len(), 1);
    }

    #[test]
    fn phase2_never_regresses_best_cost() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let free = MockCollisionOracle::free();
        let cfg = cfg_with_seed(11);
        let specs = vec![rung(&free, 0.0), rung(&free, 2.0), rung(&free, 4.0)];
        let mut sg = SparseLadderGraph::new(2, &ik, &cfg, specs);
        let initial = sg.find_sparse_path(Duration::from_millis(20), Duration::from_millis(0)).unwrap();

        let mut sg2 = SparseLadderGraph::new(2, &ik, &cfg, vec![rung(&free, 0.0), rung(&free, 2.0), rung(&free, 4.0)]);
        let improved = sg2.find_sparse_path(Duration::from_millis(20), Duration::from_millis(80)).unwrap();
        assert!(improved <= initial + 1e-9);
    }

    #[test]
    fn same_seed_same_output() {
        // Phase 1 alone is wall-clock-free (mocks always succeed on the
        // first draw), so its outcome is a pure function of the seed;
        // Phase 2's iteration count is inherently wall-clock-bound, same as
        // the source it's grounded on, so determinism is only claimed for
        // the seeded sampling, not for how many RRT* rounds a given
        // duration buys on a loaded machine.
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let free = MockCollisionOracle::free();
        let cfg = cfg_with_seed(99);
        let run = || {
            let specs = vec![rung(&free, 0.0), rung(&free, 2.0)];
            let mut sg = SparseLadderGraph::new(2, &ik, &cfg, specs);
            sg.find_sparse_path(Duration::from_millis(20), Duration::from_millis(0)).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn extract_solution_returns_one_joint_vector_per_waypoint() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let free = MockCollisionOracle::free();
        let cfg = cfg_with_seed(3);
        let specs = vec![rung(&free, 0.0), rung(&free, 2.0)];
        let mut sg = SparseLadderGraph::new(2, &ik, &cfg, specs);
        sg.find_sparse_path(Duration::from_millis(20), Duration::from_millis(0)).unwrap();
        let path = sg.extract_solution().unwrap();
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn rung_timeout_error_names_the_failing_element() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 1 };
        let blocked = MockCollisionOracle { forbidden: vec![(f64::NEG_INFINITY, f64::INFINITY)] };
        let cfg = cfg_with_seed(1);
        let specs = vec![rung(&blocked, 0.0)];
        let mut sg = SparseLadderGraph::new(2, &ik, &cfg, specs);
        let err = sg.find_sparse_path(Duration::from_millis(5), Duration::from_millis(0)).unwrap_err();
        assert!(matches!(err, SparseGraphError::RungSamplingTimeout { element_index: 0 }));
    }

    #[test]
    fn zero_elements_yields_zero_cost_and_empty_solution() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let cfg = cfg_with_seed(0);
        let mut sg = SparseLadderGraph::new(2, &ik, &cfg, Vec::new());
        let cost = sg
            .find_sparse_path(Duration::from_millis(5), Duration::from_millis(0))
            .unwrap();
        assert_eq!(cost, 0.0);
        assert!(sg.extract_solution().unwrap().is_empty());
    }

    #[test]
    fn wrong_dof_solution_is_reported_as_oracle_error() {
        use crate::geometry::Pose;

        struct WrongDofIk;
        impl IkOracle for WrongDofIk {
            fn solve(&self, _pose: &Pose) -> Vec<JointVector> {
                vec![vec![0.0, 0.0, 0.0]]
            }
            fn dof(&self) -> usize {
                2
            }
        }
        let free = MockCollisionOracle::free();
        let cfg = cfg_with_seed(0);
        let specs = vec![rung(&free, 0.0)];
        let ik = WrongDofIk;
        let mut sg = SparseLadderGraph::new(2, &ik, &cfg, specs);
        let err = sg
            .find_sparse_path(Duration::from_millis(20), Duration::from_millis(0))
            .unwrap_err();
        match err {
            SparseGraphError::Oracle(OracleError::WrongDof { expected, got }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 3);
            }
            other => panic!("expected SparseGraphError::Oracle(WrongDof), got {other:?}"),
        }
    }
}
