//! The per-element Cartesian ladder graph (spec §4.3 "Ladder Graph"):
//! one rung per waypoint, one vertex per IK solution, edges between
//! adjacent rungs weighted by L1 joint-space distance.
//!
//! Grounded in `pychoreo/src/pychoreo/cartesian_planner/ladder_graph.py`'s
//! `LadderGraph`/`LadderGraphRung`/`LadderGraphEdge`, `append_ladder_graph`
//! and `concatenate_graph_vertically`. The original's `EdgeBuilder` exists to
//! reuse a preallocated scratch buffer across rungs before being
//! `deepcopy`'d out — with no caller here needing that allocation reuse, its
//! full bipartite edge set is built directly as a plain function instead.

use crate::error::{LadderGraphError, OracleError};
use crate::geometry::{JointVector, Pose};
use crate::oracles::{CollisionOracle, IkOracle};

/// A directed edge to vertex `to` within the next rung, weighted by L1
/// joint-space distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LadderGraphEdge {
    pub to: usize,
    pub cost: f64,
}

/// One waypoint's IK solutions (flattened, `dof` values per vertex) plus,
/// for every vertex, its outgoing edges into the next rung.
#[derive(Clone, Debug, Default)]
pub struct LadderGraphRung {
    data: Vec<f64>,
    edges: Vec<Vec<LadderGraphEdge>>,
}

impl LadderGraphRung {
    fn empty() -> Self {
        Self::default()
    }

    fn vert_count(&self, dof: usize) -> usize {
        self.data.len() / dof
    }
}

/// A sequence of rungs for one Cartesian element.
#[derive(Clone, Debug)]
pub struct LadderGraph {
    dof: usize,
    rungs: Vec<LadderGraphRung>,
}

impl LadderGraph {
    pub fn new(dof: usize) -> Self {
        assert!(dof != 0, "ladder graph dof must be nonzero");
        Self {
            dof,
            rungs: Vec::new(),
        }
    }

    pub fn dof(&self) -> usize {
        self.dof
    }

    pub fn rung_count(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    pub fn vert_count(&self, rung_id: usize) -> usize {
        self.rungs[rung_id].vert_count(self.dof)
    }

    pub fn vert_data(&self, rung_id: usize, vert_id: usize) -> &[f64] {
        let start = vert_id * self.dof;
        &self.rungs[rung_id].data[start..start + self.dof]
    }

    pub fn edges(&self, rung_id: usize, vert_id: usize) -> &[LadderGraphEdge] {
        &self.rungs[rung_id].edges[vert_id]
    }

    /// Append one waypoint's IK solutions as a new final rung, wiring a full
    /// bipartite edge set from the previous rung if one exists.
    fn push_rung(&mut self, solutions: Vec<JointVector>, joint_resolution: Option<f64>) {
        let data: Vec<f64> = solutions.into_iter().flatten().collect();
        let n_vert = data.len() / self.dof;
        if let Some(prev) = self.rungs.last_mut() {
            prev.edges = full_bipartite_edges(&prev.data, &data, self.dof, joint_resolution);
        }
        self.rungs.push(LadderGraphRung {
            data,
            edges: vec![Vec::new(); n_vert],
        });
    }

    /// Append `next`'s rungs after this graph's rungs (spec §4.3
    /// "concatenate per-element graphs into one trajectory graph"),
    /// wiring a full bipartite edge set at the boundary.
    pub fn append(&mut self, next: LadderGraph) -> Result<(), LadderGraphError> {
        if self.dof != next.dof {
            return Err(LadderGraphError::Mismatched { reason: "dof mismatch on append" });
        }
        if self.rungs.is_empty() {
            self.rungs = next.rungs;
            return Ok(());
        }
        if next.rungs.is_empty() {
            return Ok(());
        }
        let boundary = self.rungs.len() - 1;
        let next_first_data = next.rungs[0].data.clone();
        self.rungs.extend(next.rungs);
        self.rungs[boundary].edges =
            full_bipartite_edges(&self.rungs[boundary].data, &next_first_data, self.dof, None);
        Ok(())
    }

    /// Merge `below`'s per-rung vertices into `self` ("above"), one rung at a
    /// time, shifting `below`'s edge target indices by `above`'s pre-merge
    /// vertex count in the next rung. Both graphs must have the same rung
    /// count (spec §4.3's multi-subprocess stacking, mirroring
    /// `concatenate_graph_vertically`).
    pub fn concat_vertical(&mut self, below: LadderGraph) -> Result<(), LadderGraphError> {
        if self.dof != below.dof {
            return Err(LadderGraphError::Mismatched { reason: "dof mismatch on vertical concat" });
        }
        if self.rungs.len() != below.rungs.len() {
            return Err(LadderGraphError::Mismatched { reason: "rung count mismatch on vertical concat" });
        }
        let num_rungs = self.rungs.len();
        let above_vert_counts: Vec<usize> = self.rungs.iter().map(|r| r.vert_count(self.dof)).collect();
        for (i, below_rung) in below.rungs.into_iter().enumerate() {
            self.rungs[i].data.extend(below_rung.data);
            if i != num_rungs - 1 {
                let shift = above_vert_counts[i + 1];
                let shifted = below_rung.edges.into_iter().map(|out_edges| {
                    out_edges
                        .into_iter()
                        .map(|e| LadderGraphEdge { to: e.to + shift, cost: e.cost })
                        .collect()
                });
                self.rungs[i].edges.extend(shifted);
            } else {
                self.rungs[i].edges.extend(below_rung.edges);
            }
        }
        Ok(())
    }
}

fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Every `(from_vertex, to_vertex)` pair, honoring an optional per-joint
/// delta cap (spec's `joint_resolution` tunable).
fn full_bipartite_edges(
    from_data: &[f64],
    to_data: &[f64],
    dof: usize,
    joint_resolution: Option<f64>,
) -> Vec<Vec<LadderGraphEdge>> {
    let n_from = from_data.len() / dof;
    let n_to = to_data.len() / dof;
    (0..n_from)
        .map(|i| {
            let from_jt = &from_data[i * dof..(i + 1) * dof];
            (0..n_to)
                .filter_map(|j| {
                    let to_jt = &to_data[j * dof..(j + 1) * dof];
                    if let Some(limit) = joint_resolution {
                        let exceeds = from_jt.iter().zip(to_jt).any(|(a, b)| (a - b).abs() > limit);
                        if exceeds {
                            return None;
                        }
                    }
                    Some(LadderGraphEdge { to: j, cost: l1_distance(from_jt, to_jt) })
                })
                .collect()
        })
        .collect()
}

/// Build a ladder graph for one element along a fixed sequence of TCP
/// poses: solve IK at every waypoint, keep only collision-free solutions,
/// fail with `EmptyRung` the first time a waypoint has none.
///
/// Every solution the oracle returns is checked against `ik.dof()` before
/// it reaches a rung (spec §7 "Oracle contract violation") — a misreporting
/// oracle raises `OracleError::WrongDof` instead of silently corrupting the
/// rung's vertex count.
pub fn build_ladder_graph(
    poses: &[Pose],
    ik: &dyn IkOracle,
    collision: &dyn CollisionOracle,
    joint_resolution: Option<f64>,
) -> Result<LadderGraph, LadderGraphError> {
    let dof = ik.dof();
    let mut graph = LadderGraph::new(dof);
    for (waypoint, pose) in poses.iter().enumerate() {
        let solved = ik.solve(pose);
        for jt in &solved {
            if jt.len() != dof {
                return Err(OracleError::WrongDof { expected: dof, got: jt.len() }.into());
            }
        }
        let free: Vec<JointVector> = solved.into_iter().filter(|jt| !collision.in_collision(jt)).collect();
        if free.is_empty() {
            return Err(LadderGraphError::EmptyRung { waypoint });
        }
        graph.push_rung(free, joint_resolution);
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracles::mocks::{MockCollisionOracle, MockIkOracle};
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};

    fn pose(x: f64) -> Pose {
        Isometry3::from_parts(Translation3::new(x, 0.0, 0.0), UnitQuaternion::identity())
    }

    #[test]
    fn build_yields_one_rung_per_waypoint_with_full_edges() {
        let ik = MockIkOracle { dof: 3, solutions_per_pose: 2 };
        let collision = MockCollisionOracle::free();
        let poses = vec![pose(0.0), pose(1.0), pose(2.0)];
        let g = build_ladder_graph(&poses, &ik, &collision, None).unwrap();
        assert_eq!(g.rung_count(), 3);
        for r in 0..3 {
            assert_eq!(g.vert_count(r), 2);
        }
        assert_eq!(g.edges(0, 0).len(), 2);
        assert!(g.edges(2, 0).is_empty(), "last rung has no outgoing edges");
    }

    #[test]
    fn empty_rung_is_reported_with_waypoint_index() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 1 };
        let collision = MockCollisionOracle { forbidden: vec![(f64::NEG_INFINITY, f64::INFINITY)] };
        let poses = vec![pose(0.0), pose(1.0)];
        let err = build_ladder_graph(&poses, &ik, &collision, None).unwrap_err();
        assert!(matches!(err, LadderGraphError::EmptyRung { waypoint: 0 }));
    }

    #[test]
    fn wrong_dof_solution_is_reported_as_oracle_error() {
        struct WrongDofIk;
        impl IkOracle for WrongDofIk {
            fn solve(&self, _pose: &Pose) -> Vec<JointVector> {
                vec![vec![0.0, 0.0, 0.0]]
            }
            fn dof(&self) -> usize {
                2
            }
        }
        let collision = MockCollisionOracle::free();
        let err = build_ladder_graph(&[pose(0.0)], &WrongDofIk, &collision, None).unwrap_err();
        match err {
            LadderGraphError::Oracle(crate::error::OracleError::WrongDof { expected, got }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 3);
            }
            other => panic!("expected OracleError::WrongDof, got {other:?}"),
        }
    }

    #[test]
    fn append_wires_full_bipartite_boundary() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let collision = MockCollisionOracle::free();
        let mut a = build_ladder_graph(&[pose(0.0), pose(1.0)], &ik, &collision, None).unwrap();
        let b = build_ladder_graph(&[pose(2.0), pose(3.0)], &ik, &collision, None).unwrap();
        a.append(b).unwrap();
        assert_eq!(a.rung_count(), 4);
        assert_eq!(a.edges(1, 0).len(), 2, "boundary rung gets a fresh bipartite edge set");
    }

    #[test]
    fn edges_only_between_consecutive_rungs() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let collision = MockCollisionOracle::free();
        let g = build_ladder_graph(&[pose(0.0), pose(1.0), pose(2.0)], &ik, &collision, None).unwrap();
        for r in 0..g.rung_count() - 1 {
            let next_size = g.vert_count(r + 1);
            for v in 0..g.vert_count(r) {
                for edge in g.edges(r, v) {
                    assert!(edge.to < next_size, "edge target must index into the very next rung");
                }
            }
        }
        for v in 0..g.vert_count(g.rung_count() - 1) {
            assert!(g.edges(g.rung_count() - 1, v).is_empty(), "last rung has no outgoing edges");
        }
    }

    #[test]
    fn append_cost_bound() {
        use crate::dag_search::DagSearch;

        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let collision = MockCollisionOracle::free();
        let g1 = build_ladder_graph(&[pose(0.0), pose(1.0)], &ik, &collision, None).unwrap();
        let g2 = build_ladder_graph(&[pose(2.0), pose(3.0)], &ik, &collision, None).unwrap();

        let cost1 = DagSearch::new(&g1).run();
        let cost2 = DagSearch::new(&g2).run();

        let min_boundary_edge = {
            let mut best = f64::INFINITY;
            let last = g1.rung_count() - 1;
            for v in 0..g1.vert_count(last) {
                let from = g1.vert_data(last, v);
                for w in 0..g2.vert_count(0) {
                    let to = g2.vert_data(0, w);
                    let cost: f64 = from.iter().zip(to).map(|(a, b)| (a - b).abs()).sum();
                    best = best.min(cost);
                }
            }
            best
        };

        let g1_rung_count = g1.rung_count();
        let g1_vert_total: usize = (0..g1_rung_count).map(|r| g1.vert_count(r)).sum();
        let g2_rung_count = g2.rung_count();
        let g2_vert_total: usize = (0..g2_rung_count).map(|r| g2.vert_count(r)).sum();

        let mut combined = g1.clone();
        combined.append(g2).unwrap();
        let combined_cost = DagSearch::new(&combined).run();
        let combined_vert_total: usize = (0..combined.rung_count()).map(|r| combined.vert_count(r)).sum();

        assert_eq!(combined.rung_count(), g1_rung_count + g2_rung_count);
        assert_eq!(combined_vert_total, g1_vert_total + g2_vert_total, "append conserves every vertex");
        assert!(
            combined_cost >= cost1 + min_boundary_edge + cost2 - 1e-9,
            "appended shortest path can never be cheaper than crossing the boundary"
        );
    }

    #[test]
    fn concat_vertical_shifts_edge_targets() {
        let ik = MockIkOracle { dof: 2, solutions_per_pose: 2 };
        let collision = MockCollisionOracle::free();
        let mut above = build_ladder_graph(&[pose(0.0), pose(1.0)], &ik, &collision, None).unwrap();
        let above_next_size = above.vert_count(1);
        let below = build_ladder_graph(&[pose(10.0), pose(11.0)], &ik, &collision, None).unwrap();
        above.concat_vertical(below).unwrap();
        assert_eq!(above.vert_count(0), 4);
        assert_eq!(above.vert_count(1), 4);
        let shifted_edge = above.edges(0, above_next_size)[0];
        assert!(shifted_edge.to >= above_next_size);
    }

    #[test]
    fn mismatched_dof_on_append_errors() {
        let mut a = LadderGraph::new(3);
        a.push_rung(vec![vec![0.0, 0.0, 0.0]], None);
        let b = LadderGraph::new(2);
        assert!(a.append(b).is_err());
    }
}
