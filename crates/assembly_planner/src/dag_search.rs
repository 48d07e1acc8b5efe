//! Shortest path over a `LadderGraph` by forward dynamic programming (spec
//! §4.3 "DAG Search").
//!
//! Grounded in `pychoreo/choreo/sc_cartesian_planner.py::SolutionRung` and
//! `DAGSearch`: rung 0's distance initializes to 0, every later rung to
//! infinity, then edges relax rung-by-rung; `shortest_path` back-traces
//! predecessors from the last rung's minimum-distance vertex.

use crate::ladder_graph::LadderGraph;

#[derive(Clone, Debug)]
struct SolutionRung {
    distance: Vec<f64>,
    predecessor: Vec<usize>,
}

impl SolutionRung {
    fn new(n_verts: usize) -> Self {
        Self { distance: vec![f64::INFINITY; n_verts], predecessor: vec![0; n_verts] }
    }

    fn extract_min(&self) -> (f64, usize) {
        let mut min_id = 0;
        let mut min_dist = self.distance[0];
        for (i, &d) in self.distance.iter().enumerate().skip(1) {
            if d < min_dist {
                min_dist = d;
                min_id = i;
            }
        }
        (min_dist, min_id)
    }
}

/// A single forward-DP shortest-path solve over one `LadderGraph`.
pub struct DagSearch<'a> {
    graph: &'a LadderGraph,
    solution: Vec<SolutionRung>,
}

impl<'a> DagSearch<'a> {
    pub fn new(graph: &'a LadderGraph) -> Self {
        let solution = (0..graph.rung_count())
            .map(|r| SolutionRung::new(graph.vert_count(r)))
            .collect();
        Self { graph, solution }
    }

    /// Propagate costs forward; returns the total minimum cost.
    pub fn run(&mut self) -> f64 {
        if self.solution.is_empty() {
            return 0.0;
        }
        for d in &mut self.solution[0].distance {
            *d = 0.0;
        }
        for r_id in 0..self.solution.len().saturating_sub(1) {
            let next_r_id = r_id + 1;
            for v_id in 0..self.graph.vert_count(r_id) {
                let u_cost = self.solution[r_id].distance[v_id];
                if !u_cost.is_finite() {
                    continue;
                }
                for edge in self.graph.edges(r_id, v_id) {
                    let dv = u_cost + edge.cost;
                    if dv < self.solution[next_r_id].distance[edge.to] {
                        self.solution[next_r_id].distance[edge.to] = dv;
                        self.solution[next_r_id].predecessor[edge.to] = v_id;
                    }
                }
            }
        }
        self.solution.last().unwrap().extract_min().0
    }

    /// Back-trace the minimum-cost path; one joint vector per rung. Empty
    /// if the graph has no rungs.
    pub fn shortest_path(&self) -> Vec<Vec<f64>> {
        let n_rungs = self.solution.len();
        if n_rungs == 0 {
            return Vec::new();
        }
        let mut path_idx = vec![0usize; n_rungs];
        let (_, min_id) = self.solution[n_rungs - 1].extract_min();
        path_idx[n_rungs - 1] = min_id;
        for r in (0..n_rungs - 1).rev() {
            path_idx[r] = self.solution[r + 1].predecessor[path_idx[r + 1]];
        }
        path_idx
            .into_iter()
            .enumerate()
            .map(|(r_id, v_id)| self.graph.vert_data(r_id, v_id).to_vec())
            .collect()
    }
}
