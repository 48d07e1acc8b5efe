//! The Assembly Sequence CSP (spec §4.2): orders elements such that each one
//! is reachable by the robot given everything already (or not yet) placed as
//! obstacles.
//!
//! Grounded in `pychoreo/choreo/assembly_csp.py::AssemblyCSP`: the `alldiff`
//! / `connect` / `exist_valid_ee_pose` constraint triplet, the
//! `support_pruning`/`suppose`/`restore` trail protocol, and the
//! `cmaps_value_ordering`/`traversal_to_ground_value_ordering` heuristics are
//! all reproduced in meaning. The trail-of-decisions idiom additionally
//! follows `aries_backtrack::Trail`'s push/save/restore shape, and the
//! explicit-state recursive search follows `oriented_edge::dfs::DfsRunner`.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::assembly_network::AssemblyNetwork;
use crate::collision_pruner;
use crate::config::PlannerConfig;
use crate::direction_map::{bucket_angles, direction_from_index, direction_to_pose, DirectionMap, DirectionMapDelta};
use crate::error::CspError;
use crate::geometry::{ElementId, JointVector, LayerId, Point};
use crate::oracles::{CollisionOracle, EndEffectorCollisionOracle, IkOracle};

/// Which end of the build order the search fills in first (spec §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

/// One suppose()'s worth of state changes, undone in one `restore()` call.
struct CspDecision {
    domain_removals: Vec<(usize, ElementId)>,
    cmap_deltas: Vec<(ElementId, DirectionMapDelta)>,
}

enum SearchOutcome {
    Complete(Vec<ElementId>),
    Exhausted,
    DeadlineExceeded,
}

/// The backtracking search over build-order variables, one per element
/// (spec §4.2).
pub struct SequenceCsp<'a> {
    net: &'a AssemblyNetwork,
    direction: SearchDirection,
    ee_collision: &'a dyn EndEffectorCollisionOracle,
    ik: &'a dyn IkOracle,
    collision: &'a dyn CollisionOracle,
    check_ik_during_pruning: bool,
    phi_disc: usize,
    theta_disc: usize,
    curr_domains: Vec<Vec<ElementId>>,
    cmaps: HashMap<ElementId, DirectionMap>,
    assignment: Vec<ElementId>,
    deepest_partial: Vec<ElementId>,
    nassigns: u32,
    nbacktracks: u32,
    assign_log: Vec<ElementId>,
}

impl<'a> SequenceCsp<'a> {
    pub fn new(
        net: &'a AssemblyNetwork,
        direction: SearchDirection,
        ee_collision: &'a dyn EndEffectorCollisionOracle,
        ik: &'a dyn IkOracle,
        collision: &'a dyn CollisionOracle,
        cfg: &PlannerConfig,
    ) -> Self {
        let mut layer_ids: Vec<LayerId> = net.layer_ids();
        if direction == SearchDirection::Backward {
            layer_ids.reverse();
        }

        let mut curr_domains = Vec::new();
        for layer in layer_ids {
            let elements = net.layer_elements(layer).to_vec();
            for _ in 0..elements.len() {
                curr_domains.push(elements.clone());
            }
        }

        let cmaps = net
            .element_ids()
            .map(|id| (*id, DirectionMap::all_feasible(cfg.direction_count())))
            .collect();

        Self {
            net,
            direction,
            ee_collision,
            ik,
            collision,
            check_ik_during_pruning: cfg.check_ik_during_pruning,
            phi_disc: cfg.phi_disc,
            theta_disc: cfg.theta_disc,
            curr_domains,
            cmaps,
            assignment: Vec::new(),
            deepest_partial: Vec::new(),
            nassigns: 0,
            nbacktracks: 0,
            assign_log: Vec::new(),
        }
    }

    pub fn nassigns(&self) -> u32 {
        self.nassigns
    }

    pub fn nbacktracks(&self) -> u32 {
        self.nbacktracks
    }

    pub fn assign_log(&self) -> &[ElementId] {
        &self.assign_log
    }

    /// The approach directions still feasible for `id` in its final
    /// (post-solve) direction map, as `(phi, theta)` radians — the candidate
    /// set the sparse ladder graph samples from for this element.
    pub fn feasible_directions(&self, id: ElementId) -> Vec<(f64, f64)> {
        self.cmaps[&id]
            .iter_feasible()
            .map(|index| {
                let (phi_i, theta_i) = direction_from_index(index, self.theta_disc);
                bucket_angles(phi_i, theta_i, self.phi_disc, self.theta_disc)
            })
            .collect()
    }

    /// Run the search to completion or until `deadline` passes.
    pub fn solve(&mut self, deadline: Option<Instant>) -> Result<Vec<ElementId>, CspError> {
        match self.backtrack(deadline) {
            SearchOutcome::Complete(order) => Ok(order),
            SearchOutcome::Exhausted => Err(CspError::Infeasible {
                deepest_partial: self.deepest_partial.clone(),
            }),
            SearchOutcome::DeadlineExceeded => Err(CspError::DeadlineExceeded {
                best_partial: self.deepest_partial.clone(),
            }),
        }
    }

    fn backtrack(&mut self, deadline: Option<Instant>) -> SearchOutcome {
        if self.assignment.len() > self.deepest_partial.len() {
            self.deepest_partial = self.assignment.clone();
        }
        if self.assignment.len() == self.curr_domains.len() {
            return SearchOutcome::Complete(self.assignment.clone());
        }
        if let Some(dl) = deadline {
            if Instant::now() >= dl {
                return SearchOutcome::DeadlineExceeded;
            }
        }

        let var = self.assignment.len();
        for value in self.ordered_candidates(var) {
            if !self.is_consistent(var, value) {
                continue;
            }
            self.assignment.push(value);
            self.nassigns += 1;
            self.assign_log.push(value);
            let decision = self.suppose(var, value);

            match self.backtrack(deadline) {
                SearchOutcome::Complete(order) => return SearchOutcome::Complete(order),
                SearchOutcome::DeadlineExceeded => return SearchOutcome::DeadlineExceeded,
                SearchOutcome::Exhausted => {
                    self.restore(decision);
                    self.assignment.pop();
                    self.nbacktracks += 1;
                    tracing::debug!(var, value = value.0, "backtrack");
                }
            }
        }
        SearchOutcome::Exhausted
    }

    fn ordered_candidates(&self, var: usize) -> Vec<ElementId> {
        let mut candidates = self.curr_domains[var].clone();
        match self.direction {
            SearchDirection::Forward => {
                candidates.sort_by_key(|v| self.cmaps[v].count_feasible());
            }
            SearchDirection::Backward => {
                candidates.sort_by(|a, b| {
                    self.net
                        .distance_to_ground(*b)
                        .cmp(&self.net.distance_to_ground(*a))
                });
            }
        }
        candidates
    }

    fn is_consistent(&self, _var: usize, value: ElementId) -> bool {
        self.constraint_alldiff(value) && self.constraint_connectivity(value) && self.exists_valid_orientation(value)
    }

    fn constraint_alldiff(&self, value: ElementId) -> bool {
        !self.assignment.contains(&value)
    }

    /// Spec §4.2 "Connectivity": forward requires grounded-or-adjacent;
    /// backward additionally accepts any element not yet placed — evaluated
    /// over the state *before* this decision, so `value` itself counts —
    /// being grounded (spec §9's documented relaxation, kept as-is).
    fn constraint_connectivity(&self, value: ElementId) -> bool {
        let placed: HashSet<ElementId> = self.assignment.iter().copied().collect();
        match self.direction {
            SearchDirection::Forward => self.net.is_grounded(value) || self.net.adjacent_to_any(value, &placed),
            SearchDirection::Backward => {
                if self.net.adjacent_to_any(value, &placed) {
                    return true;
                }
                self.net
                    .element_ids()
                    .any(|id| !placed.contains(id) && self.net.is_grounded(*id))
            }
        }
    }

    /// Spec §4.2 "exist_valid_ee_pose": prune a local copy of `value`'s cmap
    /// against currently-relevant obstacle bodies and, if configured,
    /// require at least one surviving direction to have a collision-free IK
    /// solution.
    fn exists_valid_orientation(&self, value: ElementId) -> bool {
        let cmap = &self.cmaps[&value];
        if cmap.is_empty() {
            return false;
        }
        let (p1, p2) = self.net.element_endpoints(value);
        let mut working = cmap.clone();

        match self.direction {
            SearchDirection::Forward => {
                for &placed_id in &self.assignment {
                    let blocking_body = &self.net.element(placed_id).body;
                    let (pruned, _delta) = collision_pruner::prune(
                        p1,
                        p2,
                        &working,
                        self.ee_collision,
                        blocking_body,
                        None,
                        self.phi_disc,
                        self.theta_disc,
                    );
                    working = pruned;
                    if working.is_empty() {
                        return false;
                    }
                }
            }
            SearchDirection::Backward => {
                let placed: HashSet<ElementId> = self.assignment.iter().copied().collect();
                let mut unassigned: Vec<ElementId> = self
                    .net
                    .element_ids()
                    .copied()
                    .filter(|id| *id != value && !placed.contains(id))
                    .collect();
                unassigned.sort_by_key(|id| id.0);
                let bodies: Vec<&crate::geometry::RigidBody> =
                    unassigned.iter().map(|id| &self.net.element(*id).body).collect();
                let (pruned, _delta) = collision_pruner::prune_batch(
                    p1,
                    p2,
                    &working,
                    self.ee_collision,
                    &bodies,
                    None,
                    self.phi_disc,
                    self.theta_disc,
                );
                working = pruned;
                if working.is_empty() {
                    return false;
                }
            }
        }

        if self.check_ik_during_pruning {
            self.has_collision_free_ik_at(&working, p1, p2)
        } else {
            true
        }
    }

    fn has_collision_free_ik_at(&self, cmap: &DirectionMap, p1: Point, p2: Point) -> bool {
        let mid = nalgebra::center(&p1, &p2);
        cmap.iter_feasible().any(|index| {
            let (phi_i, theta_i) = direction_from_index(index, self.theta_disc);
            let (phi, theta) = bucket_angles(phi_i, theta_i, self.phi_disc, self.theta_disc);
            let pose = direction_to_pose(mid, phi, theta, 0.0);
            self.ik
                .solve(&pose)
                .iter()
                .any(|joints: &JointVector| !self.collision.in_collision(joints))
        })
    }

    /// Commit `value` to `var`: propagate alldiff domain removals and, for
    /// forward search, persist a collision-map pruning pass against the
    /// newly placed element (spec §4.2's `support_pruning`).
    fn suppose(&mut self, var: usize, value: ElementId) -> CspDecision {
        let cmap_deltas = if self.direction == SearchDirection::Forward {
            self.support_prune_forward(value)
        } else {
            Vec::new()
        };

        let mut domain_removals = Vec::new();
        let old_domain = std::mem::replace(&mut self.curr_domains[var], vec![value]);
        for a in old_domain {
            if a != value {
                domain_removals.push((var, a));
            }
        }
        for var2 in (var + 1)..self.curr_domains.len() {
            if let Some(pos) = self.curr_domains[var2].iter().position(|&v| v == value) {
                self.curr_domains[var2].remove(pos);
                domain_removals.push((var2, value));
            }
        }

        CspDecision {
            domain_removals,
            cmap_deltas,
        }
    }

    /// Per spec §9's documented literal behavior: on the very first
    /// decision, additionally prune the newly-placed element's own cmap
    /// against the static context (reproduces the source's `assignment[0]`
    /// self-append workaround).
    fn support_prune_forward(&mut self, value: ElementId) -> Vec<(ElementId, DirectionMapDelta)> {
        let placed: HashSet<ElementId> = self.assignment.iter().copied().collect();
        let mut targets: Vec<ElementId> = self
            .net
            .element_ids()
            .copied()
            .filter(|id| !placed.contains(id))
            .collect();
        targets.sort_by_key(|id| id.0);
        if self.assignment.len() == 1 {
            targets.push(value);
        }

        let blocking_body = self.net.element(value).body.clone();
        let mut deltas = Vec::new();
        for target in targets {
            let (p1, p2) = self.net.element_endpoints(target);
            let cmap = self.cmaps[&target].clone();
            let (pruned, delta) = collision_pruner::prune(
                p1,
                p2,
                &cmap,
                self.ee_collision,
                &blocking_body,
                None,
                self.phi_disc,
                self.theta_disc,
            );
            if !delta.is_empty() {
                self.cmaps.insert(target, pruned);
                deltas.push((target, delta));
            }
        }
        deltas
    }

    fn restore(&mut self, decision: CspDecision) {
        for (var2, value) in decision.domain_removals.into_iter().rev() {
            self.curr_domains[var2].push(value);
        }
        for (e_id, delta) in decision.cmap_deltas {
            self.cmaps.get_mut(&e_id).unwrap().restore_delta(&delta);
        }
    }
}
