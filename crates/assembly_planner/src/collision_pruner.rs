//! Removes end-effector direction bits that collide with a blocking body
//! (spec §4.1).
//!
//! Grounded in `pychoreo`'s `update_collision_map`/`update_collision_map_batch`
//! (called from `assembly_csp.py` but defined in the filtered-out
//! `choreo_utils`; behavior reconstructed from every call site: prune against
//! a sampled set of end-effector poses along the element, optionally also
//! requiring a collision-free IK solution).

use crate::direction_map::{bucket_angles, direction_index, direction_to_pose, DirectionMap, DirectionMapDelta};
use crate::geometry::{Element, Point, RigidBody};
use crate::oracles::{CollisionOracle, EndEffectorCollisionOracle, IkOracle};

/// Sample points along an element's deposition path used for pruning.
fn sample_points(element_p1: Point, element_p2: Point, n_samples: usize) -> Vec<Point> {
    if n_samples <= 1 {
        return vec![element_p1, element_p2];
    }
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / (n_samples - 1) as f64;
            element_p1 + (element_p2 - element_p1) * t
        })
        .collect()
}

/// Extra arguments controlling the optional `check_ik` step of `prune`.
pub struct IkCheck<'a> {
    pub ik: &'a dyn IkOracle,
    pub collision: &'a dyn CollisionOracle,
}

/// Remove every direction whose end-effector pose (at a small set of sample
/// points along the subject element) collides with `blocking_body`.
///
/// Monotone: the returned map is bitwise ≤ `cmap` (spec §8).
#[allow(clippy::too_many_arguments)]
pub fn prune(
    subject_p1: Point,
    subject_p2: Point,
    cmap: &DirectionMap,
    ee_collision: &dyn EndEffectorCollisionOracle,
    blocking_body: &RigidBody,
    check_ik: Option<IkCheck<'_>>,
    phi_disc: usize,
    theta_disc: usize,
) -> (DirectionMap, DirectionMapDelta) {
    prune_batch(
        subject_p1,
        subject_p2,
        cmap,
        ee_collision,
        std::slice::from_ref(&blocking_body),
        check_ik,
        phi_disc,
        theta_disc,
    )
}

/// Batch variant: prune against every body in `blocking_bodies` in one pass
/// (spec §4.1 "batch variant").
#[allow(clippy::too_many_arguments)]
pub fn prune_batch(
    subject_p1: Point,
    subject_p2: Point,
    cmap: &DirectionMap,
    ee_collision: &dyn EndEffectorCollisionOracle,
    blocking_bodies: &[&RigidBody],
    check_ik: Option<IkCheck<'_>>,
    phi_disc: usize,
    theta_disc: usize,
) -> (DirectionMap, DirectionMapDelta) {
    let samples = sample_points(subject_p1, subject_p2, 3);
    let mut result = cmap.clone();
    let mut delta = DirectionMapDelta::default();

    for phi_i in 0..phi_disc {
        for theta_i in 0..theta_disc {
            let index = direction_index(phi_i, theta_i, theta_disc);
            if !result.is_set(index) {
                continue;
            }
            let (phi, theta) = bucket_angles(phi_i, theta_i, phi_disc, theta_disc);
            let blocked = samples.iter().any(|&pt| {
                let pose = direction_to_pose(pt, phi, theta, 0.0);
                blocking_bodies
                    .iter()
                    .any(|body| ee_collision.collides(&pose, body))
            }) || (check_ik.is_some()
                && !has_collision_free_ik(&samples, phi, theta, check_ik.as_ref().unwrap()));
            if blocked && result.clear(index) {
                delta.cleared.push(index);
            }
        }
    }
    (result, delta)
}

fn has_collision_free_ik(samples: &[Point], phi: f64, theta: f64, check: &IkCheck<'_>) -> bool {
    samples.iter().all(|&pt| {
        let pose = direction_to_pose(pt, phi, theta, 0.0);
        check
            .ik
            .solve(&pose)
            .iter()
            .any(|joints| !check.collision.in_collision(joints))
    })
}

/// Look up an element's two endpoint positions in the node table.
pub fn element_endpoints(element: &Element, node_points: &[Point]) -> (Point, Point) {
    (
        node_points[element.endpoints.0 .0 as usize],
        node_points[element.endpoints.1 .0 as usize],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracles::mocks::{MockEeCollisionOracle, MockIkOracle};
    use proptest::prelude::*;

    #[test]
    fn prune_against_free_oracle_changes_nothing() {
        let cmap = DirectionMap::all_feasible(16);
        let ee = MockEeCollisionOracle::free();
        let body = RigidBody::new(1, "obstacle");
        let (pruned, delta) = prune(
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            &cmap,
            &ee,
            &body,
            None,
            4,
            4,
        );
        assert!(delta.is_empty());
        assert_eq!(pruned.count_feasible(), cmap.count_feasible());
    }

    #[test]
    fn prune_against_blocking_body_clears_everything() {
        let cmap = DirectionMap::all_feasible(16);
        let body = RigidBody::new(1, "obstacle");
        let ee = MockEeCollisionOracle::blocking([1]);
        let (pruned, delta) = prune(
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            &cmap,
            &ee,
            &body,
            None,
            4,
            4,
        );
        assert!(pruned.is_empty());
        assert_eq!(delta.cleared.len(), 16);
    }

    #[test]
    fn check_ik_clears_directions_with_no_free_solution() {
        let cmap = DirectionMap::all_feasible(16);
        let ee = MockEeCollisionOracle::free();
        let body = RigidBody::new(1, "obstacle");
        let ik = MockIkOracle {
            dof: 4,
            solutions_per_pose: 1,
        };
        struct AlwaysBlocked;
        impl CollisionOracle for AlwaysBlocked {
            fn in_collision(&self, _joints: &crate::geometry::JointVector) -> bool {
                true
            }
        }
        let collision = AlwaysBlocked;
        let (pruned, delta) = prune(
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            &cmap,
            &ee,
            &body,
            Some(IkCheck {
                ik: &ik,
                collision: &collision,
            }),
            4,
            4,
        );
        assert!(pruned.is_empty());
        assert_eq!(delta.cleared.len(), 16);
    }

    proptest! {
        #[test]
        fn prune_is_monotone(blocked in proptest::bool::ANY) {
            let phi_disc = 4;
            let theta_disc = 4;
            let cmap = DirectionMap::all_feasible(phi_disc * theta_disc);
            let body = RigidBody::new(1, "obstacle");
            let ee = if blocked {
                MockEeCollisionOracle::blocking([1])
            } else {
                MockEeCollisionOracle::free()
            };
            let (pruned, _delta) = prune(
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                &cmap,
                &ee,
                &body,
                None,
                phi_disc,
                theta_disc,
            );
            for i in 0..cmap.len() {
                prop_assert!(!pruned.is_set(i) || cmap.is_set(i));
            }
            prop_assert!(pruned.count_feasible() <= cmap.count_feasible());
        }
    }
}
