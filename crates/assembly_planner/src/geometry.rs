//! Core geometric vocabulary: ids, points, poses, and the opaque rigid-body
//! handle the out-of-scope collision oracle operates on.
//!
//! Id types follow the teacher's `oriented_edge::types::{RidgeId, FacetId}`
//! newtype idiom: small `Copy` wrappers around `usize`/`u32` so element and
//! node indices can't be swapped by accident at a call site.

use nalgebra::{Isometry3, Point3};
use serde::{Deserialize, Serialize};

/// Index into the node table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identifier for one deposition element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u32);

/// Build-order layer identifier; ascending for forward search, descending
/// for backward (spec §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub i32);

/// A node's 3D coordinate, meters (scale already applied at load time).
pub type Point = Point3<f64>;

/// A rigid transform: the end-effector TCP pose the IK oracle consumes.
pub type Pose = Isometry3<f64>;

/// Degrees of freedom of the robot's joint space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dof(pub usize);

/// A joint-space configuration, length `dof`.
pub type JointVector = Vec<f64>;

/// Opaque handle to a rigid body in the shared collision scene.
///
/// The planner never inspects a body's geometry; it only ever hands handles
/// back to the collision oracle that produced them (spec §6: the collision
/// oracle is "constructed once per obstacle-set change" and is the only
/// party that understands body contents).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RigidBody {
    pub id: u64,
    pub label: String,
}

impl RigidBody {
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// One linear deposition: a cylinder between two node endpoints.
///
/// Elements are immutable for the lifetime of a plan (spec §3).
#[derive(Clone, Debug)]
pub struct Element {
    pub id: ElementId,
    pub endpoints: (NodeId, NodeId),
    pub layer: LayerId,
    pub body: RigidBody,
}

impl Element {
    pub fn other_endpoint(&self, n: NodeId) -> Option<NodeId> {
        if self.endpoints.0 == n {
            Some(self.endpoints.1)
        } else if self.endpoints.1 == n {
            Some(self.endpoints.0)
        } else {
            None
        }
    }

    pub fn shares_endpoint_with(&self, other: &Element) -> bool {
        let (a0, a1) = self.endpoints;
        let (b0, b1) = other.endpoints;
        a0 == b0 || a0 == b1 || a1 == b0 || a1 == b1
    }
}

/// Linearly interpolate `n_steps + 1` points from `p1` to `p2`, `n_steps =
/// ceil(len / step)`, always including both endpoints. Used both to build
/// collision-pruning sample points (spec §4.1) and cap-rung waypoints (spec
/// §4.4).
pub fn interpolate_straight_line(p1: Point, p2: Point, step: f64) -> Vec<Point> {
    let len = (p2 - p1).norm();
    if len <= f64::EPSILON {
        return vec![p1, p2];
    }
    let n_steps = ((len / step).ceil() as usize).max(1);
    (0..=n_steps)
        .map(|i| {
            let t = i as f64 / n_steps as f64;
            p1 + (p2 - p1) * t
        })
        .collect()
}
