//! Discretized end-effector approach-direction feasibility bitmap (spec
//! §3's "Direction Map / cmap", §4.1).
//!
//! The direction grid is φ ∈ [0, 2π) in `phi_disc` steps, θ ∈ [0, π) in
//! `theta_disc` steps, flattened as `phi_i * theta_disc + theta_i`. Backed
//! by `fixedbitset::FixedBitSet` (adopted from `plaans-aries`, which reaches
//! for the same crate for its own CSP-adjacent domains, since the teacher's
//! own strict-geometry modules never needed a compact bitset).

use std::f64::consts::PI;

use fixedbitset::FixedBitSet;

use crate::geometry::Pose;
use nalgebra::{Isometry3, UnitQuaternion, Vector3};

/// Flat bit index for direction bucket `(phi_i, theta_i)`.
#[inline]
pub fn direction_index(phi_i: usize, theta_i: usize, theta_disc: usize) -> usize {
    phi_i * theta_disc + theta_i
}

/// Inverse of `direction_index`.
#[inline]
pub fn direction_from_index(index: usize, theta_disc: usize) -> (usize, usize) {
    (index / theta_disc, index % theta_disc)
}

/// Bucket centers in radians for a `(phi_i, theta_i)` pair.
#[inline]
pub fn bucket_angles(phi_i: usize, theta_i: usize, phi_disc: usize, theta_disc: usize) -> (f64, f64) {
    let phi = (phi_i as f64 + 0.5) * (2.0 * PI / phi_disc as f64);
    let theta = (theta_i as f64 + 0.5) * (PI / theta_disc as f64);
    (phi, theta)
}

/// Map a discretized `(phi, theta)` approach direction plus a yaw about the
/// approach axis into an end-effector pose at `origin`. The mapping from
/// (φ, θ) to an orientation is fixed and implementation-defined but
/// consistent across all uses within one run, per spec §6.
pub fn direction_to_pose(origin: crate::geometry::Point, phi: f64, theta: f64, yaw: f64) -> Pose {
    // Spherical direction vector, then align the end-effector's approach
    // axis (+z) with it, followed by a yaw rotation about that axis.
    let approach = Vector3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
    let align = UnitQuaternion::rotation_between(&Vector3::z(), &approach)
        .unwrap_or_else(UnitQuaternion::identity);
    let spin = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw);
    Isometry3::from_parts(origin.coords.into(), align * spin)
}

/// A per-element feasibility bitmap over the discretized direction grid.
///
/// Monotone invariant (spec §3): within a scope, bits only go 1→0;
/// restoring a previously saved delta is the only way a bit returns to 1.
#[derive(Clone, Debug)]
pub struct DirectionMap {
    bits: FixedBitSet,
}

impl DirectionMap {
    /// A fully-feasible map over `len` directions.
    pub fn all_feasible(len: usize) -> Self {
        let mut bits = FixedBitSet::with_capacity(len);
        bits.set_range(.., true);
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.count_ones(..) == 0
    }

    pub fn count_feasible(&self) -> usize {
        self.bits.count_ones(..)
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.bits.contains(index)
    }

    pub fn iter_feasible(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.ones()
    }

    /// Clear `index`. Returns whether the bit was previously set (i.e.
    /// whether this call actually changed anything).
    pub fn clear(&mut self, index: usize) -> bool {
        let was_set = self.bits.contains(index);
        self.bits.set(index, false);
        was_set
    }

    /// Apply a previously recorded delta (the bits a `clear` cleared),
    /// restoring them to 1. This is the only way bits return to 1 (spec §3).
    pub fn restore_delta(&mut self, delta: &DirectionMapDelta) {
        for &index in &delta.cleared {
            self.bits.set(index, true);
        }
    }
}

/// The set of bit positions a pruning pass cleared, recorded so the CSP's
/// suppose/restore stack can undo it exactly (spec §4.2 "Undo").
#[derive(Clone, Debug, Default)]
pub struct DirectionMapDelta {
    pub cleared: Vec<usize>,
}

impl DirectionMapDelta {
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty()
    }
}
