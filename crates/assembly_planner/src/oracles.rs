//! IK and collision oracle contracts (spec §6).
//!
//! Both oracles are out of scope to implement — the analytical IK solver and
//! the rigid-body collision checker are treated as pure black boxes — so
//! this module only fixes their interface. `&dyn` trait objects keep the
//! planner decoupled from any concrete solver; callers plug in whatever they
//! have (an FFI binding, an in-process analytical solver, or, in tests, the
//! mocks below).

use crate::geometry::{JointVector, Pose, RigidBody};

/// `ik(tcp_pose) -> list of joint vectors` (empty if unreachable). Must be
/// pure: same pose, same obstacle-free result, every call.
pub trait IkOracle {
    fn solve(&self, pose: &Pose) -> Vec<JointVector>;
    fn dof(&self) -> usize;
}

/// `collision(joint_vector) -> bool`, closed over the robot, a set of
/// obstacle bodies, disabled-collision link pairs, and joint limits. Spec
/// §6: "constructed once per obstacle-set change."
pub trait CollisionOracle {
    fn in_collision(&self, joints: &JointVector) -> bool;
}

/// A cheaper geometric proxy used by the collision pruner (spec §4.1): does
/// the end-effector body, positioned at `pose`, collide with `body`? Unlike
/// `CollisionOracle` this never touches the robot's joint configuration —
/// it is a pose-only check used to cheaply shrink a direction map before
/// falling back to full IK + joint-space collision checking.
pub trait EndEffectorCollisionOracle {
    fn collides(&self, pose: &Pose, body: &RigidBody) -> bool;
}
