//! Error kinds for every planner stage.
//!
//! Manual `Display` impls, matching the teacher's `geom4::volume::VolumeError`
//! — this crate's library code never reaches for `thiserror`, same as the
//! teacher's own library crate.

use std::fmt;

use crate::assembly_network::UngroundedElements;
use crate::geometry::ElementId;

/// Errors from the assembly sequence CSP (spec §7 "Infeasible shape").
#[derive(Debug, Clone)]
pub enum CspError {
    /// No assignment exists; carries the deepest partial assignment reached
    /// for diagnostics, per spec §7.
    Infeasible { deepest_partial: Vec<ElementId> },
    /// The search's deadline passed before a complete assignment was found.
    DeadlineExceeded { best_partial: Vec<ElementId> },
}

impl fmt::Display for CspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CspError::Infeasible { deepest_partial } => write!(
                f,
                "no feasible assembly sequence exists (deepest partial assignment: {} elements)",
                deepest_partial.len()
            ),
            CspError::DeadlineExceeded { best_partial } => write!(
                f,
                "CSP deadline exceeded with {} elements assigned",
                best_partial.len()
            ),
        }
    }
}

impl std::error::Error for CspError {}

/// Errors from ladder graph construction (spec §7 "IK-empty rung").
#[derive(Debug, Clone)]
pub enum LadderGraphError {
    /// Some waypoint has zero collision-free IK solutions.
    EmptyRung { waypoint: usize },
    /// Two graphs being appended/concatenated disagree on dof or rung count.
    Mismatched { reason: &'static str },
    /// An IK oracle call violated its contract (spec §7).
    Oracle(OracleError),
}

impl fmt::Display for LadderGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LadderGraphError::EmptyRung { waypoint } => {
                write!(f, "ladder graph build failed: waypoint {waypoint} has no collision-free IK solution")
            }
            LadderGraphError::Mismatched { reason } => {
                write!(f, "ladder graph mismatch: {reason}")
            }
            LadderGraphError::Oracle(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LadderGraphError {}

impl From<OracleError> for LadderGraphError {
    fn from(e: OracleError) -> Self {
        LadderGraphError::Oracle(e)
    }
}

/// Errors from the sparse ladder graph (spec §7 "Rung sampling timeout").
#[derive(Debug, Clone)]
pub enum SparseGraphError {
    /// Phase 1 could not find any feasible orientation sample for an element
    /// within its per-rung timeout budget.
    RungSamplingTimeout { element_index: usize },
    /// An IK oracle call violated its contract (spec §7).
    Oracle(OracleError),
}

impl fmt::Display for SparseGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SparseGraphError::RungSamplingTimeout { element_index } => write!(
                f,
                "ladder build failed at element {element_index}: no feasible orientation sample within timeout"
            ),
            SparseGraphError::Oracle(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SparseGraphError {}

impl From<OracleError> for SparseGraphError {
    fn from(e: OracleError) -> Self {
        SparseGraphError::Oracle(e)
    }
}

/// Oracle contract violations (spec §7 "Oracle contract violation"): fatal,
/// always propagated, never caught by the planner.
#[derive(Debug, Clone)]
pub enum OracleError {
    WrongDof { expected: usize, got: usize },
    CollisionCheckFailed,
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::WrongDof { expected, got } => {
                write!(f, "IK oracle returned dof {got}, expected {expected}")
            }
            OracleError::CollisionCheckFailed => write!(f, "collision oracle call failed"),
        }
    }
}

impl std::error::Error for OracleError {}

/// Top-level error for the crate's single `plan(...)` entry point.
#[derive(Debug, Clone)]
pub enum PlanError {
    Network(UngroundedElements),
    Csp(CspError),
    Sparse(SparseGraphError),
    Ladder(LadderGraphError),
    Oracle(OracleError),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Network(e) => write!(f, "{e}"),
            PlanError::Csp(e) => write!(f, "{e}"),
            PlanError::Sparse(e) => write!(f, "{e}"),
            PlanError::Ladder(e) => write!(f, "{e}"),
            PlanError::Oracle(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<UngroundedElements> for PlanError {
    fn from(e: UngroundedElements) -> Self {
        PlanError::Network(e)
    }
}
impl From<CspError> for PlanError {
    fn from(e: CspError) -> Self {
        PlanError::Csp(e)
    }
}
impl From<SparseGraphError> for PlanError {
    fn from(e: SparseGraphError) -> Self {
        PlanError::Sparse(e)
    }
}
impl From<LadderGraphError> for PlanError {
    fn from(e: LadderGraphError) -> Self {
        PlanError::Ladder(e)
    }
}
impl From<OracleError> for PlanError {
    fn from(e: OracleError) -> Self {
        PlanError::Oracle(e)
    }
}
