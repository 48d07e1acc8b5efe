//! The persistent JSON solve log (spec §6 "Persistent logs").
//!
//! Grounded in the teacher CLI's `provenance::write_sidecar`/`report()`
//! JSON-via-`serde_json` idiom, moved into the library proper since here the
//! core planner itself — not an excluded CLI layer — produces the log.

use std::io::{self, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::ElementId;

/// One completed (or failed) assembly-sequence solve, serialized as a single
/// JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveLog {
    pub shape_name: String,
    pub element_count: usize,
    pub grounded_count: usize,
    pub assignment_count: usize,
    pub backtrack_count: u32,
    pub assignment_history: Vec<ElementId>,
    pub solve_time_secs: f64,
}

impl SolveLog {
    pub fn new(
        shape_name: impl Into<String>,
        element_count: usize,
        grounded_count: usize,
        assignment_history: Vec<ElementId>,
        backtrack_count: u32,
        solve_time: Duration,
    ) -> Self {
        Self {
            shape_name: shape_name.into(),
            element_count,
            grounded_count,
            assignment_count: assignment_history.len(),
            backtrack_count,
            assignment_history,
            solve_time_secs: solve_time.as_secs_f64(),
        }
    }

    pub fn to_writer_pretty<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }

    pub fn write_to_path(&self, path: impl AsRef<std::path::Path>) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer_pretty(file).map_err(io::Error::from)
    }
}
