//! Tabular per-element sub-process export (spec §6 "Outputs" item 4): an
//! optional CSV rendering of a solved trajectory, tagging each waypoint with
//! which phase of an element's deposition it belongs to.
//!
//! `pychoreo` itself has no such export (the PDDL/ROS-process handoff this
//! would feed is downstream of what was retained in `original_source/`), so
//! the column layout — `element_id, layer_id, subprocess, waypoint_index,
//! joint_0..joint_{n-1}` — is this crate's own design (recorded in
//! `DESIGN.md`), written with the `csv` crate the way the rest of this crate
//! reaches for `serde`/`serde_json` rather than hand-rolled formatting.

use std::io;

use crate::geometry::{ElementId, JointVector, LayerId};

/// Which phase of one element's deposition a waypoint belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubProcess {
    Approach,
    Extrude,
    Retreat,
}

impl SubProcess {
    fn as_str(self) -> &'static str {
        match self {
            SubProcess::Approach => "approach",
            SubProcess::Extrude => "extrude",
            SubProcess::Retreat => "retreat",
        }
    }
}

/// One element's waypoints for one sub-process.
#[derive(Clone, Debug)]
pub struct ElementTrajectory {
    pub element_id: ElementId,
    pub layer_id: LayerId,
    pub subprocess: SubProcess,
    pub waypoints: Vec<JointVector>,
}

/// A whole-sequence trajectory, grouped per element and sub-process, ready
/// to render as one flat CSV table.
#[derive(Clone, Debug, Default)]
pub struct SolutionExport {
    pub dof: usize,
    pub rows: Vec<ElementTrajectory>,
}

impl SolutionExport {
    pub fn new(dof: usize) -> Self {
        Self { dof, rows: Vec::new() }
    }

    pub fn push(&mut self, row: ElementTrajectory) {
        self.rows.push(row);
    }

    pub fn to_csv_writer<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["element_id".to_string(), "layer_id".to_string(), "subprocess".to_string(), "waypoint_index".to_string()];
        header.extend((0..self.dof).map(|j| format!("joint_{j}")));
        wtr.write_record(&header)?;

        for row in &self.rows {
            for (i, jt) in row.waypoints.iter().enumerate() {
                let mut record = vec![
                    row.element_id.0.to_string(),
                    row.layer_id.0.to_string(),
                    row.subprocess.as_str().to_string(),
                    i.to_string(),
                ];
                record.extend(jt.iter().map(|v| v.to_string()));
                wtr.write_record(&record)?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}
