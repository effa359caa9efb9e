//! Trajectory recording
//!
//! Appends one JSON line per recorded step. Each entry carries the step,
//! simulation time and, per body, mass, position, velocity and the
//! acceleration acting on it at that instant.

use std::io::Write;

use serde::Serialize;

use crate::simulation::forces::{gravity_for, AccelSet};
use crate::simulation::math::vec_to;
use crate::simulation::states::SimulationState;

/// A single line of the trajectory file.
#[derive(Serialize, Debug)]
pub struct OutputEntry<'a> {
    /// The step this entry represents.
    pub step: u64,

    /// Simulation time at that step.
    pub time: f64,

    /// The collection of bodies.
    pub bodies: Vec<OutputBody<'a>>,
}

/// A body, as written to the trajectory file.
#[derive(Serialize, Debug)]
pub struct OutputBody<'a> {
    pub name: &'a str,
    pub mass: f64,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub acceleration: [f64; 3],
}

/// JSON-lines writer over any `Write` sink
pub struct TrajectoryWriter<W: Write> {
    out: W,
    forces: Option<AccelSet>,
    written: u64,
}

impl<W: Write> TrajectoryWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            forces: None,
            written: 0,
        }
    }

    /// Number of entries written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append one entry for `state`
    pub fn record(&mut self, state: &SimulationState) -> std::io::Result<()> {
        let forces = self
            .forces
            .get_or_insert_with(|| gravity_for(&state.parameters, &state.engine));
        let accels = forces.evaluate(&state.bodies);

        let entry = OutputEntry {
            step: state.steps,
            time: state.t,
            bodies: state.bodies.iter().zip(accels.iter()).map(|(b, a)| OutputBody {
                name: &b.name,
                mass: b.m,
                position: vec_to(&b.x),
                velocity: vec_to(&b.v),
                acceleration: vec_to(a),
            }).collect(),
        };

        serde_json::to_writer(&mut self.out, &entry)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
