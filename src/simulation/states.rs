//! Core state types for the N-body simulation.
//!
//! - `Body` is a point mass with a position and velocity in 3D.
//! - `SimulationState` holds the ordered list of bodies, the current
//!   simulation time `t`, the number of completed steps and the run
//!   parameters the state is integrated with.
//!
//! Body order is stable for the lifetime of a state; indices into `bodies`
//! are what the force engine uses to identify pairs.

use crate::simulation::engine::Engine;
use crate::simulation::math::{is_finite_vec, NVec3};
use crate::simulation::params::Parameters;

#[derive(Debug, PartialEq)]
pub struct Body {
    pub name: String, // identity, defaults to "body-<index>"
    pub x: NVec3, // position
    pub v: NVec3, // velocity
    pub m: f64, // mass
}

impl Body {
    pub fn new(name: impl Into<String>, m: f64, x: NVec3, v: NVec3) -> Self {
        Self {
            name: name.into(),
            x,
            v,
            m,
        }
    }

    /// True when mass, position and velocity are all finite
    pub fn is_finite(&self) -> bool {
        self.m.is_finite() && is_finite_vec(&self.x) && is_finite_vec(&self.v)
    }
}

#[derive(Debug, PartialEq)]
pub struct SimulationState {
    pub bodies: Vec<Body>, // collection of bodies
    pub t: f64, // time
    pub steps: u64, // completed steps
    pub parameters: Parameters,
    pub engine: Engine,
}

impl SimulationState {
    /// New state at `t = 0` with no steps taken
    pub fn new(bodies: Vec<Body>, parameters: Parameters, engine: Engine) -> Self {
        Self {
            bodies,
            t: 0.0,
            steps: 0,
            parameters,
            engine,
        }
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Index of the first body carrying a non-finite component, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.bodies.iter().position(|b| !b.is_finite())
    }
}

// `clone_from` reuses the existing allocations; the controller copies the
// live state into a candidate buffer once per step.

impl Clone for Body {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            x: self.x,
            v: self.v,
            m: self.m,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.name.clone_from(&source.name);
        self.x = source.x;
        self.v = source.v;
        self.m = source.m;
    }
}

impl Clone for SimulationState {
    fn clone(&self) -> Self {
        Self {
            bodies: self.bodies.clone(),
            t: self.t,
            steps: self.steps,
            parameters: self.parameters,
            engine: self.engine,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.bodies.clone_from(&source.bodies);
        self.t = source.t;
        self.steps = source.steps;
        self.parameters = source.parameters;
        self.engine = source.engine;
    }
}
