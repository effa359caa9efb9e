//! Configuration types for loading simulation scenarios.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – integrator kind and Barnes–Hut options
//! - [`ParametersConfig`] – numerical parameters and physical constants
//! - [`BodyConfig`]       – initial state for each body
//! - [`ScenarioConfig`]   – top-level wrapper
//!
//! # YAML format
//! ```yaml
//! engine:
//!   integrator: "leapfrog"  # or "rk4"
//!   barnes_hut: false
//!   theta: 0.5
//!
//! parameters:
//!   dt: 0.01                # fixed step size
//!   G: 1.0                  # defaults to the SI constant
//!   softening: 0.0          # defaults to 1e-3
//!   t_end: 10.0             # optional
//!
//! bodies:
//!   - name: "a"
//!     m: 1.0
//!     x: [ -0.5, 0.0, 0.0 ]
//!     v: [  0.0, -0.7071067811865476, 0.0 ]
//!   - name: "b"
//!     m: 1.0
//!     x: [  0.5, 0.0, 0.0 ]
//!     v: [  0.0, 0.7071067811865476, 0.0 ]
//! ```
//!
//! Parsing the document is left to the caller (the binary uses `serde_yaml`);
//! [`crate::simulation::scenario::build_state`] validates the parsed result
//! and maps it into a runtime [`crate::SimulationState`].

#![allow(non_snake_case)]

use serde::Deserialize;

use crate::simulation::integrator::IntegratorKind;

/// High-level engine configuration
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub integrator: IntegratorKind, // Time integrator used for advancing the system state
    #[serde(default)]
    pub barnes_hut: bool, // `true` - approximate gravity with an octree, `false` - direct N^2 summation
    pub theta: Option<f64>, // Opening angle; a node is aggregated when size / distance < theta
}

/// Global numerical and physical parameters for a scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ParametersConfig {
    pub dt: f64,           // time step size
    pub G: Option<f64>,    // gravitational constant
    pub softening: Option<f64>, // softening length, prevents singular forces at small separations
    pub t_end: Option<f64>, // stop once simulation time reaches this
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct BodyConfig {
    pub name: Option<String>, // Display name, defaults to "body-<index>"
    pub m: f64,       // Mass of the body
    pub x: [f64; 3],  // Initial position
    pub v: [f64; 3],  // Initial velocity
}

/// Top-level scenario configuration.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig, // Integrator and Barnes–Hut options
    pub parameters: ParametersConfig, // Global numerical and physical parameters
    pub bodies: Vec<BodyConfig>, // Bodies that define the initial state of the system
}
