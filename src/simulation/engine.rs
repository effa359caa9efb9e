//! High-level runtime engine settings
//!
//! Selects the integrator and the Barnes–Hut options used when building the
//! force set for a `SimulationState`

use crate::simulation::integrator::IntegratorKind;

/// Opening angle used when a scenario asks for Barnes–Hut without giving one
pub const DEFAULT_THETA: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engine {
    pub integrator: IntegratorKind, // leapfrog or rk4
    pub barnes_hut: bool, // false = direct, true = barnes-hut
    pub theta: f64, // parameter to determine if use center of mass
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            integrator: IntegratorKind::default(),
            barnes_hut: false,
            theta: DEFAULT_THETA,
        }
    }
}
