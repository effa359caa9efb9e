//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds the fixed per-run settings:
//! - integration step size `dt`,
//! - gravitational constant `G`,
//! - softening length `eps`,
//! - optional end time `t_end` after which the runner stops on its own

#![allow(non_snake_case)]

/// Newtonian constant of gravitation in SI units (m^3 kg^-1 s^-2)
pub const G_SI: f64 = 6.674_30e-11;

/// Default softening length, in simulation length units
pub const DEFAULT_SOFTENING: f64 = 1.0e-3;

/// Default step size
pub const DEFAULT_DT: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub dt: f64, // step size
    pub G: f64, // gravitational constant
    pub eps: f64, // softening length, always >= 0
    pub t_end: Option<f64>, // stop once simulation time reaches this
}

impl Parameters {
    /// Squared softening, clamped so a negative length never reaches the force law
    pub fn eps2(&self) -> f64 {
        let eps = self.eps.max(0.0);
        eps * eps
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            G: G_SI,
            eps: DEFAULT_SOFTENING,
            t_end: None,
        }
    }
}
