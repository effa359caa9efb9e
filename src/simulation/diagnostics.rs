//! Conserved-quantity diagnostics
//!
//! Used for periodic debug logging and by the conservation tests.

#![allow(non_snake_case)]

use crate::simulation::math::{softened_distance2, NVec3};
use crate::simulation::states::Body;

pub fn total_mass(bodies: &[Body]) -> f64 {
    bodies.iter().map(|b| b.m).sum()
}

/// Sum of m * v
pub fn total_momentum(bodies: &[Body]) -> NVec3 {
    bodies.iter().fold(NVec3::zeros(), |p, b| p + b.m * b.v)
}

/// Mass-weighted mean position; origin for an empty slice
pub fn center_of_mass(bodies: &[Body]) -> NVec3 {
    let m = total_mass(bodies);
    if m <= 0.0 {
        return NVec3::zeros();
    }
    bodies.iter().fold(NVec3::zeros(), |c, b| c + b.m * b.x) / m
}

pub fn kinetic_energy(bodies: &[Body]) -> f64 {
    bodies.iter().map(|b| 0.5 * b.m * b.v.norm_squared()).sum()
}

/// Softened pairwise potential -G m_i m_j / sqrt(|r|^2 + eps^2)
///
/// Coincident pairs with no softening are skipped, matching the force law.
pub fn potential_energy(bodies: &[Body], G: f64, eps2: f64) -> f64 {
    let mut u = 0.0;
    for (i, bi) in bodies.iter().enumerate() {
        for bj in &bodies[i + 1..] {
            let d2 = softened_distance2(&(bj.x - bi.x), eps2);
            if d2 > 0.0 {
                u -= G * bi.m * bj.m / d2.sqrt();
            }
        }
    }
    u
}

pub fn total_energy(bodies: &[Body], G: f64, eps2: f64) -> f64 {
    kinetic_energy(bodies) + potential_energy(bodies, G, eps2)
}

/// Bundle of diagnostics for one state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub mass: f64,
    pub momentum: NVec3,
    pub center_of_mass: NVec3,
    pub kinetic: f64,
    pub potential: f64,
}

impl Diagnostics {
    pub fn measure(bodies: &[Body], G: f64, eps2: f64) -> Self {
        Self {
            mass: total_mass(bodies),
            momentum: total_momentum(bodies),
            center_of_mass: center_of_mass(bodies),
            kinetic: kinetic_energy(bodies),
            potential: potential_energy(bodies, G, eps2),
        }
    }

    pub fn energy(&self) -> f64 {
        self.kinetic + self.potential
    }
}
