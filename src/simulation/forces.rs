//! Force / acceleration contributors for the n-body engine
//!
//! Defines the acceleration trait, direct Newtonian gravity (the O(n^2)
//! reference) and a Barnes–Hut variant behind the same contract

#![allow(non_snake_case)]

use crate::simulation::barnes_hut::BarnesHutTree;
use crate::simulation::engine::Engine;
use crate::simulation::math::{softened_distance2, NVec3};
use crate::simulation::params::Parameters;
use crate::simulation::states::Body;

/// Collection of acceleration terms (gravity, drag, etc)
/// Each term implements [`Acceleration`] and their contributions are summed
/// into a single acceleration vector per body
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
}

impl AccelSet {
    /// Create an empty acceleration set
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
        }
    }

    /// Add an acceleration term
    pub fn with(mut self, term: impl Acceleration + Send + Sync + 'static) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    /// Compute total accelerations for all `bodies`
    /// - `out[i]` will be set to the sum of contributions from all terms
    pub fn accumulate_accels(&mut self, bodies: &[Body], out: &mut [NVec3]) {
        // Zero buffer
        for a in out.iter_mut() {
            *a = NVec3::zeros();
        }
        // Iterate over all acceleration contributors
        for term in self.terms.iter_mut() {
            term.acceleration(bodies, out);
        }
    }

    /// Allocating convenience wrapper around [`AccelSet::accumulate_accels`]
    pub fn evaluate(&mut self, bodies: &[Body]) -> Vec<NVec3> {
        let mut out = vec![NVec3::zeros(); bodies.len()];
        self.accumulate_accels(bodies, &mut out);
        out
    }
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for acceleration sources operating on an ordered body slice
/// Implementations add their contribution into `out[i]` for each body
pub trait Acceleration {
    fn acceleration(&mut self, bodies: &[Body], out: &mut [NVec3]);
}

/// Build the gravity term selected by `engine` for a run with `params`
pub fn gravity_for(params: &Parameters, engine: &Engine) -> AccelSet {
    let G = params.G;
    let eps2 = params.eps2();
    if engine.barnes_hut {
        AccelSet::new().with(NewtonianGravityBarnesHut::new(G, eps2, engine.theta))
    } else {
        AccelSet::new().with(NewtonianGravity { G, eps2 })
    }
}

/// Acceleration factor G / d^3 for softened squared distance `d2`
///
/// A zero `d2` only happens for coincident bodies with no softening; that
/// pair contributes nothing rather than a NaN.
#[inline]
pub(crate) fn pair_coefficient(G: f64, d2: f64) -> f64 {
    if d2 == 0.0 {
        return 0.0;
    }
    let inv_r = d2.sqrt().recip();
    G * inv_r * inv_r * inv_r
}

/// Newtonian gravity with softening (direct n^2 sum)
pub struct NewtonianGravity {
    pub G: f64, // gravitational constant
    pub eps2: f64, // softening squared
}

impl Acceleration for NewtonianGravity {
    fn acceleration(&mut self, bodies: &[Body], out: &mut [NVec3]) {
        let n = bodies.len();
        if n < 2 { // nothing to pair up
            return;
        }

        // Loop over each unordered pair (i, j) with i < j
        for i in 0..n {
            let bi = &bodies[i];

            for j in (i + 1)..n {
                let bj = &bodies[j];

                // r points from i to j: i is pulled along +r, j along -r
                let r = bj.x - bi.x;
                let d2 = softened_distance2(&r, self.eps2);
                let coef = pair_coefficient(self.G, d2);

                // a_i +=  G * m_j * r / d^3
                // a_j += -G * m_i * r / d^3
                out[i] += coef * bj.m * r;
                out[j] -= coef * bi.m * r;
            }
        }
    }
}

/// Newtonian gravity evaluated via a Barnes–Hut octree
/// Approximate O(N log N) accelerations controlled by `theta`
/// (opening angle) and `eps2` (softening). `theta = 0` never aggregates,
/// so the result matches [`NewtonianGravity`] up to summation order.
pub struct NewtonianGravityBarnesHut {
    pub G: f64,
    pub eps2: f64,
    pub theta: f64,
    tree: BarnesHutTree,
}

impl NewtonianGravityBarnesHut {
    pub fn new(G: f64, eps2: f64, theta: f64) -> Self {
        Self {
            G,
            eps2,
            theta: theta.max(0.0),
            tree: BarnesHutTree::new(),
        }
    }
}

impl Acceleration for NewtonianGravityBarnesHut {
    /// Rebuild the tree from `bodies` and accumulate per-body accelerations
    fn acceleration(&mut self, bodies: &[Body], out: &mut [NVec3]) {
        if bodies.len() < 2 {
            return;
        }
        self.tree.rebuild(bodies);
        for (i, a) in out.iter_mut().enumerate().take(bodies.len()) {
            *a += self.tree.force_on_body(i, bodies, self.G, self.eps2, self.theta);
        }
    }
}
