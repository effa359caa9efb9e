//! Fixed-step time integrators for the N-body system
//!
//! Provides the symplectic velocity–Verlet (leapfrog) integrator and a
//! classical 4th-order Runge–Kutta, both driven by an [`AccelSet`].
//! Each call advances exactly one `dt`, bumps `steps` by one and `t` by `dt`.
//!
//! Scratch buffers live in a [`Workspace`] owned by the caller so repeated
//! steps do not allocate.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::forces::AccelSet;
use super::math::NVec3;
use super::states::{Body, SimulationState};

/// Which integrator advances the system
/// `integrator: "leapfrog"` (alias `"verlet"`) or `integrator: "rk4"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegratorKind {
    /// Velocity-Verlet / leapfrog. Symplectic, bounded energy error, 1 force eval per step
    #[default]
    #[serde(rename = "leapfrog", alias = "verlet")]
    Leapfrog,

    /// Classical RK4. Higher local accuracy, not symplectic, 4 force evals
    #[serde(rename = "rk4")]
    Rk4,
}

impl IntegratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegratorKind::Leapfrog => "leapfrog",
            IntegratorKind::Rk4 => "rk4",
        }
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reusable per-run scratch space for the integrators
///
/// Leapfrog keeps the accelerations of its last step end together with the
/// positions they were computed at, and reuses them when the next step starts
/// from those same positions. A workspace must stay paired with one force set.
#[derive(Debug, Default)]
pub struct Workspace {
    a_old: Vec<NVec3>,
    a_new: Vec<NVec3>,
    a_old_at: Vec<NVec3>, // positions `a_old` was evaluated at
    a_old_valid: bool,
    scratch: Vec<Body>,
    kx: [Vec<NVec3>; 4],
    kv: [Vec<NVec3>; 4],
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, n: usize) {
        for buf in [&mut self.a_old, &mut self.a_new]
            .into_iter()
            .chain(self.kx.iter_mut())
            .chain(self.kv.iter_mut())
        {
            buf.resize(n, NVec3::zeros());
        }
    }

    /// True when `a_old` holds the accelerations at exactly these positions
    fn has_accels_for(&self, bodies: &[Body]) -> bool {
        self.a_old_valid
            && self.a_old_at.len() == bodies.len()
            && bodies.iter().zip(self.a_old_at.iter()).all(|(b, x)| b.x == *x)
    }
}

/// Advance `sys` by one step with the integrator its engine selects
pub fn advance(sys: &mut SimulationState, forces: &mut AccelSet, ws: &mut Workspace) {
    match sys.engine.integrator {
        IntegratorKind::Leapfrog => verlet_integrator(sys, forces, ws),
        IntegratorKind::Rk4 => rk4_integrator(sys, forces, ws),
    }
}

/// Advance the system by one time step using velocity–Verlet.
/// Two force evaluations on the first step, one per step after that.
pub fn verlet_integrator(sys: &mut SimulationState, forces: &mut AccelSet, ws: &mut Workspace) {
    let n = sys.bodies.len();
    let dt = sys.parameters.dt;
    let half_dt = 0.5 * dt;

    if n > 0 {
        ws.ensure(n);

        // a_n from x_n, unless the previous step already left it behind
        if !ws.has_accels_for(&sys.bodies) {
            forces.accumulate_accels(&sys.bodies, &mut ws.a_old);
        }

        // Kick: v_n+1/2 = v_n + (dt/2) * a_n
        // Drift: x_n+1 = x_n + dt * v_n+1/2
        for (b, a) in sys.bodies.iter_mut().zip(ws.a_old.iter()) {
            b.v += half_dt * *a;
            b.x += dt * b.v;
        }

        // a_n+1 from x_n+1
        forces.accumulate_accels(&sys.bodies, &mut ws.a_new);

        // Second kick: v_n+1 = v_n+1/2 + (dt/2) * a_n+1
        for (b, a) in sys.bodies.iter_mut().zip(ws.a_new.iter()) {
            b.v += half_dt * *a;
        }

        std::mem::swap(&mut ws.a_old, &mut ws.a_new);
        ws.a_old_at.clear();
        ws.a_old_at.extend(sys.bodies.iter().map(|b| b.x));
        ws.a_old_valid = true;
    }

    sys.t += dt;
    sys.steps += 1;
}

/// Advance the system by one time step using classical RK4 on (x, v).
///
/// k1 = f(y), k2 = f(y + dt/2 k1), k3 = f(y + dt/2 k2), k4 = f(y + dt k3),
/// y_n+1 = y_n + dt/6 (k1 + 2 k2 + 2 k3 + k4), where f(x, v) = (v, a(x)).
pub fn rk4_integrator(sys: &mut SimulationState, forces: &mut AccelSet, ws: &mut Workspace) {
    let n = sys.bodies.len();
    let dt = sys.parameters.dt;
    let half_dt = 0.5 * dt;

    if n > 0 {
        ws.ensure(n);
        ws.scratch.clone_from(&sys.bodies);

        let [kx1, kx2, kx3, kx4] = &mut ws.kx;
        let [kv1, kv2, kv3, kv4] = &mut ws.kv;

        for (k, b) in kx1.iter_mut().zip(sys.bodies.iter()) {
            *k = b.v;
        }
        forces.accumulate_accels(&sys.bodies, &mut kv1[..]);

        rk4_stage(&sys.bodies, &mut ws.scratch, forces, half_dt, (&kx1[..], &kv1[..]), (&mut kx2[..], &mut kv2[..]));
        rk4_stage(&sys.bodies, &mut ws.scratch, forces, half_dt, (&kx2[..], &kv2[..]), (&mut kx3[..], &mut kv3[..]));
        rk4_stage(&sys.bodies, &mut ws.scratch, forces, dt, (&kx3[..], &kv3[..]), (&mut kx4[..], &mut kv4[..]));

        let sixth = dt / 6.0;
        for (i, b) in sys.bodies.iter_mut().enumerate() {
            b.x += sixth * (kx1[i] + 2.0 * kx2[i] + 2.0 * kx3[i] + kx4[i]);
            b.v += sixth * (kv1[i] + 2.0 * kv2[i] + 2.0 * kv3[i] + kv4[i]);
        }
    }

    sys.t += dt;
    sys.steps += 1;
}

/// One RK4 stage: evaluate f at y + h * k_prev into k_out
fn rk4_stage(
    bodies: &[Body],
    scratch: &mut [Body],
    forces: &mut AccelSet,
    h: f64,
    (kx_prev, kv_prev): (&[NVec3], &[NVec3]),
    (kx_out, kv_out): (&mut [NVec3], &mut [NVec3]),
) {
    for i in 0..bodies.len() {
        scratch[i].x = bodies[i].x + h * kx_prev[i];
        kx_out[i] = bodies[i].v + h * kv_prev[i];
    }
    forces.accumulate_accels(scratch, kv_out);
}
