//! Build fully-initialized simulation states from configuration
//!
//! Takes a parsed [`ScenarioConfig`] and produces a [`SimulationState`] at
//! `t = 0` that satisfies every state invariant:
//! - at least one body,
//! - every mass finite and > 0, every position/velocity component finite,
//! - `dt` finite and > 0, softening finite and >= 0, `G` finite and > 0,
//! - opening angle finite and >= 0.
//!
//! Violations are reported as [`SimError::InvalidConfiguration`] naming the
//! offending field. [`default_scenario`] is used when no configuration is given.

use log::{debug, info};

use crate::configuration::config::{BodyConfig, ScenarioConfig};
use crate::simulation::diagnostics::{center_of_mass, total_mass, total_momentum};
use crate::simulation::engine::{Engine, DEFAULT_THETA};
use crate::simulation::error::{SimError, SimResult};
use crate::simulation::integrator::IntegratorKind;
use crate::simulation::math::{vec_from, NVec3};
use crate::simulation::params::{Parameters, DEFAULT_SOFTENING, G_SI};
use crate::simulation::states::{Body, SimulationState};

/// Validate `cfg` and map it into a runtime state
pub fn build_state(cfg: &ScenarioConfig) -> SimResult<SimulationState> {
    // Bodies: map `BodyConfig` -> runtime `Body`
    let bodies: Vec<Body> = cfg.bodies.iter().enumerate().map(|(i, bc): (usize, &BodyConfig)| Body {
        name: bc.name.clone().unwrap_or_else(|| format!("body-{i}")),
        x: vec_from(bc.x),
        v: vec_from(bc.v),
        m: bc.m,
    }).collect();

    // Parameters (runtime) from ParametersConfig
    let p_cfg = &cfg.parameters;
    let parameters = Parameters {
        dt: p_cfg.dt,
        G: p_cfg.G.unwrap_or(G_SI),
        eps: p_cfg.softening.unwrap_or(DEFAULT_SOFTENING),
        t_end: p_cfg.t_end,
    };

    // Engine (runtime) from EngineConfig
    let e_cfg = &cfg.engine;
    let engine = Engine {
        integrator: e_cfg.integrator,
        barnes_hut: e_cfg.barnes_hut,
        theta: e_cfg.theta.unwrap_or(DEFAULT_THETA),
    };

    let state = SimulationState::new(bodies, parameters, engine);
    validate_state(&state)?;

    info!(
        "built scenario: {} bodies, integrator = {}, barnes_hut = {}, dt = {}",
        state.len(),
        state.engine.integrator,
        state.engine.barnes_hut,
        state.parameters.dt
    );
    Ok(state)
}

/// Check every invariant a state must satisfy before it may be stepped
pub fn validate_state(state: &SimulationState) -> SimResult<()> {
    if state.bodies.is_empty() {
        return Err(SimError::config("bodies", "must contain at least one body"));
    }

    for (i, b) in state.bodies.iter().enumerate() {
        if !b.m.is_finite() || b.m <= 0.0 {
            return Err(SimError::config(format!("bodies[{i}].m"), format!("must be finite and > 0, got {}", b.m)));
        }
        if !b.x.iter().all(|c| c.is_finite()) {
            return Err(SimError::config(format!("bodies[{i}].x"), "must be finite"));
        }
        if !b.v.iter().all(|c| c.is_finite()) {
            return Err(SimError::config(format!("bodies[{i}].v"), "must be finite"));
        }
    }

    let p = &state.parameters;
    if !p.dt.is_finite() || p.dt <= 0.0 {
        return Err(SimError::config("parameters.dt", format!("must be finite and > 0, got {}", p.dt)));
    }
    if !p.eps.is_finite() || p.eps < 0.0 {
        return Err(SimError::config("parameters.softening", format!("must be finite and >= 0, got {}", p.eps)));
    }
    if !p.G.is_finite() || p.G <= 0.0 {
        return Err(SimError::config("parameters.G", format!("must be finite and > 0, got {}", p.G)));
    }
    if let Some(t_end) = p.t_end {
        if !t_end.is_finite() || t_end <= 0.0 {
            return Err(SimError::config("parameters.t_end", format!("must be finite and > 0, got {t_end}")));
        }
    }

    let theta = state.engine.theta;
    if !theta.is_finite() || theta < 0.0 {
        return Err(SimError::config("engine.theta", format!("must be finite and >= 0, got {theta}")));
    }

    if !state.t.is_finite() || state.t < 0.0 {
        return Err(SimError::config("time", format!("must be finite and >= 0, got {}", state.t)));
    }

    Ok(())
}

/// Shift `bodies` so the center of mass sits at the origin and is at rest
pub fn to_barycentric_frame(bodies: &mut [Body]) {
    let m = total_mass(bodies);
    if m <= 0.0 {
        return;
    }
    let com = center_of_mass(bodies);
    let v_com = total_momentum(bodies) / m;
    for b in bodies.iter_mut() {
        b.x -= com;
        b.v -= v_com;
    }
}

/// Sun, Venus, Earth, Moon and Mars in SI units, barycentric frame.
///
/// Planets start on the +x axis at their mean orbital distance with their
/// mean orbital speed along +y; the Moon starts outside the Earth with the
/// Earth's speed plus its own. One step is one hour.
pub fn default_scenario() -> SimulationState {
    const AU: f64 = 1.495_978_707e11;

    let planet = |name: &str, m: f64, r: f64, v: f64| Body::new(name, m, NVec3::new(r, 0.0, 0.0), NVec3::new(0.0, v, 0.0));

    let mut bodies = vec![
        planet("Sun", 1.988_47e30, 0.0, 0.0),
        planet("Venus", 4.867_5e24, 0.723_33 * AU, 35_020.0),
        planet("Earth", 5.972_2e24, AU, 29_780.0),
        planet("Moon", 7.342e22, AU + 3.844e8, 29_780.0 + 1_022.0),
        planet("Mars", 6.417_1e23, 1.523_68 * AU, 24_070.0),
    ];
    to_barycentric_frame(&mut bodies);

    let parameters = Parameters {
        dt: 3_600.0,
        G: G_SI,
        eps: DEFAULT_SOFTENING,
        t_end: None,
    };
    let engine = Engine {
        integrator: IntegratorKind::Leapfrog,
        barnes_hut: false,
        theta: DEFAULT_THETA,
    };

    debug!("built default scenario with {} bodies", bodies.len());
    SimulationState::new(bodies, parameters, engine)
}
