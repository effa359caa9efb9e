pub mod simulation;
pub mod configuration;

pub use simulation::math::NVec3;
pub use simulation::states::{Body, SimulationState};
pub use simulation::params::{Parameters, G_SI, DEFAULT_SOFTENING};
pub use simulation::engine::{Engine, DEFAULT_THETA};
pub use simulation::error::{SimError, SimResult};
pub use simulation::forces::{Acceleration, AccelSet, NewtonianGravity, NewtonianGravityBarnesHut, gravity_for};
pub use simulation::barnes_hut::BarnesHutTree;
pub use simulation::integrator::{IntegratorKind, Workspace, advance, verlet_integrator, rk4_integrator};
pub use simulation::diagnostics::Diagnostics;
pub use simulation::scenario::{build_state, default_scenario, to_barycentric_frame, validate_state};
pub use simulation::controller::{Controller, DivergenceNotice, RunMode, Snapshot};
pub use simulation::runner::{spawn, Command, Notice, Recorder, Runner, RunnerConfig, RunnerHandle};
pub use simulation::trajectory::TrajectoryWriter;

pub use configuration::config::{EngineConfig, ParametersConfig, BodyConfig, ScenarioConfig};
