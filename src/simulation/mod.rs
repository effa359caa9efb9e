pub mod math;
pub mod states;
pub mod params;
pub mod engine;
pub mod error;
pub mod forces;
pub mod barnes_hut;
pub mod integrator;
pub mod diagnostics;
pub mod scenario;
pub mod snapshot;
pub mod trajectory;
pub mod controller;
pub mod runner;
