//! Step controller: sole owner and mutator of the live simulation state
//!
//! Run modes:
//!
//! ```text
//! Stopped (ready) --start/resume--> Running <--pause/resume--> Paused
//!        \                             |                          |
//!         +------------quit------------+----quit / divergence-----+--> Stopped (finished)
//! ```
//!
//! `step()` advances one `dt` only while paused and is a no-op while
//! running. A step whose result contains a non-finite component is rejected:
//! the pre-step state stays live, the run stops and the divergence is kept
//! for consumers to see. Nothing retries it.

use std::fmt;
use std::path::Path;

use log::{error, info, warn};

use crate::simulation::error::{SimError, SimResult};
use crate::simulation::forces::{gravity_for, AccelSet};
use crate::simulation::integrator::{self, Workspace};
use crate::simulation::scenario::validate_state;
use crate::simulation::snapshot;
use crate::simulation::states::SimulationState;

/// Externally visible run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Stopped => "stopped",
            RunMode::Running => "running",
            RunMode::Paused => "paused",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Running,
    Paused,
    Finished,
}

/// Why the last step was rejected
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceNotice {
    pub step: u64, // step that would have been produced
    pub time: f64,
    pub body: usize, // first non-finite body
}

impl From<&DivergenceNotice> for SimError {
    fn from(n: &DivergenceNotice) -> Self {
        SimError::SimulationDiverged {
            step: n.step,
            time: n.time,
            body: n.body,
        }
    }
}

/// Immutable, independently-owned view handed to consumers
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: SimulationState,
    pub mode: RunMode,
    pub divergence: Option<DivergenceNotice>,
}

pub struct Controller {
    state: SimulationState,
    candidate: SimulationState,
    forces: AccelSet,
    workspace: Workspace,
    phase: Phase,
    divergence: Option<DivergenceNotice>,
}

impl Controller {
    /// Take ownership of `state`, which must satisfy every state invariant
    pub fn new(state: SimulationState) -> SimResult<Self> {
        validate_state(&state)?;
        let forces = gravity_for(&state.parameters, &state.engine);
        Ok(Self {
            candidate: state.clone(),
            state,
            forces,
            workspace: Workspace::new(),
            phase: Phase::Ready,
            divergence: None,
        })
    }

    /// Read-only view of the live state
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn mode(&self) -> RunMode {
        match self.phase {
            Phase::Ready | Phase::Finished => RunMode::Stopped,
            Phase::Running => RunMode::Running,
            Phase::Paused => RunMode::Paused,
        }
    }

    /// True once the run has been quit or has diverged
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn divergence(&self) -> Option<&DivergenceNotice> {
        self.divergence.as_ref()
    }

    /// Begin automatic stepping
    pub fn start(&mut self) -> SimResult<()> {
        match self.phase {
            Phase::Ready => {
                info!("starting run at step {} (t = {})", self.state.steps, self.state.t);
                self.phase = Phase::Running;
                Ok(())
            }
            _ => Err(self.rejected("start")),
        }
    }

    /// Suspend automatic stepping; manual `step()` becomes available
    pub fn pause(&mut self) -> SimResult<()> {
        match self.phase {
            Phase::Running => {
                info!("paused at step {}", self.state.steps);
                self.phase = Phase::Paused;
                Ok(())
            }
            Phase::Paused => Ok(()),
            _ => Err(self.rejected("pause")),
        }
    }

    /// Return to automatic stepping; from a fresh controller this starts the run
    pub fn resume(&mut self) -> SimResult<()> {
        match self.phase {
            Phase::Ready => self.start(),
            Phase::Paused => {
                info!("resumed at step {}", self.state.steps);
                self.phase = Phase::Running;
                Ok(())
            }
            Phase::Running => Ok(()),
            Phase::Finished => Err(self.rejected("resume")),
        }
    }

    /// Stop for good. The live state stays available for saving.
    pub fn quit(&mut self) {
        if self.phase != Phase::Finished {
            info!("run stopped at step {} (t = {})", self.state.steps, self.state.t);
        }
        self.phase = Phase::Finished;
    }

    /// Manual single step.
    ///
    /// Advances exactly one `dt` while paused. While running the automatic
    /// cadence owns stepping and this returns the current state unchanged.
    pub fn step(&mut self) -> SimResult<&SimulationState> {
        match self.phase {
            Phase::Paused => {
                self.advance()?;
                Ok(&self.state)
            }
            Phase::Running => Ok(&self.state),
            _ => Err(self.rejected("step")),
        }
    }

    /// One iteration of the automatic cadence; returns whether a step was taken
    pub fn tick(&mut self) -> SimResult<bool> {
        if self.phase != Phase::Running {
            return Ok(false);
        }
        self.advance()?;
        Ok(true)
    }

    /// Copy of the live state plus run mode and any divergence notice
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            mode: self.mode(),
            divergence: self.divergence.clone(),
        }
    }

    /// Persist the live (last-good) state. Failure leaves the run untouched.
    pub fn save(&self, path: &Path) -> SimResult<()> {
        snapshot::save(&self.state, path)
    }

    pub fn into_state(self) -> SimulationState {
        self.state
    }

    // helpers ==============================================================================

    /// Integrate into the candidate buffer; swap it in only if every body stayed finite
    fn advance(&mut self) -> SimResult<()> {
        self.candidate.clone_from(&self.state);
        integrator::advance(&mut self.candidate, &mut self.forces, &mut self.workspace);

        if let Some(body) = self.candidate.first_non_finite() {
            let notice = DivergenceNotice {
                step: self.candidate.steps,
                time: self.candidate.t,
                body,
            };
            error!(
                "simulation diverged at step {} (t = {}): body {} ({}) became non-finite; keeping step {}",
                notice.step, notice.time, body, self.state.bodies[body].name, self.state.steps
            );
            let err = SimError::from(&notice);
            self.divergence = Some(notice);
            self.phase = Phase::Finished;
            return Err(err);
        }

        std::mem::swap(&mut self.state, &mut self.candidate);
        Ok(())
    }

    fn rejected(&self, command: &'static str) -> SimError {
        let mode = if self.phase == Phase::Finished {
            "finished".to_string()
        } else {
            self.mode().to_string()
        };
        warn!("ignoring `{command}` while {mode}");
        SimError::InvalidCommand { command, mode }
    }
}
