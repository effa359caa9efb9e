//! Background stepping loop around a [`Controller`]
//!
//! The runner thread is the only code that touches the controller once
//! spawned. It talks to the outside world through three channels:
//!
//! - `Command`s in, applied in the order they were sent,
//! - `Snapshot` frames out through a depth-1 channel filled with `try_send`,
//!   so a slow renderer drops frames instead of holding up stepping,
//! - `Notice`s out for discrete events (saves, divergence, end of run).
//!
//! Commands are drained at the top of every iteration, so a quit is seen
//! before the next step starts and never interrupts one in progress. While
//! paused the loop blocks on the command channel. After a divergence the
//! loop keeps serving commands so the last-good state can still be saved;
//! it exits on quit, when every command sender is dropped, or when a run
//! limit (`max_steps`, `t_end`) is reached.

use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, log_enabled, warn, Level};

use crate::simulation::controller::{Controller, DivergenceNotice, RunMode, Snapshot};
use crate::simulation::diagnostics::Diagnostics;
use crate::simulation::error::SimError;
use crate::simulation::trajectory::TrajectoryWriter;

/// Discrete control input from the CLI/UI side
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    Step,
    Save(PathBuf),
    Quit,
}

/// Discrete events reported back to the CLI/UI side
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Saved { path: PathBuf, step: u64 },
    SaveFailed { path: PathBuf, error: String },
    Rejected { command: String, reason: String },
    Diverged(DivergenceNotice),
    RecordFailed(String),
    Finished { steps: u64, time: f64 },
}

pub type Recorder = TrajectoryWriter<Box<dyn Write + Send>>;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub publish_every: u64, // publish a frame every N automatic steps
    pub max_steps: Option<u64>, // stop after this many steps in this run
    pub step_delay: Option<Duration>, // sleep between automatic steps
    pub start_paused: bool,
    pub record_every: u64, // trajectory cadence, when a recorder is attached
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            publish_every: 10,
            max_steps: None,
            step_delay: None,
            start_paused: false,
            record_every: 1,
        }
    }
}

/// Consumer-side ends of the runner's channels
pub struct RunnerHandle {
    pub commands: Sender<Command>,
    pub frames: Receiver<Snapshot>,
    pub notices: Receiver<Notice>,
    thread: JoinHandle<Controller>,
}

impl RunnerHandle {
    /// Queue a command; false once the runner has exited
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Wait for the runner to exit and take the controller back
    pub fn join(self) -> thread::Result<Controller> {
        drop(self.commands);
        self.thread.join()
    }
}

/// Move `controller` onto a dedicated stepping thread
pub fn spawn(controller: Controller, config: RunnerConfig, recorder: Option<Recorder>) -> RunnerHandle {
    let (commands, command_rx) = mpsc::channel();
    let (frame_tx, frames) = mpsc::sync_channel(1);
    let (notice_tx, notices) = mpsc::channel();

    let runner = Runner::new(controller, config, command_rx, frame_tx, notice_tx, recorder);
    let thread = thread::spawn(move || runner.run());

    RunnerHandle {
        commands,
        frames,
        notices,
        thread,
    }
}

pub struct Runner {
    controller: Controller,
    config: RunnerConfig,
    commands: Receiver<Command>,
    frames: SyncSender<Snapshot>,
    notices: Sender<Notice>,
    recorder: Option<Recorder>,
    first_step: u64,
    since_publish: u64,
    dropped_frames: u64,
    quit_requested: bool,
}

impl Runner {
    pub fn new(
        controller: Controller,
        config: RunnerConfig,
        commands: Receiver<Command>,
        frames: SyncSender<Snapshot>,
        notices: Sender<Notice>,
        recorder: Option<Recorder>,
    ) -> Self {
        let first_step = controller.state().steps;
        Self {
            controller,
            config,
            commands,
            frames,
            notices,
            recorder,
            first_step,
            since_publish: 0,
            dropped_frames: 0,
            quit_requested: false,
        }
    }

    /// Drive the controller until quit or a run limit
    pub fn run(mut self) -> Controller {
        if self.controller.start().is_ok() && self.config.start_paused {
            let _ = self.controller.pause();
        }
        self.record();
        self.publish();

        while !self.quit_requested {
            self.drain_commands();
            if self.quit_requested {
                break;
            }
            if self.limit_reached() {
                info!("run limit reached");
                self.request_quit();
                break;
            }

            match self.controller.tick() {
                Ok(true) => self.after_step(false),
                Ok(false) => {}
                Err(e) => self.report_failure(e),
            }

            if let Some(delay) = self.config.step_delay {
                if self.controller.mode() == RunMode::Running {
                    thread::sleep(delay);
                }
            }
        }

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.flush() {
                let _ = self.notices.send(Notice::RecordFailed(e.to_string()));
            }
        }

        self.controller.quit();
        let state = self.controller.state();
        info!(
            "runner exiting at step {} (t = {}), {} frames dropped",
            state.steps, state.t, self.dropped_frames
        );
        let _ = self.notices.send(Notice::Finished {
            steps: state.steps,
            time: state.t,
        });
        self.publish();
        self.controller
    }

    // helpers ==============================================================================

    /// Apply every queued command in order; block for one first while not running
    fn drain_commands(&mut self) {
        if self.controller.mode() != RunMode::Running {
            match self.commands.recv() {
                Ok(cmd) => self.apply(cmd),
                Err(_) => {
                    self.request_quit();
                    return;
                }
            }
        }

        while !self.quit_requested {
            match self.commands.try_recv() {
                Ok(cmd) => self.apply(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.request_quit();
                    break;
                }
            }
        }
    }

    fn apply(&mut self, cmd: Command) {
        debug!("command: {cmd:?}");
        let result = match &cmd {
            Command::Pause => self.controller.pause(),
            Command::Resume => self.controller.resume(),
            Command::Step => {
                let was_paused = self.controller.mode() == RunMode::Paused;
                let stepped = self.controller.step().map(|_| ());
                if stepped.is_ok() && was_paused {
                    self.after_step(true);
                }
                stepped
            }
            Command::Save(path) => {
                let notice = match self.controller.save(path) {
                    Ok(()) => Notice::Saved {
                        path: path.clone(),
                        step: self.controller.state().steps,
                    },
                    Err(e) => {
                        warn!("save failed: {e}");
                        Notice::SaveFailed {
                            path: path.clone(),
                            error: e.to_string(),
                        }
                    }
                };
                let _ = self.notices.send(notice);
                return;
            }
            Command::Quit => {
                self.request_quit();
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                if matches!(cmd, Command::Pause | Command::Resume) {
                    self.publish();
                }
            }
            Err(e) => self.report_failure(e),
        }
    }

    fn request_quit(&mut self) {
        self.quit_requested = true;
        self.controller.quit();
    }

    fn report_failure(&mut self, e: SimError) {
        let notice = match (&e, self.controller.divergence()) {
            (SimError::SimulationDiverged { .. }, Some(d)) => Notice::Diverged(d.clone()),
            (SimError::InvalidCommand { command, mode }, _) => Notice::Rejected {
                command: command.to_string(),
                reason: format!("not valid while {mode}"),
            },
            _ => Notice::Rejected {
                command: String::new(),
                reason: e.to_string(),
            },
        };
        let _ = self.notices.send(notice);
        self.publish();
    }

    fn after_step(&mut self, manual: bool) {
        let steps = self.controller.state().steps;
        if steps % self.config.record_every.max(1) == 0 {
            self.record();
        }

        self.since_publish += 1;
        if manual || self.since_publish >= self.config.publish_every.max(1) {
            self.publish();
        }
    }

    fn limit_reached(&self) -> bool {
        if self.controller.is_finished() {
            return false;
        }
        let state = self.controller.state();
        let by_steps = self
            .config
            .max_steps
            .is_some_and(|max| state.steps - self.first_step >= max);
        // `t` carries rounding from repeated `+= dt`; stop within half a step of `t_end`
        let half_dt = 0.5 * state.parameters.dt;
        let by_time = state.parameters.t_end.is_some_and(|t_end| state.t >= t_end - half_dt);
        by_steps || by_time
    }

    fn record(&mut self) {
        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };
        if let Err(e) = recorder.record(self.controller.state()) {
            warn!("trajectory recording stopped: {e}");
            let _ = self.notices.send(Notice::RecordFailed(e.to_string()));
            self.recorder = None;
        }
    }

    fn publish(&mut self) {
        self.since_publish = 0;

        if log_enabled!(Level::Debug) {
            let state = self.controller.state();
            let d = Diagnostics::measure(&state.bodies, state.parameters.G, state.parameters.eps2());
            debug!(
                "step {} t = {:.6e}: E = {:.9e}, |p| = {:.3e}",
                state.steps,
                state.t,
                d.energy(),
                d.momentum.norm()
            );
        }

        // Full: the consumer has not taken the previous frame yet, so this one is dropped
        if let Err(TrySendError::Full(_)) = self.frames.try_send(self.controller.snapshot()) {
            self.dropped_frames += 1;
        }
    }
}
