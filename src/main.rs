use grav::{build_state, default_scenario, spawn, Command, Controller, Notice, RunnerConfig, ScenarioConfig, SimulationState, Snapshot};
use grav::simulation::{diagnostics::Diagnostics, snapshot, runner::Recorder};
use grav::TrajectoryWriter;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

const DEFAULT_SAVE_PATH: &str = "grav-snapshot.json";

#[derive(Parser, Debug)]
#[command(name = "grav", version, about = "Interactive, resumable N-body gravity simulator")]
struct Args {
    /// Logging level of the program
    #[arg(short = 'l', long, global = true, env = "GRAV_LOG_LEVEL", default_value = "info",
          value_parser = ["disabled", "error", "warning", "warn", "info", "debug", "trace"])]
    log_level: String,

    /// Append a JSON-lines trajectory to FILE
    #[arg(long, global = true, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Record every N steps
    #[arg(long, global = true, default_value_t = 1)]
    record_every: u64,

    /// Publish a status frame every N steps
    #[arg(long, global = true, default_value_t = 100)]
    publish_every: u64,

    /// Stop after N steps
    #[arg(long, global = true)]
    max_steps: Option<u64>,

    /// Sleep this many milliseconds between steps
    #[arg(long, global = true)]
    step_delay_ms: Option<u64>,

    /// Start paused (use `step` / `resume`)
    #[arg(long, global = true)]
    start_paused: bool,

    /// Do not read commands from stdin; run until a limit is hit
    #[arg(long, global = true)]
    headless: bool,

    /// Save the final state to FILE on exit
    #[arg(long, global = true, value_name = "FILE")]
    save_on_exit: Option<PathBuf>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Runs a new simulation
    New {
        /// System configuration file (YAML); the built-in scenario when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Resumes a previously saved simulation
    Load {
        /// Snapshot file to load
        #[arg(value_name = "FILE")]
        simulation: PathBuf,
    },
}

fn level_filter(level: &str) -> LevelFilter {
    match level {
        "disabled" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warning" | "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn setup_logging(level: &str) {
    env_logger::Builder::new()
        .filter_level(level_filter(level))
        .format_timestamp_secs()
        .init();
}

// load here to keep main clean
fn load_scenario_from_yaml(path: &Path) -> Result<ScenarioConfig> {
    let file = File::open(path).with_context(|| format!("opening scenario {}", path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("parsing scenario {}", path.display()))?;
    Ok(scenario_cfg)
}

fn initial_state(mode: &Mode) -> Result<SimulationState> {
    match mode {
        Mode::New { config: Some(path) } => Ok(build_state(&load_scenario_from_yaml(path)?)?),
        Mode::New { config: None } => {
            info!("no configuration given, using the built-in inner solar system");
            Ok(default_scenario())
        }
        Mode::Load { simulation } => Ok(snapshot::load(simulation)?),
    }
}

fn open_recorder(path: &Path) -> Result<Recorder> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening trajectory file {}", path.display()))?;
    let sink: Box<dyn Write + Send> = Box::new(BufWriter::new(file));
    Ok(TrajectoryWriter::new(sink))
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let cmd = match words.next()? {
        "p" | "pause" => Command::Pause,
        "r" | "resume" => Command::Resume,
        "s" | "step" => Command::Step,
        "save" => Command::Save(PathBuf::from(words.next().unwrap_or(DEFAULT_SAVE_PATH))),
        "q" | "quit" => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

/// Forward stdin lines as commands; end of input quits
fn spawn_command_reader(commands: Sender<Command>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Some(cmd) => {
                    if commands.send(cmd).is_err() {
                        return;
                    }
                }
                None => eprintln!("commands: pause | resume | step | save [FILE] | quit"),
            }
        }
        let _ = commands.send(Command::Quit);
    });
}

fn print_frame(frame: &Snapshot) {
    let state = &frame.state;
    let d = Diagnostics::measure(&state.bodies, state.parameters.G, state.parameters.eps2());
    println!(
        "[{:>7}] step {:>10}  t = {:.6e}  E = {:+.9e}  |p| = {:.3e}",
        frame.mode.to_string(),
        state.steps,
        state.t,
        d.energy(),
        d.momentum.norm()
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let state = initial_state(&args.mode)?;
    let controller = Controller::new(state)?;

    let recorder = args.record.as_deref().map(open_recorder).transpose()?;
    let config = RunnerConfig {
        publish_every: args.publish_every,
        max_steps: args.max_steps,
        step_delay: args.step_delay_ms.map(Duration::from_millis),
        start_paused: args.start_paused && !args.headless,
        record_every: args.record_every,
    };

    let handle = spawn(controller, config, recorder);
    if !args.headless {
        spawn_command_reader(handle.commands.clone());
        eprintln!("commands: pause | resume | step | save [FILE] | quit");
    }

    let mut diverged = None;
    'run: loop {
        match handle.frames.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => print_frame(&frame),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break 'run,
        }

        while let Ok(notice) = handle.notices.try_recv() {
            match notice {
                Notice::Saved { path, step } => println!("saved step {step} to {}", path.display()),
                Notice::SaveFailed { path, error } => eprintln!("could not save {}: {error}", path.display()),
                Notice::Rejected { command, reason } => eprintln!("`{command}` rejected: {reason}"),
                Notice::RecordFailed(error) => eprintln!("trajectory recording stopped: {error}"),
                Notice::Diverged(d) => {
                    eprintln!(
                        "simulation diverged at step {} (body {}); the last good state is kept, `save [FILE]` to keep it",
                        d.step, d.body
                    );
                    if args.headless {
                        handle.send(Command::Quit);
                    }
                    diverged = Some(d);
                }
                Notice::Finished { steps, time } => {
                    println!("finished at step {steps} (t = {time:.6e})");
                    break 'run;
                }
            }
        }
    }

    let controller = handle.join().map_err(|_| anyhow!("stepping thread panicked"))?;
    if let Some(path) = &args.save_on_exit {
        controller.save(path)?;
        println!("saved final state to {}", path.display());
    }

    match diverged {
        Some(d) => Err(grav::SimError::from(&d).into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_accepts_both_warning_spellings() {
        assert_eq!(level_filter("warning"), LevelFilter::Warn);
        assert_eq!(level_filter("warn"), LevelFilter::Warn);
        assert_eq!(level_filter("disabled"), LevelFilter::Off);

        let args = Args::try_parse_from(["grav", "--log-level", "warning", "new"]).unwrap();
        assert_eq!(args.log_level, "warning");
    }

    #[test]
    fn parse_command_words() {
        assert_eq!(parse_command("p"), Some(Command::Pause));
        assert_eq!(parse_command("save out.json"), Some(Command::Save(PathBuf::from("out.json"))));
        assert_eq!(parse_command("save"), Some(Command::Save(PathBuf::from(DEFAULT_SAVE_PATH))));
        assert_eq!(parse_command("jump"), None);
    }
}
