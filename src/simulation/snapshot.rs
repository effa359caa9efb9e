//! Snapshot codec: versioned, textual save/load of a [`SimulationState`]
//!
//! A snapshot is a JSON document:
//!
//! ```json
//! {
//!   "magic": "grav-snapshot",
//!   "version": 1,
//!   "header": {
//!     "integrator": "leapfrog", "dt": 0.01, "G": 1.0, "softening": 0.0,
//!     "t_end": null, "barnes_hut": false, "theta": 0.7,
//!     "steps": 42, "time": 0.42, "body_count": 2
//!   },
//!   "bodies": [
//!     { "name": "a", "mass": 1.0, "position": [-0.5, 0.0, 0.0], "velocity": [0.0, -0.7, 0.0] }
//!   ]
//! }
//! ```
//!
//! Floats are written in shortest round-trip form and parsed with
//! `serde_json`'s `float_roundtrip`, so save followed by load is bit-exact.
//!
//! Decoding never yields a partially-populated state: syntax, magic,
//! version, structure and invariants are all checked before a state is
//! returned. An unknown version is [`SimError::FormatVersionUnsupported`];
//! every other failure is [`SimError::CorruptSnapshot`].

#![allow(non_snake_case)]

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::simulation::engine::Engine;
use crate::simulation::error::{SimError, SimResult};
use crate::simulation::integrator::IntegratorKind;
use crate::simulation::math::{vec_from, vec_to};
use crate::simulation::params::Parameters;
use crate::simulation::scenario::validate_state;
use crate::simulation::states::{Body, SimulationState};

pub const FORMAT_MAGIC: &str = "grav-snapshot";
pub const FORMAT_VERSION: u64 = 1;

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SnapshotFile {
    magic: String,
    version: u64,
    header: SnapshotHeader,
    bodies: Vec<BodyRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SnapshotHeader {
    integrator: IntegratorKind,
    dt: f64,
    G: f64,
    softening: f64,
    t_end: Option<f64>,
    barnes_hut: bool,
    theta: f64,
    steps: u64,
    time: f64,
    body_count: usize,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct BodyRecord {
    name: String,
    mass: f64,
    position: [f64; 3],
    velocity: [f64; 3],
}

impl From<&SimulationState> for SnapshotFile {
    fn from(state: &SimulationState) -> Self {
        let p = &state.parameters;
        let e = &state.engine;
        Self {
            magic: FORMAT_MAGIC.to_string(),
            version: FORMAT_VERSION,
            header: SnapshotHeader {
                integrator: e.integrator,
                dt: p.dt,
                G: p.G,
                softening: p.eps,
                t_end: p.t_end,
                barnes_hut: e.barnes_hut,
                theta: e.theta,
                steps: state.steps,
                time: state.t,
                body_count: state.bodies.len(),
            },
            bodies: state.bodies.iter().map(|b| BodyRecord {
                name: b.name.clone(),
                mass: b.m,
                position: vec_to(&b.x),
                velocity: vec_to(&b.v),
            }).collect(),
        }
    }
}

impl SnapshotFile {
    fn into_state(self) -> SimResult<SimulationState> {
        let h = self.header;
        if h.body_count != self.bodies.len() {
            return Err(SimError::corrupt(format!(
                "header declares {} bodies but {} are present",
                h.body_count,
                self.bodies.len()
            )));
        }

        let bodies = self.bodies.into_iter().map(|r| Body {
            name: r.name,
            x: vec_from(r.position),
            v: vec_from(r.velocity),
            m: r.mass,
        }).collect();

        let state = SimulationState {
            bodies,
            t: h.time,
            steps: h.steps,
            parameters: Parameters {
                dt: h.dt,
                G: h.G,
                eps: h.softening,
                t_end: h.t_end,
            },
            engine: Engine {
                integrator: h.integrator,
                barnes_hut: h.barnes_hut,
                theta: h.theta,
            },
        };

        validate_state(&state).map_err(|e| SimError::corrupt(e.to_string()))?;
        Ok(state)
    }
}

/// Serialize `state` into snapshot bytes
pub fn encode(state: &SimulationState) -> SimResult<Vec<u8>> {
    validate_state(state).map_err(|e| SimError::corrupt(format!("refusing to encode: {e}")))?;
    serde_json::to_vec_pretty(&SnapshotFile::from(state)).map_err(|e| SimError::corrupt(e.to_string()))
}

/// Parse snapshot bytes back into a state
pub fn decode(bytes: &[u8]) -> SimResult<SimulationState> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| SimError::corrupt(e.to_string()))?;

    let obj = value.as_object().ok_or_else(|| SimError::corrupt("top level is not an object"))?;
    match obj.get("magic").and_then(Value::as_str) {
        Some(FORMAT_MAGIC) => {}
        _ => return Err(SimError::corrupt("missing or unexpected magic")),
    }
    let version = obj
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| SimError::corrupt("missing or non-integer version"))?;
    if version != FORMAT_VERSION {
        return Err(SimError::FormatVersionUnsupported {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let file: SnapshotFile = serde_json::from_value(value).map_err(|e| SimError::corrupt(e.to_string()))?;
    file.into_state()
}

/// Write `state` to `writer`
pub fn write_to<W: Write>(state: &SimulationState, mut writer: W) -> std::io::Result<()> {
    let bytes = encode(state).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    writer.write_all(&bytes)?;
    writer.flush()
}

/// Read a state from `reader`
pub fn read_from<R: Read>(mut reader: R) -> SimResult<SimulationState> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| SimError::storage("<reader>", e))?;
    decode(&bytes)
}

/// Save `state` to `path`.
///
/// The snapshot is written to a sibling `.tmp` file first and renamed into
/// place, so a failed save leaves any previous file at `path` untouched.
pub fn save(state: &SimulationState, path: &Path) -> SimResult<()> {
    let bytes = encode(state)?;
    let tmp = temp_path(path);

    let written = fs::File::create(&tmp).and_then(|file| {
        let mut w = BufWriter::new(file);
        w.write_all(&bytes)?;
        w.flush()?;
        w.get_ref().sync_all()
    });
    if let Err(e) = written.and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(SimError::storage(path, e));
    }

    info!("saved snapshot at step {} (t = {}) to {}", state.steps, state.t, path.display());
    Ok(())
}

/// Load a state from the snapshot file at `path`
pub fn load(path: &Path) -> SimResult<SimulationState> {
    let bytes = fs::read(path).map_err(|e| SimError::storage(path, e))?;
    let state = decode(&bytes)?;
    info!("loaded snapshot at step {} (t = {}) from {}", state.steps, state.t, path.display());
    Ok(state)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
