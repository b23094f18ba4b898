//! Replay: serialize/deserialize simulation logs for offline analysis.
//!
//! A log carries the scenario it was produced with, so replaying re-runs the
//! estimator on the recorded readings under the same configuration.

use crate::{
    error::SimError,
    runner::{SimOutcome, Simulation, TickRecord},
    scenarios::ScenarioConfig,
};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded simulation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub scenario_name: String,
    pub seed: u64,
    pub config: ScenarioConfig,
    /// One record per tick, in order
    pub records: Vec<TickRecord>,
}

impl ReplayLog {
    pub fn new(config: &ScenarioConfig, records: Vec<TickRecord>) -> Self {
        Self {
            scenario_name: config.name.clone(),
            seed: config.seed,
            config: config.clone(),
            records,
        }
    }
}

/// Save a replay log to a JSON file.
pub fn save_replay(log: &ReplayLog, path: &Path) -> Result<(), SimError> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a replay log from a JSON file.
pub fn load_replay(path: &Path) -> Result<ReplayLog, SimError> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: ReplayLog = serde_json::from_reader(reader)?;
    Ok(log)
}

/// Re-estimate every recorded reading vector with the log's configuration.
///
/// True poses and readings are taken from the log; only the estimates change.
pub fn rerun(log: &ReplayLog) -> Result<SimOutcome, SimError> {
    let sim = Simulation::new(log.config.clone())?;
    let records = log
        .records
        .iter()
        .map(|r| {
            Ok(TickRecord {
                estimate: sim.estimator().estimate(&r.readings)?,
                ..r.clone()
            })
        })
        .collect::<Result<Vec<_>, SimError>>()?;
    let metrics = sim.score(&records);
    Ok(SimOutcome { records, metrics })
}
