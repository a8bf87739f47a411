//! Determinism verification over a recorded snapshot sequence.
//!
//! The same script is decided several times in parallel with one config and
//! seed. Every run must produce byte-identical action batches.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use rayon::prelude::*;
use swarm_core::config::EngineConfig;
use swarm_core::engine::DecisionEngine;
use swarm_core::error::Result as EngineResult;
use swarm_core::snapshot::WorldSnapshot;

use crate::protocol::ProtocolError;

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Snapshots per run.
    pub ticks: usize,
    /// Final hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run agreed.
    pub is_deterministic: bool,
}

/// Read a JSON array of snapshots.
pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Vec<WorldSnapshot>, ProtocolError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Decide `script` once and fold every batch into one hash.
pub fn run_once(config: &EngineConfig, script: &[WorldSnapshot]) -> EngineResult<u64> {
    let mut engine = DecisionEngine::new(config.clone())?;
    let mut hasher = DefaultHasher::new();
    for snapshot in script {
        engine.decide(snapshot).hash(&mut hasher);
    }
    Ok(hasher.finish())
}

/// Decide `script` `runs` times in parallel and compare the hashes.
pub fn verify(config: &EngineConfig, script: &[WorldSnapshot], runs: usize) -> EngineResult<VerifyReport> {
    let hashes = (0..runs)
        .into_par_iter()
        .map(|_| run_once(config, script))
        .collect::<EngineResult<Vec<u64>>>()?;
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    if !is_deterministic {
        tracing::warn!(runs, ?hashes, "Runs diverged");
    }
    Ok(VerifyReport {
        ticks: script.len(),
        hashes,
        is_deterministic,
    })
}
