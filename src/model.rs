//! Trajectory data types.

use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Probabilities of action 0 recorded at the start of a round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    pub p1_prob_0: f64,
    pub p2_prob_0: f64,
}

/// Continuous strategies recorded at one gradient iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientRecord {
    pub iteration: usize,
    pub alpha: f64,
    pub beta: f64,
}

/// Output of a repeated discrete game.
pub type Trajectory = Vec<RoundRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Records {
    Discrete(Vec<RoundRecord>),
    Gradient(Vec<GradientRecord>),
}

impl Records {
    pub fn len(&self) -> usize {
        match self {
            Records::Discrete(records) => records.len(),
            Records::Gradient(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Each player's probability of its first action, in record order.
    pub fn probs(&self) -> Vec<[f64; 2]> {
        match self {
            Records::Discrete(records) => records
                .iter()
                .map(|rec| [rec.p1_prob_0, rec.p2_prob_0])
                .collect(),
            Records::Gradient(records) => {
                records.iter().map(|rec| [rec.alpha, rec.beta]).collect()
            }
        }
    }
}

/// Trajectory of one named experiment as stored on disk.
///
/// Renderers name their artifact after [`StoredTrajectory::name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrajectory {
    pub name: String,
    /// Known equilibrium, if the experiment has one.
    pub equilibrium: Option<[f64; 2]>,
    pub records: Records,
}

impl StoredTrajectory {
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, self).context("failed to serialize trajectory")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let trajectory =
            decode::from_read(&mut reader).context("failed to deserialize trajectory")?;
        Ok(trajectory)
    }
}
