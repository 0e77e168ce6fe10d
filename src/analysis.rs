use crate::model::StoredTrajectory;
use crate::stats::{ProbSeries, SeriesReport};
use anyhow::{Context, Result};
use rmp_serde::encode;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub name: String,
    pub n_records: usize,
    pub p1: SeriesReport,
    pub p2: SeriesReport,
    /// Euclidean distance of the last point from the known equilibrium.
    pub dist_equil: Option<f64>,
}

/// Summarizes one stored trajectory.
pub struct Analyzer {
    name: String,
    equilibrium: Option<[f64; 2]>,
    series: [ProbSeries; 2],
}

impl Analyzer {
    pub fn new(trajectory: &StoredTrajectory) -> Self {
        let mut analyzer = Self {
            name: trajectory.name.clone(),
            equilibrium: trajectory.equilibrium,
            series: [ProbSeries::new(), ProbSeries::new()],
        };
        for probs in trajectory.records.probs() {
            for (series, prob) in analyzer.series.iter_mut().zip(probs) {
                series.push(prob);
            }
        }
        analyzer
    }

    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let trajectory = StoredTrajectory::load(file).context("failed to load trajectory")?;
        Ok(Self::new(&trajectory))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> Summary {
        let [p1, p2] = [self.series[0].report(), self.series[1].report()];
        let dist_equil = self
            .equilibrium
            .map(|[alpha, beta]| (p1.last - alpha).hypot(p2.last - beta));
        Summary {
            name: self.name.clone(),
            n_records: self.series[0].len(),
            p1,
            p2,
            dist_equil,
        }
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let summary = self.summary();
        log::info!("{summary:#?}");
        encode::write(&mut writer, &summary).context("failed to serialize summary")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
