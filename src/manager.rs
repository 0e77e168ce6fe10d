use crate::analysis::Analyzer;
use crate::config::{Config, DiscreteConfig, GradientConfig};
use crate::engine::RepeatedGameEngine;
use crate::gradient::GradientDynamicsSolver;
use crate::model::{Records, StoredTrajectory};
use anyhow::{Context, Result};
use glob::glob;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Owns a simulation directory holding `config.toml`, one trajectory per
/// experiment and, after analysis, one summary per trajectory.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn run_experiments(&self) -> Result<()> {
        for exp in &self.cfg.discrete {
            self.run_discrete(exp)
                .with_context(|| format!("failed to run {:?}", exp.name))?;
        }
        for exp in &self.cfg.gradient {
            self.run_gradient(exp)
                .with_context(|| format!("failed to run {:?}", exp.name))?;
        }
        Ok(())
    }

    fn run_discrete(&self, exp: &DiscreteConfig) -> Result<()> {
        let (p1, p2) = exp.build_players()?;
        let rng = make_rng(exp.seed)?;
        let mut engine = RepeatedGameEngine::new(&exp.name, p1, p2, exp.iterations, rng);
        let records = engine.run()?;

        let trajectory = StoredTrajectory {
            name: exp.name.clone(),
            equilibrium: None,
            records: Records::Discrete(records),
        };
        self.save_trajectory(&trajectory)
    }

    fn run_gradient(&self, exp: &GradientConfig) -> Result<()> {
        let mut rng = make_rng(exp.seed)?;
        let mut solver = GradientDynamicsSolver::new(exp.params(), &mut rng)
            .context("failed to construct solver")?;
        let records = solver.run()?;

        let trajectory = StoredTrajectory {
            name: exp.name.clone(),
            equilibrium: Some(exp.equilibrium),
            records: Records::Gradient(records),
        };
        self.save_trajectory(&trajectory)
    }

    fn save_trajectory(&self, trajectory: &StoredTrajectory) -> Result<()> {
        let file = self.trajectory_file(&trajectory.name);
        trajectory
            .save(&file)
            .with_context(|| format!("failed to save {file:?}"))?;
        log::info!("wrote {file:?}");
        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        for file in self.trajectory_files()? {
            let analyzer = Analyzer::from_file(&file)
                .with_context(|| format!("failed to analyze {file:?}"))?;

            let results_file = self.results_file(analyzer.name());
            analyzer
                .save_results(&results_file)
                .context("failed to save results")?;
            log::info!("wrote {results_file:?}");
        }
        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for file in self.glob_files("*.msgpack")? {
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }
        Ok(())
    }

    fn trajectory_files(&self) -> Result<Vec<PathBuf>> {
        let files = self
            .glob_files("*.msgpack")?
            .into_iter()
            .filter(|file| {
                file.file_stem()
                    .and_then(|stem| stem.to_str())
                    .is_some_and(|stem| !stem.ends_with("-summary"))
            })
            .collect();
        Ok(files)
    }

    fn glob_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join(pattern);
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let files = glob(pattern)
            .context("failed to glob files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        Ok(files)
    }

    fn trajectory_file(&self, name: &str) -> PathBuf {
        self.sim_dir.join(format!("{name}.msgpack"))
    }

    fn results_file(&self, name: &str) -> PathBuf {
        self.sim_dir.join(format!("{name}-summary.msgpack"))
    }
}

fn make_rng(seed: Option<u64>) -> Result<ChaCha12Rng> {
    let rng = match seed {
        Some(seed) => ChaCha12Rng::seed_from_u64(seed),
        None => ChaCha12Rng::try_from_os_rng()?,
    };
    Ok(rng)
}
