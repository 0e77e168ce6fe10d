use crate::agent::{DEFAULT_DELTA, DiscreteAgent, Exploration, StepRule};
use crate::gradient::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, GradientParams};
use crate::utils::{check_num, check_strategy};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};

/// Experiment configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Repeated discrete games.
    #[serde(default)]
    pub discrete: Vec<DiscreteConfig>,
    /// WoLF-IGA runs.
    #[serde(default)]
    pub gradient: Vec<GradientConfig>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Phc,
    WolfPhc,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    /// Initial mixed strategy.
    pub strategy: Vec<f64>,
    /// Whether the player learns or keeps its strategy fixed.
    #[serde(default = "default_learn")]
    pub learn: bool,
}

fn default_learn() -> bool {
    true
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscreteConfig {
    pub name: String,
    pub rule: RuleKind,
    /// Number of rounds.
    pub iterations: usize,
    /// Random seed (drawn from the OS if absent).
    pub seed: Option<u64>,
    #[serde(default)]
    pub exploration: Exploration,
    /// Fixed step size (PHC only).
    pub delta: Option<f64>,

    pub player1: PlayerConfig,
    pub player2: PlayerConfig,
}

impl DiscreteConfig {
    pub fn step_rule(&self) -> StepRule {
        match self.rule {
            RuleKind::Phc => StepRule::Phc {
                delta: self.delta.unwrap_or(DEFAULT_DELTA),
            },
            RuleKind::WolfPhc => StepRule::WolfPhc,
        }
    }

    pub fn build_players(&self) -> Result<(DiscreteAgent, DiscreteAgent)> {
        let build = |player: &PlayerConfig| -> Result<DiscreteAgent> {
            let agent = DiscreteAgent::new(player.strategy.clone(), player.learn, self.step_rule())?;
            Ok(agent.with_exploration(self.exploration))
        };
        let p1 = build(&self.player1).context("failed to build player 1")?;
        let p2 = build(&self.player2).context("failed to build player 2")?;
        Ok((p1, p2))
    }

    fn validate(&self) -> Result<()> {
        check_num(self.iterations, 1..=100_000_000).context("invalid number of iterations")?;
        if let Some(delta) = self.delta {
            if self.rule != RuleKind::Phc {
                bail!("a fixed step size is only used by the phc rule");
            }
            check_num(delta, f64::MIN_POSITIVE..=1.0).context("invalid step size")?;
        }
        check_strategy(&self.player1.strategy).context("invalid strategy of player 1")?;
        check_strategy(&self.player2.strategy).context("invalid strategy of player 2")?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradientConfig {
    pub name: String,
    /// Payoff matrix of player 1.
    pub row: [[f64; 2]; 2],
    /// Payoff matrix of player 2.
    pub col: [[f64; 2]; 2],
    /// Known equilibrium `[alpha, beta]`.
    pub equilibrium: [f64; 2],
    pub eta: f64,
    pub factor_min: f64,
    pub factor_max: f64,
    /// Random seed (drawn from the OS if absent).
    pub seed: Option<u64>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl GradientConfig {
    pub fn params(&self) -> GradientParams {
        GradientParams {
            row: self.row,
            col: self.col,
            equilibrium: self.equilibrium,
            eta: self.eta,
            factor_min: self.factor_min,
            factor_max: self.factor_max,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.discrete.is_empty() && self.gradient.is_empty() {
            bail!("config must define at least one experiment");
        }

        let names = self
            .discrete
            .iter()
            .map(|exp| &exp.name)
            .chain(self.gradient.iter().map(|exp| &exp.name));
        let mut seen = HashSet::new();
        for name in names {
            check_name(name).with_context(|| format!("invalid experiment name {name:?}"))?;
            if !seen.insert(name) {
                bail!("experiment name {name:?} is used more than once");
            }
        }

        for exp in &self.discrete {
            exp.validate()
                .with_context(|| format!("invalid discrete experiment {:?}", exp.name))?;
        }
        for exp in &self.gradient {
            exp.params()
                .validate()
                .with_context(|| format!("invalid gradient experiment {:?}", exp.name))?;
        }

        Ok(())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!("name must contain only ASCII alphanumerics, '_' and '-'");
    }
    if name.ends_with("-summary") {
        bail!("name must not end with \"-summary\"");
    }
    Ok(())
}
