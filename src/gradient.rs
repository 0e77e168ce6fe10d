//! Win or learn fast infinitesimal gradient ascent (WoLF-IGA) on 2x2 matrix games.
//!
//! Player 1 plays its first action with probability `alpha` and player 2 with
//! probability `beta`. With payoff matrix `m = [[m11, m12], [m21, m22]]` and
//! `u = m11 - m12 - m21 + m22`, each player's expected value is
//!
//! ```text
//! V(alpha, beta) = u * alpha * beta + alpha * (m12 - m22) + beta * (m21 - m22) + m22
//! ```
//!
//! and each player climbs the partial derivative with respect to its own
//! probability, scaled by `factor_min` while winning and `factor_max` while losing.

use crate::error::GameError;
use crate::model::GradientRecord;
use crate::utils::check_num;
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_distr::Uniform;

/// Default stopping threshold on `|d_alpha| + |d_beta|`.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default cap on the number of gradient iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 1_000_000;

/// Parameters of a WoLF-IGA run.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientParams {
    /// Payoffs of player 1, indexed `[own action][opponent action]`.
    pub row: [[f64; 2]; 2],
    /// Payoffs of player 2, indexed `[player 1 action][own action]`.
    pub col: [[f64; 2]; 2],
    /// Known equilibrium `(alpha, beta)`, used as the win/lose benchmark.
    pub equilibrium: [f64; 2],
    pub eta: f64,
    pub factor_min: f64,
    pub factor_max: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl GradientParams {
    /// Biased matching pennies with its mixed equilibrium at `(3/8, 3/8)`.
    pub fn matching_pennies() -> Self {
        Self {
            row: [[3.0, -2.0], [-2.0, 1.0]],
            col: [[-3.0, 2.0], [2.0, -1.0]],
            equilibrium: [3.0 / 8.0, 3.0 / 8.0],
            eta: 0.1,
            factor_min: 0.2,
            factor_max: 0.8,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut payoffs = self.row.iter().chain(&self.col).flatten();
        if payoffs.any(|m| !m.is_finite()) {
            bail!("payoffs must be finite");
        }
        check_num(self.equilibrium[0], 0.0..=1.0).context("invalid equilibrium alpha")?;
        check_num(self.equilibrium[1], 0.0..=1.0).context("invalid equilibrium beta")?;
        check_num(self.eta, f64::MIN_POSITIVE..=1.0).context("invalid learning rate")?;
        check_num(self.factor_min, f64::MIN_POSITIVE..=self.factor_max)
            .context("invalid minimum factor")?;
        check_num(self.factor_max, self.factor_min..=1.0).context("invalid maximum factor")?;
        check_num(self.tolerance, f64::MIN_POSITIVE..1.0).context("invalid tolerance")?;
        check_num(self.max_iterations, 1..).context("invalid maximum number of iterations")?;
        Ok(())
    }
}

fn diag_utility(m: &[[f64; 2]; 2]) -> f64 {
    m[0][0] - m[0][1] - m[1][0] + m[1][1]
}

/// WoLF-IGA solver.
pub struct GradientDynamicsSolver {
    params: GradientParams,
    u1: f64,
    u2: f64,
    alpha: f64,
    beta: f64,
}

impl GradientDynamicsSolver {
    /// Create a solver starting from uniformly random `alpha` and `beta`.
    pub fn new<R: Rng + ?Sized>(params: GradientParams, rng: &mut R) -> Result<Self> {
        let prob_dist = Uniform::<f64>::new(0.0, 1.0)?;
        let alpha = prob_dist.sample(rng);
        let beta = prob_dist.sample(rng);
        Self::with_start(params, alpha, beta)
    }

    /// Create a solver starting from the given strategies.
    pub fn with_start(params: GradientParams, alpha: f64, beta: f64) -> Result<Self> {
        params.validate().context("invalid gradient parameters")?;
        check_num(alpha, 0.0..=1.0).context("invalid initial alpha")?;
        check_num(beta, 0.0..=1.0).context("invalid initial beta")?;
        let u1 = diag_utility(&params.row);
        let u2 = diag_utility(&params.col);
        Ok(Self {
            params,
            u1,
            u2,
            alpha,
            beta,
        })
    }

    /// Expected value of player 1.
    pub fn value1(&self, alpha: f64, beta: f64) -> f64 {
        let r = &self.params.row;
        self.u1 * alpha * beta + alpha * (r[0][1] - r[1][1]) + beta * (r[1][0] - r[1][1]) + r[1][1]
    }

    /// Expected value of player 2.
    pub fn value2(&self, alpha: f64, beta: f64) -> f64 {
        let c = &self.params.col;
        self.u2 * alpha * beta + alpha * (c[0][1] - c[1][1]) + beta * (c[1][0] - c[1][1]) + c[1][1]
    }

    /// Partial derivative of [`value1`](Self::value1) with respect to `alpha`.
    pub fn grad_alpha(&self, beta: f64) -> f64 {
        let r = &self.params.row;
        beta * self.u1 + (r[0][1] - r[1][1])
    }

    /// Partial derivative of [`value2`](Self::value2) with respect to `beta`.
    pub fn grad_beta(&self, alpha: f64) -> f64 {
        let c = &self.params.col;
        alpha * self.u2 + (c[1][0] - c[1][1])
    }

    /// Step scaling factors of both players.
    ///
    /// A player whose current value strictly exceeds its value at the
    /// equilibrium is winning and moves with `factor_min`; otherwise it
    /// moves with `factor_max`.
    pub fn win_factors(&self) -> (f64, f64) {
        let [alpha_best, beta_best] = self.params.equilibrium;
        let factor = |winning: bool| {
            if winning {
                self.params.factor_min
            } else {
                self.params.factor_max
            }
        };
        let f1 = factor(self.value1(self.alpha, self.beta) > self.value1(alpha_best, beta_best));
        let f2 = factor(self.value2(self.alpha, self.beta) > self.value2(alpha_best, beta_best));
        (f1, f2)
    }

    /// Simultaneous strategy changes `(d_alpha, d_beta)` at the current point.
    pub fn gradient_step(&self) -> (f64, f64) {
        let (f1, f2) = self.win_factors();
        let d_alpha = self.params.eta * f1 * self.grad_alpha(self.beta);
        let d_beta = self.params.eta * f2 * self.grad_beta(self.alpha);
        (d_alpha, d_beta)
    }

    /// Point reached by the current step, projected back onto `[0, 1]`.
    pub fn next_point(&self) -> (f64, f64) {
        let (d_alpha, d_beta) = self.gradient_step();
        let alpha = (self.alpha + d_alpha).clamp(0.0, 1.0);
        let beta = (self.beta + d_beta).clamp(0.0, 1.0);
        (alpha, beta)
    }

    /// Iterate the gradient dynamics until the applied step falls below the
    /// tolerance.
    ///
    /// The step is measured after projection, so a fixed point on the
    /// boundary of `[0, 1]` stops the loop even though its gradient points
    /// outward. The returned trajectory holds every visited point, the last
    /// one included.
    ///
    /// # Errors
    /// Returns [`GameError::NonConvergence`] after `max_iterations` steps.
    pub fn update(&mut self) -> Result<Vec<GradientRecord>> {
        let mut trajectory = Vec::new();
        for iteration in 0..self.params.max_iterations {
            trajectory.push(GradientRecord {
                iteration,
                alpha: self.alpha,
                beta: self.beta,
            });

            let (alpha, beta) = self.next_point();
            if (alpha - self.alpha).abs() + (beta - self.beta).abs() <= self.params.tolerance {
                return Ok(trajectory);
            }
            self.alpha = alpha;
            self.beta = beta;
        }
        Err(GameError::NonConvergence {
            iterations: self.params.max_iterations,
        }
        .into())
    }

    /// Run the dynamics from the current point, logging start and end.
    pub fn run(&mut self) -> Result<Vec<GradientRecord>> {
        log::info!("initial strategies: alpha = {}, beta = {}", self.alpha, self.beta);
        let trajectory = self.update()?;
        log::info!(
            "final strategies: alpha = {}, beta = {} (count: {})",
            self.alpha,
            self.beta,
            trajectory.len()
        );
        Ok(trajectory)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn params(&self) -> &GradientParams {
        &self.params
    }
}
