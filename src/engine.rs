//! Repeated two-player zero-sum game with discrete actions.

use crate::agent::DiscreteAgent;
use crate::learner::Learner;
use crate::model::{RoundRecord, Trajectory};
use anyhow::{Context, Result};
use rand_chacha::ChaCha12Rng;

/// Payoffs `(r1, r2)` of the matching game: player 1 wins on equal actions.
pub fn reward(a1: usize, a2: usize) -> (f64, f64) {
    if a1 == a2 { (1.0, -1.0) } else { (-1.0, 1.0) }
}

/// Game engine.
///
/// Owns both players and the random number generator used for their action
/// draws, and plays a fixed number of rounds.
pub struct RepeatedGameEngine<L: Learner = DiscreteAgent> {
    name: String,
    p1: L,
    p2: L,
    iterations: usize,
    rng: ChaCha12Rng,
}

impl<L: Learner> RepeatedGameEngine<L> {
    pub fn new(name: impl Into<String>, p1: L, p2: L, iterations: usize, rng: ChaCha12Rng) -> Self {
        Self {
            name: name.into(),
            p1,
            p2,
            iterations,
            rng,
        }
    }

    /// Play all rounds and return each player's probability of action 0,
    /// recorded before acting in every round.
    pub fn run(&mut self) -> Result<Trajectory> {
        let mut trajectory = Vec::with_capacity(self.iterations);
        let log_every = (self.iterations / 10).max(1);

        for round in 0..self.iterations {
            trajectory.push(RoundRecord {
                round,
                p1_prob_0: self.p1.current_strategy()[0],
                p2_prob_0: self.p2.current_strategy()[0],
            });

            self.play_round()
                .with_context(|| format!("failed to play round {round}"))?;

            if (round + 1) % log_every == 0 {
                let progress = 100.0 * (round + 1) as f64 / self.iterations as f64;
                log::info!("{}: completed {progress:06.2}%", self.name);
            }
        }

        log::info!(
            "{}: final strategies {:?} {:?}",
            self.name,
            self.p1.current_strategy(),
            self.p2.current_strategy()
        );

        Ok(trajectory)
    }

    fn play_round(&mut self) -> Result<()> {
        let a1 = self
            .p1
            .select_action(&mut self.rng)
            .context("player 1 failed to act")?;
        let a2 = self
            .p2
            .select_action(&mut self.rng)
            .context("player 2 failed to act")?;

        let (r1, r2) = reward(a1, a2);

        self.p1
            .update_from_reward(r1)
            .context("player 1 failed to update")?;
        self.p2
            .update_from_reward(r2)
            .context("player 2 failed to update")?;

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn players(&self) -> (&L, &L) {
        (&self.p1, &self.p2)
    }
}
