//! Discrete-action agents learning by policy hill climbing.

use crate::error::GameError;
use crate::learner::Learner;
use crate::utils::{argmax, check_strategy, dot, max};
use anyhow::{Result, bail};
use rand::prelude::*;
use rand_distr::{Bernoulli, Open01, Uniform};
use serde::{Deserialize, Serialize};

/// Discount factor of the value update.
pub const GAMMA: f64 = 0.9;

/// Default fixed step size of plain PHC.
pub const DEFAULT_DELTA: f64 = 0.01;

/// Rule used to choose the strategy step size on each update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepRule {
    /// Policy hill climbing with a fixed step size.
    Phc { delta: f64 },
    /// Win or learn fast: small step while winning, twice as large while losing.
    WolfPhc,
}

/// How a learning agent picks its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Exploration {
    /// Always play `argmax(q)`.
    #[default]
    Greedy,
    /// Play a uniformly random action with probability [`epsilon`], otherwise greedy.
    EpsilonGreedy,
}

/// Learning rate of the value update after `turns` updates.
pub fn learning_rate(turns: usize) -> f64 {
    1.0 / (10.0 + 0.00001 * turns as f64)
}

/// Exploration probability after `turns` updates.
pub fn epsilon(turns: usize) -> f64 {
    0.5 / (1.0 + 0.0001 * turns as f64)
}

/// WoLF step sizes `(delta_win, delta_lose)` after `turns` updates.
pub fn wolf_deltas(turns: usize) -> (f64, f64) {
    let delta_win = 1.0 / (1000.0 + turns as f64);
    (delta_win, 2.0 * delta_win)
}

/// Move up to `delta` of probability mass from every other action onto `best`.
///
/// Each non-best action gives `min(strategy[i], delta / (n - 1))`, so the
/// vector stays on the probability simplex. Requires `strategy.len() >= 2`.
pub fn shift_mass_to_best(strategy: &mut [f64], best: usize, delta: f64) {
    let share = delta / (strategy.len() - 1) as f64;
    let mut moved = 0.0;
    for (i, prob) in strategy.iter_mut().enumerate() {
        if i != best {
            let taken = prob.min(share);
            *prob -= taken;
            moved += taken;
        }
    }
    strategy[best] += moved;
}

/// Agent of a repeated matrix game with a finite action set.
///
/// Keeps one value estimate per action and a mixed strategy which is pulled
/// toward the best-valued action on every update. Agents built with
/// `learn = false` are fixed-policy opponents.
#[derive(Debug, Clone)]
pub struct DiscreteAgent {
    q: Vec<f64>,
    strategy: Vec<f64>,
    avg_strategy: Option<Vec<f64>>,
    turns: usize,
    rule: StepRule,
    learn: bool,
    exploration: Exploration,
    current_action: Option<usize>,
}

impl DiscreteAgent {
    /// Create an agent with all value estimates at zero.
    pub fn new(strategy: Vec<f64>, learn: bool, rule: StepRule) -> Result<Self> {
        let q = vec![0.0; strategy.len()];
        Self::with_q(q, strategy, learn, rule)
    }

    /// Create an agent with the given initial value estimates.
    pub fn with_q(q: Vec<f64>, strategy: Vec<f64>, learn: bool, rule: StepRule) -> Result<Self> {
        check_strategy(&strategy)?;
        if q.len() != strategy.len() {
            bail!(
                "value vector length must be {}, but is {}",
                strategy.len(),
                q.len()
            );
        }
        if let StepRule::Phc { delta } = rule {
            if !(delta > 0.0 && delta <= 1.0) {
                bail!("step size must be in the range (0, 1], but is {delta}");
            }
        }

        let n_act = strategy.len();
        let avg_strategy = match rule {
            StepRule::WolfPhc => Some(vec![1.0 / n_act as f64; n_act]),
            StepRule::Phc { .. } => None,
        };

        Ok(Self {
            q,
            strategy,
            avg_strategy,
            turns: 0,
            rule,
            learn,
            exploration: Exploration::default(),
            current_action: None,
        })
    }

    /// Set how the agent picks actions while learning.
    pub fn with_exploration(mut self, exploration: Exploration) -> Self {
        self.exploration = exploration;
        self
    }

    /// Select an action and latch it for the next [`update`](Self::update).
    pub fn action<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        let action = if !self.learn {
            self.sample_strategy(rng)
        } else {
            match self.exploration {
                Exploration::Greedy => argmax(&self.q),
                Exploration::EpsilonGreedy => {
                    let explore_dist = Bernoulli::new(epsilon(self.turns))?;
                    if explore_dist.sample(rng) {
                        let act_dist = Uniform::new(0, self.n_act())?;
                        act_dist.sample(rng)
                    } else {
                        argmax(&self.q)
                    }
                }
            }
        };
        self.current_action = Some(action);
        Ok(action)
    }

    /// Learn from the reward of the latched action.
    ///
    /// Does nothing for fixed-policy agents.
    ///
    /// # Errors
    /// Returns [`GameError::UncalledAction`] if no action was selected since
    /// the previous update.
    pub fn update(&mut self, reward: f64) -> Result<()> {
        let action = self.current_action.take();
        if !self.learn {
            return Ok(());
        }
        let action = action.ok_or(GameError::UncalledAction)?;

        self.update_value(action, reward);

        let best = argmax(&self.q);
        let delta = self.delta();
        shift_mass_to_best(&mut self.strategy, best, delta);

        self.update_avg_strategy();

        self.turns += 1;

        Ok(())
    }

    fn update_value(&mut self, action: usize, reward: f64) {
        let lr = learning_rate(self.turns);
        let q_max = max(&self.q);
        self.q[action] = (1.0 - lr) * self.q[action] + lr * (reward + GAMMA * q_max);
    }

    fn delta(&self) -> f64 {
        match self.rule {
            StepRule::Phc { delta } => delta,
            StepRule::WolfPhc => {
                let (delta_win, delta_lose) = wolf_deltas(self.turns);
                if self.is_winning() {
                    delta_win
                } else {
                    delta_lose
                }
            }
        }
    }

    fn update_avg_strategy(&mut self) {
        let Some(avg_strategy) = self.avg_strategy.as_mut() else {
            return;
        };
        let weight = 1.0 / (self.turns + 1) as f64;
        for (avg, &prob) in avg_strategy.iter_mut().zip(&self.strategy) {
            *avg += weight * (prob - *avg);
        }
    }

    fn sample_strategy<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let r: f64 = Open01.sample(rng);
        let mut sum = 0.0;
        for (i, &prob) in self.strategy.iter().enumerate() {
            sum += prob;
            if sum >= r {
                return i;
            }
        }
        // Rounding left the cumulative sum just below `r`.
        self.strategy
            .iter()
            .rposition(|&prob| prob > 0.0)
            .unwrap_or(self.n_act() - 1)
    }

    /// Whether the current strategy beats the average strategy under `q`.
    ///
    /// Always false for plain PHC agents, which track no average.
    pub fn is_winning(&self) -> bool {
        match &self.avg_strategy {
            Some(avg_strategy) => dot(&self.strategy, &self.q) > dot(avg_strategy, &self.q),
            None => false,
        }
    }

    /// Probability of playing `action`.
    ///
    /// # Panics
    /// Panics if `action >= self.n_act()`.
    pub fn strategy(&self, action: usize) -> f64 {
        self.strategy[action]
    }

    /// Current mixed strategy.
    pub fn strategy_vec(&self) -> &[f64] {
        &self.strategy
    }

    /// Running average of the strategy (WoLF-PHC only).
    pub fn avg_strategy(&self) -> Option<&[f64]> {
        self.avg_strategy.as_deref()
    }

    /// Action-value estimates.
    pub fn q(&self) -> &[f64] {
        &self.q
    }

    /// Number of learning updates so far.
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Whether the agent learns or keeps a fixed policy.
    pub fn learn(&self) -> bool {
        self.learn
    }

    /// Step size rule.
    pub fn rule(&self) -> StepRule {
        self.rule
    }

    /// Action latched by the last [`action`](Self::action) call, if not yet consumed.
    pub fn current_action(&self) -> Option<usize> {
        self.current_action
    }

    /// Number of actions.
    pub fn n_act(&self) -> usize {
        self.strategy.len()
    }
}

impl Learner for DiscreteAgent {
    fn select_action<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        self.action(rng)
    }

    fn update_from_reward(&mut self, reward: f64) -> Result<()> {
        self.update(reward)
    }

    fn current_strategy(&self) -> &[f64] {
        &self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    const TOL: f64 = 1e-9;

    fn assert_simplex(strategy: &[f64]) {
        assert!(strategy.iter().all(|&p| p >= 0.0), "{strategy:?}");
        let sum: f64 = strategy.iter().sum();
        assert!((sum - 1.0).abs() < TOL, "{strategy:?} sums to {sum}");
    }

    fn phc() -> StepRule {
        StepRule::Phc {
            delta: DEFAULT_DELTA,
        }
    }

    #[test]
    fn construction_validates_strategy() {
        let err = DiscreteAgent::new(vec![1.0], true, phc()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GameError>(),
            Some(&GameError::InvalidActionCount { count: 1 })
        );

        let err = DiscreteAgent::new(vec![0.6, 0.6], true, phc()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameError>(),
            Some(GameError::InvalidStrategy { .. })
        ));

        let err = DiscreteAgent::new(vec![-0.5, 1.5], false, StepRule::WolfPhc).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameError>(),
            Some(GameError::InvalidStrategy { .. })
        ));

        assert!(DiscreteAgent::with_q(vec![0.0], vec![0.5, 0.5], true, phc()).is_err());
        assert!(DiscreteAgent::new(vec![0.5, 0.5], true, StepRule::Phc { delta: 0.0 }).is_err());
    }

    #[test]
    fn update_without_action_fails() {
        let mut agt = DiscreteAgent::new(vec![0.5, 0.5], true, phc()).unwrap();
        let err = agt.update(1.0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GameError>(),
            Some(&GameError::UncalledAction)
        );

        let mut rng = ChaCha12Rng::seed_from_u64(0);
        agt.action(&mut rng).unwrap();
        agt.update(1.0).unwrap();
        assert!(agt.update(1.0).is_err());
        assert_eq!(agt.turns(), 1);
    }

    #[test]
    fn first_phc_update_matches_hand_computation() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let mut agt = DiscreteAgent::new(vec![0.5, 0.5], true, phc()).unwrap();

        assert_eq!(agt.action(&mut rng).unwrap(), 0);
        agt.update(-1.0).unwrap();

        assert!((agt.q()[0] + 0.1).abs() < TOL);
        assert_eq!(agt.q()[1], 0.0);
        assert!((agt.strategy(0) - 0.49).abs() < TOL);
        assert!((agt.strategy(1) - 0.51).abs() < TOL);
    }

    #[test]
    fn first_wolf_update_uses_losing_step() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let mut agt = DiscreteAgent::new(vec![0.2, 0.8], true, StepRule::WolfPhc).unwrap();
        assert_eq!(agt.avg_strategy(), Some(&[0.5, 0.5][..]));

        assert_eq!(agt.action(&mut rng).unwrap(), 0);
        agt.update(1.0).unwrap();

        // q = [0.1, 0]: 0.2 * 0.1 < 0.5 * 0.1, so the agent is losing.
        assert!((agt.strategy(0) - 0.202).abs() < TOL);
        assert!((agt.strategy(1) - 0.798).abs() < TOL);
        // First average is the strategy itself.
        let avg = agt.avg_strategy().unwrap();
        assert!((avg[0] - 0.202).abs() < TOL);
        assert!((avg[1] - 0.798).abs() < TOL);
    }

    #[test]
    fn wolf_deltas_are_exact() {
        for turns in [0, 1, 17, 1000, 123_456] {
            let (delta_win, delta_lose) = wolf_deltas(turns);
            assert_eq!(delta_win, 1.0 / (1000.0 + turns as f64));
            assert_eq!(delta_lose, 2.0 * delta_win);
        }
    }

    #[test]
    fn schedules_decrease() {
        assert_eq!(epsilon(0), 0.5);
        assert_eq!(learning_rate(0), 0.1);
        assert!(epsilon(10) < epsilon(0));
        assert!(learning_rate(10) < learning_rate(0));
    }

    #[test]
    fn shift_mass_keeps_simplex_and_is_monotone() {
        let mut strategy = vec![0.1, 0.6, 0.003, 0.297];
        for step in 0..200 {
            let best = step % 4;
            let before = strategy.clone();
            shift_mass_to_best(&mut strategy, best, 0.03);
            assert_simplex(&strategy);
            assert!(strategy[best] >= before[best]);
            for i in (0..4).filter(|&i| i != best) {
                assert!(strategy[i] <= before[i]);
            }
        }

        let mut pure = vec![0.0, 1.0];
        shift_mass_to_best(&mut pure, 1, 0.5);
        assert_eq!(pure, vec![0.0, 1.0]);
    }

    #[test]
    fn learners_stay_on_simplex() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        for rule in [phc(), StepRule::WolfPhc] {
            let mut agt = DiscreteAgent::new(vec![0.2, 0.3, 0.5], true, rule)
                .unwrap()
                .with_exploration(Exploration::EpsilonGreedy);
            for turn in 0..5000 {
                let action = agt.action(&mut rng).unwrap();
                let reward = if action == turn % 3 { 1.0 } else { -1.0 };
                agt.update(reward).unwrap();
                assert_simplex(agt.strategy_vec());
                if let Some(avg) = agt.avg_strategy() {
                    assert_simplex(avg);
                }
            }
            assert_eq!(agt.turns(), 5000);
        }
    }

    #[test]
    fn fixed_agents_never_change() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let mut agt = DiscreteAgent::new(vec![0.8, 0.2], false, StepRule::WolfPhc).unwrap();
        for _ in 0..100 {
            agt.action(&mut rng).unwrap();
            agt.update(1.0).unwrap();
        }
        assert_eq!(agt.turns(), 0);
        assert_eq!(agt.strategy_vec(), &[0.8, 0.2]);
        assert_eq!(agt.q(), &[0.0, 0.0]);
    }

    #[test]
    fn fixed_agents_sample_their_strategy() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);

        let mut pure = DiscreteAgent::new(vec![0.0, 1.0], false, phc()).unwrap();
        assert!((0..1000).all(|_| pure.action(&mut rng).unwrap() == 1));

        let mut pure = DiscreteAgent::new(vec![1.0, 0.0], false, phc()).unwrap();
        assert!((0..1000).all(|_| pure.action(&mut rng).unwrap() == 0));

        let mut mixed = DiscreteAgent::new(vec![0.8, 0.2], false, phc()).unwrap();
        let n_zero = (0..10_000)
            .filter(|_| mixed.action(&mut rng).unwrap() == 0)
            .count();
        assert!((7_500..8_500).contains(&n_zero), "{n_zero}");
    }

    #[test]
    fn greedy_learner_plays_best_value() {
        let mut rng = ChaCha12Rng::seed_from_u64(6);
        let mut agt = DiscreteAgent::with_q(vec![0.0, 1.0], vec![0.5, 0.5], true, phc()).unwrap();
        assert!((0..100).all(|_| agt.action(&mut rng).unwrap() == 1));
        assert_eq!(agt.current_action(), Some(1));
    }

    #[test]
    fn epsilon_greedy_learner_explores() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let mut agt = DiscreteAgent::with_q(vec![0.0, 1.0], vec![0.5, 0.5], true, phc())
            .unwrap()
            .with_exploration(Exploration::EpsilonGreedy);
        // At turn 0 half of the draws explore, and half of those pick action 0.
        let n_zero = (0..4000)
            .filter(|_| agt.action(&mut rng).unwrap() == 0)
            .count();
        assert!((800..1200).contains(&n_zero), "{n_zero}");
    }

    #[test]
    #[should_panic]
    fn strategy_of_unknown_action_panics() {
        let agt = DiscreteAgent::new(vec![0.5, 0.5], true, phc()).unwrap();
        agt.strategy(2);
    }

    #[test]
    fn strategy_reads_are_idempotent() {
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let mut agt = DiscreteAgent::new(vec![0.3, 0.7], true, StepRule::WolfPhc).unwrap();
        agt.action(&mut rng).unwrap();
        agt.update(1.0).unwrap();
        let first = agt.strategy(0);
        for _ in 0..10 {
            assert_eq!(agt.strategy(0), first);
        }
        assert_eq!(agt.current_strategy(), agt.strategy_vec());
    }
}
