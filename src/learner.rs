//! Capability set shared by the iterative best-response learners.

use anyhow::Result;
use rand::Rng;

/// A learner that repeatedly picks an action, observes a reward, and adjusts
/// its mixed strategy.
///
/// [`RepeatedGameEngine`](crate::engine::RepeatedGameEngine) is written
/// against this trait, so every step rule shares the same game loop.
pub trait Learner {
    /// Pick the action to play this round and latch it for the next update.
    fn select_action<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize>;

    /// Feed back the reward obtained by the latched action.
    fn update_from_reward(&mut self, reward: f64) -> Result<()>;

    /// Current mixed strategy.
    fn current_strategy(&self) -> &[f64];
}
