use crate::error::GameError;
use anyhow::{Result, bail};
use std::{fmt::Debug, ops::RangeBounds};

/// Tolerance on the sum of a probability vector.
pub const PROB_SUM_TOL: f64 = 1e-8;

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

/// Check that `strategy` is a probability vector over at least two actions.
pub fn check_strategy(strategy: &[f64]) -> Result<(), GameError> {
    let count = strategy.len();
    if count < 2 {
        return Err(GameError::InvalidActionCount { count });
    }
    if strategy.iter().any(|ele| !ele.is_finite()) {
        return Err(GameError::InvalidStrategy {
            reason: "vector must have only finite elements".to_string(),
        });
    }
    if strategy.iter().any(|&ele| ele < 0.0) {
        return Err(GameError::InvalidStrategy {
            reason: "vector must have only non-negative elements".to_string(),
        });
    }
    let sum: f64 = strategy.iter().sum();
    if (sum - 1.0).abs() > PROB_SUM_TOL {
        return Err(GameError::InvalidStrategy {
            reason: format!("vector must sum to 1.0 (tolerance: {PROB_SUM_TOL}), but sums to {sum}"),
        });
    }
    Ok(())
}

/// Index of the largest element, ties resolved to the lowest index.
pub fn argmax(vec: &[f64]) -> usize {
    let mut i_max = 0;
    for (i, &ele) in vec.iter().enumerate().skip(1) {
        if ele > vec[i_max] {
            i_max = i;
        }
    }
    i_max
}

pub fn max(vec: &[f64]) -> f64 {
    vec.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
