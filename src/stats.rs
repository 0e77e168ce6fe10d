//! Summary statistics of a recorded probability series.

use serde::{Deserialize, Serialize};

/// One player's probability of its first action, in record order.
#[derive(Default)]
pub struct ProbSeries {
    probs: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesReport {
    pub mean: f64,
    pub std_dev: f64,
    /// First index kept after cutting the initial transient.
    pub i_equil: usize,
    pub equil_mean: f64,
    pub equil_std_dev: f64,
    /// Standard error of `equil_mean`, corrected for autocorrelation.
    pub equil_sem: f64,
    pub last: f64,
}

impl ProbSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, prob: f64) {
        self.probs.push(prob);
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn report(&self) -> SeriesReport {
        let (mean, var) = mean_var(&self.probs);
        let i_equil = mser_cut(&self.probs);
        let tail = &self.probs[i_equil..];
        let (equil_mean, equil_var) = mean_var(tail);
        SeriesReport {
            mean,
            std_dev: var.sqrt(),
            i_equil,
            equil_mean,
            equil_std_dev: equil_var.sqrt(),
            equil_sem: blocked_sem(tail),
            last: self.probs.last().copied().unwrap_or(f64::NAN),
        }
    }
}

/// Mean and unbiased variance; NaN where undefined.
fn mean_var(vals: &[f64]) -> (f64, f64) {
    let n = vals.len() as f64;
    let mean = if vals.is_empty() {
        f64::NAN
    } else {
        vals.iter().sum::<f64>() / n
    };
    let var = if vals.len() < 2 {
        f64::NAN
    } else {
        vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
    };
    (mean, var)
}

/// Truncation point minimizing the MSER statistic `SSE(tail) / len(tail)^2`.
///
/// Every cut in the first half of the series is tried; ties go to the
/// earliest cut.
fn mser_cut(vals: &[f64]) -> usize {
    let n = vals.len();
    if n < 2 {
        return 0;
    }

    // Suffix sums of x and x^2, accumulated from the end.
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut scores = vec![f64::INFINITY; n / 2 + 1];
    for i in (0..n).rev() {
        sum += vals[i];
        sum_sq += vals[i] * vals[i];
        if i < scores.len() {
            let len = (n - i) as f64;
            let sse = (sum_sq - sum * sum / len).max(0.0);
            scores[i] = sse / (len * len);
        }
    }

    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score < scores[best] {
            best = i;
        }
    }
    best
}

/// Standard error of the mean by pairwise blocking.
///
/// Blocks are averaged in pairs until the naive estimate stops growing
/// beyond its own uncertainty; that plateau value is returned.
fn blocked_sem(vals: &[f64]) -> f64 {
    let mut blocks = vals.to_vec();
    let mut prev: Option<(f64, f64)> = None;
    while blocks.len() >= 2 {
        let n = blocks.len() as f64;
        let sem = (mean_var(&blocks).1 / n).sqrt();
        let err = sem / (2.0 * (n - 1.0)).sqrt();
        if let Some((prev_sem, prev_err)) = prev {
            if sem - prev_sem <= prev_err {
                return sem;
            }
        }
        prev = Some((sem, err));
        blocks = blocks
            .chunks_exact(2)
            .map(|pair| 0.5 * (pair[0] + pair[1]))
            .collect();
    }
    prev.map_or(f64::NAN, |(sem, _)| sem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(vals: impl IntoIterator<Item = f64>) -> ProbSeries {
        let mut series = ProbSeries::new();
        vals.into_iter().for_each(|val| series.push(val));
        series
    }

    #[test]
    fn moments_match_direct_formulas() {
        let report = series([1.0, 2.0, 3.0, 4.0]).report();
        assert!((report.mean - 2.5).abs() < 1e-12);
        assert!((report.std_dev - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(report.last, 4.0);
    }

    #[test]
    fn transient_is_cut_from_settling_series() {
        let report = series((0..1024).map(|i| if i < 100 { i as f64 / 100.0 } else { 1.0 })).report();
        assert_eq!(report.i_equil, 100, "{report:?}");
        assert_eq!(report.equil_mean, 1.0);
        assert_eq!(report.equil_std_dev, 0.0);
        assert_eq!(report.equil_sem, 0.0);
        assert!(report.mean < 1.0);
    }

    #[test]
    fn sem_of_alternating_series_shrinks_with_blocking() {
        // Pair averages of 0, 1, 0, 1, ... are constant, so the plateau is zero.
        let report = series((0..256).map(|i| (i % 2) as f64)).report();
        assert!((report.equil_mean - 0.5).abs() < 1e-12);
        assert!(report.equil_sem < 1e-12, "{report:?}");
    }

    #[test]
    fn short_series_do_not_panic() {
        let empty = ProbSeries::new().report();
        assert_eq!(empty.i_equil, 0);
        assert!(empty.mean.is_nan());
        assert!(empty.equil_sem.is_nan());

        let single = series([0.5]).report();
        assert_eq!(single.i_equil, 0);
        assert_eq!(single.equil_mean, 0.5);
        assert!(single.std_dev.is_nan());
    }
}
