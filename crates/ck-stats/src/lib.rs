#![forbid(unsafe_code)]

//! Descriptive statistics over a stream of non-missing doubles.
//!
//! Every numeric column projects its non-missing cells to `f64` and hands
//! them to these functions, so the algorithms exist exactly once. Callers
//! are responsible for removing missing values first.
//!
//! Degenerate inputs never error: the empty sum is `0`, the empty product
//! is `1`, and any statistic that needs more observations than it was
//! given is `NaN`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("percentile {0} is outside [0, 100]")]
    PercentileOutOfRange(f64),
}

// ── Moments and sums ───────────────────────────────────────────────────

#[must_use]
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

#[must_use]
pub fn product(values: &[f64]) -> f64 {
    values.iter().product()
}

#[must_use]
pub fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

#[must_use]
pub fn sum_of_logs(values: &[f64]) -> f64 {
    values.iter().map(|v| v.ln()).sum()
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    sum(values) / values.len() as f64
}

#[must_use]
pub fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    (sum_of_logs(values) / values.len() as f64).exp()
}

/// Root mean square.
#[must_use]
pub fn quadratic_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    (sum_of_squares(values) / values.len() as f64).sqrt()
}

#[must_use]
pub fn min(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

#[must_use]
pub fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[must_use]
pub fn range(values: &[f64]) -> f64 {
    max(values) - min(values)
}

fn squared_deviations(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum()
}

/// Sample variance (`n - 1` denominator); a single value has variance `0`.
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => 0.0,
        n => squared_deviations(values) / (n - 1) as f64,
    }
}

#[must_use]
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    squared_deviations(values) / values.len() as f64
}

#[must_use]
pub fn standard_deviation(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Second central moment, `Σ(x - mean)² / n`.
#[must_use]
pub fn second_moment(values: &[f64]) -> f64 {
    population_variance(values)
}

fn standardized_power_sum(values: &[f64], power: i32) -> Option<f64> {
    let m = mean(values);
    let s = standard_deviation(values);
    if s <= f64::EPSILON * m.abs().max(1.0) {
        return None;
    }
    Some(values.iter().map(|x| ((x - m) / s).powi(power)).sum())
}

/// Adjusted Fisher-Pearson sample skewness.
#[must_use]
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return f64::NAN;
    }
    let Some(cubes) = standardized_power_sum(values, 3) else {
        return 0.0;
    };
    let n = n as f64;
    n / ((n - 1.0) * (n - 2.0)) * cubes
}

/// Bias-corrected excess kurtosis.
#[must_use]
pub fn kurtosis(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 4 {
        return f64::NAN;
    }
    let Some(fourths) = standardized_power_sum(values, 4) else {
        return 0.0;
    };
    let n = n as f64;
    let scale = n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0));
    let correction = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    scale * fourths - correction
}

// ── Order statistics ───────────────────────────────────────────────────

#[must_use]
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// R-7 quantile of already-sorted data. Callers keep `q` in `[0, 1]`.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = pos - lower as f64;
        sorted[lower] + frac * (sorted[upper] - sorted[lower])
    }
}

/// Percentile with `p` in `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> Result<f64, StatsError> {
    if !(0.0..=100.0).contains(&p) {
        return Err(StatsError::PercentileOutOfRange(p));
    }
    Ok(quantile_sorted(&sorted(values), p / 100.0))
}

#[must_use]
pub fn median(values: &[f64]) -> f64 {
    quantile_sorted(&sorted(values), 0.5)
}

#[must_use]
pub fn quartile1(values: &[f64]) -> f64 {
    quantile_sorted(&sorted(values), 0.25)
}

#[must_use]
pub fn quartile3(values: &[f64]) -> f64 {
    quantile_sorted(&sorted(values), 0.75)
}

// ── Snapshot ───────────────────────────────────────────────────────────

/// Every statistic for one input, computed in a single call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Stats {
    pub count: usize,
    pub sum: f64,
    pub product: f64,
    pub mean: f64,
    pub geometric_mean: f64,
    pub quadratic_mean: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub variance: f64,
    pub population_variance: f64,
    pub standard_deviation: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub sum_of_logs: f64,
    pub sum_of_squares: f64,
    pub second_moment: f64,
    pub median: f64,
    pub quartile1: f64,
    pub quartile3: f64,
}

impl Stats {
    #[must_use]
    pub fn compute(values: &[f64]) -> Self {
        trace!(count = values.len(), "computing column statistics");
        let ordered = sorted(values);
        let variance = variance(values);
        Self {
            count: values.len(),
            sum: sum(values),
            product: product(values),
            mean: mean(values),
            geometric_mean: geometric_mean(values),
            quadratic_mean: quadratic_mean(values),
            min: ordered.first().copied().unwrap_or(f64::NAN),
            max: ordered.last().copied().unwrap_or(f64::NAN),
            range: range(values),
            variance,
            population_variance: population_variance(values),
            standard_deviation: variance.sqrt(),
            skewness: skewness(values),
            kurtosis: kurtosis(values),
            sum_of_logs: sum_of_logs(values),
            sum_of_squares: sum_of_squares(values),
            second_moment: second_moment(values),
            median: quantile_sorted(&ordered, 0.5),
            quartile1: quantile_sorted(&ordered, 0.25),
            quartile3: quantile_sorted(&ordered, 0.75),
        }
    }

    /// Labelled measures shown by a numeric column summary, in display order.
    #[must_use]
    pub fn summary_measures(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("n", self.count as f64),
            ("sum", self.sum),
            ("Mean", self.mean),
            ("Min", self.min),
            ("Max", self.max),
            ("Range", self.range),
            ("Variance", self.variance),
            ("Std. Dev", self.standard_deviation),
        ]
    }

    /// The summary measures followed by the higher moments and quartiles.
    #[must_use]
    pub fn all_measures(&self) -> Vec<(&'static str, f64)> {
        let mut measures = self.summary_measures();
        measures.extend([
            ("Sum of Squares", self.sum_of_squares),
            ("Geometric Mean", self.geometric_mean),
            ("Quadratic Mean", self.quadratic_mean),
            ("Population Variance", self.population_variance),
            ("Sum of Logs", self.sum_of_logs),
            ("Skewness", self.skewness),
            ("Kurtosis", self.kurtosis),
            ("1st Quartile", self.quartile1),
            ("Median", self.median),
            ("3rd Quartile", self.quartile3),
        ]);
        measures
    }
}
