//! Descriptive statistics engine
//!
//! Operates on a cleaned numeric sequence. Every statistic degrades
//! gracefully: an empty series or insufficient sample size yields `None`
//! for that statistic only, never an error or panic.
//!
//! Two standard deviations coexist on purpose and must not be conflated:
//! [`NumericSeries::population_std_dev`] (divide by N) backs the basic
//! descriptive statistics and z-scores, while
//! [`NumericSeries::sample_std_dev`] (divide by N−1) backs the confidence
//! interval and t-test paths in [`inference`].

pub mod inference;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use inference::{
    ConfidenceInterval, Diagnostics, GrowthSignificance, TTestResult,
};

/// A cleaned numeric sequence.
///
/// Construction filters out non-finite values; all statistics run over what
/// remains.
#[derive(Debug, Clone)]
pub struct NumericSeries {
    values: Vec<f64>,
}

impl NumericSeries {
    pub fn new(values: Vec<f64>) -> Self {
        let values = values.into_iter().filter(|v| v.is_finite()).collect();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }

    // ============================================
    // Basic descriptive statistics
    // ============================================

    pub fn sum(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum())
    }

    pub fn mean(&self) -> Option<f64> {
        self.sum().map(|s| s / self.values.len() as f64)
    }

    /// Median: for an even-length series, the average of the two middle
    /// elements.
    pub fn median(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sorted = self.sorted();
        let n = sorted.len();
        let mid = n / 2;
        Some(if n % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        })
    }

    /// Most frequent values. `None` when the series is empty or every value
    /// is unique (no mode is more honest than listing everything).
    pub fn mode(&self) -> Option<Vec<f64>> {
        if self.values.is_empty() {
            return None;
        }

        let mut frequency: HashMap<u64, (f64, usize)> = HashMap::new();
        for &v in &self.values {
            let entry = frequency.entry(v.to_bits()).or_insert((v, 0));
            entry.1 += 1;
        }

        let max_freq = frequency.values().map(|(_, count)| *count).max()?;
        let mut modes: Vec<f64> = frequency
            .values()
            .filter(|(_, count)| *count == max_freq)
            .map(|(v, _)| *v)
            .collect();
        modes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        if modes.len() == self.values.len() {
            None
        } else {
            Some(modes)
        }
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn range(&self) -> Option<f64> {
        Some(self.max()? - self.min()?)
    }

    /// Population variance (divide by N).
    pub fn population_variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        let n = self.values.len() as f64;
        Some(self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n)
    }

    /// Population standard deviation (divide by N). Backs z-scores,
    /// skewness, and kurtosis.
    pub fn population_std_dev(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }

    /// Sample standard deviation (divide by N−1). Backs confidence
    /// intervals and t-tests. Requires N ≥ 2.
    pub fn sample_std_dev(&self) -> Option<f64> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let sum_sq: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        Some((sum_sq / (n - 1) as f64).sqrt())
    }

    /// Percentile via linear interpolation between order statistics.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.values.is_empty() || !(0.0..=100.0).contains(&p) {
            return None;
        }
        let sorted = self.sorted();
        let index = (p / 100.0) * (sorted.len() - 1) as f64;
        let lower = index.floor() as usize;
        let upper = index.ceil() as usize;
        let weight = index - lower as f64;

        if lower == upper {
            return Some(sorted[lower]);
        }
        Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
    }

    pub fn iqr(&self) -> Option<f64> {
        Some(self.percentile(75.0)? - self.percentile(25.0)?)
    }

    /// Coefficient of variation as a percentage of the mean.
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        let mean = self.mean()?;
        if mean == 0.0 {
            return None;
        }
        Some(self.population_std_dev()? / mean * 100.0)
    }

    // ============================================
    // Outlier detection
    // ============================================

    /// IQR-rule outliers: values outside Q1 − 1.5·IQR or Q3 + 1.5·IQR.
    pub fn detect_outliers_iqr(&self) -> Option<IqrOutliers> {
        let q1 = self.percentile(25.0)?;
        let q3 = self.percentile(75.0)?;
        let iqr = q3 - q1;
        let lower_bound = q1 - 1.5 * iqr;
        let upper_bound = q3 + 1.5 * iqr;

        let outliers: Vec<Outlier> = self
            .values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v < lower_bound || v > upper_bound)
            .map(|(index, &value)| Outlier {
                index,
                value,
                reason: if value < lower_bound {
                    "below Q1 - 1.5*IQR".to_string()
                } else {
                    "above Q3 + 1.5*IQR".to_string()
                },
            })
            .collect();

        let count = outliers.len();
        Some(IqrOutliers {
            outliers,
            count,
            percentage: count as f64 / self.values.len() as f64 * 100.0,
            lower_bound,
            upper_bound,
        })
    }

    /// Z-score outliers: |z| > 3 with population standard deviation. A
    /// zero-variance series has no outliers rather than a division by zero.
    pub fn detect_outliers_z_score(&self) -> Option<ZScoreOutliers> {
        let mean = self.mean()?;
        let std = self.population_std_dev()?;

        if std == 0.0 {
            return Some(ZScoreOutliers::default());
        }

        let outliers: Vec<ZScoreOutlier> = self
            .values
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let z = (value - mean) / std;
                (z.abs() > 3.0).then(|| ZScoreOutlier {
                    index,
                    value,
                    z_score: z,
                })
            })
            .collect();

        let count = outliers.len();
        Some(ZScoreOutliers {
            outliers,
            count,
            percentage: count as f64 / self.values.len() as f64 * 100.0,
        })
    }

    // ============================================
    // Shape
    // ============================================

    /// Third standardized moment (population std dev). Requires N ≥ 3.
    pub fn skewness(&self) -> Option<f64> {
        if self.values.len() < 3 {
            return None;
        }
        let mean = self.mean()?;
        let std = self.population_std_dev()?;
        if std == 0.0 {
            return Some(0.0);
        }
        let n = self.values.len() as f64;
        Some(
            self.values
                .iter()
                .map(|v| ((v - mean) / std).powi(3))
                .sum::<f64>()
                / n,
        )
    }

    /// Excess kurtosis (fourth standardized moment minus 3). Requires N ≥ 4.
    pub fn kurtosis(&self) -> Option<f64> {
        if self.values.len() < 4 {
            return None;
        }
        let mean = self.mean()?;
        let std = self.population_std_dev()?;
        if std == 0.0 {
            return Some(0.0);
        }
        let n = self.values.len() as f64;
        Some(
            self.values
                .iter()
                .map(|v| ((v - mean) / std).powi(4))
                .sum::<f64>()
                / n
                - 3.0,
        )
    }

    // ============================================
    // Trend
    // ============================================

    /// Ordinary least squares of value against 0-based row index.
    ///
    /// The x-axis is row order, not calendar time, even when a date column
    /// exists. Requires N ≥ 2.
    pub fn linear_regression(&self) -> Option<Regression> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }

        let x_mean = (n - 1) as f64 / 2.0;
        let y_mean = self.mean()?;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, &y) in self.values.iter().enumerate() {
            let dx = i as f64 - x_mean;
            numerator += dx * (y - y_mean);
            denominator += dx * dx;
        }

        let slope = if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        };
        let intercept = y_mean - slope * x_mean;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (i, &y) in self.values.iter().enumerate() {
            let predicted = slope * i as f64 + intercept;
            ss_res += (y - predicted).powi(2);
            ss_tot += (y - y_mean).powi(2);
        }
        let r_squared = if ss_tot == 0.0 {
            0.0
        } else {
            1.0 - ss_res / ss_tot
        };

        Some(Regression {
            slope,
            intercept,
            r_squared,
            direction: TrendDirection::from_slope(slope),
            strength: TrendStrength::from_r_squared(r_squared),
        })
    }

    /// Percent change between the means of the first and second halves
    /// (midpoint at floor(N/2)). `None` when the first-half mean is zero.
    pub fn growth_rate(&self) -> Option<f64> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        let mid = n / 2;
        let first: f64 = self.values[..mid].iter().sum::<f64>() / mid as f64;
        let second: f64 = self.values[mid..].iter().sum::<f64>() / (n - mid) as f64;

        if first == 0.0 {
            return None;
        }
        Some((second - first) / first * 100.0)
    }

    /// Run every statistic over the series.
    pub fn full_analysis(&self) -> FullAnalysis {
        FullAnalysis {
            sample_size: self.values.len(),
            mean: self.mean(),
            median: self.median(),
            mode: self.mode(),
            min: self.min(),
            max: self.max(),
            range: self.range(),
            variance: self.population_variance(),
            std_dev: self.population_std_dev(),
            coefficient_of_variation: self.coefficient_of_variation(),
            q1: self.percentile(25.0),
            q2: self.percentile(50.0),
            q3: self.percentile(75.0),
            iqr: self.iqr(),
            skewness: self.skewness(),
            kurtosis: self.kurtosis(),
            outliers_iqr: self.detect_outliers_iqr(),
            outliers_z_score: self.detect_outliers_z_score(),
            trend: self.linear_regression(),
            growth_rate: self.growth_rate(),
            confidence_interval_95: self.confidence_interval_95(),
            t_test: self.t_test(0.0),
            growth_significance: self.test_growth_significance(),
            diagnostics: self.diagnostics(),
            reliability: Reliability::from_sample_size(self.values.len()),
        }
    }
}

// ============================================
// Result types
// ============================================

/// One value flagged by the IQR rule, tagged with the bound it violated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outlier {
    pub index: usize,
    pub value: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IqrOutliers {
    pub outliers: Vec<Outlier>,
    pub count: usize,
    pub percentage: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZScoreOutlier {
    pub index: usize,
    pub value: f64,
    pub z_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZScoreOutliers {
    pub outliers: Vec<ZScoreOutlier>,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Upward,
    Downward,
    Flat,
}

impl TrendDirection {
    fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            TrendDirection::Upward
        } else if slope < 0.0 {
            TrendDirection::Downward
        } else {
            TrendDirection::Flat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Upward => "upward",
            TrendDirection::Downward => "downward",
            TrendDirection::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
}

impl TrendStrength {
    fn from_r_squared(r_squared: f64) -> Self {
        if r_squared > 0.7 {
            TrendStrength::Strong
        } else if r_squared > 0.4 {
            TrendStrength::Moderate
        } else {
            TrendStrength::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendStrength::Strong => "strong",
            TrendStrength::Moderate => "moderate",
            TrendStrength::Weak => "weak",
        }
    }
}

/// Ordinary least squares fit against row index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
    pub strength: TrendStrength,
}

impl Regression {
    pub fn equation(&self) -> String {
        format!("y = {:.4}x + {:.4}", self.slope, self.intercept)
    }
}

/// Qualitative reliability of the sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    High,
    Moderate,
    Low,
}

impl Reliability {
    pub fn from_sample_size(n: usize) -> Self {
        if n >= 30 {
            Reliability::High
        } else if n >= 10 {
            Reliability::Moderate
        } else {
            Reliability::Low
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Reliability::High => "High (n>=30)",
            Reliability::Moderate => "Moderate (10<=n<30)",
            Reliability::Low => "Low (n<10)",
        }
    }
}

/// Everything the engine can say about one numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub sample_size: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub mode: Option<Vec<f64>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub range: Option<f64>,
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    pub coefficient_of_variation: Option<f64>,
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
    pub iqr: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub outliers_iqr: Option<IqrOutliers>,
    pub outliers_z_score: Option<ZScoreOutliers>,
    pub trend: Option<Regression>,
    pub growth_rate: Option<f64>,
    pub confidence_interval_95: Option<ConfidenceInterval>,
    pub t_test: Option<TTestResult>,
    pub growth_significance: Option<GrowthSignificance>,
    pub diagnostics: Option<Diagnostics>,
    pub reliability: Reliability,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> NumericSeries {
        NumericSeries::new(values.to_vec())
    }

    #[test]
    fn test_empty_series_yields_none_everywhere() {
        let s = series(&[]);
        assert!(s.mean().is_none());
        assert!(s.median().is_none());
        assert!(s.mode().is_none());
        assert!(s.population_std_dev().is_none());
        assert!(s.percentile(50.0).is_none());
        assert!(s.detect_outliers_iqr().is_none());
        assert!(s.detect_outliers_z_score().is_none());
        assert!(s.linear_regression().is_none());
        assert!(s.growth_rate().is_none());
        assert!(s.confidence_interval_95().is_none());
    }

    #[test]
    fn test_non_finite_values_are_filtered() {
        let s = series(&[1.0, f64::NAN, 2.0, f64::INFINITY, 3.0]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.mean(), Some(2.0));
    }

    #[test]
    fn test_median_even_length_averages_middle_pair() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.median(), Some(2.5));
    }

    #[test]
    fn test_median_odd_length() {
        let s = series(&[3.0, 1.0, 2.0]);
        assert_eq!(s.median(), Some(2.0));
    }

    #[test]
    fn test_percentile_50_matches_median_even_length() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.percentile(50.0), s.median());
        assert_eq!(s.percentile(50.0), Some(2.5));
    }

    #[test]
    fn test_median_within_min_max_and_quartile_ordering() {
        let s = series(&[12.0, 7.0, 3.0, 9.0, 15.0, 4.0, 8.0]);
        let median = s.median().unwrap();
        assert!(median >= s.min().unwrap() && median <= s.max().unwrap());
        let q1 = s.percentile(25.0).unwrap();
        let q3 = s.percentile(75.0).unwrap();
        assert!(q1 <= median && median <= q3);
    }

    #[test]
    fn test_mode_all_unique_is_none() {
        let s = series(&[1.0, 2.0, 3.0]);
        assert!(s.mode().is_none());
    }

    #[test]
    fn test_mode_returns_most_frequent() {
        let s = series(&[1.0, 2.0, 2.0, 3.0]);
        assert_eq!(s.mode(), Some(vec![2.0]));
    }

    #[test]
    fn test_population_vs_sample_std_dev_differ() {
        let s = series(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let pop = s.population_std_dev().unwrap();
        let sample = s.sample_std_dev().unwrap();
        assert!((pop - 2.0).abs() < 1e-9);
        assert!(sample > pop);
        let expected_sample = pop * (8.0f64 / 7.0).sqrt();
        assert!((sample - expected_sample).abs() < 1e-9);
    }

    #[test]
    fn test_iqr_outliers_are_strictly_outside_bounds() {
        let s = series(&[10.0, 12.0, 11.0, 13.0, 1000.0]);
        let report = s.detect_outliers_iqr().unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.outliers[0].value, 1000.0);
        for outlier in &report.outliers {
            assert!(
                outlier.value < report.lower_bound || outlier.value > report.upper_bound,
                "flagged value must lie outside the bounds"
            );
        }
    }

    #[test]
    fn test_z_score_outlier_detection() {
        // Large N keeps the extreme value's influence on sigma small enough
        // that its z-score clears 3.
        let mut values = vec![10.0; 40];
        values.extend_from_slice(&[12.0, 11.0, 13.0, 9.0, 1000.0]);
        let s = series(&values);
        let report = s.detect_outliers_z_score().unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.outliers[0].value, 1000.0);
        assert!(report.outliers[0].z_score.abs() > 3.0);
    }

    #[test]
    fn test_z_score_zero_variance_has_no_outliers() {
        let s = series(&[5.0, 5.0, 5.0, 5.0]);
        let report = s.detect_outliers_z_score().unwrap();
        assert_eq!(report.count, 0);
    }

    #[test]
    fn test_skewness_kurtosis_sample_size_floors() {
        assert!(series(&[1.0, 2.0]).skewness().is_none());
        assert!(series(&[1.0, 2.0, 3.0]).skewness().is_some());
        assert!(series(&[1.0, 2.0, 3.0]).kurtosis().is_none());
        assert!(series(&[1.0, 2.0, 3.0, 4.0]).kurtosis().is_some());
    }

    #[test]
    fn test_regression_on_strictly_increasing_values() {
        let values: Vec<f64> = (0..35).map(|i| 1000.0 + 250.0 * i as f64).collect();
        let reg = series(&values).linear_regression().unwrap();
        assert!(reg.slope > 0.0);
        assert!(reg.r_squared > 0.9);
        assert_eq!(reg.direction, TrendDirection::Upward);
        assert_eq!(reg.strength, TrendStrength::Strong);
    }

    #[test]
    fn test_regression_flat_series() {
        let reg = series(&[5.0, 5.0, 5.0, 5.0]).linear_regression().unwrap();
        assert_eq!(reg.slope, 0.0);
        assert_eq!(reg.direction, TrendDirection::Flat);
        assert_eq!(reg.r_squared, 0.0);
    }

    #[test]
    fn test_growth_rate_midpoint_split() {
        // First half [100, 100] mean 100, second half [150, 150] mean 150.
        let s = series(&[100.0, 100.0, 150.0, 150.0]);
        assert_eq!(s.growth_rate(), Some(50.0));
    }

    #[test]
    fn test_growth_rate_zero_first_half_is_none() {
        let s = series(&[0.0, 0.0, 10.0, 10.0]);
        assert!(s.growth_rate().is_none());
    }

    #[test]
    fn test_full_analysis_on_tiny_series_does_not_panic() {
        let analysis = series(&[42.0]).full_analysis();
        assert_eq!(analysis.sample_size, 1);
        assert_eq!(analysis.mean, Some(42.0));
        assert!(analysis.skewness.is_none());
        assert!(analysis.trend.is_none());
        assert_eq!(analysis.reliability, Reliability::Low);
    }
}
