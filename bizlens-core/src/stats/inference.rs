//! Inferential statistics: confidence intervals and significance tests.
//!
//! Everything here is deliberately approximate. The t-critical values come
//! from a small lookup table with a 2.0 fallback, and p-values come from a
//! coarse ladder below 30 samples or an Abramowitz-Stegun normal-CDF
//! polynomial at 30 and above. Downstream output is pinned to these
//! approximations; swapping in an exact t-distribution would change results.

use super::NumericSeries;
use serde::{Deserialize, Serialize};

/// Two-sided 95% critical values of the t-distribution by degrees of
/// freedom. Missing entries fall back to 2.0; df >= 30 uses the normal 1.96.
const T_TABLE_95: &[(usize, f64)] = &[
    (1, 12.706),
    (2, 4.303),
    (3, 3.182),
    (4, 2.776),
    (5, 2.571),
    (6, 2.447),
    (7, 2.365),
    (8, 2.306),
    (9, 2.262),
    (10, 2.228),
    (15, 2.131),
    (20, 2.086),
    (25, 2.060),
    (30, 2.042),
];

const T_FALLBACK: f64 = 2.0;
const Z_95: f64 = 1.96;

/// 95% two-sided t-critical value for the given degrees of freedom.
pub fn t_critical_95(df: usize) -> f64 {
    if df >= 30 {
        return Z_95;
    }
    T_TABLE_95
        .iter()
        .find(|(table_df, _)| *table_df == df)
        .map(|(_, t)| *t)
        .unwrap_or(T_FALLBACK)
}

/// Standard normal CDF via the Abramowitz-Stegun rational polynomial fit.
pub fn normal_cdf(z: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.2316419 * z.abs());
    let d = 0.3989423 * (-z * z / 2.0).exp();
    let prob =
        d * t * (0.3193815 + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274))));
    if z > 0.0 {
        1.0 - prob
    } else {
        prob
    }
}

/// Two-sided p-value approximation for a t-statistic.
///
/// df >= 30 uses the normal CDF; smaller samples use a coarse ladder.
pub fn approximate_p_value(t: f64, df: usize) -> f64 {
    let t = t.abs();
    if df >= 30 {
        return 2.0 * (1.0 - normal_cdf(t));
    }
    if t > 3.0 {
        0.01
    } else if t > 2.0 {
        0.05
    } else if t > 1.5 {
        0.15
    } else {
        0.3
    }
}

/// 95% confidence interval for the mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub margin_of_error: f64,
    pub confidence_level: u8,
}

/// One-sample t-test result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TTestResult {
    pub t_statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub significant: bool,
}

/// Two-sample (first half vs second half) growth significance result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthSignificance {
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    pub first_half_mean: f64,
    pub second_half_mean: f64,
}

/// Data-quality diagnostics for a numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    pub sample_size: usize,
    pub has_negatives: bool,
    pub has_zeros: bool,
    pub coefficient_of_variation: Option<f64>,
    pub issues: Vec<String>,
}

impl Diagnostics {
    pub fn quality(&self) -> &'static str {
        if self.issues.is_empty() {
            "good"
        } else {
            "moderate"
        }
    }
}

impl NumericSeries {
    /// 95% confidence interval for the mean, using the sample standard
    /// deviation (N−1 denominator). Requires N ≥ 2.
    pub fn confidence_interval_95(&self) -> Option<ConfidenceInterval> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let sample_std = self.sample_std_dev()?;
        let standard_error = sample_std / (n as f64).sqrt();

        let t_value = if n >= 30 { Z_95 } else { t_critical_95(n - 1) };
        let margin_of_error = t_value * standard_error;

        Some(ConfidenceInterval {
            mean,
            lower: mean - margin_of_error,
            upper: mean + margin_of_error,
            margin_of_error,
            confidence_level: 95,
        })
    }

    /// One-sample t-test against a hypothesized mean, using the sample
    /// standard deviation. Requires N ≥ 2 and nonzero variance.
    pub fn t_test(&self, hypothesized_mean: f64) -> Option<TTestResult> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let sample_std = self.sample_std_dev()?;
        if sample_std == 0.0 {
            return None;
        }
        let standard_error = sample_std / (n as f64).sqrt();
        let t_statistic = (mean - hypothesized_mean) / standard_error;
        let degrees_of_freedom = n - 1;
        let p_value = approximate_p_value(t_statistic, degrees_of_freedom);

        Some(TTestResult {
            t_statistic,
            degrees_of_freedom,
            p_value,
            significant: p_value < 0.05,
        })
    }

    /// Welch-style test of whether the second half of the series differs
    /// from the first half. Splits at floor(N/2) and uses each half's
    /// population variance over its own length for the pooled standard
    /// error. Significance is declared at |t| > 2.0 (approximately p<0.05).
    /// Requires N ≥ 4 and a nonzero pooled standard error.
    pub fn test_growth_significance(&self) -> Option<GrowthSignificance> {
        let n = self.len();
        if n < 4 {
            return None;
        }
        let mid = n / 2;
        let first = NumericSeries::new(self.values()[..mid].to_vec());
        let second = NumericSeries::new(self.values()[mid..].to_vec());

        let mean1 = first.mean()?;
        let mean2 = second.mean()?;
        let var1 = first.population_variance()?;
        let var2 = second.population_variance()?;

        let se = (var1 / first.len() as f64 + var2 / second.len() as f64).sqrt();
        if se == 0.0 {
            return None;
        }

        let t_statistic = (mean2 - mean1) / se;
        let p_value = approximate_p_value(t_statistic, n.saturating_sub(2));

        Some(GrowthSignificance {
            t_statistic,
            p_value,
            significant: t_statistic.abs() > 2.0,
            first_half_mean: mean1,
            second_half_mean: mean2,
        })
    }

    /// Quick data-quality diagnostics: sign issues and dispersion.
    pub fn diagnostics(&self) -> Option<Diagnostics> {
        if self.is_empty() {
            return None;
        }
        let has_negatives = self.values().iter().any(|v| *v < 0.0);
        let has_zeros = self.values().iter().any(|v| *v == 0.0);
        let cv = self.coefficient_of_variation();

        let mut issues = Vec::new();
        if has_negatives {
            issues.push("contains negative values".to_string());
        }
        if has_zeros {
            issues.push("contains zero values".to_string());
        }
        if let Some(cv) = cv {
            if cv > 100.0 {
                issues.push("high variability (CV > 100%)".to_string());
            }
        }

        Some(Diagnostics {
            sample_size: self.len(),
            has_negatives,
            has_zeros,
            coefficient_of_variation: cv,
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> NumericSeries {
        NumericSeries::new(values.to_vec())
    }

    #[test]
    fn test_t_critical_table_lookup() {
        assert_eq!(t_critical_95(1), 12.706);
        assert_eq!(t_critical_95(4), 2.776);
        assert_eq!(t_critical_95(15), 2.131);
        // Missing entry falls back rather than interpolating.
        assert_eq!(t_critical_95(12), 2.0);
        assert_eq!(t_critical_95(30), 1.96);
        assert_eq!(t_critical_95(200), 1.96);
    }

    #[test]
    fn test_normal_cdf_known_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-4);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn test_approximate_p_value_ladder() {
        assert_eq!(approximate_p_value(3.5, 10), 0.01);
        assert_eq!(approximate_p_value(2.5, 10), 0.05);
        assert_eq!(approximate_p_value(1.7, 10), 0.15);
        assert_eq!(approximate_p_value(0.5, 10), 0.3);
    }

    #[test]
    fn test_approximate_p_value_uses_cdf_for_large_samples() {
        let p = approximate_p_value(1.96, 30);
        assert!((p - 0.05).abs() < 2e-3);
    }

    #[test]
    fn test_confidence_interval_small_sample_uses_t_table() {
        // n=5, df=4 -> t=2.776
        let s = series(&[10.0, 12.0, 11.0, 13.0, 14.0]);
        let ci = s.confidence_interval_95().unwrap();
        let sample_std = s.sample_std_dev().unwrap();
        let expected_margin = 2.776 * sample_std / 5f64.sqrt();
        assert!((ci.margin_of_error - expected_margin).abs() < 1e-9);
        assert!(ci.lower < ci.mean && ci.mean < ci.upper);
    }

    #[test]
    fn test_confidence_interval_large_sample_uses_z() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let s = series(&values);
        let ci = s.confidence_interval_95().unwrap();
        let expected_margin = 1.96 * s.sample_std_dev().unwrap() / 40f64.sqrt();
        assert!((ci.margin_of_error - expected_margin).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_interval_needs_two_values() {
        assert!(series(&[5.0]).confidence_interval_95().is_none());
    }

    #[test]
    fn test_growth_significance_detects_step_change() {
        let mut values = vec![100.0, 101.0, 99.0, 100.0, 100.5, 99.5];
        values.extend_from_slice(&[200.0, 201.0, 199.0, 200.0, 200.5, 199.5]);
        let result = series(&values).test_growth_significance().unwrap();
        assert!(result.significant);
        assert!(result.t_statistic > 2.0);
        assert!((result.first_half_mean - 100.0).abs() < 1.0);
        assert!((result.second_half_mean - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_growth_significance_stable_series_not_significant() {
        let result = series(&[100.0, 102.0, 98.0, 101.0, 99.0, 100.0, 101.0, 99.0])
            .test_growth_significance()
            .unwrap();
        assert!(!result.significant);
    }

    #[test]
    fn test_growth_significance_needs_four_values() {
        assert!(series(&[1.0, 2.0, 3.0]).test_growth_significance().is_none());
    }

    #[test]
    fn test_growth_significance_constant_series_is_none() {
        assert!(series(&[5.0, 5.0, 5.0, 5.0]).test_growth_significance().is_none());
    }

    #[test]
    fn test_t_test_against_zero() {
        let s = series(&[10.0, 12.0, 11.0, 13.0, 14.0]);
        let result = s.t_test(0.0).unwrap();
        assert!(result.t_statistic > 3.0);
        assert_eq!(result.degrees_of_freedom, 4);
        assert!(result.significant);
    }

    #[test]
    fn test_diagnostics_flags_issues() {
        let d = series(&[-5.0, 0.0, 10.0, 20.0]).diagnostics().unwrap();
        assert!(d.has_negatives);
        assert!(d.has_zeros);
        assert_eq!(d.quality(), "moderate");

        let clean = series(&[10.0, 11.0, 12.0]).diagnostics().unwrap();
        assert!(clean.issues.is_empty());
        assert_eq!(clean.quality(), "good");
    }
}
