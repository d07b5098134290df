use crate::error::AnalyticsError;
use crate::series::ClosePrices;
use crate::stats::{mean, sample_std_dev};
use serde::Serialize;

/// Below this the annualized volatility is treated as zero, so a constant
/// return series computed in floating point still reads as undefined.
const ZERO_VOLATILITY: f64 = 1e-12;

/// Annualized risk/return statistics for a single ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharpeReport {
    pub annualized_return: f64,
    pub risk_free_rate: f64,
    /// `None` when fewer than two returns are available.
    pub annualized_std_dev: Option<f64>,
    /// `None` when volatility is zero or undefined.
    pub sharpe_ratio: Option<f64>,
}

/// A stateless calculator for annualized Sharpe statistics.
#[derive(Debug, Clone, Copy)]
pub struct SharpeCalculator {
    risk_free_rate: f64,
    periods_per_year: u32,
}

impl Default for SharpeCalculator {
    fn default() -> Self {
        Self::new(0.03, 12)
    }
}

impl SharpeCalculator {
    pub fn new(risk_free_rate: f64, periods_per_year: u32) -> Self {
        Self {
            risk_free_rate,
            periods_per_year,
        }
    }

    /// Computes the statistics from a close series, one close per period.
    pub fn calculate(&self, closes: &ClosePrices) -> Result<SharpeReport, AnalyticsError> {
        let returns = closes.pct_change()?;
        self.calculate_from_returns(&returns)
    }

    /// Computes the statistics from periodic (e.g. monthly) returns.
    pub fn calculate_from_returns(&self, returns: &[f64]) -> Result<SharpeReport, AnalyticsError> {
        let periods = f64::from(self.periods_per_year);

        let mean_return = mean(returns).ok_or_else(|| {
            AnalyticsError::NotEnoughData("at least two closing prices are required".to_string())
        })?;
        let annualized_return = mean_return * periods;

        let annualized_std_dev = sample_std_dev(returns).map(|sd| sd * periods.sqrt());

        let sharpe_ratio = annualized_std_dev
            .filter(|sd| *sd > ZERO_VOLATILITY)
            .map(|sd| (annualized_return - self.risk_free_rate) / sd);

        Ok(SharpeReport {
            annualized_return,
            risk_free_rate: self.risk_free_rate,
            annualized_std_dev,
            sharpe_ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn closes(values: &[f64]) -> ClosePrices {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (NaiveDate::from_ymd_opt(2020 + i as i32 / 12, i as u32 % 12 + 1, 1).unwrap(), *v))
            .collect()
    }

    #[test]
    fn annualizes_mean_and_volatility() {
        let returns = [0.02, -0.01, 0.03, 0.01];
        let report = SharpeCalculator::default().calculate_from_returns(&returns).unwrap();

        let mean = 0.0125;
        let sd = sample_std_dev(&returns).unwrap();
        assert!((report.annualized_return - mean * 12.0).abs() < 1e-12);
        assert!((report.annualized_std_dev.unwrap() - sd * 12f64.sqrt()).abs() < 1e-12);
        let expected = (mean * 12.0 - 0.03) / (sd * 12f64.sqrt());
        assert!((report.sharpe_ratio.unwrap() - expected).abs() < 1e-9);
        assert_eq!(report.risk_free_rate, 0.03);
    }

    #[test]
    fn constant_return_has_undefined_sharpe() {
        // Doubling every month: every return is exactly 1.0.
        let report = SharpeCalculator::default()
            .calculate(&closes(&[100.0, 200.0, 400.0, 800.0, 1600.0]))
            .unwrap();
        assert_eq!(report.annualized_return, 12.0);
        assert_eq!(report.annualized_std_dev, Some(0.0));
        assert_eq!(report.sharpe_ratio, None);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["sharpeRatio"].is_null());
        assert_eq!(json["annualizedReturn"], 12.0);
    }

    #[test]
    fn constant_return_with_float_noise_is_still_undefined() {
        let mut values = vec![100.0];
        for _ in 0..11 {
            let last = *values.last().unwrap();
            values.push(last * 1.05);
        }
        let report = SharpeCalculator::default().calculate(&closes(&values)).unwrap();
        assert_eq!(report.sharpe_ratio, None);
    }

    #[test]
    fn single_return_has_no_volatility() {
        let report = SharpeCalculator::default()
            .calculate(&closes(&[100.0, 110.0]))
            .unwrap();
        assert!((report.annualized_return - 1.2).abs() < 1e-9);
        assert_eq!(report.annualized_std_dev, None);
        assert_eq!(report.sharpe_ratio, None);
    }

    #[test]
    fn single_close_is_not_enough_data() {
        assert!(matches!(
            SharpeCalculator::default().calculate(&closes(&[100.0])),
            Err(AnalyticsError::NotEnoughData(_))
        ));
    }

    #[test]
    fn custom_risk_free_rate_is_reported() {
        let report = SharpeCalculator::new(0.05, 12)
            .calculate_from_returns(&[0.01, 0.02, 0.015])
            .unwrap();
        assert_eq!(report.risk_free_rate, 0.05);
    }
}
