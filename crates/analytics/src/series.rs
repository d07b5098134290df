use crate::error::AnalyticsError;
use chrono::NaiveDate;
use core_types::PriceBar;
use serde::Serialize;
use std::collections::BTreeMap;

/// Closing prices ordered by date. Serializes as `{"YYYY-MM-DD": close, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClosePrices(BTreeMap<NaiveDate, f64>);

impl ClosePrices {
    /// Extracts the close of every bar. A later bar for the same date wins.
    pub fn from_bars(bars: &[PriceBar]) -> Self {
        Self(bars.iter().map(|bar| (bar.date, bar.close)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.0.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &f64)> {
        self.0.iter()
    }

    /// Period-over-period fractional change. The first observation has no
    /// predecessor and is dropped.
    pub fn pct_change(&self) -> Result<Vec<f64>, AnalyticsError> {
        let closes = self.values();
        closes
            .windows(2)
            .map(|w| {
                if w[0] == 0.0 {
                    return Err(AnalyticsError::DivisionByZero("monthly return".to_string()));
                }
                Ok(w[1] / w[0] - 1.0)
            })
            .collect()
    }

    /// Pairs up closes on the dates both series share, in date order.
    pub fn align(&self, other: &ClosePrices) -> (Vec<f64>, Vec<f64>) {
        self.0
            .iter()
            .filter_map(|(date, close)| other.0.get(date).map(|o| (*close, *o)))
            .unzip()
    }
}

impl FromIterator<(NaiveDate, f64)> for ClosePrices {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, month, 1).unwrap()
    }

    fn bar(month: u32, close: f64) -> PriceBar {
        PriceBar {
            date: d(month),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }

    #[test]
    fn extraction_orders_by_date() {
        let closes = ClosePrices::from_bars(&[bar(3, 30.0), bar(1, 10.0), bar(2, 20.0)]);
        assert_eq!(closes.values(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn serializes_as_date_keyed_map() {
        let closes = ClosePrices::from_bars(&[bar(1, 10.5)]);
        let json = serde_json::to_value(&closes).unwrap();
        assert_eq!(json["2023-01-01"], 10.5);
    }

    #[test]
    fn pct_change_drops_first_observation() {
        let closes = ClosePrices::from_bars(&[bar(1, 100.0), bar(2, 110.0), bar(3, 99.0)]);
        let returns = closes.pct_change().unwrap();
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.10).abs() < 1e-12);
        assert!((returns[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn pct_change_rejects_zero_price() {
        let closes = ClosePrices::from_bars(&[bar(1, 0.0), bar(2, 1.0)]);
        assert!(matches!(
            closes.pct_change(),
            Err(AnalyticsError::DivisionByZero(_))
        ));
    }

    #[test]
    fn align_keeps_shared_dates_only() {
        let a = ClosePrices::from_bars(&[bar(1, 1.0), bar(2, 2.0), bar(3, 3.0)]);
        let b = ClosePrices::from_bars(&[bar(2, 20.0), bar(3, 30.0), bar(4, 40.0)]);
        assert_eq!(a.align(&b), (vec![2.0, 3.0], vec![20.0, 30.0]));
    }
}
