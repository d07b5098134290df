use crate::error::ApiError;
use chrono::DateTime;
use core_types::PriceBar;
use serde::Deserialize;

// Shapes of `GET /v8/finance/chart/{symbol}`. Only the fields we read are modelled.

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

/// Represents an error reported inside the chart payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    /// Bar open times in unix seconds. Absent when the range holds no bars.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    pub quote: Vec<Quote>,
}

/// Column-oriented OHLCV. Individual cells can be null for partial bars.
#[derive(Debug, Default, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

fn cell(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

impl ChartEnvelope {
    /// Flattens the columnar payload into rows, skipping bars with no close.
    pub fn into_bars(self, symbol: &str) -> Result<Vec<PriceBar>, ApiError> {
        if let Some(err) = self.chart.error {
            return Err(ApiError::ApiError(format!("{}: {}", err.code, err.description)));
        }

        let result = self
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ApiError::NoData(symbol.to_string()))?;

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidData(format!("missing quote block for {symbol}")))?;

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, ts) in result.timestamp.iter().enumerate() {
            let Some(close) = cell(&quote.close, i) else {
                continue;
            };
            let date = DateTime::from_timestamp(*ts, 0)
                .ok_or_else(|| ApiError::InvalidData(format!("Invalid timestamp: {ts}")))?
                .date_naive();

            bars.push(PriceBar {
                date,
                open: cell(&quote.open, i).unwrap_or(close),
                high: cell(&quote.high, i).unwrap_or(close),
                low: cell(&quote.low, i).unwrap_or(close),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }

        if bars.is_empty() {
            return Err(ApiError::NoData(symbol.to_string()));
        }
        Ok(bars)
    }
}
