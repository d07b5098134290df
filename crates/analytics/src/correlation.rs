use crate::series::ClosePrices;
use crate::stats::pearson;
use serde::Serialize;
use std::collections::BTreeMap;

/// Benchmark closes against ticker closes on their shared dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterData {
    /// Benchmark closes.
    pub x: Vec<f64>,
    /// Ticker closes.
    pub y: Vec<f64>,
    pub correlation: Option<f64>,
}

/// Column-major correlation table: `matrix[column][row]`.
/// Serializes as `{"AAPL": {"AAPL": 1.0, "MSFT": 0.83, ...}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CorrelationMatrix(BTreeMap<String, BTreeMap<String, Option<f64>>>);

impl CorrelationMatrix {
    pub fn get(&self, column: &str, row: &str) -> Option<f64> {
        self.0.get(column).and_then(|rows| rows.get(row)).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds the scatter plot for `ticker` against `benchmark`.
pub fn scatter(ticker: &ClosePrices, benchmark: &ClosePrices) -> ScatterData {
    let (x, y) = benchmark.align(ticker);
    let correlation = pearson(&x, &y);
    ScatterData { x, y, correlation }
}

/// Pairwise correlation of every series against every other.
/// Each pair is aligned on its own shared dates.
pub fn correlation_matrix(series: &[(String, ClosePrices)]) -> CorrelationMatrix {
    let mut matrix = BTreeMap::new();
    for (column, col_closes) in series {
        let rows = series
            .iter()
            .map(|(row, row_closes)| {
                let (a, b) = col_closes.align(row_closes);
                (row.clone(), pearson(&a, &b))
            })
            .collect();
        matrix.insert(column.clone(), rows);
    }
    CorrelationMatrix(matrix)
}
