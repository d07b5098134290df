//! # TickerLens Analytics
//!
//! Pure computations over monthly price series: close extraction, percentage
//! change, Pearson correlation (pairwise and as a matrix) and Sharpe statistics.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O. Inputs are price bars or close series, outputs are
//!   serializable report structs.
//! - **Undefined is explicit:** Statistics that are mathematically undefined
//!   (zero variance, too few points) are `None` and serialize as `null`.

pub mod correlation;
pub mod error;
pub mod series;
pub mod sharpe;
pub mod stats;

pub use correlation::{correlation_matrix, scatter, CorrelationMatrix, ScatterData};
pub use error::AnalyticsError;
pub use series::ClosePrices;
pub use sharpe::{SharpeCalculator, SharpeReport};
