//! Fairway Analytics - Deterministic revenue computation over the event ledger
//!
//! Everything in this crate derives from `fairway-ledger` queries. Nothing is
//! stored back: metrics, forecasts, anomalies, growth analyses, and insights
//! are pure functions of the ledger snapshot they read, so recomputing over
//! unchanged history reproduces identical figures.
//!
//! - [`metrics::MetricsAggregator`] folds a period bucket into revenue totals
//! - [`forecast::ForecastEngine`] projects net revenue with scenario bands
//! - [`anomaly::AnomalyDetector`] flags daily outliers against a rolling baseline
//! - [`growth::GrowthAnalyzer`] compares completed calendar windows
//! - [`insight::InsightGenerator`] turns the above into prioritized findings
//! - [`cache::MetricsCache`] memoizes metrics, invalidated by ledger generation

pub mod anomaly;
pub mod cache;
pub mod forecast;
pub mod growth;
pub mod insight;
pub mod metrics;

pub use anomaly::{AnomalyDetector, AnomalyKind, AnomalySeverity, RevenueAnomaly};
pub use cache::MetricsCache;
pub use forecast::{ForecastEngine, ForecastPoint, ForecastScenario, RevenueForecast};
pub use growth::{GrowthAnalysis, GrowthAnalyzer, TrendDirection};
pub use insight::{InsightGenerator, InsightKind, InsightPriority, RevenueInsight};
pub use metrics::{BreakdownSlice, MetricsAggregator, RevenueBreakdown, RevenueMetrics};
