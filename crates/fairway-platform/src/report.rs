//! Report assembly and the export-encoder boundary.
//!
//! The core builds structured payloads; turning them into file bytes is an
//! external collaborator's job. Encoders are registered per format and
//! invoked under the configured time budget.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fairway_analytics::{
    GrowthAnalysis, RevenueAnomaly, RevenueBreakdown, RevenueForecast, RevenueInsight,
    RevenueMetrics,
};
use fairway_common::{RevenuePeriod, TenantId};
use fairway_ledger::RevenueEvent;
use serde::{Deserialize, Serialize};

/// Formats for raw revenue data export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
    Excel,
    Xml,
}

/// Formats a rendered report may take. Superset of [`ExportFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Csv,
    Json,
    Excel,
    Xml,
    Pdf,
    Html,
}

impl From<ExportFormat> for ReportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Csv => Self::Csv,
            ExportFormat::Json => Self::Json,
            ExportFormat::Excel => Self::Excel,
            ExportFormat::Xml => Self::Xml,
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "excel",
            Self::Xml => "xml",
            Self::Pdf => "pdf",
            Self::Html => "html",
        };
        f.write_str(s)
    }
}

/// Which sections a report should carry.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// `None` reports platform-wide
    pub tenant_id: Option<TenantId>,
    pub period: RevenuePeriod,
    pub as_of: DateTime<Utc>,
    pub include_breakdown: bool,
    pub include_growth: bool,
    pub include_forecast: bool,
    /// Horizon when forecasting is requested
    pub forecast_months: u32,
    pub include_anomalies: bool,
    pub include_insights: bool,
}

impl ReportRequest {
    /// Every section enabled.
    pub fn full(tenant_id: Option<TenantId>, period: RevenuePeriod, as_of: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            period,
            as_of,
            include_breakdown: true,
            include_growth: true,
            include_forecast: true,
            forecast_months: 3,
            include_anomalies: true,
            include_insights: true,
        }
    }

    /// Metrics section only.
    pub fn metrics_only(
        tenant_id: Option<TenantId>,
        period: RevenuePeriod,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            period,
            as_of,
            include_breakdown: false,
            include_growth: false,
            include_forecast: false,
            forecast_months: 0,
            include_anomalies: false,
            include_insights: false,
        }
    }
}

/// Structured, format-agnostic report payload.
///
/// Sections not requested (or disabled by feature toggles) are `None` or
/// empty; the encoder renders whatever is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueReport {
    pub generated_at: DateTime<Utc>,
    pub tenant_id: Option<TenantId>,
    /// Bucket granularity, absent for raw data exports
    pub period: Option<RevenuePeriod>,
    pub metrics: Option<RevenueMetrics>,
    pub breakdown: Option<RevenueBreakdown>,
    pub growth: Option<GrowthAnalysis>,
    pub forecast: Option<RevenueForecast>,
    pub anomalies: Vec<RevenueAnomaly>,
    pub insights: Vec<RevenueInsight>,
    /// Raw event rows, populated by data export
    pub events: Option<Vec<RevenueEvent>>,
}

/// Rendered report bytes plus the format they are in.
#[derive(Debug, Clone)]
pub struct EncodedReport {
    pub format: ReportFormat,
    pub bytes: Vec<u8>,
}

/// Collaborator error surface; the platform wraps these as upstream failures.
pub type EncodeError = Box<dyn std::error::Error + Send + Sync>;

/// External encoder collaborator. One registered implementation per format.
#[async_trait]
pub trait ReportEncoder: Send + Sync {
    /// Format this encoder produces.
    fn format(&self) -> ReportFormat;

    /// Render the payload into bytes.
    async fn encode(&self, report: &RevenueReport) -> Result<Vec<u8>, EncodeError>;
}
