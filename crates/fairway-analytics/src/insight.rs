//! Rule-based insight generation from computed analytics.

use crate::anomaly::{AnomalySeverity, RevenueAnomaly};
use crate::growth::{GrowthAnalysis, TrendDirection};
use crate::metrics::RevenueMetrics;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an insight is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Growth,
    Risk,
    Opportunity,
    AnomalyFollowup,
}

/// How urgently an insight deserves attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
}

/// One generated observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueInsight {
    pub tenant_id: Option<Uuid>,
    pub kind: InsightKind,
    pub priority: InsightPriority,
    pub title: String,
    pub detail: String,
    /// Confidence in [0, 1], keyed to how much data backs the rule.
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

/// Max anomaly follow-ups emitted per generation pass.
const MAX_FOLLOWUPS: usize = 3;

/// Derives typed insights from metrics, growth, and anomaly output.
///
/// Generation is a fixed rule table over its inputs: the same inputs always
/// produce the same insights in the same order.
#[derive(Debug, Default)]
pub struct InsightGenerator;

impl InsightGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(
        &self,
        metrics: &RevenueMetrics,
        growth: Option<&GrowthAnalysis>,
        anomalies: &[RevenueAnomaly],
    ) -> Vec<RevenueInsight> {
        let generated_at = Utc::now();
        let tenant_id = metrics.tenant_id;
        let mut insights = Vec::new();
        // Wider windows carry more signal.
        let data_confidence = if metrics.event_count >= 30 { 0.9 } else { 0.7 };

        if let Some(rate) = metrics.growth_rate {
            if rate >= dec!(0.10) {
                insights.push(RevenueInsight {
                    tenant_id,
                    kind: InsightKind::Growth,
                    priority: InsightPriority::High,
                    title: format!("Net revenue up {}%", percent(rate)),
                    detail: format!(
                        "Net revenue of {} grew {}% over the previous period.",
                        metrics.net_revenue.round_dp(2),
                        percent(rate)
                    ),
                    confidence: data_confidence,
                    generated_at,
                });
            } else if rate <= dec!(-0.10) {
                insights.push(RevenueInsight {
                    tenant_id,
                    kind: InsightKind::Risk,
                    priority: InsightPriority::High,
                    title: format!("Net revenue down {}%", percent(rate.abs())),
                    detail: format!(
                        "Net revenue of {} fell {}% versus the previous period.",
                        metrics.net_revenue.round_dp(2),
                        percent(rate.abs())
                    ),
                    confidence: data_confidence,
                    generated_at,
                });
            }
        }

        if let Some(churn) = metrics.churn_rate {
            if churn >= dec!(0.05) {
                let priority = if churn >= dec!(0.10) {
                    InsightPriority::High
                } else {
                    InsightPriority::Medium
                };
                insights.push(RevenueInsight {
                    tenant_id,
                    kind: InsightKind::Risk,
                    priority,
                    title: format!("Churn at {}%", percent(churn)),
                    detail: format!(
                        "{}% of subscriptions active at period start were cancelled.",
                        percent(churn)
                    ),
                    confidence: data_confidence,
                    generated_at,
                });
            }
        }

        if let Some(analysis) = growth {
            match analysis.trend {
                TrendDirection::Accelerating => insights.push(RevenueInsight {
                    tenant_id,
                    kind: InsightKind::Growth,
                    priority: InsightPriority::Medium,
                    title: "Growth is accelerating".to_string(),
                    detail: format!(
                        "Monthly growth rates are strictly increasing: {}.",
                        rates_list(&analysis.monthly_growth_rates)
                    ),
                    confidence: 0.8,
                    generated_at,
                }),
                TrendDirection::Declining => insights.push(RevenueInsight {
                    tenant_id,
                    kind: InsightKind::Risk,
                    priority: InsightPriority::Medium,
                    title: "Growth is slowing".to_string(),
                    detail: format!(
                        "Monthly growth rates are strictly decreasing: {}.",
                        rates_list(&analysis.monthly_growth_rates)
                    ),
                    confidence: 0.8,
                    generated_at,
                }),
                TrendDirection::Volatile => insights.push(RevenueInsight {
                    tenant_id,
                    kind: InsightKind::Risk,
                    priority: InsightPriority::Low,
                    title: "Growth is volatile".to_string(),
                    detail: "Monthly growth keeps flipping sign; treat single-month moves with caution.".to_string(),
                    confidence: 0.7,
                    generated_at,
                }),
                TrendDirection::Steady => {}
            }
        }

        if metrics.gross_revenue > Decimal::ZERO {
            let one_time_share = metrics.one_time_revenue / metrics.gross_revenue;
            if one_time_share > dec!(0.30) {
                insights.push(RevenueInsight {
                    tenant_id,
                    kind: InsightKind::Opportunity,
                    priority: InsightPriority::Medium,
                    title: "One-time revenue dominates".to_string(),
                    detail: format!(
                        "One-time purchases are {}% of gross; converting repeat buyers to subscriptions would stabilize MRR.",
                        percent(one_time_share)
                    ),
                    confidence: data_confidence,
                    generated_at,
                });
            }
            let usage_share = metrics.usage_revenue / metrics.gross_revenue;
            if usage_share > dec!(0.25) {
                insights.push(RevenueInsight {
                    tenant_id,
                    kind: InsightKind::Opportunity,
                    priority: InsightPriority::Low,
                    title: "Usage revenue is significant".to_string(),
                    detail: format!(
                        "Metered usage is {}% of gross; usage tiers may capture more of this demand.",
                        percent(usage_share)
                    ),
                    confidence: data_confidence,
                    generated_at,
                });
            }
        }

        for anomaly in anomalies
            .iter()
            .filter(|anomaly| anomaly.severity >= AnomalySeverity::High)
            .take(MAX_FOLLOWUPS)
        {
            let priority = if anomaly.severity == AnomalySeverity::Critical {
                InsightPriority::High
            } else {
                InsightPriority::Medium
            };
            insights.push(RevenueInsight {
                tenant_id,
                kind: InsightKind::AnomalyFollowup,
                priority,
                title: format!("Investigate {:?} around {}", anomaly.kind, anomaly.bucket),
                detail: if anomaly.candidate_causes.is_empty() {
                    "No candidate causes identified.".to_string()
                } else {
                    anomaly.candidate_causes.join("; ")
                },
                confidence: 0.8,
                generated_at,
            });
        }

        insights
    }
}

fn percent(rate: Decimal) -> Decimal {
    (rate * dec!(100)).round_dp(1)
}

fn rates_list(rates: &[Decimal]) -> String {
    let formatted: Vec<String> = rates
        .iter()
        .map(|rate| format!("{}%", percent(*rate)))
        .collect();
    formatted.join(", ")
}
