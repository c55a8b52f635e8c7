use super::metrics::trend;
use super::rules::{self, Intervention, Recommendation, Rule, RuleInput};
use super::{ActivityData, LearningPatterns, ProgressMetrics};
use crate::config::AnalyticsConfig;
use crate::error::{EngineError, Result};
use crate::risk::{RiskEngine, RiskFactor};
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const Z_95: f64 = 1.96;
/// Variance assumed when fewer than two scores exist.
const DEFAULT_SCORE_VARIANCE: f64 = 100.0;
/// Share of hourly velocity realized per calendar day.
const DAILY_VELOCITY_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predictions {
    /// `None` when no learning velocity has been recorded
    pub expected_completion_date: Option<NaiveDate>,
    pub dropout_risk: f64,
    pub trend: f64,
    pub projected_final_score: f64,
    pub confidence_interval: ConfidenceInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub student_id: String,
    pub course_id: String,
    pub current_progress: ProgressMetrics,
    pub learning_patterns: LearningPatterns,
    pub recommendations: Vec<Recommendation>,
    pub predictions: Predictions,
    pub risk_factors: Vec<RiskFactor>,
    pub interventions: Vec<Intervention>,
}

/// Pure, synchronous progress analysis. Holds only configuration.
pub struct ProgressAnalyzer {
    config: AnalyticsConfig,
    risk: RiskEngine,
}

impl ProgressAnalyzer {
    pub fn new(config: AnalyticsConfig) -> Self {
        let risk = RiskEngine::new(config.thresholds);
        Self { config, risk }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Completion dates are projected from `data.as_of`, or today (UTC) when unset.
    pub fn analyze_progress(
        &self,
        student_id: &str,
        course_id: &str,
        data: &ActivityData,
    ) -> Result<ProgressReport> {
        let today = data.as_of.unwrap_or_else(|| Utc::now().date_naive());
        self.analyze_progress_at(student_id, course_id, data, today)
    }

    pub fn analyze_progress_at(
        &self,
        student_id: &str,
        course_id: &str,
        data: &ActivityData,
        today: NaiveDate,
    ) -> Result<ProgressReport> {
        if student_id.trim().is_empty() {
            return Err(EngineError::invalid("student id is required"));
        }

        let metrics = ProgressMetrics::compute(data, &self.config);
        let patterns = LearningPatterns::identify(data);
        let input = RuleInput {
            metrics: &metrics,
            patterns: &patterns,
            thresholds: &self.config.thresholds,
        };
        let recommendations = Rule::fire(rules::RECOMMENDATIONS, &input);
        let interventions = Rule::fire(rules::INTERVENTIONS, &input);
        let risk_factors = self.risk.risk_factors(&metrics, &patterns);
        let predictions = self.predict(&metrics, &patterns, today);

        debug!(
            student_id,
            course_id,
            completion = metrics.completion_rate,
            dropout_risk = predictions.dropout_risk,
            "progress analyzed"
        );

        Ok(ProgressReport {
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            current_progress: metrics,
            learning_patterns: patterns,
            recommendations,
            predictions,
            risk_factors,
            interventions,
        })
    }

    fn predict(
        &self,
        metrics: &ProgressMetrics,
        patterns: &LearningPatterns,
        today: NaiveDate,
    ) -> Predictions {
        let t = trend(metrics.average_score);
        Predictions {
            expected_completion_date: completion_date(
                metrics.completion_rate,
                patterns.learning_velocity,
                today,
            ),
            dropout_risk: self.risk.dropout_risk(metrics, patterns),
            trend: t,
            projected_final_score: (metrics.average_score + t * 20.0).clamp(0.0, 100.0),
            confidence_interval: confidence_interval(metrics),
        }
    }
}

impl Default for ProgressAnalyzer {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default())
    }
}

fn completion_date(completion_rate: f64, velocity: f64, today: NaiveDate) -> Option<NaiveDate> {
    if velocity <= 0.0 {
        return None;
    }
    let days = ((1.0 - completion_rate).max(0.0) / (velocity * DAILY_VELOCITY_FACTOR)).ceil();
    if !days.is_finite() || days > u32::MAX as f64 {
        return None;
    }
    today.checked_add_days(Days::new(days as u64))
}

fn confidence_interval(metrics: &ProgressMetrics) -> ConfidenceInterval {
    let n = metrics.assessment_count.max(1) as f64;
    let variance = metrics.score_variance.unwrap_or(DEFAULT_SCORE_VARIANCE);
    let margin = Z_95 * (variance / n).sqrt();
    ConfidenceInterval {
        lower: (metrics.average_score - margin).max(0.0),
        upper: (metrics.average_score + margin).min(100.0),
    }
}
