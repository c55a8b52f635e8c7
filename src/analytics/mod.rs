//! Progress analytics over an activity snapshot: metrics, learning patterns,
//! projections, and the recommendation / intervention rule tables.

mod analyzer;
mod metrics;
pub mod rules;

pub use analyzer::{ConfidenceInterval, Predictions, ProgressAnalyzer, ProgressReport};
pub use metrics::{Breakthrough, DifficultyTrend, LearningPatterns, ProgressMetrics};
pub use rules::{Intervention, Priority, Recommendation, Rule, RuleInput, Urgency};

use crate::lenient;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-course activity snapshot. Every field is optional; malformed values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityData {
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_modules: Option<u64>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub completed_modules: Option<u64>,
    /// Minutes
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_time_spent: Option<f64>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_interactions: Option<u64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub concepts_mastered: Option<f64>,
    /// 0–100, oldest first
    #[serde(default, deserialize_with = "lenient::numbers")]
    pub assessment_scores: Vec<f64>,
    /// Activity amount per observed day; > 0 counts as active
    #[serde(default, deserialize_with = "lenient::numbers")]
    pub daily_activity: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::records")]
    pub time_based_performance: Vec<TimeSlotPerformance>,
    #[serde(default, deserialize_with = "lenient::records")]
    pub content_interactions: Vec<ContentInteraction>,
    /// Topic → mastery in [0, 1]
    #[serde(default, deserialize_with = "lenient::scores")]
    pub topic_scores: BTreeMap<String, f64>,
    /// Topic → score improvement in [0, 1]
    #[serde(default, deserialize_with = "lenient::scores")]
    pub score_improvements: BTreeMap<String, f64>,
    /// Reference date for completion projections; today (UTC) when absent
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotPerformance {
    pub time_slot: String,
    pub performance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInteraction {
    pub content_type: String,
    pub engagement_score: f64,
}
