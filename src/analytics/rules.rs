//! Declarative rule tables. Each rule is an independent (predicate, outcome) pair;
//! evaluation keeps table order and every matching rule fires.

use super::{LearningPatterns, ProgressMetrics};
use crate::config::ProgressThresholds;
use serde::{Deserialize, Serialize};

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub metrics: &'a ProgressMetrics,
    pub patterns: &'a LearningPatterns,
    pub thresholds: &'a ProgressThresholds,
}

pub struct Rule<T> {
    pub name: &'static str,
    pub applies: fn(&RuleInput<'_>) -> bool,
    pub outcome: fn(&RuleInput<'_>) -> T,
}

impl<T> Rule<T> {
    pub fn fire(rules: &[Rule<T>], input: &RuleInput<'_>) -> Vec<T> {
        rules
            .iter()
            .filter(|r| (r.applies)(input))
            .map(|r| {
                tracing::debug!(rule = r.name, "rule fired");
                (r.outcome)(input)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Soon,
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub urgency: Urgency,
}

fn recommend(kind: &str, message: impl Into<String>, priority: Priority) -> Recommendation {
    Recommendation {
        kind: kind.to_string(),
        message: message.into(),
        priority,
    }
}

fn intervene(kind: &str, description: &str, urgency: Urgency) -> Intervention {
    Intervention {
        kind: kind.to_string(),
        description: description.to_string(),
        urgency,
    }
}

pub const RECOMMENDATIONS: &[Rule<Recommendation>] = &[
    Rule {
        name: "slow-pacing",
        applies: |i| i.metrics.completion_rate < i.thresholds.average,
        outcome: |_| {
            recommend(
                "pacing",
                "Consider reducing daily study load and focusing on consistency",
                Priority::High,
            )
        },
    },
    Rule {
        name: "low-scores",
        applies: |i| i.metrics.average_score < 70.0,
        outcome: |_| {
            recommend(
                "content",
                "Review fundamental concepts before advancing",
                Priority::High,
            )
        },
    },
    Rule {
        name: "irregular-schedule",
        applies: |i| i.metrics.consistency_score < 0.6,
        outcome: |_| {
            recommend(
                "schedule",
                "Establish a regular study schedule for better retention",
                Priority::Medium,
            )
        },
    },
    Rule {
        name: "peak-hours",
        applies: |i| !i.patterns.peak_performance_times.is_empty(),
        outcome: |i| {
            recommend(
                "timing",
                format!(
                    "Schedule challenging content during peak hours: {}",
                    i.patterns.peak_performance_times.join(", ")
                ),
                Priority::Low,
            )
        },
    },
];

pub const INTERVENTIONS: &[Rule<Intervention>] = &[
    Rule {
        name: "content-simplification",
        applies: |i| i.metrics.completion_rate < i.thresholds.average,
        outcome: |_| {
            intervene(
                "content-simplification",
                "Provide additional foundational content",
                Urgency::Immediate,
            )
        },
    },
    Rule {
        name: "gamification",
        applies: |i| i.metrics.engagement_level < 0.6,
        outcome: |_| {
            intervene(
                "gamification",
                "Increase interactive elements and rewards",
                Urgency::Soon,
            )
        },
    },
];
