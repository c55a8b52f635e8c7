//! Combines progress metrics and learning patterns into a dropout risk and tagged risk factors.

use crate::analytics::{LearningPatterns, ProgressMetrics, Rule, RuleInput};
use crate::config::ProgressThresholds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub severity: Severity,
}

/// Penalty, in hundredths of risk, added when its condition holds.
struct Penalty {
    points: u32,
    applies: fn(&RuleInput<'_>) -> bool,
}

const DROPOUT_PENALTIES: &[Penalty] = &[
    Penalty {
        points: 40,
        applies: |i| i.metrics.completion_rate < i.thresholds.needs_improvement,
    },
    Penalty {
        points: 30,
        applies: |i| i.metrics.consistency_score < 0.5,
    },
    Penalty {
        points: 20,
        applies: |i| i.patterns.struggle_points.len() > 2,
    },
    Penalty {
        points: 10,
        applies: |i| i.metrics.engagement_level < 0.4,
    },
];

fn factor(name: &str, severity: Severity) -> RiskFactor {
    RiskFactor {
        factor: name.to_string(),
        severity,
    }
}

pub const RISK_FACTORS: &[Rule<RiskFactor>] = &[
    Rule {
        name: "low-completion",
        applies: |i| i.metrics.completion_rate < i.thresholds.needs_improvement,
        outcome: |_| factor("low-completion", Severity::High),
    },
    Rule {
        name: "inconsistent-study",
        applies: |i| i.metrics.consistency_score < 0.4,
        outcome: |_| factor("inconsistent-study", Severity::Medium),
    },
    Rule {
        name: "multiple-struggle-points",
        applies: |i| i.patterns.struggle_points.len() > 3,
        outcome: |_| factor("multiple-struggle-points", Severity::Medium),
    },
];

pub struct RiskEngine {
    thresholds: ProgressThresholds,
}

impl RiskEngine {
    pub fn new(thresholds: ProgressThresholds) -> Self {
        Self { thresholds }
    }

    fn input<'a>(
        &'a self,
        metrics: &'a ProgressMetrics,
        patterns: &'a LearningPatterns,
    ) -> RuleInput<'a> {
        RuleInput {
            metrics,
            patterns,
            thresholds: &self.thresholds,
        }
    }

    /// Sum of the matching penalties, capped at 1.
    pub fn dropout_risk(&self, metrics: &ProgressMetrics, patterns: &LearningPatterns) -> f64 {
        let input = self.input(metrics, patterns);
        let points: u32 = DROPOUT_PENALTIES
            .iter()
            .filter(|p| (p.applies)(&input))
            .map(|p| p.points)
            .sum();
        (f64::from(points) / 100.0).min(1.0)
    }

    pub fn risk_factors(
        &self,
        metrics: &ProgressMetrics,
        patterns: &LearningPatterns,
    ) -> Vec<RiskFactor> {
        Rule::fire(RISK_FACTORS, &self.input(metrics, patterns))
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(ProgressThresholds::default())
    }
}
