//! Behavioral feature extraction for the learning-style and difficulty models.

mod behavioral;
mod pipeline;

pub use behavioral::BehavioralStats;
pub use pipeline::{FeatureExtractor, StandardScaler};

use crate::error::{EngineError, Result};
use crate::lenient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw per-student learning history. Never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningHistory {
    /// Completion ratio per module, in order
    #[serde(default, deserialize_with = "lenient::numbers")]
    pub completion_rates: Vec<f64>,
    /// Session lengths in minutes
    #[serde(default, deserialize_with = "lenient::numbers")]
    pub time_spent: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::value")]
    pub interaction_patterns: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub preferred_content_types: Vec<String>,
    /// Assessment scores, 0–100
    #[serde(default, deserialize_with = "lenient::numbers")]
    pub assessment_scores: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub completion_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub time_efficiency: Option<f64>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub struggling_topics: Vec<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub strong_topics: Vec<String>,
}

/// Performance summary fed to the difficulty model. `None` marks a missing data point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// 0–100
    pub average_score: Option<f64>,
    /// 0–1
    pub completion_rate: Option<f64>,
    /// 0–1
    pub time_efficiency: Option<f64>,
    #[serde(default)]
    pub struggling_topics: BTreeSet<String>,
    #[serde(default)]
    pub strong_topics: BTreeSet<String>,
}

impl PerformanceMetrics {
    /// Explicit fields on the history win; otherwise score and completion are the
    /// means of their sample sequences.
    pub fn from_history(history: &LearningHistory) -> Self {
        Self {
            average_score: history
                .average_score
                .or_else(|| mean(&history.assessment_scores)),
            completion_rate: history
                .completion_rate
                .or_else(|| mean(&history.completion_rates)),
            time_efficiency: history.time_efficiency,
            struggling_topics: history.struggling_topics.iter().cloned().collect(),
            strong_topics: history.strong_topics.iter().cloned().collect(),
        }
    }

    /// Available raw numbers on a common 0–100 scale, used for confidence estimation.
    pub fn data_points(&self) -> Vec<f64> {
        [
            self.average_score,
            self.completion_rate.map(|c| c * 100.0),
            self.time_efficiency.map(|t| t * 100.0),
        ]
        .into_iter()
        .flatten()
        .filter(|x| x.is_finite())
        .collect()
    }
}

/// Which model a vector is laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    LearningStyle,
    Difficulty,
}

impl FeatureSchema {
    pub const fn dim(self) -> usize {
        match self {
            FeatureSchema::LearningStyle => 10,
            FeatureSchema::Difficulty => 5,
        }
    }
}

/// Fixed-length, fixed-order model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(schema: FeatureSchema, values: Vec<f32>) -> Result<Self> {
        if values.len() != schema.dim() {
            return Err(EngineError::invalid(format!(
                "{:?} features need {} values, got {}",
                schema,
                schema.dim(),
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::invalid("feature values must be finite"));
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

pub(crate) fn mean(xs: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = xs.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_tolerates_wrong_types() {
        let h: LearningHistory = serde_json::from_str(
            r#"{"completionRates":[0.5,"x",0.7],"timeSpent":"lots","assessmentScores":null,
                "preferredContentTypes":["video",3],"averageScore":"high"}"#,
        )
        .unwrap();
        assert_eq!(h.completion_rates, vec![0.5, 0.7]);
        assert!(h.time_spent.is_empty());
        assert!(h.assessment_scores.is_empty());
        assert_eq!(h.preferred_content_types, vec!["video".to_string()]);
        assert_eq!(h.average_score, None);
    }

    #[test]
    fn metrics_derive_from_samples_when_not_explicit() {
        let h = LearningHistory {
            completion_rates: vec![0.5, 0.6],
            assessment_scores: vec![80.0, 85.0],
            ..Default::default()
        };
        let m = PerformanceMetrics::from_history(&h);
        assert_eq!(m.average_score, Some(82.5));
        assert!((m.completion_rate.unwrap() - 0.55).abs() < 1e-12);
        assert_eq!(m.time_efficiency, None);
        assert_eq!(m.data_points().len(), 2);

        let explicit = LearningHistory {
            average_score: Some(40.0),
            ..h
        };
        assert_eq!(PerformanceMetrics::from_history(&explicit).average_score, Some(40.0));
    }

    #[test]
    fn feature_vector_enforces_schema_length() {
        assert!(FeatureVector::new(FeatureSchema::Difficulty, vec![0.0; 5]).is_ok());
        assert!(FeatureVector::new(FeatureSchema::Difficulty, vec![0.0; 10]).is_err());
        assert!(FeatureVector::new(FeatureSchema::LearningStyle, vec![f32::NAN; 10]).is_err());
    }
}
