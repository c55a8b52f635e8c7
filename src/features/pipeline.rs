//! Feature extraction pipeline: history → behavioral stats → style vector,
//! performance metrics → standardized difficulty vector.

use super::{BehavioralStats, FeatureSchema, FeatureVector, LearningHistory, PerformanceMetrics};
use crate::error::Result;
use crate::lenient::finite_or_zero;
use serde::{Deserialize, Serialize};

/// Per-feature standardization `(x - mean) / std` for the difficulty layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: [f32; 5],
    pub stds: [f32; 5],
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self {
            means: [0.5, 0.7, 0.6, 0.8, 0.4],
            stds: [0.2, 0.15, 0.25, 0.1, 0.3],
        }
    }
}

impl StandardScaler {
    pub fn transform(&self, raw: [f32; 5]) -> Vec<f32> {
        raw.iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// Stateless extractor; identical input always yields the identical vector.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    scaler: StandardScaler,
}

impl FeatureExtractor {
    pub fn new(scaler: StandardScaler) -> Self {
        Self { scaler }
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn extract_style_features(&self, history: &LearningHistory) -> Result<FeatureVector> {
        let stats = BehavioralStats::from_history(history);
        FeatureVector::new(FeatureSchema::LearningStyle, stats.to_vector())
    }

    /// Order: averageScore/100, completionRate, timeEfficiency, |struggling|/10, |strong|/10,
    /// each standardized. Missing values count as zero before scaling.
    pub fn extract_difficulty_features(&self, metrics: &PerformanceMetrics) -> Result<FeatureVector> {
        let value = |x: Option<f64>| finite_or_zero(x.unwrap_or(0.0)) as f32;
        let raw = [
            value(metrics.average_score) / 100.0,
            value(metrics.completion_rate),
            value(metrics.time_efficiency),
            metrics.struggling_topics.len() as f32 / 10.0,
            metrics.strong_topics.len() as f32 / 10.0,
        ];
        FeatureVector::new(FeatureSchema::Difficulty, self.scaler.transform(raw))
    }
}
