//! Difficulty regressor: 5 standardized performance features → sigmoid score in [0, 1].

use super::network::{Architecture, FitOptions};
use super::{ModelHandle, TrainingSummary};
use crate::config::{EngineConfig, TrainingSchedule};
use crate::error::{EngineError, Result};
use crate::features::{FeatureExtractor, FeatureSchema, FeatureVector, PerformanceMetrics};
use serde::{Deserialize, Serialize};
use std::fmt;

const BASE_ADAPTATION_RATE: f64 = 0.1;
const MIN_ADAPTATION_RATE: f64 = 0.05;
const MAX_ADAPTATION_RATE: f64 = 0.2;
const MIN_CONFIDENCE: f64 = 0.3;
const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 4] = [
        DifficultyLevel::Beginner,
        DifficultyLevel::Intermediate,
        DifficultyLevel::Advanced,
        DifficultyLevel::Expert,
    ];

    pub fn from_score(score: f64) -> Self {
        if score < 0.25 {
            DifficultyLevel::Beginner
        } else if score < 0.5 {
            DifficultyLevel::Intermediate
        } else if score < 0.75 {
            DifficultyLevel::Advanced
        } else {
            DifficultyLevel::Expert
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
            DifficultyLevel::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Total study hours for a path at this tier.
    pub fn base_hours(self) -> u32 {
        match self {
            DifficultyLevel::Beginner => 40,
            DifficultyLevel::Intermediate => 60,
            DifficultyLevel::Advanced => 80,
            DifficultyLevel::Expert => 100,
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyPrediction {
    pub score: f64,
    pub level: DifficultyLevel,
    pub confidence: f64,
    pub adaptation_rate: f64,
}

impl DifficultyPrediction {
    pub fn new(score: f64, metrics: &PerformanceMetrics) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            score,
            level: DifficultyLevel::from_score(score),
            confidence: confidence(metrics),
            adaptation_rate: adaptation_rate(metrics),
        }
    }
}

/// `clamp(1 - variance/1000, 0.3, 0.95)` over the available data points; fewer than
/// two points gives the floor.
pub fn confidence(metrics: &PerformanceMetrics) -> f64 {
    let points = metrics.data_points();
    if points.len() < 2 {
        return MIN_CONFIDENCE;
    }
    let mean = points.iter().sum::<f64>() / points.len() as f64;
    let variance = points.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / points.len() as f64;
    (1.0 - variance / 1000.0).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// `base × averageScore/100 × completionRate`, kept within [0.05, 0.2].
pub fn adaptation_rate(metrics: &PerformanceMetrics) -> f64 {
    let score = metrics.average_score.unwrap_or(0.0);
    let completion = metrics.completion_rate.unwrap_or(0.0);
    let rate = BASE_ADAPTATION_RATE * (score / 100.0) * completion;
    if rate.is_finite() {
        rate.clamp(MIN_ADAPTATION_RATE, MAX_ADAPTATION_RATE)
    } else {
        MIN_ADAPTATION_RATE
    }
}

/// Training example: performance and its optimal difficulty on a 0–100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultySample {
    pub metrics: PerformanceMetrics,
    pub optimal_difficulty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyEvaluation {
    pub loss: f32,
    pub mean_absolute_error: f32,
    /// Approximate: `1 - MAE`
    pub accuracy: f32,
}

pub struct DifficultyModel {
    handle: ModelHandle,
    extractor: FeatureExtractor,
    schedule: TrainingSchedule,
    learning_rate: f32,
    seed: u64,
}

impl DifficultyModel {
    pub fn new(
        handle: ModelHandle,
        extractor: FeatureExtractor,
        schedule: TrainingSchedule,
        learning_rate: f32,
        seed: u64,
    ) -> Self {
        Self {
            handle,
            extractor,
            schedule,
            learning_rate,
            seed,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let m = &config.models;
        Self::new(
            ModelHandle::new(
                "difficulty",
                Architecture::difficulty(),
                Some(config.difficulty_model_path()),
                m.seed,
            ),
            FeatureExtractor::default(),
            m.difficulty_training,
            m.learning_rate,
            m.seed,
        )
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub async fn predict(&self, metrics: &PerformanceMetrics) -> Result<DifficultyPrediction> {
        let features = self.extractor.extract_difficulty_features(metrics)?;
        let score = self.score(&features).await?;
        Ok(DifficultyPrediction::new(score, metrics))
    }

    /// Raw model output for an already-extracted vector.
    pub async fn score(&self, features: &FeatureVector) -> Result<f64> {
        if features.schema() != FeatureSchema::Difficulty {
            return Err(EngineError::invalid("difficulty model needs difficulty features"));
        }
        let out = self
            .handle
            .with_network(|n| n.forward(features.as_slice()))
            .await?;
        out.first()
            .map(|&s| s as f64)
            .ok_or_else(|| EngineError::ModelUnavailable("difficulty model produced no output".into()))
    }

    pub async fn train(&self, dataset: &[DifficultySample]) -> Result<TrainingSummary> {
        self.train_with(dataset, self.schedule).await
    }

    pub async fn train_with(
        &self,
        dataset: &[DifficultySample],
        schedule: TrainingSchedule,
    ) -> Result<TrainingSummary> {
        let (xs, ys) = self.encode(dataset)?;
        let options = FitOptions {
            epochs: schedule.epochs,
            batch_size: schedule.batch_size,
            validation_split: schedule.validation_split,
            learning_rate: self.learning_rate,
            seed: self.seed,
        };
        let history = self.handle.fit(xs, ys, options).await?;
        let summary = TrainingSummary::from_history(self.handle.name(), dataset.len(), history);
        tracing::info!(
            samples = summary.samples,
            epochs = summary.epochs,
            loss = summary.final_loss,
            val_loss = ?summary.final_val_loss,
            "difficulty model trained"
        );
        Ok(summary)
    }

    pub async fn evaluate(&self, dataset: &[DifficultySample]) -> Result<DifficultyEvaluation> {
        let (xs, ys) = self.encode(dataset)?;
        let eval = self.handle.with_network(|n| n.evaluate(&xs, &ys)).await?;
        Ok(DifficultyEvaluation {
            loss: eval.loss,
            mean_absolute_error: eval.mean_absolute_error,
            accuracy: 1.0 - eval.mean_absolute_error,
        })
    }

    pub async fn save(&self) -> Result<std::path::PathBuf> {
        self.handle.save().await
    }

    fn encode(&self, dataset: &[DifficultySample]) -> Result<(Vec<Vec<f32>>, Vec<Vec<f32>>)> {
        if dataset.is_empty() {
            return Err(EngineError::invalid("difficulty dataset is empty"));
        }
        let mut xs = Vec::with_capacity(dataset.len());
        let mut ys = Vec::with_capacity(dataset.len());
        for sample in dataset {
            if !sample.optimal_difficulty.is_finite() {
                return Err(EngineError::invalid("optimal difficulty must be a finite number"));
            }
            xs.push(
                self.extractor
                    .extract_difficulty_features(&sample.metrics)?
                    .as_slice()
                    .to_vec(),
            );
            ys.push(vec![(sample.optimal_difficulty / 100.0).clamp(0.0, 1.0) as f32]);
        }
        Ok((xs, ys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(avg: Option<f64>, completion: Option<f64>, eff: Option<f64>) -> PerformanceMetrics {
        PerformanceMetrics {
            average_score: avg,
            completion_rate: completion,
            time_efficiency: eff,
            ..Default::default()
        }
    }

    fn model() -> DifficultyModel {
        DifficultyModel::new(
            ModelHandle::new("difficulty", Architecture::difficulty(), None, 42),
            FeatureExtractor::default(),
            TrainingSchedule {
                epochs: 20,
                batch_size: 4,
                validation_split: 0.2,
            },
            0.01,
            42,
        )
    }

    #[test]
    fn level_thresholds() {
        let eps = 1e-9;
        assert_eq!(DifficultyLevel::from_score(0.0), DifficultyLevel::Beginner);
        assert_eq!(DifficultyLevel::from_score(0.24999), DifficultyLevel::Beginner);
        assert_eq!(DifficultyLevel::from_score(0.25 - eps), DifficultyLevel::Beginner);
        assert_eq!(DifficultyLevel::from_score(0.25), DifficultyLevel::Intermediate);
        assert_eq!(DifficultyLevel::from_score(0.49999), DifficultyLevel::Intermediate);
        assert_eq!(DifficultyLevel::from_score(0.5), DifficultyLevel::Advanced);
        assert_eq!(DifficultyLevel::from_score(0.75 - eps), DifficultyLevel::Advanced);
        assert_eq!(DifficultyLevel::from_score(0.75), DifficultyLevel::Expert);
        assert_eq!(DifficultyLevel::from_score(1.0), DifficultyLevel::Expert);
    }

    #[test]
    fn confidence_floor_with_few_points() {
        assert_eq!(confidence(&metrics(None, None, None)), 0.3);
        assert_eq!(confidence(&metrics(Some(99.0), None, None)), 0.3);
        assert_eq!(confidence(&metrics(None, None, Some(0.1))), 0.3);
    }

    #[test]
    fn confidence_from_variance() {
        // points 80, 80, 80 → variance 0 → capped at 0.95
        assert_eq!(confidence(&metrics(Some(80.0), Some(0.8), Some(0.8))), 0.95);
        // points 70, 50 → mean 60, variance 100 → 0.9
        let c = confidence(&metrics(Some(70.0), Some(0.5), None));
        assert!((c - 0.9).abs() < 1e-12);
        // wide spread → floor
        assert_eq!(confidence(&metrics(Some(100.0), Some(0.0), None)), 0.3);
    }

    #[test]
    fn adaptation_rate_is_bounded() {
        assert_eq!(adaptation_rate(&metrics(None, None, None)), 0.05);
        assert_eq!(adaptation_rate(&metrics(Some(100.0), Some(1.0), None)), 0.1);
        assert_eq!(adaptation_rate(&metrics(Some(10.0), Some(0.1), None)), 0.05);
        let r = adaptation_rate(&metrics(Some(90.0), Some(0.9), None));
        assert!((r - 0.081).abs() < 1e-12);
    }

    #[test]
    fn level_names_round_trip() {
        for level in DifficultyLevel::ALL {
            assert_eq!(DifficultyLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(DifficultyLevel::parse("grandmaster"), None);
        assert_eq!(serde_json::to_value(DifficultyLevel::Expert).unwrap(), "expert");
    }

    #[tokio::test]
    async fn prediction_is_well_formed_and_repeatable() {
        let m = model();
        let input = metrics(Some(82.5), Some(0.55), None);
        let a = m.predict(&input).await.unwrap();
        let b = m.predict(&input).await.unwrap();
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a.score));
        assert_eq!(a.level, DifficultyLevel::from_score(a.score));
        assert!((0.05..=0.2).contains(&a.adaptation_rate));
    }

    #[tokio::test]
    async fn train_and_evaluate() {
        let m = model();
        let dataset: Vec<DifficultySample> = (0..20)
            .map(|i| DifficultySample {
                metrics: metrics(Some(i as f64 * 5.0), Some(i as f64 / 20.0), Some(0.5)),
                optimal_difficulty: i as f64 * 5.0,
            })
            .collect();
        let summary = m.train(&dataset).await.unwrap();
        assert_eq!(summary.epochs, 20);
        assert_eq!(summary.train_samples, 16);

        let eval = m.evaluate(&dataset).await.unwrap();
        assert!((eval.accuracy - (1.0 - eval.mean_absolute_error)).abs() < 1e-6);
        assert!(eval.mean_absolute_error >= 0.0 && eval.mean_absolute_error <= 1.0);
    }

    #[tokio::test]
    async fn empty_dataset_is_invalid_input() {
        assert!(matches!(model().train(&[]).await, Err(EngineError::InvalidInput(_))));

        let bad = DifficultySample {
            metrics: metrics(Some(50.0), Some(0.5), None),
            optimal_difficulty: f64::NAN,
        };
        assert!(matches!(model().train(&[bad]).await, Err(EngineError::InvalidInput(_))));
    }
}
