//! Learning-style classifier: 10 behavioral features → four-way softmax.

use super::network::{Architecture, FitOptions};
use super::{ModelHandle, TrainingSummary};
use crate::config::{EngineConfig, TrainingSchedule};
use crate::error::{EngineError, Result};
use crate::features::{FeatureExtractor, FeatureSchema, FeatureVector, LearningHistory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

const SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    ReadingWriting,
}

impl LearningStyle {
    /// Output-unit order of the classifier.
    pub const ALL: [LearningStyle; 4] = [
        LearningStyle::Visual,
        LearningStyle::Auditory,
        LearningStyle::Kinesthetic,
        LearningStyle::ReadingWriting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Auditory => "auditory",
            LearningStyle::Kinesthetic => "kinesthetic",
            LearningStyle::ReadingWriting => "reading-writing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Training-label encoding. Unrecognized labels become `kinesthetic`.
    pub fn from_label(label: &str) -> Self {
        Self::parse(label).unwrap_or_else(|| {
            warn!(label, "unrecognized learning-style label; encoding as kinesthetic");
            LearningStyle::Kinesthetic
        })
    }

    pub fn index(self) -> usize {
        match self {
            LearningStyle::Visual => 0,
            LearningStyle::Auditory => 1,
            LearningStyle::Kinesthetic => 2,
            LearningStyle::ReadingWriting => 3,
        }
    }

    pub fn one_hot(self) -> Vec<f32> {
        let mut v = vec![0.0; Self::ALL.len()];
        v[self.index()] = 1.0;
        v
    }
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePrediction {
    pub primary: LearningStyle,
    pub confidence: f64,
    /// Sums to 1
    pub all_scores: BTreeMap<LearningStyle, f64>,
}

impl StylePrediction {
    /// Build from raw class outputs, renormalizing when they do not sum to 1.
    pub fn from_scores(raw: &[f32]) -> Result<Self> {
        if raw.len() != LearningStyle::ALL.len() {
            return Err(EngineError::ModelUnavailable(format!(
                "classifier produced {} scores, expected 4",
                raw.len()
            )));
        }
        let mut scores: Vec<f64> = raw
            .iter()
            .map(|&s| if s.is_finite() && s > 0.0 { s as f64 } else { 0.0 })
            .collect();
        let sum: f64 = scores.iter().sum();
        if sum <= 0.0 {
            scores = vec![0.25; 4];
        } else if (sum - 1.0).abs() > SUM_TOLERANCE {
            scores.iter_mut().for_each(|s| *s /= sum);
        }

        // first maximum wins ties, in class order
        let (best, confidence) = scores
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &s)| if s > acc.1 { (i, s) } else { acc });

        Ok(Self {
            primary: LearningStyle::ALL[best],
            confidence: confidence.clamp(0.0, 1.0),
            all_scores: LearningStyle::ALL.into_iter().zip(scores).collect(),
        })
    }
}

/// One labelled training example: the raw history and its learning-style label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSample {
    #[serde(alias = "features")]
    pub history: LearningHistory,
    #[serde(alias = "learningStyle")]
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleEvaluation {
    pub loss: f32,
    pub accuracy: f32,
}

pub struct LearningStyleModel {
    handle: ModelHandle,
    extractor: FeatureExtractor,
    schedule: TrainingSchedule,
    learning_rate: f32,
    seed: u64,
}

impl LearningStyleModel {
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
                "learning-style",
                Architecture::learning_style(),
                Some(config.style_model_path()),
                m.seed,
            ),
            FeatureExtractor::default(),
            m.style_training,
            m.learning_rate,
            m.seed,
        )
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub async fn predict(&self, features: &FeatureVector) -> Result<StylePrediction> {
        if features.schema() != FeatureSchema::LearningStyle {
            return Err(EngineError::invalid("learning-style model needs style features"));
        }
        let raw = self
            .handle
            .with_network(|n| n.forward(features.as_slice()))
            .await?;
        StylePrediction::from_scores(&raw)
    }

    pub async fn classify(&self, history: &LearningHistory) -> Result<StylePrediction> {
        let features = self.extractor.extract_style_features(history)?;
        self.predict(&features).await
    }

    pub async fn train(&self, dataset: &[StyleSample]) -> Result<TrainingSummary> {
        self.train_with(dataset, self.schedule).await
    }

    pub async fn train_with(
        &self,
        dataset: &[StyleSample],
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
            "learning-style model trained"
        );
        Ok(summary)
    }

    pub async fn evaluate(&self, dataset: &[StyleSample]) -> Result<StyleEvaluation> {
        let (xs, ys) = self.encode(dataset)?;
        let eval = self.handle.with_network(|n| n.evaluate(&xs, &ys)).await?;
        Ok(StyleEvaluation {
            loss: eval.loss,
            accuracy: eval.accuracy,
        })
    }

    pub async fn save(&self) -> Result<std::path::PathBuf> {
        self.handle.save().await
    }

    fn encode(&self, dataset: &[StyleSample]) -> Result<(Vec<Vec<f32>>, Vec<Vec<f32>>)> {
        if dataset.is_empty() {
            return Err(EngineError::invalid("learning-style dataset is empty"));
        }
        let mut xs = Vec::with_capacity(dataset.len());
        let mut ys = Vec::with_capacity(dataset.len());
        for sample in dataset {
            xs.push(
                self.extractor
                    .extract_style_features(&sample.history)?
                    .as_slice()
                    .to_vec(),
            );
            ys.push(LearningStyle::from_label(&sample.label).one_hot());
        }
        Ok((xs, ys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LearningStyleModel {
        LearningStyleModel::new(
            ModelHandle::new("learning-style", Architecture::learning_style(), None, 42),
            FeatureExtractor::default(),
            TrainingSchedule {
                epochs: 5,
                batch_size: 4,
                validation_split: 0.2,
            },
            0.01,
            42,
        )
    }

    #[test]
    fn unknown_label_encodes_as_kinesthetic() {
        assert_eq!(LearningStyle::from_label("telepathic"), LearningStyle::Kinesthetic);
        assert_eq!(LearningStyle::from_label("Reading-Writing"), LearningStyle::ReadingWriting);
        assert_eq!(LearningStyle::Auditory.one_hot(), vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn scores_are_renormalized() {
        let p = StylePrediction::from_scores(&[2.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!(p.primary, LearningStyle::Visual);
        assert!((p.confidence - 0.5).abs() < 1e-12);
        let sum: f64 = p.all_scores.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_scores_fall_back_to_uniform() {
        let p = StylePrediction::from_scores(&[0.0, f32::NAN, 0.0, 0.0]).unwrap();
        assert_eq!(p.primary, LearningStyle::Visual);
        assert_eq!(p.confidence, 0.25);
    }

    #[test]
    fn serializes_style_names() {
        let p = StylePrediction::from_scores(&[0.1, 0.1, 0.1, 0.7]).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["primary"], "reading-writing");
        assert!(json["allScores"]["kinesthetic"].is_number());
    }

    #[tokio::test]
    async fn predicts_before_any_training() {
        let m = model();
        assert!(!m.handle().is_initialized());
        let p = m.classify(&LearningHistory::default()).await.unwrap();
        assert!(m.handle().is_initialized());
        assert!((0.0..=1.0).contains(&p.confidence));
        assert_eq!(p.all_scores.len(), 4);
    }

    #[tokio::test]
    async fn rejects_difficulty_features() {
        let m = model();
        let v = FeatureVector::new(FeatureSchema::Difficulty, vec![0.0; 5]).unwrap();
        assert!(matches!(m.predict(&v).await, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn empty_training_set_is_invalid_input() {
        assert!(matches!(
            model().train(&[]).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn training_reports_schedule() {
        let m = model();
        let dataset: Vec<StyleSample> = (0..10)
            .map(|i| StyleSample {
                history: LearningHistory {
                    time_spent: vec![20.0 * i as f64],
                    preferred_content_types: vec![(if i % 2 == 0 { "video" } else { "text" }).to_string()],
                    ..Default::default()
                },
                label: (if i % 2 == 0 { "visual" } else { "reading-writing" }).to_string(),
            })
            .collect();
        let summary = m.train(&dataset).await.unwrap();
        assert_eq!(summary.epochs, 5);
        assert_eq!(summary.samples, 10);
        assert_eq!(summary.validation_samples, 2);
        assert!(summary.final_val_loss.is_some());
        let eval = m.evaluate(&dataset).await.unwrap();
        assert!(eval.loss.is_finite());
    }
}
