//! Predictive models: a small dense network per task behind a load-or-construct-once handle.
//!
//! - [`LearningStyleModel`] classifies behavior into one of four learning styles.
//! - [`DifficultyModel`] regresses performance to a difficulty score in [0, 1].

pub mod artifact;
mod difficulty;
pub mod network;
mod style;

pub use difficulty::{
    DifficultyEvaluation, DifficultyLevel, DifficultyModel, DifficultyPrediction, DifficultySample,
};
pub use network::{Architecture, FitOptions, Network, NetworkWeights};
pub use style::{LearningStyle, LearningStyleModel, StyleEvaluation, StylePrediction, StyleSample};

use crate::error::{EngineError, Result};
use network::{EpochStats, FitHistory};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

/// At-most-once initialized network. The first caller loads the artifact (or builds a
/// fresh network when none is stored); concurrent first callers wait on the same init.
/// Training runs one at a time, each starting from the previous run's weights.
pub struct ModelHandle {
    name: &'static str,
    architecture: Architecture,
    artifact_path: Option<PathBuf>,
    seed: u64,
    cell: OnceCell<RwLock<Network>>,
    training: Mutex<()>,
}

impl ModelHandle {
    pub fn new(
        name: &'static str,
        architecture: Architecture,
        artifact_path: Option<PathBuf>,
        seed: u64,
    ) -> Self {
        Self {
            name,
            architecture,
            artifact_path,
            seed,
            cell: OnceCell::new(),
            training: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    async fn get(&self) -> Result<&RwLock<Network>> {
        self.cell
            .get_or_try_init(|| async { self.load_or_construct().await.map(RwLock::new) })
            .await
    }

    async fn load_or_construct(&self) -> Result<Network> {
        if let Some(path) = &self.artifact_path {
            if let Some(weights) = artifact::load(path).await? {
                if weights.architecture != self.architecture {
                    return Err(EngineError::ModelUnavailable(format!(
                        "{} artifact {} has a different architecture",
                        self.name,
                        path.display()
                    )));
                }
                let network = Network::from_weights(weights)?;
                info!(model = self.name, path = %path.display(), "loaded model artifact");
                return Ok(network);
            }
            info!(model = self.name, path = %path.display(), "no stored model; constructing new");
        }
        Network::new(self.architecture.clone(), self.seed)
    }

    /// Run `f` against the current network under a read lock.
    pub async fn with_network<T>(&self, f: impl FnOnce(&Network) -> Result<T>) -> Result<T> {
        let lock = self.get().await?;
        let guard = lock
            .read()
            .map_err(|_| EngineError::ModelUnavailable(format!("{} lock poisoned", self.name)))?;
        f(&guard)
    }

    /// Copy of the current network, for training off-lock.
    pub async fn snapshot(&self) -> Result<Network> {
        self.with_network(|n| Ok(n.clone())).await
    }

    pub async fn replace(&self, network: Network) -> Result<()> {
        let lock = self.get().await?;
        let mut guard = lock
            .write()
            .map_err(|_| EngineError::ModelUnavailable(format!("{} lock poisoned", self.name)))?;
        *guard = network;
        Ok(())
    }

    /// Persist current weights to the artifact path.
    pub async fn save(&self) -> Result<PathBuf> {
        let path = self.artifact_path.clone().ok_or_else(|| {
            EngineError::Storage(format!("{} has no artifact path configured", self.name))
        })?;
        let weights = self.with_network(|n| Ok(n.weights())).await?;
        artifact::save(&path, &weights).await?;
        info!(model = self.name, path = %path.display(), "saved model artifact");
        Ok(path)
    }

    /// Fit a copy of the network on a blocking thread, then swap it in. Readers keep
    /// predicting with the old weights meanwhile; a second fit waits for this one.
    pub(crate) async fn fit(
        &self,
        xs: Vec<Vec<f32>>,
        ys: Vec<Vec<f32>>,
        options: FitOptions,
    ) -> Result<FitHistory> {
        let _training = self.training.lock().await;
        let mut network = self.snapshot().await?;
        let (network, history) = tokio::task::spawn_blocking(move || {
            let history = network.fit(&xs, &ys, options)?;
            Ok::<_, EngineError>((network, history))
        })
        .await
        .map_err(|e| EngineError::ModelUnavailable(format!("training task failed: {e}")))??;
        self.replace(network).await?;
        Ok(history)
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSummary {
    pub model: String,
    pub samples: usize,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub epochs: usize,
    pub final_loss: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_val_loss: Option<f32>,
    pub history: Vec<EpochStats>,
}

impl TrainingSummary {
    fn from_history(model: &str, samples: usize, history: FitHistory) -> Self {
        let last = history.epochs.last();
        Self {
            model: model.to_string(),
            samples,
            train_samples: history.train_samples,
            validation_samples: history.validation_samples,
            epochs: history.epochs.len(),
            final_loss: last.map(|e| e.loss).unwrap_or(0.0),
            final_val_loss: last.and_then(|e| e.val_loss),
            history: history.epochs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn constructs_once_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let handle = Arc::new(ModelHandle::new(
            "difficulty",
            Architecture::difficulty(),
            Some(dir.path().join("absent.json")),
            42,
        ));
        assert!(!handle.is_initialized());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let h = Arc::clone(&handle);
                tokio::spawn(async move { h.snapshot().await.map(|n| n.weights()) })
            })
            .collect();
        let mut weights = Vec::new();
        for t in tasks {
            weights.push(t.await.unwrap().unwrap());
        }
        assert!(handle.is_initialized());
        assert!(weights.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn save_then_reload_from_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.json");
        let first = ModelHandle::new("style", Architecture::learning_style(), Some(path.clone()), 1);
        first.save().await.unwrap();

        let second = ModelHandle::new("style", Architecture::learning_style(), Some(path), 99);
        let a = first.snapshot().await.unwrap().weights();
        let b = second.snapshot().await.unwrap().weights();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn architecture_mismatch_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        ModelHandle::new("style", Architecture::learning_style(), Some(path.clone()), 1)
            .save()
            .await
            .unwrap();
        let wrong = ModelHandle::new("difficulty", Architecture::difficulty(), Some(path), 1);
        assert!(matches!(
            wrong.snapshot().await,
            Err(EngineError::ModelUnavailable(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_fits_both_apply() {
        let xs: Vec<Vec<f32>> = (0..12)
            .map(|i| vec![i as f32 / 12.0, 0.5, 0.2, 1.0 - i as f32 / 12.0, 0.3])
            .collect();
        let ys: Vec<Vec<f32>> = (0..12).map(|i| vec![i as f32 / 12.0]).collect();
        let options = FitOptions {
            epochs: 3,
            batch_size: 4,
            validation_split: 0.0,
            learning_rate: 0.01,
            seed: 5,
        };

        let sequential = ModelHandle::new("difficulty", Architecture::difficulty(), None, 42);
        let once = sequential.fit(xs.clone(), ys.clone(), options).await.unwrap();
        let after_one = sequential.snapshot().await.unwrap().weights();
        sequential.fit(xs.clone(), ys.clone(), options).await.unwrap();
        let after_two = sequential.snapshot().await.unwrap().weights();
        assert_eq!(once.epochs.len(), 3);
        assert_ne!(after_one, after_two);

        let shared = Arc::new(ModelHandle::new("difficulty", Architecture::difficulty(), None, 42));
        let runs: Vec<_> = (0..2)
            .map(|_| {
                let (h, xs, ys) = (Arc::clone(&shared), xs.clone(), ys.clone());
                tokio::spawn(async move { h.fit(xs, ys, options).await })
            })
            .collect();
        for run in runs {
            run.await.unwrap().unwrap();
        }
        assert_eq!(shared.snapshot().await.unwrap().weights(), after_two);
    }
}
