use crate::error::{EngineError, Result};
use crate::lenient;
use crate::model::DifficultyLevel;
use serde::{Deserialize, Serialize};

const LOW_ACCURACY: f64 = 0.6;
const HIGH_ACCURACY: f64 = 0.9;
const FAST_COMPLETION: f64 = 0.7;
const DECISION_CONFIDENCE: f64 = 0.8;

/// Recent performance at the current tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPerformance {
    #[serde(default, alias = "currentLevel", deserialize_with = "lenient::value")]
    pub difficulty: Option<DifficultyLevel>,
    /// Fraction of correct answers, 0–1
    #[serde(default, deserialize_with = "lenient::number")]
    pub accuracy: Option<f64>,
    /// Time taken relative to the expected time; below 1 is faster than expected
    #[serde(default, deserialize_with = "lenient::number")]
    pub completion_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyChange {
    Increase,
    Decrease,
    Maintain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationDecision {
    pub current_level: Option<DifficultyLevel>,
    pub recommended_change: DifficultyChange,
    pub confidence: f64,
    pub reasoning: String,
}

/// The decrease and increase triggers are disjoint, so at most one fires.
pub fn decide(performance: &CurrentPerformance) -> Result<AdaptationDecision> {
    let accuracy = performance
        .accuracy
        .ok_or_else(|| EngineError::invalid("accuracy is required"))?;
    let fast = performance
        .completion_time
        .is_some_and(|t| t < FAST_COMPLETION);

    let (change, reasoning) = if accuracy < LOW_ACCURACY {
        (
            DifficultyChange::Decrease,
            "Low accuracy suggests content is too difficult",
        )
    } else if accuracy > HIGH_ACCURACY && fast {
        (
            DifficultyChange::Increase,
            "High accuracy and fast completion suggests ready for harder content",
        )
    } else {
        (
            DifficultyChange::Maintain,
            "Performance is within the target range for the current level",
        )
    };

    Ok(AdaptationDecision {
        current_level: performance.difficulty,
        recommended_change: change,
        confidence: DECISION_CONFIDENCE,
        reasoning: reasoning.to_string(),
    })
}
