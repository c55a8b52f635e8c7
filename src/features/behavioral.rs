//! Behavioral statistics over a learning history (learning-style model input).

use super::LearningHistory;
use crate::lenient::finite_or_zero;
use serde::{Deserialize, Serialize};

const LONG_SESSION_MINUTES: f64 = 120.0;
const SHORT_SESSION_MINUTES: f64 = 30.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralStats {
    /// Number of completion samples
    pub completion_samples: usize,
    /// Mean of the completion samples (0 when none)
    pub mean_completion: f64,
    /// Total minutes across all sessions
    pub total_minutes: f64,
    pub interaction_count: usize,
    pub prefers_video: bool,
    pub prefers_text: bool,
    pub prefers_interactive: bool,
    /// Sum of assessment scores
    pub total_score: f64,
    /// Any session longer than two hours
    pub has_long_session: bool,
    /// Any session shorter than half an hour
    pub has_short_session: bool,
}

impl BehavioralStats {
    pub fn from_history(history: &LearningHistory) -> Self {
        let completions: Vec<f64> = history
            .completion_rates
            .iter()
            .copied()
            .map(finite_or_zero)
            .collect();
        let sessions: Vec<f64> = history
            .time_spent
            .iter()
            .copied()
            .map(finite_or_zero)
            .collect();
        let prefers = |tag: &str| {
            history
                .preferred_content_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(tag))
        };

        Self {
            completion_samples: completions.len(),
            mean_completion: if completions.is_empty() {
                0.0
            } else {
                completions.iter().sum::<f64>() / completions.len() as f64
            },
            total_minutes: sessions.iter().sum(),
            interaction_count: history.interaction_patterns.len(),
            prefers_video: prefers("video"),
            prefers_text: prefers("text"),
            prefers_interactive: prefers("interactive"),
            total_score: history
                .assessment_scores
                .iter()
                .copied()
                .map(finite_or_zero)
                .sum(),
            has_long_session: sessions.iter().any(|&t| t > LONG_SESSION_MINUTES),
            has_short_session: sessions.iter().any(|&t| t < SHORT_SESSION_MINUTES),
        }
    }

    /// Encode to the 10-feature learning-style layout (normalized)
    pub fn to_vector(&self) -> Vec<f32> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        vec![
            (self.completion_samples as f64 / 10.0).min(1.0) as f32,
            (self.total_minutes / 1000.0).clamp(0.0, 1.0) as f32,
            (self.interaction_count as f64 / 20.0).min(1.0) as f32,
            flag(self.prefers_video),
            flag(self.prefers_text),
            flag(self.prefers_interactive),
            (self.total_score / 100.0).clamp(0.0, 1.0) as f32,
            flag(self.has_long_session),
            flag(self.has_short_session),
            self.mean_completion as f32,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_is_all_zero() {
        let s = BehavioralStats::from_history(&LearningHistory::default());
        assert_eq!(s.to_vector(), vec![0.0; 10]);
    }

    #[test]
    fn caps_and_flags() {
        let h = LearningHistory {
            completion_rates: vec![0.4; 12],
            time_spent: vec![600.0, 500.0, 20.0],
            interaction_patterns: vec![serde_json::json!({"kind": "click"}); 5],
            preferred_content_types: vec!["Video".into(), "interactive".into()],
            assessment_scores: vec![40.0],
            ..Default::default()
        };
        let v = BehavioralStats::from_history(&h).to_vector();
        assert_eq!(v[0], 1.0);
        assert_eq!(v[1], 1.0);
        assert_eq!(v[2], 0.25);
        assert_eq!(v[3..6].to_vec(), vec![1.0f32, 0.0, 1.0]);
        assert!((v[6] - 0.4).abs() < 1e-6);
        assert_eq!(v[7], 1.0);
        assert_eq!(v[8], 1.0);
        assert!((v[9] - 0.4).abs() < 1e-6);
    }
}
