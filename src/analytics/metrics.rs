use super::ActivityData;
use crate::config::AnalyticsConfig;
use crate::features::mean;
use crate::lenient::finite_or_zero;
use serde::{Deserialize, Serialize};

/// Scores considered when judging the recent difficulty trend.
const TREND_WINDOW: usize = 5;
const MIN_TREND_SCORES: usize = 3;
const TREND_BAND: f64 = 0.1;
const PEAK_PERFORMANCE: f64 = 0.8;
const MAX_PEAK_TIMES: usize = 3;
const MAX_CONTENT_PREFERENCES: usize = 3;
const STRUGGLE_SCORE: f64 = 0.6;
const BREAKTHROUGH_IMPROVEMENT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DifficultyTrend {
    InsufficientData,
    Improving,
    Declining,
    Stable,
}

/// Current-progress block of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    pub completion_rate: f64,
    pub average_score: f64,
    pub time_efficiency: f64,
    pub consistency_score: f64,
    pub engagement_level: f64,
    pub difficulty_adaptation: DifficultyTrend,
    pub assessment_count: usize,
    /// Sample variance of assessment scores; `None` with fewer than two scores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_variance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakthrough {
    pub topic: String,
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPatterns {
    pub peak_performance_times: Vec<String>,
    /// Concepts mastered per hour
    pub learning_velocity: f64,
    pub content_preferences: Vec<String>,
    pub struggle_points: Vec<String>,
    pub breakthrough_moments: Vec<Breakthrough>,
}

/// Normalized score trend: 0 at a 50 average, ±1 at the extremes.
pub fn trend(average_score: f64) -> f64 {
    (average_score - 50.0) / 50.0
}

/// Hours of recorded study; a missing or non-positive total counts as one minute.
fn hours_spent(data: &ActivityData) -> f64 {
    data.total_time_spent.filter(|t| *t > 0.0).unwrap_or(1.0) / 60.0
}

impl ProgressMetrics {
    pub fn compute(data: &ActivityData, config: &AnalyticsConfig) -> Self {
        let total = data.total_modules.filter(|t| *t > 0).unwrap_or(1) as f64;
        let completed = data.completed_modules.unwrap_or(0) as f64;
        let scores = &data.assessment_scores;

        Self {
            completion_rate: (completed / total).min(1.0),
            average_score: mean(scores).unwrap_or(0.0),
            time_efficiency: time_efficiency(
                data.total_time_spent.unwrap_or(0.0),
                completed,
                config.expected_minutes_per_module,
            ),
            consistency_score: consistency(&data.daily_activity),
            engagement_level: engagement(data, config.reference_interactions_per_hour),
            difficulty_adaptation: difficulty_trend(scores),
            assessment_count: scores.len(),
            score_variance: sample_variance(scores),
        }
    }
}

fn time_efficiency(total_minutes: f64, completed: f64, expected_per_module: f64) -> f64 {
    if completed <= 0.0 {
        return 0.0;
    }
    let per_module = total_minutes.max(0.0) / completed;
    if per_module <= 0.0 {
        return 1.0;
    }
    finite_or_zero((expected_per_module / per_module).min(1.0))
}

fn consistency(daily: &[f64]) -> f64 {
    if daily.is_empty() {
        return 0.0;
    }
    daily.iter().filter(|d| **d > 0.0).count() as f64 / daily.len() as f64
}

fn engagement(data: &ActivityData, reference_per_hour: f64) -> f64 {
    let interactions = data.total_interactions.unwrap_or(0) as f64;
    let per_hour = interactions / hours_spent(data);
    finite_or_zero((per_hour / reference_per_hour).min(1.0))
}

fn difficulty_trend(scores: &[f64]) -> DifficultyTrend {
    if scores.len() < MIN_TREND_SCORES {
        return DifficultyTrend::InsufficientData;
    }
    let recent = &scores[scores.len().saturating_sub(TREND_WINDOW)..];
    let t = trend(mean(recent).unwrap_or(0.0));
    if t > TREND_BAND {
        DifficultyTrend::Improving
    } else if t < -TREND_BAND {
        DifficultyTrend::Declining
    } else {
        DifficultyTrend::Stable
    }
}

fn sample_variance(scores: &[f64]) -> Option<f64> {
    if scores.len() < 2 {
        return None;
    }
    let m = mean(scores)?;
    Some(scores.iter().map(|s| (s - m).powi(2)).sum::<f64>() / (scores.len() - 1) as f64)
}

impl LearningPatterns {
    pub fn identify(data: &ActivityData) -> Self {
        Self {
            peak_performance_times: data
                .time_based_performance
                .iter()
                .filter(|slot| slot.performance > PEAK_PERFORMANCE)
                .map(|slot| slot.time_slot.clone())
                .take(MAX_PEAK_TIMES)
                .collect(),
            learning_velocity: finite_or_zero(
                data.concepts_mastered.unwrap_or(0.0) / hours_spent(data),
            ),
            content_preferences: content_preferences(data),
            struggle_points: data
                .topic_scores
                .iter()
                .filter(|(_, score)| **score < STRUGGLE_SCORE)
                .map(|(topic, _)| topic.clone())
                .collect(),
            breakthrough_moments: data
                .score_improvements
                .iter()
                .filter(|(_, gain)| **gain > BREAKTHROUGH_IMPROVEMENT)
                .map(|(topic, gain)| Breakthrough {
                    topic: topic.clone(),
                    improvement: *gain,
                })
                .collect(),
        }
    }
}

/// Content types ranked by summed engagement; ties keep first-seen order.
fn content_preferences(data: &ActivityData) -> Vec<String> {
    let mut totals: Vec<(&str, f64)> = Vec::new();
    for i in &data.content_interactions {
        let score = finite_or_zero(i.engagement_score);
        match totals.iter().position(|(t, _)| *t == i.content_type) {
            Some(idx) => totals[idx].1 += score,
            None => totals.push((i.content_type.as_str(), score)),
        }
    }
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals
        .into_iter()
        .take(MAX_CONTENT_PREFERENCES)
        .map(|(t, _)| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{ContentInteraction, TimeSlotPerformance};

    fn config() -> AnalyticsConfig {
        AnalyticsConfig::default()
    }

    #[test]
    fn empty_activity_is_neutral() {
        let m = ProgressMetrics::compute(&ActivityData::default(), &config());
        assert_eq!(m.completion_rate, 0.0);
        assert_eq!(m.average_score, 0.0);
        assert_eq!(m.time_efficiency, 0.0);
        assert_eq!(m.consistency_score, 0.0);
        assert_eq!(m.engagement_level, 0.0);
        assert_eq!(m.difficulty_adaptation, DifficultyTrend::InsufficientData);
        assert_eq!(m.score_variance, None);

        let p = LearningPatterns::identify(&ActivityData::default());
        assert_eq!(p.learning_velocity, 0.0);
        assert!(p.struggle_points.is_empty());
    }

    #[test]
    fn core_ratios() {
        let data = ActivityData {
            total_modules: Some(10),
            completed_modules: Some(4),
            total_time_spent: Some(600.0),
            total_interactions: Some(250),
            daily_activity: vec![30.0, 0.0, 45.0, 10.0],
            ..Default::default()
        };
        let m = ProgressMetrics::compute(&data, &config());
        assert!((m.completion_rate - 0.4).abs() < 1e-12);
        // 150 min per module against 120 expected
        assert!((m.time_efficiency - 0.8).abs() < 1e-12);
        assert_eq!(m.consistency_score, 0.75);
        // 25 interactions per hour against 50
        assert!((m.engagement_level - 0.5).abs() < 1e-12);
    }

    #[test]
    fn trend_uses_last_five_scores() {
        assert_eq!(difficulty_trend(&[90.0, 90.0]), DifficultyTrend::InsufficientData);
        assert_eq!(
            difficulty_trend(&[10.0, 10.0, 80.0, 80.0, 80.0, 80.0, 80.0]),
            DifficultyTrend::Improving
        );
        assert_eq!(difficulty_trend(&[50.0, 52.0, 48.0]), DifficultyTrend::Stable);
        assert_eq!(difficulty_trend(&[30.0, 40.0, 35.0]), DifficultyTrend::Declining);
    }

    #[test]
    fn patterns() {
        let data = ActivityData {
            total_time_spent: Some(120.0),
            concepts_mastered: Some(6.0),
            time_based_performance: ["morning", "noon", "evening", "night", "dawn"]
                .iter()
                .map(|s| TimeSlotPerformance {
                    time_slot: s.to_string(),
                    performance: if *s == "noon" { 0.5 } else { 0.9 },
                })
                .collect(),
            content_interactions: vec![
                ContentInteraction { content_type: "text".into(), engagement_score: 0.4 },
                ContentInteraction { content_type: "video".into(), engagement_score: 0.9 },
                ContentInteraction { content_type: "quiz".into(), engagement_score: 0.5 },
                ContentInteraction { content_type: "text".into(), engagement_score: 0.4 },
                ContentInteraction { content_type: "audio".into(), engagement_score: 0.1 },
            ],
            topic_scores: [("keys".to_string(), 0.4), ("mining".to_string(), 0.9)].into(),
            score_improvements: [("script".to_string(), 0.35), ("fees".to_string(), 0.1)].into(),
            ..Default::default()
        };
        let p = LearningPatterns::identify(&data);
        assert_eq!(p.peak_performance_times, vec!["morning", "evening", "night"]);
        assert_eq!(p.learning_velocity, 3.0);
        assert_eq!(p.content_preferences, vec!["video", "text", "quiz"]);
        assert_eq!(p.struggle_points, vec!["keys"]);
        assert_eq!(p.breakthrough_moments.len(), 1);
        assert_eq!(p.breakthrough_moments[0].topic, "script");
    }
}
