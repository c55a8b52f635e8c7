//! Topic sequencing through the curriculum graph and next-content recommendations.

pub mod catalog;

pub use catalog::Domain;

use crate::content::{self, prompts, ContentGenerator, ContentTask, ContextualRecommendations, ExerciseContent};
use crate::error::{EngineError, Result};
use crate::model::DifficultyLevel;
use crate::storage::{StudentProfile, StudentRepository};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const UPCOMING: usize = 3;
const PREREQUISITES: usize = 2;
const FALLBACK_TOPICS: usize = 3;

/// Position of a topic in its sequence, or the opening topics when it is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SequentialTopics {
    Positioned {
        current: String,
        next: Option<String>,
        upcoming: Vec<String>,
        prerequisites: Vec<String>,
    },
    Fallback(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveExercise {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: ExerciseContent,
    /// Minutes
    pub estimated_time: u32,
    pub difficulty: DifficultyLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecommendation {
    pub next_topics: SequentialTopics,
    pub contextual_content: ContextualRecommendations,
    pub adaptive_exercises: Vec<AdaptiveExercise>,
    /// Minutes, adjusted for the student's learning speed
    pub estimated_time: u32,
}

fn owned(topics: &[&str]) -> Vec<String> {
    topics.iter().map(|t| t.to_string()).collect()
}

/// Unknown difficulty names and tiers a domain lacks fall back to its beginner sequence.
pub fn sequential_topics_in(domain: Domain, current_topic: &str, difficulty: &str) -> SequentialTopics {
    let sequence = DifficultyLevel::parse(difficulty)
        .and_then(|level| catalog::sequence(domain, level))
        .or_else(|| catalog::sequence(domain, DifficultyLevel::Beginner))
        .unwrap_or_default();

    match sequence.iter().position(|t| *t == current_topic) {
        Some(i) => SequentialTopics::Positioned {
            current: current_topic.to_string(),
            next: sequence.get(i + 1).map(|t| t.to_string()),
            upcoming: owned(&sequence[i + 1..(i + 1 + UPCOMING).min(sequence.len())]),
            prerequisites: owned(&sequence[i.saturating_sub(PREREQUISITES)..i]),
        },
        None => SequentialTopics::Fallback(owned(&sequence[..FALLBACK_TOPICS.min(sequence.len())])),
    }
}

pub fn sequential_topics(current_topic: &str, difficulty: &str) -> SequentialTopics {
    sequential_topics_in(Domain::default(), current_topic, difficulty)
}

/// Topic minutes divided by learning speed, rounded up. Non-positive speeds count as 1.
pub fn estimate_completion_minutes(topic: &str, learning_speed: f64) -> u32 {
    let speed = if learning_speed.is_finite() && learning_speed > 0.0 {
        learning_speed
    } else {
        1.0
    };
    let minutes = (f64::from(catalog::topic_base_minutes(topic)) / speed).ceil();
    minutes.min(f64::from(u32::MAX)) as u32
}

pub struct CurriculumRecommender {
    generator: Arc<dyn ContentGenerator>,
    repository: Arc<dyn StudentRepository>,
    domain: Domain,
}

impl CurriculumRecommender {
    pub fn new(generator: Arc<dyn ContentGenerator>, repository: Arc<dyn StudentRepository>) -> Self {
        Self {
            generator,
            repository,
            domain: Domain::default(),
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn sequential_topics(&self, current_topic: &str, difficulty: &str) -> SequentialTopics {
        sequential_topics_in(self.domain, current_topic, difficulty)
    }

    pub async fn recommend_next_content(
        &self,
        student_id: &str,
        current_topic: &str,
        difficulty: &str,
    ) -> Result<ContentRecommendation> {
        if student_id.trim().is_empty() {
            return Err(EngineError::invalid("student id is required"));
        }
        let profile = self
            .repository
            .student_profile(student_id)
            .await?
            .ok_or_else(|| EngineError::invalid(format!("unknown student {student_id}")))?;
        let level = DifficultyLevel::parse(difficulty).unwrap_or(DifficultyLevel::Beginner);

        let contextual = content::request::<ContextualRecommendations>(
            self.generator.as_ref(),
            ContentTask::Recommendations,
            prompts::contextual_recommendations(current_topic, level, &profile),
        );
        let exercises = self.adaptive_exercises(current_topic, &profile);
        let (contextual_content, adaptive_exercises) = tokio::try_join!(contextual, exercises)?;

        info!(
            student_id,
            topic = current_topic,
            exercises = adaptive_exercises.len(),
            "next content recommended"
        );
        Ok(ContentRecommendation {
            next_topics: self.sequential_topics(current_topic, difficulty),
            contextual_content,
            adaptive_exercises,
            estimated_time: estimate_completion_minutes(current_topic, profile.learning_speed),
        })
    }

    async fn adaptive_exercises(
        &self,
        topic: &str,
        profile: &StudentProfile,
    ) -> Result<Vec<AdaptiveExercise>> {
        let requests = catalog::exercise_types(profile.learning_style)
            .into_iter()
            .map(|kind| async move {
                let content = content::request::<ExerciseContent>(
                    self.generator.as_ref(),
                    ContentTask::Exercise,
                    prompts::exercise(kind, topic, profile),
                )
                .await?;
                Ok::<_, EngineError>(AdaptiveExercise {
                    kind: kind.to_string(),
                    content,
                    estimated_time: catalog::exercise_minutes(kind),
                    difficulty: profile.current_level,
                })
            });
        try_join_all(requests).await
    }
}
