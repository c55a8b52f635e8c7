//! The engine's entry point: composes the models, analytics, curriculum and content
//! generation into the four public operations.

mod adaptation;
mod schedule;

pub use adaptation::{decide, AdaptationDecision, CurrentPerformance, DifficultyChange};
pub use schedule::{AdaptiveSchedule, CompletionEstimate, LearnerPreferences};

use crate::analytics::{ActivityData, ProgressAnalyzer, ProgressReport};
use crate::config::EngineConfig;
use crate::content::{self, prompts, ContentGenerator, ContentTask, KnowledgeGapReport, ModuleContent};
use crate::curriculum::{catalog, ContentRecommendation, CurriculumRecommender, Domain};
use crate::error::{EngineError, Result};
use crate::features::{LearningHistory, PerformanceMetrics};
use crate::model::{
    DifficultyModel, DifficultyPrediction, LearningStyle, LearningStyleModel, StylePrediction,
};
use crate::storage::StudentRepository;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomModule {
    pub topic: String,
    pub content: ModuleContent,
    pub learning_style: LearningStyle,
    /// Minutes
    pub estimated_time: u32,
}

/// Same inputs and model weights give the same path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedPath {
    pub student_id: String,
    pub learning_style: StylePrediction,
    pub recommended_difficulty: DifficultyPrediction,
    pub knowledge_gaps: KnowledgeGapReport,
    pub customized_modules: Vec<CustomModule>,
    pub estimated_completion_time: CompletionEstimate,
    pub adaptive_schedule: AdaptiveSchedule,
}

pub struct PersonalizationOrchestrator {
    style: Arc<LearningStyleModel>,
    difficulty: Arc<DifficultyModel>,
    analyzer: ProgressAnalyzer,
    recommender: CurriculumRecommender,
    generator: Arc<dyn ContentGenerator>,
    repository: Arc<dyn StudentRepository>,
}

fn require_id(student_id: &str) -> Result<()> {
    if student_id.trim().is_empty() {
        return Err(EngineError::invalid("student id is required"));
    }
    Ok(())
}

impl PersonalizationOrchestrator {
    /// Models load lazily from the configured artifact paths on first use.
    pub fn new(
        config: &EngineConfig,
        generator: Arc<dyn ContentGenerator>,
        repository: Arc<dyn StudentRepository>,
    ) -> Self {
        Self::with_models(
            Arc::new(LearningStyleModel::from_config(config)),
            Arc::new(DifficultyModel::from_config(config)),
            ProgressAnalyzer::new(config.analytics.clone()),
            generator,
            repository,
        )
    }

    pub fn with_models(
        style: Arc<LearningStyleModel>,
        difficulty: Arc<DifficultyModel>,
        analyzer: ProgressAnalyzer,
        generator: Arc<dyn ContentGenerator>,
        repository: Arc<dyn StudentRepository>,
    ) -> Self {
        let recommender = CurriculumRecommender::new(Arc::clone(&generator), Arc::clone(&repository));
        Self {
            style,
            difficulty,
            analyzer,
            recommender,
            generator,
            repository,
        }
    }

    /// Recommend within `domain`'s curriculum instead of the default one.
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.recommender =
            CurriculumRecommender::new(Arc::clone(&self.generator), Arc::clone(&self.repository))
                .with_domain(domain);
        self
    }

    pub fn style_model(&self) -> &LearningStyleModel {
        &self.style
    }

    pub fn difficulty_model(&self) -> &DifficultyModel {
        &self.difficulty
    }

    pub fn recommender(&self) -> &CurriculumRecommender {
        &self.recommender
    }

    /// All-or-nothing: any failing step fails the call with `PersonalizationFailed`.
    pub async fn generate_personalized_path(
        &self,
        student_id: &str,
        history: &LearningHistory,
        preferences: &LearnerPreferences,
    ) -> Result<PersonalizedPath> {
        self.build_path(student_id, history, preferences)
            .await
            .map_err(|e| {
                warn!(student_id, error = %e, "personalization failed");
                EngineError::personalization(e)
            })
    }

    async fn build_path(
        &self,
        student_id: &str,
        history: &LearningHistory,
        preferences: &LearnerPreferences,
    ) -> Result<PersonalizedPath> {
        require_id(student_id)?;
        let weekly_hours = preferences.weekly_hours()?;
        let metrics = PerformanceMetrics::from_history(history);

        let (learning_style, recommended_difficulty, knowledge_gaps) = tokio::try_join!(
            self.style.classify(history),
            self.difficulty.predict(&metrics),
            content::request::<KnowledgeGapReport>(
                self.generator.as_ref(),
                ContentTask::KnowledgeGaps,
                prompts::knowledge_gaps(history),
            ),
        )?;

        let customized_modules = self
            .custom_modules(learning_style.primary, &knowledge_gaps.gaps)
            .await?;

        let path = PersonalizedPath {
            student_id: student_id.to_string(),
            estimated_completion_time: CompletionEstimate::new(
                recommended_difficulty.level,
                weekly_hours,
            ),
            adaptive_schedule: AdaptiveSchedule::new(weekly_hours, learning_style.primary),
            learning_style,
            recommended_difficulty,
            knowledge_gaps,
            customized_modules,
        };
        info!(
            student_id,
            style = %path.learning_style.primary,
            level = %path.recommended_difficulty.level,
            modules = path.customized_modules.len(),
            "personalized path generated"
        );
        Ok(path)
    }

    async fn custom_modules(&self, style: LearningStyle, gaps: &[String]) -> Result<Vec<CustomModule>> {
        try_join_all(gaps.iter().map(|gap| async move {
            let content = content::request::<ModuleContent>(
                self.generator.as_ref(),
                ContentTask::Module,
                prompts::custom_module(gap, style),
            )
            .await?;
            Ok::<_, EngineError>(CustomModule {
                topic: gap.clone(),
                content,
                learning_style: style,
                estimated_time: catalog::module_minutes(gap),
            })
        }))
        .await
    }

    pub async fn recommend_next_content(
        &self,
        student_id: &str,
        current_topic: &str,
        difficulty: &str,
    ) -> Result<ContentRecommendation> {
        self.recommender
            .recommend_next_content(student_id, current_topic, difficulty)
            .await
    }

    pub fn analyze_progress(
        &self,
        student_id: &str,
        course_id: &str,
        data: &ActivityData,
    ) -> Result<ProgressReport> {
        self.analyzer.analyze_progress(student_id, course_id, data)
    }

    /// Progress report over the activity snapshot held by the repository.
    pub async fn analyze_stored_progress(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<ProgressReport> {
        require_id(student_id)?;
        let data = self
            .repository
            .activity_data(student_id, course_id)
            .await?
            .ok_or_else(|| {
                EngineError::invalid(format!(
                    "no activity recorded for {student_id} in {course_id}"
                ))
            })?;
        self.analyze_progress(student_id, course_id, &data)
    }

    pub fn adapt_difficulty(
        &self,
        student_id: &str,
        performance: &CurrentPerformance,
    ) -> Result<AdaptationDecision> {
        require_id(student_id)?;
        let decision = decide(performance)?;
        info!(
            student_id,
            change = ?decision.recommended_change,
            "difficulty adaptation decided"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::ScriptedGenerator;
    use crate::features::FeatureExtractor;
    use crate::model::{Architecture, DifficultyLevel, ModelHandle};
    use crate::storage::InMemoryStudentStore;

    fn orchestrator(generator: ScriptedGenerator) -> PersonalizationOrchestrator {
        let config = EngineConfig::default();
        let m = &config.models;
        PersonalizationOrchestrator::with_models(
            Arc::new(LearningStyleModel::new(
                ModelHandle::new("learning-style", Architecture::learning_style(), None, 42),
                FeatureExtractor::default(),
                m.style_training,
                m.learning_rate,
                m.seed,
            )),
            Arc::new(DifficultyModel::new(
                ModelHandle::new("difficulty", Architecture::difficulty(), None, 42),
                FeatureExtractor::default(),
                m.difficulty_training,
                m.learning_rate,
                m.seed,
            )),
            ProgressAnalyzer::default(),
            Arc::new(generator),
            Arc::new(InMemoryStudentStore::new()),
        )
    }

    fn history() -> LearningHistory {
        serde_json::from_str(
            r#"{"completionRates":[0.5,0.6],"timeSpent":[90,40],"assessmentScores":[80,85]}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn builds_one_module_per_gap() {
        let o = orchestrator(ScriptedGenerator::default());
        let prefs = LearnerPreferences {
            available_time: Some(5.0),
        };
        let path = o
            .generate_personalized_path("s1", &history(), &prefs)
            .await
            .unwrap();
        assert_eq!(path.customized_modules.len(), 2);
        assert_eq!(path.customized_modules[0].topic, "cryptography");
        assert_eq!(path.customized_modules[0].estimated_time, 300);
        assert!(DifficultyLevel::ALL.contains(&path.recommended_difficulty.level));
        assert_eq!(path.estimated_completion_time.weekly_hours, 5.0);
        assert!(path.adaptive_schedule.sessions_per_week <= 7);
    }

    #[tokio::test]
    async fn identical_requests_give_identical_paths() {
        let prefs = LearnerPreferences {
            available_time: Some(8.0),
        };
        let first = orchestrator(ScriptedGenerator::default())
            .generate_personalized_path("s1", &history(), &prefs)
            .await
            .unwrap();
        let again = orchestrator(ScriptedGenerator::default())
            .generate_personalized_path("s1", &history(), &prefs)
            .await
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&again).unwrap()
        );
    }

    #[tokio::test]
    async fn bad_preferences_are_wrapped() {
        let o = orchestrator(ScriptedGenerator::default());
        let err = o
            .generate_personalized_path("s1", &history(), &LearnerPreferences::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "personalization_failed");
        assert_eq!(err.cause().kind(), "invalid_input");
    }

    #[tokio::test]
    async fn module_failure_discards_the_whole_path() {
        let o = orchestrator(ScriptedGenerator {
            module: "{\"contentOutline\": ".into(),
            ..Default::default()
        });
        let err = o
            .generate_personalized_path(
                "s1",
                &history(),
                &LearnerPreferences {
                    available_time: Some(5.0),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.cause(), EngineError::UpstreamFormat { task: "module", .. }));
    }

    #[tokio::test]
    async fn stored_progress_requires_a_snapshot() {
        let o = orchestrator(ScriptedGenerator::default());
        assert!(matches!(
            o.analyze_stored_progress("s1", "c1").await,
            Err(EngineError::InvalidInput(_))
        ));
    }
}
