//! Adaptive learning engine: learner analytics and curriculum personalization.
//!
//! Modular structure:
//! - [`features`]: history → fixed-length feature vectors
//! - [`model`]: learning-style classifier and difficulty regressor
//! - [`analytics`]: progress metrics, learning patterns, rule tables
//! - [`risk`]: dropout risk and risk factors
//! - [`content`]: external content generator seam
//! - [`curriculum`]: topic sequencing and next-content recommendations
//! - [`personalization`]: orchestrator exposing the public operations
//! - [`storage`]: student profile / activity repositories
//! - [`logging`]: tracing setup and JSON result lines

pub mod analytics;
pub mod config;
pub mod content;
pub mod curriculum;
pub mod error;
pub mod features;
pub mod lenient;
pub mod logging;
pub mod model;
pub mod personalization;
pub mod risk;
pub mod storage;

pub use analytics::{ActivityData, ProgressAnalyzer, ProgressReport};
pub use config::EngineConfig;
pub use content::{ContentGenerator, ContentRequest, ContentTask, HttpContentGenerator};
pub use curriculum::{CurriculumRecommender, SequentialTopics};
pub use error::{EngineError, Result};
pub use features::{FeatureExtractor, FeatureVector, LearningHistory, PerformanceMetrics};
pub use logging::StructuredLogger;
pub use model::{DifficultyModel, LearningStyleModel};
pub use personalization::{LearnerPreferences, PersonalizationOrchestrator, PersonalizedPath};
pub use risk::RiskEngine;
pub use storage::{InMemoryStudentStore, SqliteStudentStore, StudentProfile, StudentRepository};
