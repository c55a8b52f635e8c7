//! Read access to student profiles and activity snapshots.
//!
//! The engine only reads through [`StudentRepository`]. Writes go through the concrete
//! stores: `put_*` for single records, and [`SqliteStudentStore::seed`] for the
//! `seed` CLI command.

mod memory;
mod sqlite;

pub use memory::InMemoryStudentStore;
pub use sqlite::SqliteStudentStore;

use crate::analytics::ActivityData;
use crate::error::Result;
use crate::model::{DifficultyLevel, LearningStyle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentProfile {
    pub learning_style: LearningStyle,
    pub current_level: DifficultyLevel,
    /// Multiplier on study pace; 1.0 is nominal
    pub learning_speed: f64,
    pub preferred_topics: Vec<String>,
    pub weak_areas: Vec<String>,
    pub strong_areas: Vec<String>,
}

impl Default for StudentProfile {
    fn default() -> Self {
        Self {
            learning_style: LearningStyle::Kinesthetic,
            current_level: DifficultyLevel::Beginner,
            learning_speed: 1.0,
            preferred_topics: Vec::new(),
            weak_areas: Vec::new(),
            strong_areas: Vec::new(),
        }
    }
}

/// One student in a seed file: an optional profile plus activity snapshots by course id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    #[serde(default)]
    pub profile: Option<StudentProfile>,
    #[serde(default)]
    pub activity: BTreeMap<String, ActivityData>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub students: usize,
    pub profiles: usize,
    pub activities: usize,
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>>;

    async fn activity_data(&self, student_id: &str, course_id: &str)
        -> Result<Option<ActivityData>>;
}
