use super::{StudentProfile, StudentRepository};
use crate::analytics::ActivityData;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStudentStore {
    profiles: RwLock<HashMap<String, StudentProfile>>,
    activity: RwLock<HashMap<(String, String), ActivityData>>,
}

fn poisoned<T>(_: T) -> EngineError {
    EngineError::Storage("in-memory store lock poisoned".into())
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_profile(&self, student_id: &str, profile: StudentProfile) -> Result<()> {
        self.profiles
            .write()
            .map_err(poisoned)?
            .insert(student_id.to_string(), profile);
        Ok(())
    }

    pub fn put_activity(&self, student_id: &str, course_id: &str, data: ActivityData) -> Result<()> {
        self.activity
            .write()
            .map_err(poisoned)?
            .insert((student_id.to_string(), course_id.to_string()), data);
        Ok(())
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentStore {
    async fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        Ok(self.profiles.read().map_err(poisoned)?.get(student_id).cloned())
    }

    async fn activity_data(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<ActivityData>> {
        let key = (student_id.to_string(), course_id.to_string());
        Ok(self.activity.read().map_err(poisoned)?.get(&key).cloned())
    }
}
