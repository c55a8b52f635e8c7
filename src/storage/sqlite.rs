//! SQLite-backed student store. Profiles and activity snapshots are kept as JSON payloads.
//!
//! rusqlite is synchronous, so every statement runs on tokio's blocking pool.

use super::{SeedSummary, StudentProfile, StudentRecord, StudentRepository};
use crate::analytics::ActivityData;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteStudentStore {
    conn: Arc<Mutex<Connection>>,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS profiles (
        student_id TEXT PRIMARY KEY,
        payload TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS activity (
        student_id TEXT NOT NULL,
        course_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (student_id, course_id)
    );
"#;

fn decode<T: DeserializeOwned>(what: &str, payload: &str) -> Result<T> {
    serde_json::from_str(payload)
        .map_err(|e| EngineError::Storage(format!("stored {what} is corrupt: {e}")))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| EngineError::Storage(e.to_string()))
}

fn write_profile(conn: &Connection, student_id: &str, profile: &StudentProfile) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO profiles (student_id, payload, updated_at) VALUES (?1, ?2, ?3)",
        params![student_id, encode(profile)?, Utc::now().timestamp_millis()],
    )?;
    Ok(())
}

fn write_activity(conn: &Connection, student_id: &str, course_id: &str, data: &ActivityData) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO activity (student_id, course_id, payload, updated_at) \
         VALUES (?1, ?2, ?3, ?4)",
        params![student_id, course_id, encode(data)?, Utc::now().timestamp_millis()],
    )?;
    Ok(())
}

impl SqliteStudentStore {
    /// Open or create the DB at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| EngineError::Storage(format!("{}: {e}", parent.display())))?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| EngineError::Storage("student store lock poisoned".into()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| EngineError::Storage(format!("student store task: {e}")))?
    }

    pub async fn put_profile(&self, student_id: &str, profile: &StudentProfile) -> Result<()> {
        let (id, profile) = (student_id.to_string(), profile.clone());
        self.blocking(move |conn| write_profile(conn, &id, &profile)).await
    }

    pub async fn put_activity(&self, student_id: &str, course_id: &str, data: &ActivityData) -> Result<()> {
        let (id, course, data) = (student_id.to_string(), course_id.to_string(), data.clone());
        self.blocking(move |conn| write_activity(conn, &id, &course, &data)).await
    }

    /// Write every record in one transaction; nothing is stored if any record is rejected.
    pub async fn seed(&self, records: Vec<StudentRecord>) -> Result<SeedSummary> {
        if let Some(bad) = records.iter().find(|r| r.id.trim().is_empty()) {
            return Err(EngineError::invalid(format!(
                "student record without an id ({} courses)",
                bad.activity.len()
            )));
        }
        let summary = self
            .blocking(move |conn| {
                let tx = conn.transaction()?;
                let mut summary = SeedSummary::default();
                for record in &records {
                    if let Some(profile) = &record.profile {
                        write_profile(&tx, &record.id, profile)?;
                        summary.profiles += 1;
                    }
                    for (course_id, data) in &record.activity {
                        write_activity(&tx, &record.id, course_id, data)?;
                        summary.activities += 1;
                    }
                    summary.students += 1;
                }
                tx.commit()?;
                Ok(summary)
            })
            .await?;
        info!(
            students = summary.students,
            profiles = summary.profiles,
            activities = summary.activities,
            "student store seeded"
        );
        Ok(summary)
    }
}

#[async_trait]
impl StudentRepository for SqliteStudentStore {
    async fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        let id = student_id.to_string();
        let payload: Option<String> = self
            .blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT payload FROM profiles WHERE student_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        payload.map(|p| decode("profile", &p)).transpose()
    }

    async fn activity_data(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<ActivityData>> {
        let (id, course) = (student_id.to_string(), course_id.to_string());
        let payload: Option<String> = self
            .blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT payload FROM activity WHERE student_id = ?1 AND course_id = ?2",
                        params![id, course],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        payload.map(|p| decode("activity", &p)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DifficultyLevel, LearningStyle};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn profile_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/students.db");
        let profile = StudentProfile {
            learning_style: LearningStyle::Visual,
            current_level: DifficultyLevel::Advanced,
            learning_speed: 1.5,
            weak_areas: vec!["cryptography".into()],
            ..Default::default()
        };
        SqliteStudentStore::open(&path)
            .unwrap()
            .put_profile("s1", &profile)
            .await
            .unwrap();

        let reopened = SqliteStudentStore::open(&path).unwrap();
        assert_eq!(reopened.student_profile("s1").await.unwrap(), Some(profile));
        assert_eq!(reopened.student_profile("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn activity_is_keyed_by_course() {
        let store = SqliteStudentStore::open_in_memory().unwrap();
        let data = ActivityData {
            completed_modules: Some(3),
            ..Default::default()
        };
        store.put_activity("s1", "bitcoin-101", &data).await.unwrap();
        assert_eq!(store.activity_data("s1", "bitcoin-101").await.unwrap(), Some(data));
        assert_eq!(store.activity_data("s1", "stacks-101").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_payload_is_storage_error() {
        let store = SqliteStudentStore::open_in_memory().unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO profiles (student_id, payload, updated_at) VALUES ('s1', 'nope', 0)",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.student_profile("s1").await,
            Err(EngineError::Storage(_))
        ));
    }

    fn record(id: &str, courses: &[&str]) -> StudentRecord {
        StudentRecord {
            id: id.to_string(),
            profile: Some(StudentProfile {
                learning_speed: 1.25,
                ..Default::default()
            }),
            activity: courses
                .iter()
                .map(|c| {
                    let data = ActivityData {
                        completed_modules: Some(2),
                        ..Default::default()
                    };
                    (c.to_string(), data)
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn seed_writes_profiles_and_activity() {
        let store = SqliteStudentStore::open_in_memory().unwrap();
        let summary = store
            .seed(vec![
                record("s1", &["bitcoin-101", "stacks-101"]),
                StudentRecord {
                    id: "s2".into(),
                    profile: None,
                    activity: BTreeMap::new(),
                },
            ])
            .await
            .unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                students: 2,
                profiles: 1,
                activities: 2,
            }
        );
        let profile = store.student_profile("s1").await.unwrap().unwrap();
        assert_eq!(profile.learning_speed, 1.25);
        assert!(store.activity_data("s1", "stacks-101").await.unwrap().is_some());
        assert_eq!(store.student_profile("s2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn seed_rejects_blank_ids_before_writing() {
        let store = SqliteStudentStore::open_in_memory().unwrap();
        let err = store
            .seed(vec![record("s1", &["bitcoin-101"]), record("  ", &[])])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(store.student_profile("s1").await.unwrap(), None);
    }

    #[test]
    fn seed_file_shape() {
        let records: Vec<StudentRecord> = serde_json::from_str(
            r#"[{"id":"s1","profile":{"learningStyle":"visual"},
                 "activity":{"bitcoin-101":{"completedModules":3,"totalModules":12}}},
                {"id":"s2"}]"#,
        )
        .unwrap();
        assert_eq!(records[0].profile.as_ref().unwrap().learning_style, LearningStyle::Visual);
        assert_eq!(records[0].activity["bitcoin-101"].completed_modules, Some(3));
        assert!(records[1].profile.is_none() && records[1].activity.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_reads_on_multi_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStudentStore::open(&dir.path().join("students.db")).unwrap());
        let ids: Vec<String> = (0..16).map(|i| format!("s{i}")).collect();
        let records = ids.iter().map(|id| record(id, &["bitcoin-101"])).collect();
        store.seed(records).await.unwrap();

        let tasks: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let profile = store.student_profile(&id).await?;
                    let activity = store.activity_data(&id, "bitcoin-101").await?;
                    Ok::<_, EngineError>(profile.is_some() && activity.is_some())
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().unwrap());
        }
    }
}
