//! External content generation behind a narrow prompt → JSON seam.
//!
//! The engine only sends a task prompt and a temperature, and only checks that the
//! answer parses into the schema the caller expects. Transport details live in
//! [`HttpContentGenerator`]; tests plug in scripted generators.

mod http;
pub mod prompts;
mod schema;

pub use http::HttpContentGenerator;
pub use schema::{
    parse_response, ContextualRecommendations, ExerciseContent, KnowledgeGapReport, ModuleContent,
};

use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTask {
    KnowledgeGaps,
    Module,
    Exercise,
    Recommendations,
}

impl ContentTask {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentTask::KnowledgeGaps => "knowledge_gaps",
            ContentTask::Module => "module",
            ContentTask::Exercise => "exercise",
            ContentTask::Recommendations => "recommendations",
        }
    }

    /// Sampling temperature: analytical tasks run cooler than creative ones.
    pub fn temperature(self) -> f32 {
        match self {
            ContentTask::KnowledgeGaps => 0.3,
            ContentTask::Recommendations => 0.5,
            ContentTask::Module | ContentTask::Exercise => 0.7,
        }
    }
}

impl fmt::Display for ContentTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRequest {
    pub task: ContentTask,
    pub prompt: String,
    pub temperature: f32,
}

impl ContentRequest {
    pub fn new(task: ContentTask, prompt: String) -> Self {
        Self {
            task,
            prompt,
            temperature: task.temperature(),
        }
    }
}

/// A language-model service. Returns the raw text answer; no retries.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &ContentRequest) -> Result<String>;
}

/// Send `prompt` for `task` and parse the answer as `T`.
pub async fn request<T: DeserializeOwned>(
    generator: &dyn ContentGenerator,
    task: ContentTask,
    prompt: String,
) -> Result<T> {
    let request = ContentRequest::new(task, prompt);
    debug!(task = %task, prompt_len = request.prompt.len(), "requesting content");
    let raw = generator.generate(&request).await?;
    parse_response(task, &raw)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Answers every task with a canned JSON document and records the requests.
    pub struct ScriptedGenerator {
        pub gaps: String,
        pub module: String,
        pub exercise: String,
        pub recommendations: String,
        pub seen: Mutex<Vec<ContentRequest>>,
    }

    impl Default for ScriptedGenerator {
        fn default() -> Self {
            Self {
                gaps: r#"{"gaps":["cryptography","consensus"],"recommendations":["review hashing"],"priority":"high"}"#.into(),
                module: r#"{"contentOutline":["intro"],"interactiveElements":[],"exercises":["quiz"],"assessmentMethods":["test"]}"#.into(),
                exercise: r#"{"instructions":"do it","expectedOutcome":"done","hints":["try"],"assessmentCriteria":["works"]}"#.into(),
                recommendations: r#"{"readings":[],"exercises":[],"examples":[],"simulations":[],"assessmentQuestions":[]}"#.into(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate(&self, request: &ContentRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(match request.task {
                ContentTask::KnowledgeGaps => self.gaps.clone(),
                ContentTask::Module => self.module.clone(),
                ContentTask::Exercise => self.exercise.clone(),
                ContentTask::Recommendations => self.recommendations.clone(),
            })
        }
    }
}
