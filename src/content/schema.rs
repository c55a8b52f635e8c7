//! Response schemas the engine accepts from the content generator.

use super::ContentTask;
use crate::analytics::Priority;
use crate::error::{EngineError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGapReport {
    pub gaps: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<Value>,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleContent {
    pub content_outline: Vec<Value>,
    #[serde(default)]
    pub interactive_elements: Vec<Value>,
    #[serde(default, alias = "practicalExercises")]
    pub exercises: Vec<Value>,
    #[serde(default)]
    pub assessment_methods: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseContent {
    pub instructions: Value,
    #[serde(default)]
    pub expected_outcome: Value,
    #[serde(default)]
    pub hints: Vec<Value>,
    #[serde(default)]
    pub assessment_criteria: Vec<Value>,
}

/// The five supplementary-content categories; all must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualRecommendations {
    #[serde(alias = "supplementaryReadings")]
    pub readings: Vec<Value>,
    #[serde(alias = "practicalExercises")]
    pub exercises: Vec<Value>,
    #[serde(alias = "realWorldExamples")]
    pub examples: Vec<Value>,
    #[serde(alias = "interactiveSimulations")]
    pub simulations: Vec<Value>,
    pub assessment_questions: Vec<Value>,
}

/// Strip an optional markdown code fence around a JSON answer.
fn unfence(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .and_then(|s| s.strip_suffix("```"))
        .or_else(|| trimmed.strip_prefix("```").and_then(|s| s.strip_suffix("```")))
        .unwrap_or(trimmed)
        .trim()
}

pub fn parse_response<T: DeserializeOwned>(task: ContentTask, raw: &str) -> Result<T> {
    serde_json::from_str(unfence(raw)).map_err(|e| {
        tracing::warn!(task = %task, error = %e, "content generator answer did not match schema");
        EngineError::UpstreamFormat {
            task: task.as_str(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_fenced_json() {
        let raw = "```json\n{\"gaps\":[\"mining\"],\"priority\":\"medium\"}\n```";
        let r: KnowledgeGapReport = parse_response(ContentTask::KnowledgeGaps, raw).unwrap();
        assert_eq!(r.gaps, vec!["mining"]);
        assert_eq!(r.priority, Priority::Medium);
        assert!(r.recommendations.is_empty());
    }

    #[test]
    fn missing_category_is_rejected() {
        let raw = r#"{"readings":[],"exercises":[],"examples":[],"simulations":[]}"#;
        let err = parse_response::<ContextualRecommendations>(ContentTask::Recommendations, raw)
            .unwrap_err();
        assert_eq!(err.kind(), "upstream_format_error");
    }

    #[test]
    fn module_needs_an_outline() {
        assert!(parse_response::<ModuleContent>(ContentTask::Module, r#"{"exercises":[]}"#).is_err());
        let m: ModuleContent = parse_response(
            ContentTask::Module,
            r#"{"contentOutline":[{"section":"keys"}],"practicalExercises":["sign a tx"]}"#,
        )
        .unwrap();
        assert_eq!(m.exercises.len(), 1);
    }
}
