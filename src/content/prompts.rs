//! Prompt builders. Each prompt names the JSON shape the matching schema parses.

use crate::features::LearningHistory;
use crate::model::{DifficultyLevel, LearningStyle};
use crate::storage::StudentProfile;

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn knowledge_gaps(history: &LearningHistory) -> String {
    format!(
        "Analyze the following learning history for blockchain/Bitcoin education and identify knowledge gaps:\n\
         {}\n\n\
         Identify specific areas where the student needs improvement and suggest targeted learning modules.\n\
         Focus on: Bitcoin fundamentals, blockchain technology, cryptography, consensus mechanisms, \
         smart contracts, DeFi concepts, and Stacks ecosystem.\n\n\
         Respond with JSON only: {{\"gaps\": [string], \"recommendations\": [string], \"priority\": \"high\" | \"medium\" | \"low\"}}",
        to_json(history)
    )
}

pub fn custom_module(gap: &str, style: LearningStyle) -> String {
    format!(
        "Create a learning module for \"{gap}\" targeting the {style} learning style.\n\
         Focus on blockchain/Bitcoin education with hands-on Stacks examples.\n\n\
         Respond with JSON only: {{\"contentOutline\": [...], \"interactiveElements\": [...], \
         \"exercises\": [...], \"assessmentMethods\": [...]}}"
    )
}

pub fn exercise(kind: &str, topic: &str, profile: &StudentProfile) -> String {
    format!(
        "Create a {kind} exercise for learning \"{topic}\" in blockchain education.\n\
         Difficulty should match the student's level: {level}\n\
         Learning style preference: {style}\n\
         Make it practical and hands-on with Stacks/Bitcoin examples.\n\n\
         Respond with JSON only: {{\"instructions\": string, \"expectedOutcome\": string, \
         \"hints\": [string], \"assessmentCriteria\": [string]}}",
        level = profile.current_level,
        style = profile.learning_style,
    )
}

pub fn contextual_recommendations(
    topic: &str,
    difficulty: DifficultyLevel,
    profile: &StudentProfile,
) -> String {
    format!(
        "Generate personalized learning recommendations for a {difficulty} level student studying \
         \"{topic}\" in blockchain/Bitcoin education.\n\n\
         Student profile: {}\n\n\
         Focus on Stacks ecosystem integration and hands-on Bitcoin concepts.\n\
         Respond with JSON only, with these five arrays: {{\"readings\": [...], \"exercises\": [...], \
         \"examples\": [...], \"simulations\": [...], \"assessmentQuestions\": [...]}}",
        to_json(profile)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_carry_their_inputs() {
        let profile = StudentProfile::default();
        let p = contextual_recommendations("script-language", DifficultyLevel::Intermediate, &profile);
        assert!(p.contains("intermediate level"));
        assert!(p.contains("\"script-language\""));
        assert!(p.contains("\"learningSpeed\""));

        let e = exercise("code-review", "taproot-upgrade", &profile);
        assert!(e.starts_with("Create a code-review exercise"));

        let g = knowledge_gaps(&LearningHistory {
            assessment_scores: vec![42.0],
            ..Default::default()
        });
        assert!(g.contains("\"assessmentScores\":[42.0]"));
    }
}
