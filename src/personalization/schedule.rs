use crate::error::{EngineError, Result};
use crate::lenient;
use crate::model::{DifficultyLevel, LearningStyle};
use serde::{Deserialize, Serialize};

const MAX_SESSIONS_PER_WEEK: f64 = 7.0;
const MAX_SESSION_MINUTES: f64 = 120.0;
const REVIEW_SESSIONS: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerPreferences {
    /// Study hours available per week
    #[serde(default, deserialize_with = "lenient::number")]
    pub available_time: Option<f64>,
}

impl LearnerPreferences {
    pub fn weekly_hours(&self) -> Result<f64> {
        match self.available_time {
            Some(h) if h.is_finite() && h > 0.0 => Ok(h),
            Some(h) => Err(EngineError::invalid(format!(
                "availableTime must be a positive number of hours, got {h}"
            ))),
            None => Err(EngineError::invalid("availableTime is required")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEstimate {
    pub total_hours: u32,
    pub estimated_weeks: u32,
    pub weekly_hours: f64,
}

impl CompletionEstimate {
    pub fn new(level: DifficultyLevel, weekly_hours: f64) -> Self {
        let total_hours = level.base_hours();
        Self {
            total_hours,
            estimated_weeks: (f64::from(total_hours) / weekly_hours).ceil().min(f64::from(u32::MAX))
                as u32,
            weekly_hours,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveSchedule {
    pub sessions_per_week: u32,
    /// Minutes
    pub session_duration: u32,
    /// Minutes between breaks
    pub break_frequency: u32,
    pub review_sessions: u32,
}

impl AdaptiveSchedule {
    pub fn new(weekly_hours: f64, style: LearningStyle) -> Self {
        Self {
            sessions_per_week: (weekly_hours / 2.0).ceil().min(MAX_SESSIONS_PER_WEEK) as u32,
            session_duration: (weekly_hours * 60.0).min(MAX_SESSION_MINUTES).ceil() as u32,
            break_frequency: if style == LearningStyle::Kinesthetic { 15 } else { 30 },
            review_sessions: REVIEW_SESSIONS,
        }
    }
}
