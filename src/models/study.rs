//! Study assistant data models
//!
//! This module defines the request shapes accepted by the study endpoint and
//! the payloads it hands back in buffered modes.

use crate::core::constants::{mode, role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversation role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => role::USER,
            Role::Assistant => role::ASSISTANT,
            Role::System => role::SYSTEM,
        }
    }
}

/// A single role-tagged conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Task the assistant is asked to perform
///
/// Unknown or null mode names fall back to [`Mode::Simple`] without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Mode {
    #[default]
    Simple,
    StepByStep,
    RealWorld,
    Problem,
    Quiz,
    Notes,
    Planner,
}

/// How the dispatcher shapes the upstream completion for a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Await the full completion and return a JSON document
    Buffered,
    /// Pass the upstream event stream through unmodified
    Streaming,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Simple,
        Mode::StepByStep,
        Mode::RealWorld,
        Mode::Problem,
        Mode::Quiz,
        Mode::Notes,
        Mode::Planner,
    ];

    pub fn parse(name: &str) -> Self {
        match name {
            mode::STEP_BY_STEP => Mode::StepByStep,
            mode::REAL_WORLD => Mode::RealWorld,
            mode::PROBLEM => Mode::Problem,
            mode::QUIZ => Mode::Quiz,
            mode::NOTES => Mode::Notes,
            mode::PLANNER => Mode::Planner,
            _ => Mode::Simple,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Simple => mode::SIMPLE,
            Mode::StepByStep => mode::STEP_BY_STEP,
            Mode::RealWorld => mode::REAL_WORLD,
            Mode::Problem => mode::PROBLEM,
            Mode::Quiz => mode::QUIZ,
            Mode::Notes => mode::NOTES,
            Mode::Planner => mode::PLANNER,
        }
    }

    pub fn shape(&self) -> ResponseShape {
        match self {
            Mode::Quiz | Mode::Notes | Mode::Planner => ResponseShape::Buffered,
            Mode::Simple | Mode::StepByStep | Mode::RealWorld | Mode::Problem => {
                ResponseShape::Streaming
            }
        }
    }
}

impl From<Option<String>> for Mode {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(Mode::parse).unwrap_or_default()
    }
}

impl From<Mode> for String {
    fn from(value: Mode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Short,
    Long,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Short => "short",
            QuestionType::Long => "long",
        }
    }

    /// Human-readable label injected into the quiz prompt
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "multiple choice (MCQ) with 4 options",
            QuestionType::Short => "short answer (1-2 sentences)",
            QuestionType::Long => "long answer (detailed explanation required)",
        }
    }
}

/// Inbound request to the study endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
}

impl ChatRequest {
    pub fn new(mode: Mode, messages: Vec<Message>) -> Self {
        Self {
            messages,
            mode,
            ..Default::default()
        }
    }
}

/// One generated practice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
}

impl QuizQuestion {
    /// Letter label shown in front of the option at `index` (A, B, C, ...)
    pub fn option_letter(index: usize) -> Option<char> {
        u8::try_from(index)
            .ok()
            .filter(|i| *i < 26)
            .map(|i| char::from(b'A' + i))
    }

    /// Trimmed, case-insensitive comparison against the expected answer
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim().to_lowercase() == self.correct_answer.trim().to_lowercase()
    }
}

/// Quiz payload returned in quiz mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSet {
    pub questions: Vec<QuizQuestion>,
}

/// Inputs for a generated study plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub exam_date: String,
    pub daily_hours: String,
    pub subjects: Vec<String>,
}

impl PlanRequest {
    /// Render the planner prompt sent as the user turn
    pub fn to_message(&self) -> Message {
        Message::user(format!(
            "Create a study plan. Exam date: {}. Available study hours per day: {}. Subjects: {}.",
            self.exam_date,
            self.daily_hours,
            self.subjects.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_fallback_to_simple() {
        assert_eq!(Mode::parse("quiz"), Mode::Quiz);
        assert_eq!(Mode::parse("step-by-step"), Mode::StepByStep);
        assert_eq!(Mode::parse("haiku"), Mode::Simple);
        assert_eq!(Mode::parse(""), Mode::Simple);
    }

    #[test]
    fn test_mode_shapes() {
        let buffered: Vec<Mode> = Mode::ALL
            .into_iter()
            .filter(|m| m.shape() == ResponseShape::Buffered)
            .collect();
        assert_eq!(buffered, vec![Mode::Quiz, Mode::Notes, Mode::Planner]);
    }

    #[test]
    fn test_deserialize_request_defaults() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"What is a heap?"}]}"#,
        )
        .unwrap();
        assert_eq!(request.mode, Mode::Simple);
        assert_eq!(request.messages, vec![Message::user("What is a heap?")]);
        assert!(request.question_type.is_none());
    }

    #[test]
    fn test_null_mode_is_simple() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages":[],"mode":null}"#).unwrap();
        assert_eq!(request.mode, Mode::Simple);
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages":[],"mode":"no-such-mode"}"#).unwrap();
        assert_eq!(request.mode, Mode::Simple);
    }

    #[test]
    fn test_deserialize_quiz_request() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"messages":[],"mode":"quiz","topic":"Tries","difficulty":"hard","questionType":"short"}"#,
        )
        .unwrap();
        assert_eq!(request.mode, Mode::Quiz);
        assert_eq!(request.difficulty, Some(Difficulty::Hard));
        assert_eq!(request.question_type, Some(QuestionType::Short));
    }

    #[test]
    fn test_quiz_answer_check() {
        let question = QuizQuestion {
            question: "Which structure is LIFO?".to_string(),
            question_type: QuestionType::Mcq,
            options: Some(vec![
                "Queue".to_string(),
                "Stack".to_string(),
                "Heap".to_string(),
                "Trie".to_string(),
            ]),
            correct_answer: "B".to_string(),
            explanation: "Stacks pop the most recent push.".to_string(),
        };
        assert!(question.is_correct(" b "));
        assert!(!question.is_correct("A"));
        assert_eq!(QuizQuestion::option_letter(1), Some('B'));
        assert_eq!(QuizQuestion::option_letter(26), None);
    }

    #[test]
    fn test_plan_message() {
        let plan = PlanRequest {
            exam_date: "2026-12-01".to_string(),
            daily_hours: "3".to_string(),
            subjects: vec!["DBMS".to_string(), "Algorithms".to_string()],
        };
        assert_eq!(
            plan.to_message().content,
            "Create a study plan. Exam date: 2026-12-01. Available study hours per day: 3. Subjects: DBMS, Algorithms."
        );
    }
}
