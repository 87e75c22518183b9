//! System prompt registry
//!
//! Maps each [`Mode`] to its system prompt and applies the per-request
//! augmentation: subject, topic and difficulty lines, and for quizzes the
//! question-type line plus the JSON schema example matching that type.

use crate::models::study::{ChatRequest, Difficulty, Mode, QuestionType};
use serde::Serialize;

const SIMPLE: &str = "You are a friendly CS tutor for university students. Explain concepts in simple, easy-to-understand language. Use analogies and avoid jargon. Keep explanations concise but thorough. Format using markdown with headers, bullet points, and code blocks where appropriate.";

const STEP_BY_STEP: &str = "You are a detailed CS tutor. Break down every concept into numbered steps. Show the reasoning process clearly. Include pseudocode or code snippets. Highlight key takeaways. Format using markdown.";

const REAL_WORLD: &str = "You are a practical CS tutor. Explain concepts through real-world examples and applications. Show how theory applies in industry. Include practical code examples. Format using markdown.";

const PROBLEM: &str = "You are a CS problem-solving tutor. When given a problem:
1. Clarify the problem statement
2. Discuss approach and reasoning
3. Show step-by-step solution
4. Highlight common mistakes to avoid
5. Suggest practice variations
Format using markdown with code blocks.";

const QUIZ_INTRO: &str = "You are a quiz generator for CS students. Generate exactly 5 questions based on the topic and difficulty. Return ONLY valid JSON (no markdown, no code fences) with this exact structure:";

const QUIZ_OUTRO: &str = "For MCQs, correct_answer should be the letter (A, B, C, or D). For short/long questions, correct_answer should be the answer text.";

const NOTES: &str = "You are a study notes generator. Convert the given text into clean, well-organized study notes. Include:
- Key concepts highlighted
- Important definitions
- Formulas or algorithms in code blocks
- Summary points
- Mnemonics or memory aids where helpful
Format using markdown with clear headers and bullet points.";

const PLANNER: &str = "You are a study planner AI. Create a detailed daily study plan based on the user's exam date, available hours, and subjects. Include:
- Day-by-day breakdown
- Time allocation per subject
- Mix of learning and revision
- Break suggestions
- Weekly review sessions
- Tips for effective studying
Format as a clean markdown table and schedule.";

/// Placeholder options shown in the MCQ schema example
const MCQ_OPTIONS: [&str; 4] = ["opt1", "opt2", "opt3", "opt4"];

/// One question of the example document embedded in the quiz prompt
///
/// Field order is the order the model sees.
#[derive(Debug, Serialize)]
struct SchemaQuestion {
    question: &'static str,
    #[serde(rename = "type")]
    question_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<[&'static str; 4]>,
    correct_answer: &'static str,
    explanation: &'static str,
}

#[derive(Debug, Serialize)]
struct SchemaExample {
    questions: [SchemaQuestion; 1],
}

impl SchemaExample {
    fn for_type(question_type: QuestionType) -> Self {
        let question = match question_type {
            QuestionType::Mcq => SchemaQuestion {
                question: "...",
                question_type: QuestionType::Mcq.as_str(),
                options: Some(MCQ_OPTIONS),
                correct_answer: "A",
                explanation: "...",
            },
            QuestionType::Short | QuestionType::Long => SchemaQuestion {
                question: "...",
                question_type: question_type.as_str(),
                options: None,
                correct_answer: "the answer text",
                explanation: "...",
            },
        };
        Self {
            questions: [question],
        }
    }

    fn render(&self) -> String {
        // Plain structs of string literals cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Quiz prompt for the given question type (MCQ when unset)
fn quiz_template(question_type: Option<QuestionType>) -> String {
    let schema = SchemaExample::for_type(question_type.unwrap_or(QuestionType::Mcq));
    format!("{QUIZ_INTRO}\n{}\n{QUIZ_OUTRO}", schema.render())
}

/// Base template for a mode before any request-specific lines
pub fn base_template(mode: Mode, question_type: Option<QuestionType>) -> String {
    match mode {
        Mode::Simple => SIMPLE.to_string(),
        Mode::StepByStep => STEP_BY_STEP.to_string(),
        Mode::RealWorld => REAL_WORLD.to_string(),
        Mode::Problem => PROBLEM.to_string(),
        Mode::Quiz => quiz_template(question_type),
        Mode::Notes => NOTES.to_string(),
        Mode::Planner => PLANNER.to_string(),
    }
}

/// Build the system prompt for a mode and its optional context
///
/// Subject, topic and difficulty lines are appended in that order when
/// present. The question type only affects quiz prompts.
pub fn resolve(
    mode: Mode,
    subject: Option<&str>,
    topic: Option<&str>,
    difficulty: Option<Difficulty>,
    question_type: Option<QuestionType>,
) -> String {
    let mut prompt = base_template(mode, question_type);

    if let Some(subject) = subject.filter(|s| !s.is_empty()) {
        prompt.push_str(&format!("\n\nSubject context: {subject}"));
    }
    if let Some(topic) = topic.filter(|t| !t.is_empty()) {
        prompt.push_str(&format!("\nCurrent topic: {topic}"));
    }
    if let Some(difficulty) = difficulty {
        prompt.push_str(&format!("\nDifficulty level: {difficulty}"));
    }
    if mode == Mode::Quiz {
        if let Some(question_type) = question_type {
            prompt.push_str(&format!("\nQuestion type: {}", question_type.label()));
        }
    }

    prompt
}

/// [`resolve`] applied to the fields of an inbound request
pub fn resolve_for(request: &ChatRequest) -> String {
    resolve(
        request.mode,
        request.subject.as_deref(),
        request.topic.as_deref(),
        request.difficulty,
        request.question_type,
    )
}
