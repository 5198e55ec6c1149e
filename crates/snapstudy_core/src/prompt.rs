//! crates/snapstudy_core/src/prompt.rs
//!
//! The prompt orchestrator: wraps extracted text and tutor questions in their
//! fixed instruction sets and invokes the model exactly once per call.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::domain::ExtractedText;
use crate::ports::{LanguageModelService, ModelPurpose, ModelRequest, PortError, PortResult};

pub const STUDY_MATERIALS_INSTRUCTIONS: &str = r#"You are an AI assistant integrated into the SnapStudy platform. Your task is to analyze educational content provided by the user and return structured learning resources as a single, valid, raw JSON object.

The content may be text the user typed or pasted, text extracted from an uploaded PDF, Word or text file, or the contents of a web page.

Output rules:
- Respond with ONLY the raw JSON object. No Markdown, no code fences, no commentary before or after it.
- Every field in the structure below must be present. Use empty arrays or empty strings when there is no data.

Minimum requirements:
- Flashcards: at least 5 in total, split between "basic" and "advanced".
- Quiz questions: at least 5 in total, across "multipleChoice" and "trueFalse".
- Every quiz question includes an "answerExplanation" briefly explaining the correct answer.
- Resources: 2-3 "recommendedCourses" (Coursera, edX, Udemy, etc.) and 2-3 "youtubeLinks".
- Every YouTube link includes "title", "url", "channel" (e.g. "CrashCourse") and "duration" (e.g. "12:45").

JSON structure to output:
{
  "studyMaterials": {
    "shortNotes": {
      "key_points": ["Point 1", "Point 2"],
      "important_terms": ["Term 1 - Definition", "Term 2 - Definition"],
      "concepts_explained": ["Concept - Explanation"],
      "examples": ["Example 1"]
    },
    "summary": {
      "brief": "1-2 sentence summary of the topic",
      "detailed": "Comprehensive summary including core ideas and examples"
    },
    "flashcards": {
      "basic": [{"front": "What is ...?", "back": "Definition/Answer"}],
      "advanced": [{"front": "Explain/Compare/Why ...", "back": "Detailed explanation"}]
    },
    "quizQuestions": {
      "multipleChoice": [
        {
          "question": "Which of the following is ...?",
          "options": {"A": "Option A", "B": "Option B", "C": "Option C", "D": "Option D"},
          "correctAnswer": "A",
          "answerExplanation": "Why option A is correct and the others are not."
        }
      ],
      "trueFalse": [
        {
          "question": "Statement for validation.",
          "correctAnswer": true,
          "answerExplanation": "Why the statement is true or false."
        }
      ]
    },
    "resources": {
      "recommendedCourses": [{"title": "Course Name", "url": "https://..."}],
      "youtubeLinks": [
        {"title": "Video Title", "url": "https://...", "channel": "Channel Name", "duration": "12:45"}
      ]
    }
  }
}"#;

pub const TUTOR_INSTRUCTIONS: &str = "You are a patient AI tutor helping a student understand study materials they generated. Answer using the provided context first and your general knowledge second.";

const TUTOR_INPUT_TEMPLATE: &str = r#"Context:
{context}

Question:
{question}

Instructions:
- Provide a clear and concise answer based on the context
- Include relevant details from the provided content
- Stay focused on the specific question"#;

/// Renders the tutor prompt for one question.
pub fn render_tutor_input(question: &str, context: &str) -> String {
    TUTOR_INPUT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

//=========================================================================================
// The Orchestrator
//=========================================================================================

/// Owns the model port and the two fixed instruction contracts.
#[derive(Clone)]
pub struct PromptOrchestrator {
    model: Arc<dyn LanguageModelService>,
}

impl PromptOrchestrator {
    pub fn new(model: Arc<dyn LanguageModelService>) -> Self {
        Self { model }
    }

    /// Asks the model for study materials covering `extracted`.
    ///
    /// Returns the model's raw reply untouched; turning it into a record is the
    /// normalizer's job.
    pub async fn generate_materials(&self, extracted: &ExtractedText) -> PortResult<String> {
        let request = ModelRequest {
            purpose: ModelPurpose::Generation,
            instructions: STUDY_MATERIALS_INSTRUCTIONS.to_string(),
            input: extracted.text.clone(),
        };
        info!(
            source = ?extracted.source_kind,
            origin = extracted.origin.as_deref().unwrap_or("-"),
            chars = extracted.text.chars().count(),
            "Requesting study materials from the model."
        );
        self.invoke(&request).await
    }

    /// Asks the tutor a question against an already assembled context string.
    pub async fn answer_question(&self, question: &str, context: &str) -> PortResult<String> {
        let request = ModelRequest {
            purpose: ModelPurpose::Tutor,
            instructions: TUTOR_INSTRUCTIONS.to_string(),
            input: render_tutor_input(question, context),
        };
        self.invoke(&request).await
    }

    async fn invoke(&self, request: &ModelRequest) -> PortResult<String> {
        debug!("Model input:\n{}", request.input);
        let started = Instant::now();
        let reply = self.model.complete(request).await?;
        info!("⏱️ {:?} model call took: {:?}", request.purpose, started.elapsed());
        debug!("Raw model reply:\n{}", reply);

        if reply.trim().is_empty() {
            return Err(PortError::EmptyModelResponse);
        }
        Ok(reply)
    }
}
