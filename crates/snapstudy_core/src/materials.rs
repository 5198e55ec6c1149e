//! crates/snapstudy_core/src/materials.rs
//!
//! The canonical "study materials" record produced by the normalizer.
//!
//! Every field is mandatory. Anything the model leaves out is replaced with an
//! empty collection or one of the placeholder strings below at the
//! normalization boundary, so code downstream never checks for absence.

use serde::{Deserialize, Serialize};

pub const NO_BRIEF_SUMMARY: &str = "No brief summary available";
pub const NO_DETAILED_SUMMARY: &str = "No detailed summary available";
pub const NO_FLASHCARD_FRONT: &str = "No question available";
pub const NO_FLASHCARD_BACK: &str = "No answer available";
pub const NO_QUIZ_QUESTION: &str = "No question available";
pub const NO_EXPLANATION: &str = "No explanation provided";
pub const UNTITLED_COURSE: &str = "Untitled Course";
pub const UNTITLED_VIDEO: &str = "Untitled Video";
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";
pub const UNKNOWN_DURATION: &str = "Unknown Duration";
pub const MISSING_URL: &str = "#";

/// Option labels used for every true/false quiz item.
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterials {
    pub short_notes: ShortNotes,
    pub summary: Summary,
    pub flashcards: Flashcards,
    pub quiz_questions: Vec<QuizQuestion>,
    pub resources: Resources,
}

/// Short-form notes. Field names match the keys the model is told to emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortNotes {
    pub key_points: Vec<String>,
    pub important_terms: Vec<String>,
    pub concepts_explained: Vec<String>,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub brief: String,
    pub detailed: String,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            brief: NO_BRIEF_SUMMARY.to_string(),
            detailed: NO_DETAILED_SUMMARY.to_string(),
        }
    }
}

impl Summary {
    /// True when at least one of the two summaries came from the model.
    pub fn has_content(&self) -> bool {
        self.brief != NO_BRIEF_SUMMARY || self.detailed != NO_DETAILED_SUMMARY
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcards {
    pub basic: Vec<Flashcard>,
    pub advanced: Vec<Flashcard>,
}

impl Flashcards {
    /// Basic cards first, then advanced, in model order.
    pub fn iter(&self) -> impl Iterator<Item = &Flashcard> {
        self.basic.iter().chain(self.advanced.iter())
    }

    pub fn len(&self) -> usize {
        self.basic.len() + self.advanced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// One quiz item. `answer_index` always points into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub recommended_courses: Vec<Course>,
    pub youtube_links: Vec<VideoResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResource {
    pub title: String,
    pub channel: String,
    pub url: String,
    pub duration: String,
}

/// The top-level object the model is asked to produce: `{"studyMaterials": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterialsDocument {
    pub study_materials: StudyMaterials,
}

impl StudyMaterials {
    /// True when nothing at all was generated for this record.
    pub fn is_empty(&self) -> bool {
        *self == StudyMaterials::default()
    }

    /// Wraps the record in its top-level key, the same shape the model emits.
    pub fn into_document(self) -> StudyMaterialsDocument {
        StudyMaterialsDocument {
            study_materials: self,
        }
    }
}
