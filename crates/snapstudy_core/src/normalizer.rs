//! crates/snapstudy_core/src/normalizer.rs
//!
//! Turns a model reply of unpredictable shape into a total `StudyMaterials`.
//!
//! Decoding happens in three stages:
//! 1. `Envelope::detect` works out which wrapper the reply arrived in and
//!    reduces it to a `RawPayload`.
//! 2. `decode_payload` turns that payload into JSON, trying the structured
//!    object first, then a fenced string, then a bare string.
//! 3. `normalize_value` rebuilds every section of the record, substituting
//!    defaults for anything missing or of the wrong type.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::materials::{
    Course, Flashcard, Flashcards, QuizQuestion, Resources, ShortNotes, StudyMaterials, Summary,
    VideoResource, MISSING_URL, NO_BRIEF_SUMMARY, NO_DETAILED_SUMMARY, NO_EXPLANATION,
    NO_FLASHCARD_BACK, NO_FLASHCARD_FRONT, NO_QUIZ_QUESTION, TRUE_FALSE_OPTIONS, UNKNOWN_CHANNEL,
    UNKNOWN_DURATION, UNTITLED_COURSE, UNTITLED_VIDEO,
};
use crate::ports::{PortError, PortResult};

/// Upper bound on the characters of offending text kept for diagnostics.
pub const EXCERPT_LIMIT: usize = 200;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+-]*[ \t]*\r?\n?").expect("valid regex"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?[ \t]*```\s*$").expect("valid regex"));

//=========================================================================================
// Stage 1: Envelopes
//=========================================================================================

/// The wrapper shapes a reply has been observed in.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{"response": "<text>"}`
    BareResponse(String),
    /// `{"data": {"response": "<text>"}}`
    NestedResponse(String),
    /// `{"data": {"response": {...}}}`, already parsed.
    NestedObject(Value),
    /// `{"data": {...}}`, already parsed.
    StructuredData(Value),
    /// `{"data": "<text>"}`
    DataText(String),
    /// The payload object itself, `{"studyMaterials": {...}}`.
    Document(Value),
}

/// A reply with its envelope removed: either text still to be parsed, or an
/// object that already is JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Text(String),
    Object(Value),
}

impl Envelope {
    /// Inspects `body` and reports which envelope it is.
    pub fn detect(body: Value) -> PortResult<Self> {
        if let Some(text) = body.get("response").and_then(Value::as_str) {
            return Ok(Envelope::BareResponse(text.to_string()));
        }

        if let Some(data) = body.get("data") {
            match data.get("response") {
                Some(Value::String(text)) => return Ok(Envelope::NestedResponse(text.clone())),
                Some(response @ Value::Object(_)) => {
                    return Ok(Envelope::NestedObject(response.clone()))
                }
                _ => {}
            }
            match data {
                Value::Object(_) => return Ok(Envelope::StructuredData(data.clone())),
                Value::String(text) => return Ok(Envelope::DataText(text.clone())),
                _ => {}
            }
        }

        if body.get("studyMaterials").is_some() {
            return Ok(Envelope::Document(body));
        }

        Err(PortError::MalformedResponse {
            excerpt: excerpt(&body.to_string()),
        })
    }

    pub fn into_payload(self) -> RawPayload {
        match self {
            Envelope::BareResponse(text)
            | Envelope::NestedResponse(text)
            | Envelope::DataText(text) => RawPayload::Text(text),
            Envelope::NestedObject(value)
            | Envelope::StructuredData(value)
            | Envelope::Document(value) => {
                RawPayload::Object(value)
            }
        }
    }
}

//=========================================================================================
// Stage 2: Payload decoding
//=========================================================================================

/// Removes a surrounding markdown code fence, e.g. ```` ```json ... ``` ````.
///
/// Returns `None` when the text carries no fence markers at all.
pub fn strip_code_fence(text: &str) -> Option<String> {
    let opened = OPENING_FENCE.is_match(text);
    let closed = CLOSING_FENCE.is_match(text);
    if !opened && !closed {
        return None;
    }
    let without_open = OPENING_FENCE.replace(text, "");
    let without_close = CLOSING_FENCE.replace(&without_open, "");
    Some(without_close.trim().to_string())
}

pub fn decode_payload(payload: RawPayload) -> PortResult<Value> {
    match payload {
        RawPayload::Object(value) => Ok(value),
        RawPayload::Text(text) => decode_text(&text),
    }
}

fn decode_text(text: &str) -> PortResult<Value> {
    let candidate = match strip_code_fence(text) {
        Some(inner) => {
            debug!("Stripped markdown fence from model reply.");
            inner
        }
        None => text.trim().to_string(),
    };

    match serde_json::from_str::<Value>(&candidate) {
        // Some models double-encode: the JSON document arrives as a JSON string.
        Ok(Value::String(inner)) => serde_json::from_str(inner.trim()).map_err(|_| malformed(text)),
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("Model reply failed to parse as JSON: {}", e);
            Err(malformed(text))
        }
    }
}

fn malformed(text: &str) -> PortError {
    PortError::MalformedResponse {
        excerpt: excerpt(text),
    }
}

/// The first `EXCERPT_LIMIT` characters of `text`, trimmed.
pub fn excerpt(text: &str) -> String {
    text.trim().chars().take(EXCERPT_LIMIT).collect()
}

//=========================================================================================
// Entry points
//=========================================================================================

/// Normalizes a raw model reply (the text the model produced, no envelope).
pub fn normalize_reply(raw: &str) -> PortResult<StudyMaterials> {
    let parsed = decode_payload(RawPayload::Text(raw.to_string()))?;
    normalize_value(&parsed)
}

/// Normalizes an HTTP response body in any of the known envelope shapes.
pub fn normalize_envelope(body: Value) -> PortResult<StudyMaterials> {
    let envelope = Envelope::detect(body)?;
    let parsed = decode_payload(envelope.into_payload())?;
    normalize_value(&parsed)
}

//=========================================================================================
// Stage 3: Total-schema reconstruction
//=========================================================================================

/// Rebuilds a complete record from parsed JSON.
///
/// Only the absence of the top-level `studyMaterials` object is an error;
/// everything below it falls back to defaults.
pub fn normalize_value(parsed: &Value) -> PortResult<StudyMaterials> {
    let root = parsed
        .get("studyMaterials")
        .and_then(Value::as_object)
        .ok_or(PortError::MissingStudyMaterials)?;

    Ok(StudyMaterials {
        short_notes: short_notes(root.get("shortNotes")),
        summary: summary(root.get("summary")),
        flashcards: flashcards(root.get("flashcards")),
        quiz_questions: quiz_questions(root.get("quizQuestions")),
        resources: resources(root.get("resources")),
    })
}

fn short_notes(value: Option<&Value>) -> ShortNotes {
    let Some(notes) = value.and_then(Value::as_object) else {
        return ShortNotes::default();
    };
    ShortNotes {
        key_points: string_list(notes.get("key_points")),
        important_terms: string_list(notes.get("important_terms")),
        concepts_explained: string_list(notes.get("concepts_explained")),
        examples: string_list(notes.get("examples")),
    }
}

fn summary(value: Option<&Value>) -> Summary {
    let Some(summary) = value.and_then(Value::as_object) else {
        return Summary::default();
    };
    Summary {
        brief: text_or(summary, "brief", NO_BRIEF_SUMMARY),
        detailed: text_or(summary, "detailed", NO_DETAILED_SUMMARY),
    }
}

fn flashcards(value: Option<&Value>) -> Flashcards {
    let Some(groups) = value.and_then(Value::as_object) else {
        return Flashcards::default();
    };
    Flashcards {
        basic: flashcard_group(groups.get("basic")),
        advanced: flashcard_group(groups.get("advanced")),
    }
}

fn flashcard_group(value: Option<&Value>) -> Vec<Flashcard> {
    objects(value)
        .map(|card| Flashcard {
            front: text_or(card, "front", NO_FLASHCARD_FRONT),
            back: text_or(card, "back", NO_FLASHCARD_BACK),
        })
        .collect()
}

fn resources(value: Option<&Value>) -> Resources {
    let Some(resources) = value.and_then(Value::as_object) else {
        return Resources::default();
    };

    let recommended_courses = match resources.get("recommendedCourses") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(course) => Some(Course {
                    title: text_or(course, "title", UNTITLED_COURSE),
                    url: text_or(course, "url", MISSING_URL),
                }),
                Value::String(title) if !title.trim().is_empty() => Some(Course {
                    title: title.clone(),
                    url: MISSING_URL.to_string(),
                }),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let youtube_links = objects(resources.get("youtubeLinks"))
        .map(|video| VideoResource {
            title: text_or(video, "title", UNTITLED_VIDEO),
            channel: text_or(video, "channel", UNKNOWN_CHANNEL),
            url: text_or(video, "url", MISSING_URL),
            duration: text_or(video, "duration", UNKNOWN_DURATION),
        })
        .collect();

    Resources {
        recommended_courses,
        youtube_links,
    }
}

//=========================================================================================
// Quiz questions
//=========================================================================================

/// Flattens quiz questions into one ordered list: multiple choice first, then
/// true/false. Also accepts the already-flat canonical list.
fn quiz_questions(value: Option<&Value>) -> Vec<QuizQuestion> {
    match value {
        Some(Value::Object(groups)) => objects(groups.get("multipleChoice"))
            .filter_map(multiple_choice)
            .chain(objects(groups.get("trueFalse")).filter_map(true_false))
            .collect(),
        Some(Value::Array(_)) => objects(value).filter_map(flat_item).collect(),
        _ => Vec::new(),
    }
}

fn flat_item(item: &Map<String, Value>) -> Option<QuizQuestion> {
    if item.contains_key("answerIndex") {
        return indexed(item);
    }
    let is_true_false = match item.get("correctAnswer") {
        Some(Value::Bool(_)) => true,
        Some(answer) => !item.contains_key("options") && truth_value(answer).is_some(),
        None => false,
    };
    if is_true_false {
        true_false(item)
    } else {
        multiple_choice(item)
    }
}

/// The canonical form: `options` is a list and `answerIndex` points into it.
fn indexed(item: &Map<String, Value>) -> Option<QuizQuestion> {
    let options = string_list(item.get("options"));
    let index = item.get("answerIndex").and_then(Value::as_u64)? as usize;
    if index >= options.len() {
        warn!("Dropping quiz item whose answerIndex {} is out of range.", index);
        return None;
    }
    Some(QuizQuestion {
        question: text_or(item, "question", NO_QUIZ_QUESTION),
        options,
        answer_index: index,
        explanation: explanation(item),
    })
}

fn multiple_choice(item: &Map<String, Value>) -> Option<QuizQuestion> {
    let (keys, options) = option_entries(item.get("options"));
    if options.is_empty() {
        warn!("Dropping multiple-choice item without options.");
        return None;
    }
    let Some(answer_index) = item
        .get("correctAnswer")
        .and_then(|answer| resolve_answer(answer, &keys, &options))
    else {
        warn!(
            "Dropping multiple-choice item whose correctAnswer {:?} matches no option.",
            item.get("correctAnswer")
        );
        return None;
    };
    Some(QuizQuestion {
        question: text_or(item, "question", NO_QUIZ_QUESTION),
        options,
        answer_index,
        explanation: explanation(item),
    })
}

fn true_false(item: &Map<String, Value>) -> Option<QuizQuestion> {
    let Some(truth) = item.get("correctAnswer").and_then(truth_value) else {
        warn!("Dropping true/false item without a boolean correctAnswer.");
        return None;
    };
    Some(QuizQuestion {
        question: text_or(item, "question", NO_QUIZ_QUESTION),
        options: TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect(),
        answer_index: if truth { 0 } else { 1 },
        explanation: explanation(item),
    })
}

/// Splits an option map into its keys and labels, keeping the model's order.
/// A plain list gets letter keys `A`, `B`, ... assigned by position.
fn option_entries(value: Option<&Value>) -> (Vec<String>, Vec<String>) {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(key, label)| scalar_text(label).map(|label| (key.clone(), label)))
            .unzip(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .enumerate()
            .map(|(i, label)| (letter_key(i), label))
            .unzip(),
        _ => (Vec::new(), Vec::new()),
    }
}

fn letter_key(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => (index + 1).to_string(),
    }
}

/// Locates the declared answer: exact key, then case-insensitive key, then the
/// option text itself. A bare integer is taken as a position.
fn resolve_answer(answer: &Value, keys: &[String], options: &[String]) -> Option<usize> {
    if let Some(position) = answer.as_u64() {
        let position = position as usize;
        return (position < options.len()).then_some(position);
    }
    let wanted = answer.as_str()?.trim();
    keys.iter()
        .position(|key| key == wanted)
        .or_else(|| keys.iter().position(|key| key.eq_ignore_ascii_case(wanted)))
        .or_else(|| {
            options
                .iter()
                .position(|label| label.trim().eq_ignore_ascii_case(wanted))
        })
}

fn truth_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(truth) => Some(*truth),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn explanation(item: &Map<String, Value>) -> String {
    ["answerExplanation", "explanation"]
        .iter()
        .find_map(|key| non_blank(item.get(*key)))
        .unwrap_or_else(|| NO_EXPLANATION.to_string())
}

//=========================================================================================
// Value helpers
//=========================================================================================

/// Iterates the object entries of an array, skipping anything else.
fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// Strings and other scalars from an array. Blank strings, nulls and nested
/// structures are dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(scalar_text)
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value.and_then(scalar_text)
}

fn text_or(object: &Map<String, Value>, key: &str, placeholder: &str) -> String {
    non_blank(object.get(key)).unwrap_or_else(|| placeholder.to_string())
}
