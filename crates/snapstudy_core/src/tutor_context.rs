//! crates/snapstudy_core/src/tutor_context.rs
//!
//! Builds the context string handed to the tutor alongside a question.

use crate::materials::StudyMaterials;

pub const NO_CONTEXT_AVAILABLE: &str =
    "No context available. Please generate study materials first.";

/// Concatenates the generated artifacts in a fixed order: summary, key points,
/// important terms, concepts explained, flashcards.
///
/// When none of those exist the user's raw text is used instead, and failing
/// that an explicit placeholder.
pub fn assemble_tutor_context(materials: &StudyMaterials, raw_text: Option<&str>) -> String {
    let mut context = String::new();

    if materials.summary.has_content() {
        context.push_str(&format!(
            "Brief Summary: {}\nDetailed Summary: {}\n\n",
            materials.summary.brief, materials.summary.detailed
        ));
    }

    let notes = &materials.short_notes;
    push_numbered(&mut context, "Key Points", &notes.key_points);
    push_numbered(&mut context, "Important Terms", &notes.important_terms);
    push_numbered(&mut context, "Concepts Explained", &notes.concepts_explained);

    if !materials.flashcards.is_empty() {
        context.push_str("Flashcards:\n");
        for (i, card) in materials.flashcards.iter().enumerate() {
            context.push_str(&format!(
                "Q{n}: {}\nA{n}: {}\n",
                card.front,
                card.back,
                n = i + 1
            ));
        }
        context.push('\n');
    }

    if !context.is_empty() {
        return context;
    }

    match raw_text.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_CONTEXT_AVAILABLE.to_string(),
    }
}

fn push_numbered(context: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    context.push_str(&format!("{}:\n", heading));
    for (i, item) in items.iter().enumerate() {
        context.push_str(&format!("{}. {}\n", i + 1, item));
    }
    context.push('\n');
}
