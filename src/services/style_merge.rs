//! Style Merge Engine
//!
//! Pure merge of a base prompt into a style template. No I/O; identical
//! inputs always yield byte-identical outputs.

use crate::models::style::{StyleTemplate, PROMPT_PLACEHOLDER};

/// The outcome of merging a base prompt with one style template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPrompt {
    pub final_prompt: String,
    pub negative_prompt: String,
    pub style_id: String,
    pub style_name: String,
}

/// Substitute the base prompt into the template's positive prompt.
///
/// Only the FIRST occurrence of the placeholder is replaced, verbatim —
/// no escaping, no trimming. Later occurrences are left untouched. A
/// template without the placeholder merges to its positive text unchanged
/// (validation is the caller's gate, not this function's).
pub fn merge_style(base_prompt: &str, template: &StyleTemplate) -> MergedPrompt {
    MergedPrompt {
        final_prompt: template.positive.replacen(PROMPT_PLACEHOLDER, base_prompt, 1),
        negative_prompt: template.negative.clone(),
        style_id: template.id.clone(),
        style_name: template.name.clone(),
    }
}
