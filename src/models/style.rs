//! Style Template Models
//!
//! Reusable prompt-modifier pairs applied via placeholder substitution.

use serde::{Deserialize, Serialize};

/// The substitution token a positive prompt template must contain.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Id of the implicit base style added when `include_base_style` is set.
pub const BASE_STYLE_ID: &str = "base";

/// A reusable style: positive prompt template plus negative prompt text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleTemplate {
    pub id: String,
    pub name: String,
    /// Positive prompt template; must contain the `{prompt}` placeholder
    pub positive: String,
    /// Negative prompt text, may be empty
    #[serde(default)]
    pub negative: String,
}

impl StyleTemplate {
    /// The implicit base style: the prompt passes through unmodified.
    pub fn base() -> Self {
        Self {
            id: BASE_STYLE_ID.to_string(),
            name: "Base".to_string(),
            positive: PROMPT_PLACEHOLDER.to_string(),
            negative: String::new(),
        }
    }

    /// Reject templates whose positive prompt lacks the placeholder.
    ///
    /// Extra occurrences are allowed; only the first one is substituted at
    /// merge time.
    pub fn validate(&self) -> Result<(), String> {
        if !self.positive.contains(PROMPT_PLACEHOLDER) {
            return Err(format!(
                "style template '{}' is missing the {} placeholder",
                self.id, PROMPT_PLACEHOLDER
            ));
        }
        Ok(())
    }
}
