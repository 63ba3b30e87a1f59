/// Prompt composition
use crate::styles::StylePreset;

/// Lead-in used when the user gave no instruction
pub const DEFAULT_LEAD_IN: &str = "A cinematic archival vintage video clip";

/// Merge the free-text instruction with the style's prompt fragment
pub fn compose_prompt(instruction: Option<&str>, style: &StylePreset) -> String {
    match instruction.map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => format!("{}. {}", text, style.prompt),
        None => format!("{}. {}", DEFAULT_LEAD_IN, style.prompt),
    }
}
