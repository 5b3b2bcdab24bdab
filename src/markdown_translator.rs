use crate::chat_translator::Translate;
use crate::errors::ProviderError;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

// 只包含内嵌图片（data URI 或 attachment）的单元格
static IMAGE_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:!\[[^\]]*\]\((?:data:image/[^)]+|attachment:[^)]+)\)\s*)+$")
        .expect("valid regex")
});

pub fn is_image_only(text: &str) -> bool {
    IMAGE_ONLY.is_match(text.trim())
}

/// Translates a whole markdown cell as one unit.
///
/// Blank and image-only cells are returned unchanged without calling the
/// provider. A trailing newline on the input is kept on the output.
pub fn translate_markdown(
    text: &str,
    translator: &dyn Translate,
    target_lang: &str,
) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        return Ok(text.to_string());
    }
    if is_image_only(text) {
        debug!("image-only markdown cell, passing through");
        return Ok(text.to_string());
    }

    let mut translated = translator.translate(text, target_lang)?;
    if text.ends_with('\n') && !translated.ends_with('\n') {
        translated.push('\n');
    }
    Ok(translated)
}
