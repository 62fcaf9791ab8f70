//! Draft extraction from create-post output
//!
//! Tool responses that carry a re-usable draft embed it as a `POST TEXT:`
//! line followed by the text between two dashed separator lines. Anything
//! not matching that exact shape simply yields no draft; it is never an
//! error.

use once_cell::sync::Lazy;
use regex::Regex;

/// The `POST TEXT:` block: header line, dashed line, content, dashed line
static POST_TEXT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)POST TEXT:\s*\n-+\n(.+?)\n-+\n").unwrap());

/// Extract the post text block from a create-post result.
///
/// Returns the trimmed inner content, or `None` when the output does not
/// contain a well-formed block.
pub fn extract_post_text(output: &str) -> Option<String> {
    POST_TEXT_BLOCK
        .captures(output)
        .map(|caps| caps[1].trim().to_string())
}
