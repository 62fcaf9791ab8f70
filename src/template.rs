//! Local post formatting for direct mode
//!
//! Renders drafts and simulated publishes without a tool server: a style
//! marker, optional hashtags derived from the text, length-capped output,
//! and the `POST TEXT:` summary block the draft cache extracts from.

use crate::protocol::PostStyle;
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Width of the separator lines around the post text block
const SEPARATOR_WIDTH: usize = 40;

/// Capitalized words longer than four characters become hashtag candidates
static HASHTAG_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]{4,}$").unwrap());

/// Marker emoji prepended to the post for each style
fn style_marker(style: PostStyle) -> &'static str {
    match style {
        PostStyle::Professional => "📢",
        PostStyle::Casual => "🚀",
        PostStyle::Witty => "😄",
        PostStyle::Inspirational => "✨",
    }
}

/// Derive up to two hashtags from capitalized words in the input text
fn derive_hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for word in text.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        if !HASHTAG_WORD.is_match(trimmed) {
            continue;
        }
        if tags.iter().any(|t| t[1..].eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        tags.push(format!("#{}", trimmed));
        if tags.len() == 2 {
            break;
        }
    }

    tags
}

/// Cap the post at `max_length` characters, ending with an ellipsis
fn truncate_post(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    if max_length <= 3 {
        return ".".repeat(max_length);
    }

    let kept: String = text.chars().take(max_length - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Compose the styled post body
fn build_post(text: &str, style: PostStyle, include_hashtags: bool, max_length: usize) -> String {
    let mut post = format!("{} {}", style_marker(style), text.trim());

    if include_hashtags {
        let tags = derive_hashtags(text);
        if !tags.is_empty() {
            post.push(' ');
            post.push_str(&tags.join(" "));
        }
    }

    truncate_post(&post, max_length)
}

/// Render a draft summary with the extractable `POST TEXT:` block
pub(crate) fn render_draft(
    text: &str,
    style: PostStyle,
    include_hashtags: bool,
    max_length: usize,
) -> String {
    let post = build_post(text, style, include_hashtags, max_length);
    let separator = "-".repeat(SEPARATOR_WIDTH);
    let hashtag_count = post.chars().filter(|c| *c == '#').count();

    format!(
        "✅ Post draft created ({} style)\n\nPOST TEXT:\n{}\n{}\n{}\n\nLength: {}/{} characters\nHashtags: {}\n",
        style.as_str(),
        separator,
        post,
        separator,
        post.chars().count(),
        max_length,
        hashtag_count,
    )
}

/// Render a simulated publish summary
pub(crate) fn render_publish(post_text: &str) -> String {
    let separator = "-".repeat(SEPARATOR_WIDTH);

    format!(
        "🎉 Post published (simulated)\n\nPOST TEXT:\n{}\n{}\n{}\n\nPublished at: {}\nLength: {} characters\n\nDirect mode is active; nothing was sent to X.\n",
        separator,
        post_text,
        separator,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        post_text.chars().count(),
    )
}
