//! Fenced-block extraction for LLM replies.
//!
//! This is the load-bearing module: every generated or corrected file passes
//! through [`extract_block`] before it is written to disk.
//!
//! Extraction is an ordered list of [`FenceRule`]s. Each rule is tried against
//! every fence in the reply, left to right, before the next rule gets a turn;
//! the first match wins.

use crate::language::Language;

const FENCE: &str = "```";

/// Full preprocessing pipeline applied to every LLM response.
///
/// Strips `<think>` and `<thinking>` blocks, then trims whitespace.
pub fn preprocess(text: &str) -> String {
    let stripped = strip_think_tags(text);
    stripped.trim().to_string()
}

/// Strip all `<think>...</think>` and `<thinking>...</thinking>` blocks from text.
///
/// Handles complete blocks, incomplete blocks (no closing tag),
/// and multiple sequential blocks.
///
/// # Examples
///
/// ```
/// use solution_craft::output_parser::strip_think_tags;
///
/// assert_eq!(strip_think_tags("<think>reasoning</think>result"), "result");
/// assert_eq!(strip_think_tags("<think>no closing tag"), "");
/// assert_eq!(strip_think_tags("<thinking>also works</thinking>done"), "done");
/// ```
pub fn strip_think_tags(text: &str) -> String {
    let result = strip_tag_variant(text, "<think>", "</think>");
    strip_tag_variant(&result, "<thinking>", "</thinking>")
}

fn strip_tag_variant(text: &str, open: &str, close: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find(open) {
        if let Some(end_offset) = result[start..].find(close) {
            let end = start + end_offset + close.len();
            result = format!("{}{}", &result[..start], &result[end..]);
        } else {
            // No closing tag: drop everything from the open tag on
            result.truncate(start);
            break;
        }
    }
    result
}

/// A block located by a [`FenceRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    /// Language tag on the opening fence (or on a nested fence when the
    /// outer one had none).
    pub tag: Option<&'a str>,
    /// Block content, trimmed at both ends, internal indentation untouched.
    pub content: &'a str,
    /// The rule that matched.
    pub rule: FenceRule,
}

impl FencedBlock<'_> {
    pub fn language(&self) -> Language {
        self.tag.map(Language::from_tag).unwrap_or(Language::Unknown)
    }
}

/// One way of recognising a fenced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceRule {
    /// `` ```tag\n`` content `` \n``` ``: newline after the opening fence
    /// and before the closing fence are both mandatory.
    Strict,
    /// `` ```tag `` content `` ``` ``: newlines optional on both sides.
    Lenient,
}

/// Rules in the order they are attempted.
pub const RULES: [FenceRule; 2] = [FenceRule::Strict, FenceRule::Lenient];

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '#')
}

/// Split the text right after an opening fence into `(tag, rest)`.
///
/// A run of tag characters only counts as a tag when whitespace (or the end
/// of the text) follows it; otherwise it is the first token of the content.
fn split_tag(after_fence: &str) -> (Option<&str>, &str) {
    let end = after_fence
        .char_indices()
        .find(|(_, c)| !is_tag_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(after_fence.len());
    if end == 0 {
        return (None, after_fence);
    }
    let rest = &after_fence[end..];
    match rest.chars().next() {
        None => (Some(&after_fence[..end]), rest),
        Some(c) if c.is_whitespace() => (Some(&after_fence[..end]), rest),
        Some(_) => (None, after_fence),
    }
}

impl FenceRule {
    /// Try this rule against the fence starting at byte offset `at`.
    fn match_at(self, text: &str, at: usize) -> Option<FencedBlock<'_>> {
        let after_fence = &text[at + FENCE.len()..];
        let (tag, rest) = split_tag(after_fence);
        let raw = match self {
            FenceRule::Strict => {
                let rest = rest.trim_start_matches(&[' ', '\t', '\r'][..]);
                let body = rest.strip_prefix('\n')?;
                let close = body.find("\n```")?;
                &body[..close]
            }
            FenceRule::Lenient => {
                let close = rest.find(FENCE)?;
                &rest[..close]
            }
        };
        let (nested_tag, content) = strip_nested_fence(raw.trim());
        if content.is_empty() {
            return None;
        }
        Some(FencedBlock {
            tag: tag.or(nested_tag),
            content,
            rule: self,
        })
    }
}

/// Drop a second opening fence sitting on the first line of captured content.
fn strip_nested_fence(content: &str) -> (Option<&str>, &str) {
    let Some(after) = content.strip_prefix(FENCE) else {
        return (None, content);
    };
    let (line, rest) = after.split_once('\n').unwrap_or((after, ""));
    let tag = line.trim();
    let tag = (!tag.is_empty() && tag.chars().all(is_tag_char)).then_some(tag);
    (tag, rest.trim())
}

/// Locate the first fenced block in `text`, trying each rule in [`RULES`]
/// order across the whole text before falling back to the next.
///
/// Returns `None` when no rule matches; this never panics on arbitrary input.
///
/// # Examples
///
/// ```
/// use solution_craft::output_parser::extract::{extract_block, FenceRule};
///
/// let block = extract_block("Fixed:\n```python\ndef add(a, b):\n    return a + b\n```").unwrap();
/// assert_eq!(block.tag, Some("python"));
/// assert_eq!(block.content, "def add(a, b):\n    return a + b");
/// assert_eq!(block.rule, FenceRule::Strict);
/// ```
pub fn extract_block(text: &str) -> Option<FencedBlock<'_>> {
    RULES.iter().find_map(|rule| {
        fence_positions(text).find_map(|at| rule.match_at(text, at))
    })
}

fn fence_positions(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.match_indices('`')
        .map(|(i, _)| i)
        .filter(move |&i| text[i..].starts_with(FENCE))
}

/// Extract the content of the first fenced block, after stripping think blocks.
pub fn extract_content(raw: &str) -> Option<String> {
    let cleaned = strip_think_tags(raw);
    extract_block(&cleaned).map(|b| b.content.to_string())
}

/// Language declared on the first fenced block's opening fence.
///
/// Unrecognised tags, untagged fences and replies without a fence all map to
/// [`Language::Unknown`].
pub fn detect_language(raw: &str) -> Language {
    let cleaned = strip_think_tags(raw);
    extract_block(&cleaned)
        .map(|b| b.language())
        .unwrap_or(Language::Unknown)
}

/// Lower-cased tag of the first fenced block, if it has one.
pub fn fence_tag(raw: &str) -> Option<String> {
    let cleaned = strip_think_tags(raw);
    extract_block(&cleaned).and_then(|b| b.tag.map(str::to_ascii_lowercase))
}
