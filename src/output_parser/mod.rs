//! # Reply Parser
//!
//! Turns a free-form LLM reply into one of three outcomes:
//!
//! | Reply | Outcome |
//! |-------|---------|
//! | exactly `NO` (any case, surrounding whitespace) | [`ReplyOutcome::NoChange`] |
//! | contains a fenced block | [`ReplyOutcome::Content`] |
//! | anything else | [`ReplyOutcome::Unparseable`] |
//!
//! The `NO` check happens before any extraction is attempted. Neither
//! `NoChange` nor `Unparseable` is an error: both leave the component alone.

pub mod extract;

pub use extract::{
    detect_language, extract_block, extract_content, fence_tag, preprocess, strip_think_tags,
    FenceRule, FencedBlock,
};

use crate::language::Language;

/// Token a model replies with when a component needs no change.
pub const NO_CHANGE_TOKEN: &str = "NO";

/// Content extracted from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub content: String,
    pub language: Language,
    pub rule: FenceRule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The model signalled that nothing needs to change.
    NoChange,
    /// A complete replacement was found.
    Content(Extracted),
    /// Neither `NO` nor a fenced block.
    Unparseable,
}

/// Whether `raw` is the explicit no-change signal.
pub fn is_no_change(raw: &str) -> bool {
    preprocess(raw).eq_ignore_ascii_case(NO_CHANGE_TOKEN)
}

/// Classify a reply. Extraction only runs when the reply is not `NO`.
pub fn parse_reply(raw: &str) -> ReplyOutcome {
    if is_no_change(raw) {
        return ReplyOutcome::NoChange;
    }
    let cleaned = strip_think_tags(raw);
    match extract_block(&cleaned) {
        Some(block) => ReplyOutcome::Content(Extracted {
            content: block.content.to_string(),
            language: block.language(),
            rule: block.rule,
        }),
        None => ReplyOutcome::Unparseable,
    }
}
