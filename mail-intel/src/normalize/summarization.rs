//! Conservative normalization feeding the summarizer
//!
//! Keeps sentence structure intact but removes mail headers, trailing
//! signatures, links and addresses.

use regex::Regex;
use std::sync::OnceLock;

/// Compiled cleanup patterns
struct Patterns {
    subject: Regex,
    header: Regex,
    signature: Regex,
    url: Regex,
    address: Regex,
    special_chars: Regex,
    whitespace: Regex,
}

impl Patterns {
    fn compile() -> Option<Self> {
        Some(Self {
            subject: Regex::new(r"(?im)subject:[ \t]*(\S.*?)[ \t]*$").ok()?,
            header: Regex::new(r"(?m)^[ \t]*(To|From|Subject|Date|CC|BCC):.*$").ok()?,
            signature: Regex::new(
                r"(?s)\n[ \t]*(?:--[ \t]*\r?(?:\n.*)?$|Best regards.*|Sincerely.*|Thanks.*)",
            )
            .ok()?,
            url: Regex::new(r"http\S+|www\.\S+").ok()?,
            address: Regex::new(r"\S+@\S+").ok()?,
            special_chars: Regex::new(r"[^\w\s.,!?-]").ok()?,
            whitespace: Regex::new(r"\s+").ok()?,
        })
    }
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS.get_or_init(Patterns::compile).as_ref()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Summarization-clean text plus the subject line, when one was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySource {
    pub cleaned: String,
    pub subject: Option<String>,
}

impl SummarySource {
    pub fn word_count(&self) -> usize {
        self.cleaned.split_whitespace().count()
    }
}

/// First `Subject:` line value (case-insensitive), trimmed
pub fn extract_subject(text: &str) -> Option<String> {
    patterns()?
        .subject
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Strip headers, signatures, links and addresses and collapse whitespace
pub fn clean_for_summarization(text: &str) -> String {
    let Some(p) = patterns() else {
        return collapse_whitespace(text);
    };
    let text = p.header.replace_all(text, "");
    let text = p.signature.replace(&text, "");
    let text = p.url.replace_all(&text, "");
    let text = p.address.replace_all(&text, "");
    let text = p.whitespace.replace_all(&text, " ");
    let text = p.special_chars.replace_all(&text, "");
    // Removing characters can leave doubled spaces behind.
    collapse_whitespace(&text)
}

/// Map raw text to its summarization-clean form and extract the subject
pub fn normalize_for_summarization(text: &str) -> SummarySource {
    SummarySource {
        cleaned: clean_for_summarization(text),
        subject: extract_subject(text),
    }
}
