//! Cleanup applied to generated summaries

/// Placeholder and end markers some checkpoints leak into decoded text
const MODEL_ARTIFACTS: [&str; 3] = ["<pad>", "</s>", "<unk>"];

/// Summaries with fewer words than this get the subject as context
const MIN_CONTEXT_WORDS: usize = 5;

/// Tidy raw generator output.
///
/// Strips model markers, capitalizes the first letter and terminates the
/// sentence. Short results are prefixed with the subject when there is one.
pub fn post_process(summary: &str, subject: Option<&str>) -> String {
    let mut text = summary.to_string();
    for marker in MODEL_ARTIFACTS {
        text = text.replace(marker, "");
    }
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut text = capitalize_first(&text);
    if !text.is_empty() && !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }

    match subject {
        Some(subject) if text.split_whitespace().count() < MIN_CONTEXT_WORDS => {
            format!("Email about: {subject}. {text}").trim_end().to_string()
        }
        _ => text,
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
