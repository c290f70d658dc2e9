//! Response sanitizer: isolate the JSON payload inside raw model text.
//!
//! Models wrap JSON in code fences, prose, or both. This module never fails;
//! when nothing parses it hands back the fence-stripped text and lets the
//! caller report the parse error.

use std::sync::LazyLock;

use regex::Regex;

/// Reasoning blocks some local models emit before the answer.
static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

/// Greedy outermost-span fallback, tried after the balanced scan.
static JSON_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\s\S]*\]|\{[\s\S]*\}").expect("valid regex"));

/// Return the most likely JSON substring of `raw`.
///
/// Order of attempts:
/// 1. Strip `<think>` blocks and a leading or trailing markdown fence.
/// 2. Balanced scan from each `[` or `{` in text order; the first span
///    that parses wins. Falls back to the unstripped text when the fenced
///    body holds no JSON.
/// 3. Greedy regex span, if it parses.
/// 4. The stripped text itself.
pub fn sanitize_json_response(raw: &str) -> String {
    let without_reasoning = THINK_BLOCK.replace_all(raw, "");
    let unfenced = without_reasoning.trim();
    let text = strip_code_fences(unfenced);

    let candidates = if text.len() == unfenced.len() {
        vec![text]
    } else {
        vec![text, unfenced]
    };

    for candidate in &candidates {
        if let Some(span) = first_parsable_span(candidate) {
            return span.to_string();
        }
    }

    for candidate in &candidates {
        for found in JSON_SPAN.find_iter(candidate) {
            if is_json(found.as_str()) {
                tracing::debug!("JSON isolated by regex fallback");
                return found.as_str().to_string();
            }
        }
    }

    tracing::debug!(len = text.len(), "No JSON span found in model response");
    text.to_string()
}

/// Remove a fence opening the text (with its info string) or closing it.
/// Fences in the middle of prose are left alone.
fn strip_code_fences(trimmed: &str) -> &str {
    if let Some(after_fence) = trimmed.strip_prefix("```") {
        // Skip the info string ("json", "JSON", ...) up to the end of the line.
        let body_start = after_fence
            .find(|c: char| c == '\n' || c == '[' || c == '{')
            .unwrap_or(after_fence.len());
        let body = &after_fence[body_start..];
        return match body.find("```") {
            Some(end) => body[..end].trim(),
            None => body.trim(),
        };
    }

    match trimmed.strip_suffix("```") {
        Some(body) => body.trim(),
        None => trimmed,
    }
}

/// First balanced `[...]` or `{...}` span, in text order, that parses.
fn first_parsable_span(text: &str) -> Option<&str> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '[' || *ch == '{')
        .filter_map(|(start, _)| balanced_span(text, start))
        .find(|span| is_json(span))
}

/// Span from `start` to its matching closer, skipping brackets inside strings.
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_json(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}
