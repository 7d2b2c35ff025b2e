//! Locating the structured-data substring inside raw completion text.
//!
//! Models wrap their payloads in chatter: apologies, markdown fences,
//! explanations after the data, and sometimes several blocks separated by
//! delimiter lines. Extraction narrows the raw text to the single most
//! likely candidate before any parsing is attempted.

use salvage_core::{Candidate, Provenance, TargetShape};

/// Find the best structured candidate in `raw` for the given target shape.
///
/// Strategy, in priority order:
///
/// 1. The content of the first fenced code block, with any language tag on
///    the opening fence skipped.
/// 2. If delimiter lines (`---`, `###`, `===`) split the text into multiple
///    blocks, only the first block is considered further.
/// 3. For an object target, a string-aware balanced `{…}` span; for an array
///    target, a balanced `[…]` span containing an object, else a lone object.
/// 4. The whole (first-block) text, trimmed, when it plausibly starts a
///    structure but never balances.
///
/// Returns `None` only when the text contains no brace or bracket at all.
pub fn extract(raw: &str, shape: TargetShape) -> Option<Candidate> {
    if let Some(inner) = fenced_block(raw) {
        // A fence is decisive even when its content needs repair.
        return Some(Candidate::new(inner, Provenance::CodeFence));
    }

    let block = first_delimited_block(raw);

    let span = match shape {
        TargetShape::Object => balanced_span(block, '{', '}'),
        TargetShape::Array => balanced_span(block, '[', ']')
            .filter(|s| s.contains('{'))
            .or_else(|| balanced_span(block, '{', '}')),
    };
    if let Some(span) = span {
        return Some(Candidate::new(span, Provenance::BraceScan));
    }

    let trimmed = block.trim();
    if trimmed.contains('{') || trimmed.contains('[') {
        return Some(Candidate::new(trimmed, Provenance::WholeText));
    }
    None
}

/// Content of the first triple-backtick fence, if any.
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_open = &raw[open + 3..];
    let close = after_open.find("```")?;
    let mut inner = &after_open[..close];
    // Skip a language tag such as ```json on the opening line.
    if let Some(newline) = inner.find('\n') {
        let first_line = inner[..newline].trim();
        if !first_line.is_empty() && first_line.chars().all(|c| c.is_ascii_alphanumeric()) {
            inner = &inner[newline + 1..];
        }
    }
    Some(inner.trim())
}

/// Whether a line is a standalone block delimiter (`---`, `###`, `===`).
fn is_delimiter_line(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3
        && (line.chars().all(|c| c == '-')
            || line.chars().all(|c| c == '#')
            || line.chars().all(|c| c == '='))
}

/// The text up to the first delimiter line, or all of it.
fn first_delimited_block(raw: &str) -> &str {
    let mut offset = 0;
    for line in raw.lines() {
        if is_delimiter_line(line) && offset > 0 {
            return &raw[..offset];
        }
        // lines() strips the newline, so track offsets manually.
        offset += line.len();
        if raw[offset..].starts_with("\r\n") {
            offset += 2;
        } else if raw[offset..].starts_with('\n') {
            offset += 1;
        }
    }
    raw
}

/// The first balanced `open…close` span, counting depth outside strings.
///
/// Both quote styles the repair dialect accepts are treated as string
/// delimiters, so a brace inside a single-quoted value does not end the span.
fn balanced_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
