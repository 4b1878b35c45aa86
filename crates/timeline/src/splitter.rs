//! Splitting over-long segment text into sub-slides.
//!
//! Text is cut at the sentence or clause punctuation closest to (but not
//! past) the character budget; when the budget window holds no punctuation
//! the cut is made exactly at the budget. The parent duration is shared out
//! in proportion to each fragment's non-whitespace character count, so the
//! fragments always add up to the parent.

use scriptreel_model::SubSlide;

/// Characters after which a slide may break.
pub const BREAK_CHARS: &[char] = &[
    '.', '!', '?', ',', ';', ':', '…', '。', '！', '？', '、', '，', '；', '：',
];

/// Split `text` into fragments of at most `max_chars` characters.
///
/// Returns no fragments for blank text and a single fragment when the text
/// already fits.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![];
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= max_chars {
        return vec![trimmed.to_string()];
    }

    let mut fragments: Vec<String> = Vec::new();
    let mut rest = &chars[..];
    loop {
        while rest.first().is_some_and(|c| c.is_whitespace()) {
            rest = &rest[1..];
        }
        if rest.is_empty() {
            break;
        }
        if rest.len() <= max_chars {
            fragments.push(rest.iter().collect());
            break;
        }

        let cut = rest[..max_chars]
            .iter()
            .rposition(|c| BREAK_CHARS.contains(c))
            .map(|i| i + 1)
            .unwrap_or(max_chars);

        let fragment: String = rest[..cut].iter().collect();
        let fragment = fragment.trim_end();
        if !fragment.is_empty() {
            fragments.push(fragment.to_string());
        }
        rest = &rest[cut..];
    }

    fragments
}

fn weight(fragment: &str) -> usize {
    fragment.chars().filter(|c| !c.is_whitespace()).count()
}

/// Split a segment into timed sub-slides.
///
/// Sub-slide times are absolute: the first starts at `start_seconds` and the
/// last ends at `start_seconds + duration_seconds`.
pub fn split_segment(
    parent_segment_id: u32,
    text: &str,
    start_seconds: f64,
    duration_seconds: f64,
    max_chars: usize,
) -> Vec<SubSlide> {
    let fragments = split_text(text, max_chars);
    let total: usize = fragments.iter().map(|f| weight(f)).sum();
    if total == 0 {
        return vec![];
    }

    let count = fragments.len() as u32;
    let last = fragments.len() - 1;
    let mut consumed = 0usize;
    let mut offset = 0.0f64;

    fragments
        .into_iter()
        .enumerate()
        .map(|(i, fragment)| {
            consumed += weight(&fragment);
            let end_offset = if i == last {
                duration_seconds
            } else {
                duration_seconds * (consumed as f64 / total as f64)
            };
            let sub = SubSlide {
                parent_segment_id,
                order: i as u32,
                count,
                text: fragment,
                start_seconds: start_seconds + offset,
                duration_seconds: end_offset - offset,
                is_continuation: i > 0,
            };
            offset = end_offset;
            sub
        })
        .collect()
}
