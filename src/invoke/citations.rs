//! Citation rewriting for retrieval answers.
//!
//! Assistant answers cite retrieved passages with opaque placeholder text
//! (for example `【4:0†source】`) plus span offsets. We replace each span
//! with a bracketed index into the annotation list and append a
//! bibliography that maps those indices to filenames.

use std::ops::Range;

use tracing::warn;

use crate::backend::types::Annotation;

/// Replace every annotation span in `value` with `[i]`, where `i` is the
/// annotation's position in the list.
///
/// All spans are located against the original text before anything is
/// mutated, then applied right to left. Two annotations with identical
/// placeholder text therefore cannot clobber each other's markers.
pub fn apply_markers(value: &str, annotations: &[Annotation]) -> String {
    let mut located: Vec<(usize, Range<usize>)> = Vec::new();
    for (ordinal, annotation) in annotations.iter().enumerate() {
        match locate_span(value, annotation) {
            Some(range) => located.push((ordinal, range)),
            None => {
                warn!(placeholder = %annotation.text, "annotation span not found in answer text");
            }
        }
    }
    located.sort_by(|a, b| b.1.start.cmp(&a.1.start));

    let mut rewritten = value.to_string();
    for (ordinal, range) in located {
        rewritten.replace_range(range, &format!("[{ordinal}]"));
    }
    rewritten
}

/// Join the rewritten answer and its bibliography with a blank line.
/// An answer without citations is returned untouched.
pub fn assemble_answer(rewritten: String, citations: &[String]) -> String {
    if citations.is_empty() {
        rewritten
    } else {
        format!("{}\n\n{}", rewritten, citations.join("\n"))
    }
}

/// Find the byte range an annotation covers in `value`.
///
/// The API reports offsets in code points, which only coincide with byte
/// offsets for pure-ASCII prefixes. Try bytes first, then code points,
/// then fall back to the first occurrence of the placeholder text.
fn locate_span(value: &str, annotation: &Annotation) -> Option<Range<usize>> {
    if let Some(span) = value.get(annotation.start_index..annotation.end_index) {
        if span == annotation.text {
            return Some(annotation.start_index..annotation.end_index);
        }
    }

    if let (Some(start), Some(end)) = (
        char_to_byte(value, annotation.start_index),
        char_to_byte(value, annotation.end_index),
    ) {
        if value.get(start..end) == Some(annotation.text.as_str()) {
            return Some(start..end);
        }
    }

    value
        .find(annotation.text.as_str())
        .map(|pos| pos..pos + annotation.text.len())
}

/// Byte offset of the `char_idx`-th code point, or `value.len()` for the
/// one-past-end position.
fn char_to_byte(value: &str, char_idx: usize) -> Option<usize> {
    value
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(value.len()))
        .nth(char_idx)
}
