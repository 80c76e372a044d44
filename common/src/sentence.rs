//! The sentence/word model from spec §4.2 and the GLOSSARY: a file is a
//! byte sequence decomposed into sentences by scanning left-to-right and
//! terminating each sentence inclusive of the first `.`, `!`, or `?`;
//! leading whitespace is dropped between sentences; a tail with no
//! terminator is the incomplete final sentence.
//!
//! This is pure, allocation-light logic with no I/O, shared so it can be
//! exercised directly by unit tests without a running SS.

use crate::error::DocsError;

/// Split `text` into sentences. The last entry may be an *incomplete*
/// sentence (no terminating `.`/`!`/`?`); an empty `text` yields an empty
/// vector.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if current.is_empty() && c.is_whitespace() {
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

fn is_complete(sentence: &str) -> bool {
    matches!(sentence.chars().last(), Some('.') | Some('!') | Some('?'))
}

/// `(sentence_count, tail_is_complete)` for committed content. An empty file
/// is `(0, true)`.
pub fn sentences_state(text: &str) -> (usize, bool) {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return (0, true);
    }
    let complete = is_complete(sentences.last().unwrap());
    (sentences.len(), complete)
}

/// The highest sentence index `WRITE_BEGIN` may target, per spec §4.2 step 1.
pub fn max_write_begin_index(text: &str) -> usize {
    let (count, complete) = sentences_state(text);
    if complete { count } else { count.saturating_sub(1) }
}

/// Extend `sentences` with empty slots so index `sidx` exists.
pub fn ensure_index(sentences: &mut Vec<String>, sidx: usize) {
    while sentences.len() <= sidx {
        sentences.push(String::new());
    }
}

/// Apply one `WRITE_UPDATE` to the in-memory sentence list: insert `content`
/// as a word at `widx` within sentence `sidx`, preserving single-space
/// separation. Mutates `sentences` in place.
pub fn apply_word_update(
    sentences: &mut [String],
    sidx: usize,
    widx: i64,
    content: &str,
) -> Result<(), DocsError> {
    if widx < 0 {
        return Err(DocsError::WordIndexNegative);
    }
    let words: Vec<&str> = sentences[sidx].split_whitespace().collect();
    let word_count = words.len();
    let widx = widx as usize;
    if widx > word_count + 1 {
        return Err(DocsError::WordOutOfRange { max: word_count + 1 });
    }
    let insert_pos = widx.min(word_count);

    let mut new_words: Vec<&str> = Vec::with_capacity(words.len() + 1);
    new_words.extend_from_slice(&words[..insert_pos]);
    new_words.push(content);
    new_words.extend_from_slice(&words[insert_pos..]);

    sentences[sidx] = new_words.join(" ");
    Ok(())
}

/// Rebuild file bytes from a sentence list: concatenate non-empty
/// sentences, inserting a single space between adjacent sentences when
/// needed (sentences never start with whitespace after `split_sentences`,
/// so a space is inserted unless the previous sentence already ends in
/// whitespace).
pub fn rebuild(sentences: &[String]) -> String {
    let mut out = String::new();
    for s in sentences {
        if s.is_empty() {
            continue;
        }
        if !out.is_empty() {
            let prev_ends_ws = out.ends_with(|c: char| c.is_whitespace());
            if !prev_ends_ws {
                out.push(' ');
            }
        }
        out.push_str(s);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_basic_sentences() {
        let s = split_sentences("Hello world. How are you? Fine!");
        assert_eq!(s, vec!["Hello world.", "How are you?", "Fine!"]);
    }

    #[test]
    fn trims_leading_whitespace_between_sentences() {
        let s = split_sentences("Hello.   World.");
        assert_eq!(s, vec!["Hello.", "World."]);
    }

    #[test]
    fn detects_incomplete_tail() {
        let s = split_sentences("Hello. incomplete tail");
        assert_eq!(s, vec!["Hello.", "incomplete tail"]);
        assert_eq!(sentences_state("Hello. incomplete tail"), (2, false));
    }

    #[test]
    fn empty_file_is_complete_with_zero_sentences() {
        assert_eq!(sentences_state(""), (0, true));
        assert_eq!(max_write_begin_index(""), 0);
    }

    #[test]
    fn max_write_begin_index_allows_append_slot_when_complete() {
        assert_eq!(max_write_begin_index("Hello. World."), 2);
    }

    #[test]
    fn max_write_begin_index_caps_at_incomplete_tail() {
        assert_eq!(max_write_begin_index("Hello. tail"), 1);
    }

    #[test]
    fn word_update_inserts_and_preserves_spacing() {
        let mut sentences = vec!["Hello world.".to_string()];
        apply_word_update(&mut sentences, 0, 1, "brave").unwrap();
        assert_eq!(sentences[0], "Hello brave world.");
    }

    #[test]
    fn word_update_append_at_word_count_plus_one() {
        let mut sentences = vec!["Hello world.".to_string()];
        let word_count = 2;
        apply_word_update(&mut sentences, 0, (word_count + 1) as i64, "!!!").unwrap();
        assert_eq!(sentences[0], "Hello world. !!!");
    }

    #[test]
    fn word_update_rejects_out_of_range() {
        let mut sentences = vec!["Hello world.".to_string()];
        let err = apply_word_update(&mut sentences, 0, 4, "x").unwrap_err();
        assert_eq!(err, DocsError::WordOutOfRange { max: 3 });
    }

    #[test]
    fn word_update_rejects_negative() {
        let mut sentences = vec!["Hello world.".to_string()];
        let err = apply_word_update(&mut sentences, 0, -1, "x").unwrap_err();
        assert_eq!(err, DocsError::WordIndexNegative);
    }

    #[test]
    fn rebuild_joins_sentences_with_single_space() {
        let sentences = vec!["Hello.".to_string(), "World.".to_string()];
        assert_eq!(rebuild(&sentences), "Hello. World.");
    }

    #[test]
    fn rebuild_skips_empty_sentences() {
        let sentences = vec!["Hello.".to_string(), String::new(), "World.".to_string()];
        assert_eq!(rebuild(&sentences), "Hello. World.");
    }

    #[test]
    fn ensure_index_extends_with_empty_slots() {
        let mut sentences = vec!["Hello.".to_string()];
        ensure_index(&mut sentences, 3);
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[1], "");
        assert_eq!(sentences[3], "");
    }
}
