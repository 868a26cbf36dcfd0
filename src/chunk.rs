//! Recursive character text splitter.
//!
//! Splits extracted document text into [`Chunk`]s of at most `chunk_size`
//! characters, with neighbouring chunks sharing up to `chunk_overlap`
//! characters. Text is cut on the coarsest separator present (`"\n\n"`,
//! then `"\n"`, then `" "`, then between characters); pieces that are still
//! too long are split again with the next separator. Separators stay
//! attached to the start of the piece that follows them.
//!
//! Lengths are counted in `char`s, not bytes.

use std::collections::VecDeque;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Split a document's text into chunks with contiguous indices from 0.
/// Empty or whitespace-only text yields no chunks.
pub fn chunk_text(source: &str, text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    split_text(text, chunk_size, chunk_overlap)
        .iter()
        .enumerate()
        .map(|(i, piece)| make_chunk(source, i as i64, piece))
        .collect()
}

/// Split text into trimmed, non-empty pieces.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut out = Vec::new();
    split_recursive(text, &SEPARATORS, chunk_size, chunk_overlap, &mut out);
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
    out: &mut Vec<String>,
) {
    // Pick the first separator that occurs in the text; "" always matches.
    let mut separator = "";
    let mut finer: &[&str] = &[];
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            break;
        }
        if text.contains(sep) {
            separator = sep;
            finer = &separators[i + 1..];
            break;
        }
    }

    let mut small: Vec<&str> = Vec::new();
    for piece in split_keep_separator(text, separator) {
        if char_len(piece) < chunk_size {
            small.push(piece);
            continue;
        }
        if !small.is_empty() {
            out.extend(merge_splits(&small, chunk_size, chunk_overlap));
            small.clear();
        }
        if finer.is_empty() {
            out.push(piece.to_string());
        } else {
            split_recursive(piece, finer, chunk_size, chunk_overlap, out);
        }
    }
    if !small.is_empty() {
        out.extend(merge_splits(&small, chunk_size, chunk_overlap));
    }
}

/// Split on `sep`, keeping each separator at the start of the next piece.
fn split_keep_separator<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    if sep.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(sep) {
        pieces.push(&text[start..idx]);
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Greedily pack small pieces into chunks, carrying a tail of up to
/// `chunk_overlap` characters into the next chunk.
fn merge_splits(splits: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in splits {
        let len = char_len(piece);
        if total + len > chunk_size && !current.is_empty() {
            if let Some(doc) = join_pieces(&current) {
                docs.push(doc);
            }
            while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                match current.pop_front() {
                    Some(front) => total -= char_len(front),
                    None => break,
                }
            }
        }
        current.push_back(piece);
        total += len;
    }

    if let Some(doc) = join_pieces(&current) {
        docs.push(doc);
    }
    docs
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn make_chunk(source: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
