//! Windowed document chunking with stable, deterministic identifiers.
//!
//! Documents are split into windows of at most `max_tokens` whitespace
//! tokens, each overlapping the previous window by `overlap_tokens`. A
//! window prefers to end on a sentence or paragraph break found within a
//! small trailing tolerance before falling back to a hard token cut, so
//! chunk boundaries avoid splitting mid-sentence when they can (best
//! effort, not a strict guarantee).

use crate::error::{Error, Result};
use crate::filter::MetaValue;
use crate::types::{Chunk, Document};

/// Split `document` into overlapping chunks.
///
/// Deterministic: the same document text and parameters always produce
/// identical chunk ids and spans, which is what makes re-ingestion
/// idempotent and citations stable.
pub fn chunk(document: &Document, max_tokens: usize, overlap_tokens: usize) -> Result<Vec<Chunk>> {
    if max_tokens == 0 {
        return Err(Error::InvalidConfig("max_tokens must be positive".into()));
    }
    if overlap_tokens >= max_tokens {
        return Err(Error::InvalidConfig(format!(
            "overlap_tokens ({overlap_tokens}) must be smaller than max_tokens ({max_tokens})"
        )));
    }

    let text = document.text.as_str();
    let tokens = token_spans(text);
    if tokens.is_empty() {
        return Err(Error::EmptyDocument(document.doc_id.clone()));
    }

    let n = tokens.len();
    let tolerance = (max_tokens / 5).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chunk_index = 0usize;

    loop {
        let hard_end = (start + max_tokens).min(n);
        let mut cut = hard_end;
        if hard_end < n {
            let lo = hard_end.saturating_sub(tolerance).max(start + 1);
            for candidate in (lo..=hard_end).rev() {
                if breaks_after(text, &tokens, candidate - 1) {
                    cut = candidate;
                    break;
                }
            }
        }

        let span = (tokens[start].0, tokens[cut - 1].1);
        let mut metadata = document.metadata.clone();
        metadata.insert("chunk_index".into(), MetaValue::Num(chunk_index as f64));
        chunks.push(Chunk {
            chunk_id: chunk_id(&document.doc_id, span),
            doc_id: document.doc_id.clone(),
            text: text[span.0..span.1].to_string(),
            token_span: span,
            metadata,
        });
        chunk_index += 1;

        if cut >= n {
            break;
        }
        // Step back by the overlap, but always make progress.
        start = cut.saturating_sub(overlap_tokens).max(start + 1);
    }

    Ok(chunks)
}

/// Chunk ids are derived from the owning document and the byte span, so the
/// same content at the same offset always gets the same id.
fn chunk_id(doc_id: &str, span: (usize, usize)) -> String {
    let digest = blake3::hash(format!("{}:{}:{}", doc_id, span.0, span.1).as_bytes());
    let hex = digest.to_hex();
    format!("{}#{}", doc_id, &hex.as_str()[..12])
}

/// Byte ranges of whitespace-delimited tokens.
fn token_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// True when the window may end cleanly after token `idx`: the token closes
/// a sentence, or the gap to the next token contains a paragraph break.
fn breaks_after(text: &str, tokens: &[(usize, usize)], idx: usize) -> bool {
    let (tok_start, tok_end) = tokens[idx];
    if matches!(
        text[tok_start..tok_end].chars().next_back(),
        Some('.' | '!' | '?' | ';' | ':')
    ) {
        return true;
    }
    let gap_end = tokens.get(idx + 1).map_or(text.len(), |t| t.0);
    text[tok_end..gap_end].contains("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Meta;
    use chrono::Utc;

    fn doc(text: &str) -> Document {
        Document {
            doc_id: "doc-a".into(),
            source_uri: "mem://doc-a".into(),
            ingestion_date: Utc::now(),
            content_hash: blake3::hash(text.as_bytes()).to_hex().to_string(),
            metadata: Meta::new(),
            text: text.to_string(),
        }
    }

    #[test]
    fn windows_overlap_by_configured_tokens() {
        let words: Vec<String> = (0..25).map(|i| format!("w{i}")).collect();
        let d = doc(&words.join(" "));
        let chunks = chunk(&d, 10, 3).expect("chunk");
        assert!(chunks.len() > 1);
        // First window ends at token 10, next starts at token 7.
        assert!(chunks[0].text.ends_with("w9"));
        assert!(chunks[1].text.starts_with("w7"));
    }

    #[test]
    fn prefers_sentence_boundary_within_tolerance() {
        // The period sits two tokens before the hard cut; the window should
        // end there instead of mid-sentence.
        let d = doc("one two three four five six seven eight. nine ten eleven twelve");
        let chunks = chunk(&d, 10, 2).expect("chunk");
        assert!(chunks[0].text.ends_with("eight."));
    }

    #[test]
    fn chunk_text_is_contiguous_substring() {
        let d = doc("alpha bravo charlie.\n\ndelta echo foxtrot golf hotel india juliet kilo lima");
        for c in chunk(&d, 6, 1).expect("chunk") {
            assert_eq!(c.text, &d.text[c.token_span.0..c.token_span.1]);
        }
    }
}
