//! Maps anchor phrases onto the word-timestamped transcript of the final
//! narration. Matching runs over the shared normalized-word space, so a
//! phrase the validator accepted aligns unless the spoken audio drifted
//! from the script (TTS rewording, recognition noise). Drift is a per-phrase
//! miss, never a failure.

use tracing::debug;

use crate::{
    normalize::normalize_words,
    types::{AnchorPhrase, Cue, CueKind, Script, Transcript},
};

#[derive(Debug, Default)]
pub struct Alignment {
    pub cues: Vec<Cue>,
    /// Anchors whose phrase never showed up in the transcript.
    pub misses: Vec<AnchorPhrase>,
}

/// A transcript token that survived normalization, with its index into the
/// original token vector.
struct NormalizedToken {
    word: String,
    source: usize,
}

/// Locate every anchor phrase and scene keyword in the transcript and turn
/// each hit into a time-anchored cue. First-occurrence rule: the earliest
/// window outside the head/tail exclusion zone wins, which makes alignment
/// deterministic and idempotent.
pub fn align(script: &Script, transcript: &Transcript) -> Alignment {
    let tokens: Vec<NormalizedToken> = transcript
        .tokens
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            let words = normalize_words(&t.word);
            words.into_iter().next().map(|word| NormalizedToken { word, source: i })
        })
        .collect();

    let scene_spans = scene_spans(script, tokens.len());
    let head = scene_spans.first().map(|&(_, end)| end).unwrap_or(0);
    let tail_start = if scene_spans.len() < 2 {
        tokens.len()
    } else {
        scene_spans.last().map(|&(start, _)| start).unwrap_or(tokens.len())
    };

    let mut alignment = Alignment::default();

    for anchor in &script.anchors {
        let phrase_words = normalize_words(&anchor.phrase);
        match find_window(&tokens, &phrase_words, head, tail_start) {
            Some(at) => {
                let first = &transcript.tokens[tokens[at].source];
                let last = &transcript.tokens[tokens[at + phrase_words.len() - 1].source];
                alignment.cues.push(Cue {
                    kind: anchor.kind.into(),
                    asset_ref: anchor.asset_ref.clone(),
                    start: first.start,
                    end: last.end,
                    scene_index: scene_at(&scene_spans, script, at),
                    source_phrase: anchor.phrase.clone(),
                });
            }
            None => {
                debug!(phrase = %anchor.phrase, "anchor phrase absent from transcript");
                alignment.misses.push(anchor.clone());
            }
        }
    }

    // Keyword highlights are scoped to their own scene's token range.
    for (scene, &(span_start, span_end)) in script.scenes.iter().zip(&scene_spans) {
        for keyword in &scene.keywords {
            let words = normalize_words(keyword);
            if words.is_empty() {
                continue;
            }
            let window = &tokens[span_start..span_end.min(tokens.len())];
            if let Some(offset) = crate::normalize::find_subsequence(
                &window.iter().map(|t| t.word.clone()).collect::<Vec<_>>(),
                &words,
            ) {
                let at = span_start + offset;
                let first = &transcript.tokens[tokens[at].source];
                let last = &transcript.tokens[tokens[at + words.len() - 1].source];
                alignment.cues.push(Cue {
                    kind: CueKind::Keyword,
                    asset_ref: None,
                    start: first.start,
                    end: last.end,
                    scene_index: scene.index,
                    source_phrase: keyword.clone(),
                });
            }
        }
    }

    alignment
}

/// First window matching the phrase, skipping windows that lie entirely
/// inside the head or tail exclusion zone. A window straddling a zone
/// boundary is acceptable.
fn find_window(
    tokens: &[NormalizedToken],
    phrase_words: &[String],
    head: usize,
    tail_start: usize,
) -> Option<usize> {
    if phrase_words.is_empty() || phrase_words.len() > tokens.len() {
        return None;
    }
    (0..=tokens.len() - phrase_words.len()).find(|&i| {
        let end = i + phrase_words.len();
        let in_head = end <= head;
        let in_tail = i >= tail_start;
        !in_head
            && !in_tail
            && tokens[i..end]
                .iter()
                .zip(phrase_words)
                .all(|(t, w)| t.word == *w)
    })
}

/// Per-scene token index ranges, scaled from the script's word share per
/// scene onto the transcript length. Recognition may merge or split words,
/// so scene boundaries in transcript space are proportional, not exact.
fn scene_spans(script: &Script, token_count: usize) -> Vec<(usize, usize)> {
    let counts: Vec<usize> = script
        .scenes
        .iter()
        .map(|s| normalize_words(&s.narration).len())
        .collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return script.scenes.iter().map(|_| (0, token_count)).collect();
    }

    let mut spans = Vec::with_capacity(counts.len());
    let mut acc = 0usize;
    for (i, &count) in counts.iter().enumerate() {
        let start = acc * token_count / total;
        acc += count;
        let end = if i == counts.len() - 1 {
            token_count
        } else {
            acc * token_count / total
        };
        spans.push((start, end));
    }
    spans
}

/// Scene index owning a transcript position. Falls back to the last scene.
fn scene_at(spans: &[(usize, usize)], script: &Script, position: usize) -> usize {
    spans
        .iter()
        .zip(&script.scenes)
        .find(|&(&(start, end), _)| position >= start && position < end)
        .map(|(_, scene)| scene.index)
        .or_else(|| script.scenes.last().map(|s| s.index))
        .unwrap_or(1)
}
