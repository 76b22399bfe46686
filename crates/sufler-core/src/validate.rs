//! Hard textual constraints on anchor phrases. Pure logic, no I/O; the
//! repair orchestrator is the only caller that acts on a violation.

use serde::{Deserialize, Serialize};

use crate::{
    normalize::{find_subsequence, normalize_words},
    types::{AnchorKind, Script},
};

/// Image anchors must be short enough to overlay while spoken.
pub const MIN_PHRASE_WORDS: usize = 5;
pub const MAX_IMAGE_PHRASE_WORDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationReason {
    TooShort,
    TooLong,
    NotFound,
    BoundaryPhrase,
}

/// First constraint violation found in a script, in scene-then-anchor order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseViolation {
    pub phrase: String,
    pub reason: ViolationReason,
}

/// Check every anchor phrase against the script text and position rules.
/// Returns the first violation in scan order, `None` when the script is
/// acceptable. Scan order is deterministic: anchors in declaration order,
/// each checked for word count, presence, then boundary placement.
pub fn validate(script: &Script) -> Option<PhraseViolation> {
    let narration_words = normalize_words(&script.full_narration());
    let zones = boundary_zones(script);

    for anchor in &script.anchors {
        let phrase_words = normalize_words(&anchor.phrase);

        if phrase_words.len() < MIN_PHRASE_WORDS {
            return Some(PhraseViolation {
                phrase: anchor.phrase.clone(),
                reason: ViolationReason::TooShort,
            });
        }
        if anchor.kind == AnchorKind::Image && phrase_words.len() > MAX_IMAGE_PHRASE_WORDS {
            return Some(PhraseViolation {
                phrase: anchor.phrase.clone(),
                reason: ViolationReason::TooLong,
            });
        }

        let Some(at) = find_subsequence(&narration_words, &phrase_words) else {
            return Some(PhraseViolation {
                phrase: anchor.phrase.clone(),
                reason: ViolationReason::NotFound,
            });
        };

        let end = at + phrase_words.len();
        if end <= zones.head || at >= zones.tail_start {
            return Some(PhraseViolation {
                phrase: anchor.phrase.clone(),
                reason: ViolationReason::BoundaryPhrase,
            });
        }
    }

    None
}

/// Head/tail exclusion zones in normalized-word offsets. The first and last
/// scene's narration is reserved for intro/outro, no anchor may live there.
pub struct BoundaryZones {
    /// Number of words belonging to the first scene.
    pub head: usize,
    /// Word offset where the last scene begins.
    pub tail_start: usize,
}

pub fn boundary_zones(script: &Script) -> BoundaryZones {
    let total: usize = script
        .scenes
        .iter()
        .map(|s| normalize_words(&s.narration).len())
        .sum();
    let head = script
        .scenes
        .first()
        .map(|s| normalize_words(&s.narration).len())
        .unwrap_or(0);
    let tail = script
        .scenes
        .last()
        .map(|s| normalize_words(&s.narration).len())
        .unwrap_or(0);

    // A single-scene script has no interior; head swallows everything.
    let tail_start = if script.scenes.len() < 2 { total } else { total - tail };
    BoundaryZones { head, tail_start }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnchorPhrase, Scene};

    fn scene(index: usize, narration: &str) -> Scene {
        Scene {
            index,
            narration: narration.to_string(),
            visuals: Vec::new(),
            keywords: Vec::new(),
        }
    }

    fn anchor(phrase: &str, kind: AnchorKind) -> AnchorPhrase {
        AnchorPhrase {
            phrase: phrase.to_string(),
            kind,
            asset_hint: phrase.to_string(),
            asset_ref: None,
        }
    }

    fn script(scenes: Vec<Scene>, anchors: Vec<AnchorPhrase>) -> Script {
        Script {
            title: "Algoritmos".into(),
            subtitle: "Uma introducao".into(),
            scenes,
            anchors,
        }
    }

    #[test]
    fn mid_script_phrase_of_five_words_passes() {
        let s = script(
            vec![
                scene(1, "Bem vindos ao canal pessoal"),
                scene(2, "Hoje vamos falar sobre algoritmos e estruturas de dados"),
                scene(3, "Ate a proxima aula pessoal"),
            ],
            vec![anchor("algoritmos e estruturas de dados", AnchorKind::Image)],
        );
        assert!(validate(&s).is_none());
    }

    #[test]
    fn three_word_phrase_is_too_short() {
        let s = script(
            vec![
                scene(1, "Bem vindos ao canal pessoal"),
                scene(2, "Hoje vamos falar sobre algoritmos de dados"),
                scene(3, "Ate a proxima aula pessoal"),
            ],
            vec![anchor("algoritmos de dados", AnchorKind::Image)],
        );
        let violation = validate(&s).unwrap();
        assert_eq!(violation.reason, ViolationReason::TooShort);
        assert_eq!(violation.phrase, "algoritmos de dados");
    }

    #[test]
    fn eleven_word_image_phrase_is_too_long() {
        let long = "um dois tres quatro cinco seis sete oito nove dez onze";
        let s = script(
            vec![scene(1, "intro aqui"), scene(2, long), scene(3, "tchau pessoal ate mais")],
            vec![anchor(long, AnchorKind::Image)],
        );
        assert_eq!(validate(&s).unwrap().reason, ViolationReason::TooLong);
    }

    #[test]
    fn long_code_phrase_is_allowed() {
        let long = "um dois tres quatro cinco seis sete oito nove dez onze";
        let s = script(
            vec![scene(1, "intro aqui"), scene(2, long), scene(3, "tchau pessoal ate mais")],
            vec![anchor(long, AnchorKind::Code)],
        );
        assert!(validate(&s).is_none());
    }

    #[test]
    fn absent_phrase_is_not_found() {
        let s = script(
            vec![
                scene(1, "Bem vindos ao canal"),
                scene(2, "Hoje vamos falar sobre grafos"),
                scene(3, "Ate a proxima"),
            ],
            vec![anchor("arvores binarias de busca balanceadas", AnchorKind::Image)],
        );
        assert_eq!(validate(&s).unwrap().reason, ViolationReason::NotFound);
    }

    #[test]
    fn matching_ignores_case_and_punctuation() {
        let s = script(
            vec![
                scene(1, "Bem vindos ao canal"),
                scene(2, "Hoje: VAMOS falar, sobre algoritmos!"),
                scene(3, "Ate a proxima"),
            ],
            vec![anchor("hoje vamos falar sobre algoritmos", AnchorKind::Image)],
        );
        assert!(validate(&s).is_none());
    }

    #[test]
    fn phrase_inside_first_scene_is_boundary() {
        let s = script(
            vec![
                scene(1, "Bem vindos ao canal sobre programacao avancada"),
                scene(2, "Hoje vamos falar sobre grafos"),
                scene(3, "Ate a proxima"),
            ],
            vec![anchor("bem vindos ao canal sobre programacao", AnchorKind::Code)],
        );
        assert_eq!(validate(&s).unwrap().reason, ViolationReason::BoundaryPhrase);
    }

    #[test]
    fn phrase_inside_last_scene_is_boundary() {
        let s = script(
            vec![
                scene(1, "Bem vindos"),
                scene(2, "Hoje vamos falar sobre grafos"),
                scene(3, "Obrigado por assistir ate a proxima aula"),
            ],
            vec![anchor("obrigado por assistir ate a proxima", AnchorKind::Code)],
        );
        assert_eq!(validate(&s).unwrap().reason, ViolationReason::BoundaryPhrase);
    }

    #[test]
    fn first_violation_wins_in_anchor_order() {
        let s = script(
            vec![
                scene(1, "Bem vindos"),
                scene(2, "Hoje vamos falar sobre algoritmos e grafos"),
                scene(3, "Ate a proxima"),
            ],
            vec![
                anchor("frase curta demais", AnchorKind::Image),
                anchor("frase que nao existe em lugar nenhum", AnchorKind::Image),
            ],
        );
        assert_eq!(validate(&s).unwrap().reason, ViolationReason::TooShort);
    }
}
