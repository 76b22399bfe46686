use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What kind of asset an anchor phrase points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    Image,
    Code,
    Formula,
}

/// A literal text span of the narration that a visual cue is anchored to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorPhrase {
    pub phrase: String,
    pub kind: AnchorKind,
    /// Search term handed to asset providers.
    pub asset_hint: String,
    /// Filled in by the asset resolver once a provider returns a candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualElement {
    pub kind: AnchorKind,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// 1-based, contiguous across the script.
    pub index: usize,
    pub narration: String,
    #[serde(default)]
    pub visuals: Vec<VisualElement>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub subtitle: String,
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub anchors: Vec<AnchorPhrase>,
}

impl Script {
    /// All scene narrations joined in scene order.
    pub fn full_narration(&self) -> String {
        self.scenes
            .iter()
            .map(|s| s.narration.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One word of the recognized narration with its time span in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptToken {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub tokens: Vec<TranscriptToken>,
    pub language: String,
}

impl Transcript {
    /// End timestamp of the last token, zero for an empty transcript.
    pub fn duration(&self) -> f64 {
        self.tokens.last().map(|t| t.end).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueKind {
    Image,
    Code,
    Formula,
    Keyword,
}

impl CueKind {
    /// Tie-break priority when two cues start at the same instant.
    /// Lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            CueKind::Image => 0,
            CueKind::Code => 1,
            CueKind::Formula => 2,
            CueKind::Keyword => 3,
        }
    }
}

impl From<AnchorKind> for CueKind {
    fn from(kind: AnchorKind) -> Self {
        match kind {
            AnchorKind::Image => CueKind::Image,
            AnchorKind::Code => CueKind::Code,
            AnchorKind::Formula => CueKind::Formula,
        }
    }
}

/// A scheduled visual event, time-anchored into the narration audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cue {
    pub kind: CueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_ref: Option<String>,
    pub start: f64,
    pub end: f64,
    pub scene_index: usize,
    pub source_phrase: String,
}

/// An anchor that exhausted every provider in the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedAnchor {
    pub phrase: String,
    pub kind: AnchorKind,
    pub attempts: u32,
}

/// A cue the scheduler had to push back to respect the two-active-cues cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub scene_index: usize,
    pub source_phrase: String,
    pub original_start: f64,
    pub deferred_start: f64,
}

/// Per-scene ordered cue timeline, ready for the renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub scenes: BTreeMap<usize, Vec<Cue>>,
}

impl Timeline {
    pub fn cue_count(&self) -> usize {
        self.scenes.values().map(Vec::len).sum()
    }
}
