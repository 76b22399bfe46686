//! Sufler Core Library
//!
//! Core functionality for generating lesson scripts with constraint-checked
//! anchor phrases, resolving visual assets, and aligning cues against the
//! word-timestamped transcript of the narrated audio.

pub mod align;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod repair;
pub mod resolve;
pub mod schedule;
pub mod transcribe;
pub mod types;
pub mod validate;

// Re-export commonly used items at crate root
pub use align::{Alignment, align};
pub use error::{Result, SuflerError};
pub use pipeline::{
    align_and_schedule, generate_validated_script, load_script, load_transcript, resolve_assets,
    save_script, save_timeline, save_transcript,
};
pub use repair::{RepairBudget, ScriptGenerator, ScriptOutcome, ValidatedScript, parse_script};
pub use resolve::{AssetProvider, AssetResolver, QualifierRotation};
pub use schedule::schedule;
pub use transcribe::Transcriber;
pub use types::{
    AnchorKind, AnchorPhrase, Cue, CueKind, Scene, ScheduleConflict, Script, Timeline, Transcript,
    TranscriptToken, UnresolvedAnchor, VisualElement,
};
pub use validate::{PhraseViolation, ViolationReason, validate};
