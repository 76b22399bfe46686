//! Top-level pipeline operations and JSON artifact helpers. Each stage
//! degrades gracefully: constraint, alignment and asset problems come back
//! as structured lists, never as errors.

use std::path::Path;

use tokio::fs;
use tokio_util::sync::CancellationToken;

use crate::{
    align::{Alignment, align},
    error::Result,
    repair::{RepairBudget, ScriptGenerator, ValidatedScript},
    resolve::{AssetResolver, QualifierRotation},
    schedule::schedule,
    types::{AnchorPhrase, ScheduleConflict, Script, Timeline, Transcript, UnresolvedAnchor},
};

/// Generate a script and drive the repair loop until it satisfies every
/// anchor constraint or the budget runs out. Check `outcome` on the result:
/// an `Exhausted` script is usable but may still violate constraints.
pub async fn generate_validated_script(
    generator: &dyn ScriptGenerator,
    source_text: &str,
    scene_count: usize,
    budget: RepairBudget,
    cancel: &CancellationToken,
) -> Result<ValidatedScript> {
    crate::repair::generate_validated_script(generator, source_text, scene_count, budget, cancel)
        .await
}

/// Resolve a concrete asset reference for every anchor in the script.
pub async fn resolve_assets(
    resolver: &AssetResolver,
    script: Script,
    qualifiers: &mut QualifierRotation,
    cancel: &CancellationToken,
) -> (Script, Vec<UnresolvedAnchor>) {
    resolver.resolve(script, qualifiers, cancel).await
}

/// Align every anchor phrase and keyword against the transcript, then merge
/// the resulting cues into a per-scene timeline.
pub fn align_and_schedule(
    script: &Script,
    transcript: &Transcript,
) -> (Timeline, Vec<AnchorPhrase>, Vec<ScheduleConflict>) {
    let Alignment { cues, misses } = align(script, transcript);
    let (timeline, conflicts) = schedule(cues);
    (timeline, misses, conflicts)
}

/// Load a script from a cached file
pub async fn load_script(path: &Path) -> Result<Script> {
    let json_content = fs::read_to_string(path).await?;
    let script: Script = serde_json::from_str(&json_content)?;
    Ok(script)
}

/// Save a script to a file
pub async fn save_script(script: &Script, path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(script)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

/// Load a transcript from a cached file
pub async fn load_transcript(path: &Path) -> Result<Transcript> {
    let json_content = fs::read_to_string(path).await?;
    let transcript: Transcript = serde_json::from_str(&json_content)?;
    Ok(transcript)
}

/// Save a transcript to a file
pub async fn save_transcript(transcript: &Transcript, path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(transcript)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

/// Save a timeline to a file
pub async fn save_timeline(timeline: &Timeline, path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(timeline)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}
