//! Merges aligned cues into an ordered per-scene timeline. At most two cues
//! may be active at once within a scene; an overflowing cue is pushed back
//! to start right after the earliest-ending active cue and reported as a
//! conflict instead of being dropped.

use tracing::debug;

use crate::types::{Cue, ScheduleConflict, Timeline};

/// Arrange cues per scene, sorted ascending by start time with ties broken
/// by kind priority (image > code > formula > keyword). Returns the
/// timeline together with every deferral that was needed.
pub fn schedule(cues: Vec<Cue>) -> (Timeline, Vec<ScheduleConflict>) {
    let mut timeline = Timeline::default();
    let mut conflicts = Vec::new();

    for cue in cues {
        timeline.scenes.entry(cue.scene_index).or_default().push(cue);
    }

    for scene_cues in timeline.scenes.values_mut() {
        scene_cues.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then_with(|| a.kind.priority().cmp(&b.kind.priority()))
        });

        // Sweep in start order. The active set is re-derived from the
        // already-placed cues at each candidate start, so a deferral never
        // hides cues that are still running at a later cue's start.
        for idx in 0..scene_cues.len() {
            let (earlier, rest) = scene_cues.split_at_mut(idx);
            let cue = &mut rest[0];

            let original_start = cue.start;
            loop {
                let active: Vec<f64> = earlier
                    .iter()
                    .filter(|c| c.start <= cue.start && cue.start < c.end)
                    .map(|c| c.end)
                    .collect();
                if active.len() < 2 {
                    break;
                }
                let earliest_end = active.iter().copied().fold(f64::INFINITY, f64::min);
                let shift = earliest_end - cue.start;
                cue.start = earliest_end;
                cue.end += shift;
            }
            if cue.start > original_start {
                debug!(
                    scene = cue.scene_index,
                    phrase = %cue.source_phrase,
                    from = original_start,
                    to = cue.start,
                    "cue deferred"
                );
                conflicts.push(ScheduleConflict {
                    scene_index: cue.scene_index,
                    source_phrase: cue.source_phrase.clone(),
                    original_start,
                    deferred_start: cue.start,
                });
            }
        }

        // Deferral can reorder within the scene; restore start ordering.
        scene_cues.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then_with(|| a.kind.priority().cmp(&b.kind.priority()))
        });
    }

    (timeline, conflicts)
}
