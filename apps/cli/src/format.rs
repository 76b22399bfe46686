use sufler_core::{CueKind, ScheduleConflict, Timeline};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

fn kind_label(kind: CueKind) -> &'static str {
    match kind {
        CueKind::Image => "image",
        CueKind::Code => "code",
        CueKind::Formula => "formula",
        CueKind::Keyword => "keyword",
    }
}

/// Format a cue timeline as human-readable markdown
pub fn format_timeline_readable(timeline: &Timeline, conflicts: &[ScheduleConflict]) -> String {
    let mut output = String::new();

    for (scene_index, cues) in &timeline.scenes {
        output.push_str(&format!("## Scene {}\n\n", scene_index));
        for cue in cues {
            let start = format_timestamp(cue.start);
            let end = format_timestamp(cue.end);
            output.push_str(&format!(
                "[{}–{}] {} \"{}\"",
                start,
                end,
                kind_label(cue.kind),
                cue.source_phrase
            ));
            if let Some(asset) = &cue.asset_ref {
                output.push_str(&format!(" → {}", asset));
            }
            output.push('\n');
        }
        output.push('\n');
    }

    if !conflicts.is_empty() {
        output.push_str("## Deferred cues\n\n");
        for conflict in conflicts {
            output.push_str(&format!(
                "scene {}: \"{}\" moved {} → {}\n",
                conflict.scene_index,
                conflict.source_phrase,
                format_timestamp(conflict.original_start),
                format_timestamp(conflict.deferred_start)
            ));
        }
    }

    output
}
