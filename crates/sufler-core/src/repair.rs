//! Generate -> Validate -> Repair loop. Driven as an explicit state machine
//! so callers branch on an enumerated outcome instead of catching errors:
//! an exhausted budget still hands back the last produced script.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::{Result, SuflerError},
    normalize::trim_terminal_punctuation,
    types::Script,
    validate::{PhraseViolation, validate},
};

/// External script generator. Returns raw model text; parsing and
/// constraint checking stay on this side of the boundary.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, source_text: &str, scene_count: usize) -> anyhow::Result<String>;

    /// Targeted re-prompt: fix one invalid anchor phrase without rewriting
    /// the narration.
    async fn correct(&self, prior: &Script, invalid_phrase: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct RepairBudget {
    /// Full generations, including the first one.
    pub max_generate_attempts: u32,
    /// Correction rounds per generation before regenerating from scratch.
    pub max_repair_attempts: u32,
}

impl Default for RepairBudget {
    fn default() -> Self {
        Self {
            max_generate_attempts: 10,
            max_repair_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptOutcome {
    Accepted,
    /// Budget ran out; the returned script may still violate constraints.
    Exhausted,
}

#[derive(Debug)]
pub struct ValidatedScript {
    pub script: Script,
    pub outcome: ScriptOutcome,
    /// Total generator calls spent (generations plus corrections).
    pub generator_calls: u32,
    /// Violation still standing when the outcome is `Exhausted`.
    pub last_violation: Option<PhraseViolation>,
}

enum State {
    Generating,
    Validating { script: Script },
    Repairing { script: Script, violation: PhraseViolation },
}

/// Strip markdown fences the model likes to wrap JSON in, then parse.
/// Anchor phrases get their terminal punctuation trimmed on the way in so
/// the sentence-boundary invariant holds regardless of model habits.
pub fn parse_script(raw: &str) -> Result<Script> {
    let json_text = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let mut script: Script =
        serde_json::from_str(json_text).map_err(|e| SuflerError::ScriptParse {
            reason: e.to_string(),
        })?;

    if script.scenes.is_empty() {
        return Err(SuflerError::ScriptParse {
            reason: "script has no scenes".to_string(),
        });
    }

    for anchor in &mut script.anchors {
        anchor.phrase = trim_terminal_punctuation(anchor.phrase.trim()).to_string();
    }
    Ok(script)
}

/// Run the repair loop until a script satisfies every anchor constraint or
/// the budget is exhausted. Exhaustion is not an error: the last produced
/// script is returned flagged `Exhausted` and the caller decides. Only a
/// generator that never yields a parseable script at all produces `Err`.
///
/// Total generator calls are bounded by
/// `max_generate_attempts * (1 + max_repair_attempts)`.
pub async fn generate_validated_script(
    generator: &dyn ScriptGenerator,
    source_text: &str,
    scene_count: usize,
    budget: RepairBudget,
    cancel: &CancellationToken,
) -> Result<ValidatedScript> {
    let mut calls: u32 = 0;
    let mut generate_attempt: u32 = 0;
    let mut repair_attempt: u32 = 0;
    let mut last_script: Option<Script> = None;
    let mut last_violation: Option<PhraseViolation> = None;
    let mut last_failure = String::from("generator was never called");

    let mut state = State::Generating;

    loop {
        match state {
            State::Generating => {
                if generate_attempt >= budget.max_generate_attempts || cancel.is_cancelled() {
                    break;
                }
                generate_attempt += 1;
                repair_attempt = 0;

                let raw = tokio::select! {
                    biased;
                    r = generator.generate(source_text, scene_count) => r,
                    _ = cancel.cancelled() => break,
                };
                calls += 1;

                state = match raw.map_err(|e| e.to_string()).and_then(|raw| {
                    parse_script(&raw).map_err(|e| e.to_string())
                }) {
                    Ok(script) => State::Validating { script },
                    Err(reason) => {
                        warn!(attempt = generate_attempt, %reason, "generation attempt failed");
                        last_failure = reason;
                        State::Generating
                    }
                };
            }

            State::Validating { script } => match validate(&script) {
                None => {
                    debug!(calls, generate_attempt, "script accepted");
                    return Ok(ValidatedScript {
                        script,
                        outcome: ScriptOutcome::Accepted,
                        generator_calls: calls,
                        last_violation: None,
                    });
                }
                Some(violation) => {
                    debug!(
                        phrase = %violation.phrase,
                        reason = ?violation.reason,
                        "constraint violated"
                    );
                    state = State::Repairing { script, violation };
                }
            },

            State::Repairing { script, violation } => {
                if repair_attempt >= budget.max_repair_attempts || cancel.is_cancelled() {
                    // Inner budget spent: the whole generation restarts.
                    last_script = Some(script);
                    last_violation = Some(violation);
                    state = State::Generating;
                    continue;
                }
                repair_attempt += 1;

                let raw = tokio::select! {
                    biased;
                    r = generator.correct(&script, &violation.phrase) => Some(r),
                    _ = cancel.cancelled() => None,
                };
                let Some(raw) = raw else {
                    last_script = Some(script);
                    last_violation = Some(violation);
                    break;
                };
                calls += 1;

                state = match raw.map_err(|e| e.to_string()).and_then(|raw| {
                    parse_script(&raw).map_err(|e| e.to_string())
                }) {
                    Ok(repaired) => State::Validating { script: repaired },
                    Err(reason) => {
                        warn!(repair_attempt, %reason, "repair attempt failed");
                        // Keep the prior artifact and retry the same fix.
                        State::Repairing { script, violation }
                    }
                };
            }
        }
    }

    match last_script {
        Some(script) => {
            warn!(calls, generate_attempt, "repair budget exhausted, returning last script");
            Ok(ValidatedScript {
                script,
                outcome: ScriptOutcome::Exhausted,
                generator_calls: calls,
                last_violation,
            })
        }
        None if cancel.is_cancelled() => Err(SuflerError::Cancelled),
        None => Err(SuflerError::GenerationFailed {
            attempt: generate_attempt,
            reason: last_failure,
        }),
    }
}
