use std::path::Path;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use sufler_core::{Transcriber, Transcript, TranscriptToken};
use tokio::{fs, process::Command};

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    language: String,
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// Transcribes narration audio by shelling out to the Whisper CLI with
/// word-level timestamps enabled.
pub struct WhisperCliTranscriber {
    model: String,
}

impl WhisperCliTranscriber {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let output_dir = audio_path.parent().unwrap_or(Path::new("."));

        let output = Command::new("whisper")
            .arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_format")
            .arg("json")
            .arg("--word_timestamps")
            .arg("True")
            .arg("--output_dir")
            .arg(output_dir)
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!(
                "whisper failed for {}: {}",
                audio_path.display(),
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        // Whisper names output based on input filename
        let stem = audio_path
            .file_stem()
            .ok_or_else(|| anyhow!("audio path has no file name: {}", audio_path.display()))?;
        let json_path = output_dir.join(stem).with_extension("json");

        let json_content = fs::read_to_string(&json_path).await?;
        let raw: WhisperOutput = serde_json::from_str(&json_content)?;

        let tokens: Vec<TranscriptToken> = raw
            .segments
            .into_iter()
            .flat_map(|seg| seg.words)
            .map(|w| TranscriptToken {
                word: w.word.trim().to_string(),
                start: w.start,
                end: w.end,
            })
            .collect();

        if tokens.is_empty() {
            return Err(anyhow!(
                "whisper produced no word timestamps for {}",
                audio_path.display()
            ));
        }

        Ok(Transcript {
            tokens,
            language: raw.language,
        })
    }
}
