use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use sufler_core::{
    AssetResolver, QualifierRotation, RepairBudget, ScriptOutcome, Transcriber,
    align_and_schedule, generate_validated_script, load_script, load_transcript, resolve_assets,
    save_script, save_timeline, save_transcript,
};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::{
    assets::{OpenverseProvider, WikimediaProvider},
    cache::{get_cache_dir, get_script_path, get_timeline_path, get_transcript_path},
    format::format_timeline_readable,
    generator::ChatGenerator,
    provider::Provider,
    transcriber::WhisperCliTranscriber,
};

mod assets;
mod cache;
mod format;
mod generator;
mod provider;
mod transcriber;

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "sufler")]
#[command(
    about = "Turn a source text into a narrated lesson script with time-anchored visual cues"
)]
struct Cli {
    /// Source text file
    input: PathBuf,

    /// Number of scenes to generate
    #[arg(short, long, default_value_t = 5)]
    scenes: usize,

    /// AI provider for script generation
    #[arg(short, long, default_value = "grok")]
    provider: CliProvider,

    /// Narrated audio file to align cues against. Alignment is skipped
    /// when omitted.
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Whisper model for transcription
    #[arg(long, default_value = "base")]
    whisper_model: String,

    /// Abort the pipeline after this many seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Force re-processing even if cached files exist
    #[arg(short, long)]
    force: bool,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let run_id = Uuid::new_v4();

    println!(
        "\n{}  {}\n",
        style("sufler").cyan().bold(),
        style("Lesson Script Builder").dim()
    );
    tracing::debug!(%run_id, "pipeline run started");

    let source_text = fs::read_to_string(&cli.input).await?;
    let cache_dir = get_cache_dir(&source_text);
    fs::create_dir_all(&cache_dir).await?;

    let cancel = CancellationToken::new();
    if let Some(secs) = cli.deadline {
        let deadline_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            deadline_cancel.cancel();
        });
    }

    // Step 1: Generate a constraint-checked script
    let script_path = get_script_path(&cache_dir);
    let script = if !cli.force && fs::metadata(&script_path).await.is_ok() {
        let script = load_script(&script_path).await?;
        println!(
            "{} Script loaded from cache ({} scenes)",
            style("✓").green().bold(),
            script.scenes.len()
        );
        script
    } else {
        let provider: Provider = cli.provider.into();
        let generator = ChatGenerator::new(provider.clone())?;
        let spinner = create_spinner(&format!(
            "Generating script with {} ({} scenes)...",
            provider.name(),
            cli.scenes
        ));
        let validated = generate_validated_script(
            &generator,
            &source_text,
            cli.scenes,
            RepairBudget::default(),
            &cancel,
        )
        .await?;
        match validated.outcome {
            ScriptOutcome::Accepted => spinner.finish_with_message(format!(
                "{} Script accepted after {} generator calls",
                style("✓").green().bold(),
                validated.generator_calls
            )),
            ScriptOutcome::Exhausted => {
                spinner.finish_with_message(format!(
                    "{} Repair budget exhausted, continuing with best effort",
                    style("!").yellow().bold()
                ));
                if let Some(violation) = &validated.last_violation {
                    println!(
                        "  {} \"{}\" ({:?})",
                        style("still invalid:").yellow(),
                        violation.phrase,
                        violation.reason
                    );
                }
            }
        }
        validated.script
    };

    // Step 2: Resolve assets for every anchor
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let resolver = AssetResolver::new(vec![
        Arc::new(OpenverseProvider::new(client.clone())) as Arc<dyn sufler_core::AssetProvider>,
        Arc::new(WikimediaProvider::new(client)),
    ]);
    let mut qualifiers = QualifierRotation::default();

    let spinner = create_spinner("Resolving visual assets...");
    let (script, unresolved) = resolve_assets(&resolver, script, &mut qualifiers, &cancel).await;
    let resolved_count = script.anchors.iter().filter(|a| a.asset_ref.is_some()).count();
    spinner.finish_with_message(format!(
        "{} Assets resolved: {}/{}",
        style("✓").green().bold(),
        resolved_count,
        script.anchors.len()
    ));
    for anchor in &unresolved {
        println!(
            "  {} \"{}\" after {} attempts",
            style("unresolved:").yellow(),
            anchor.phrase,
            anchor.attempts
        );
    }

    save_script(&script, &script_path).await?;
    println!(
        "{} {}",
        style("Saved:").dim(),
        style(script_path.display()).cyan()
    );

    // Steps 3-4 need the narrated audio
    let Some(audio_path) = cli.audio else {
        println!(
            "\n{}",
            style("No --audio given, skipping alignment and scheduling.").dim()
        );
        return Ok(());
    };

    // Step 3: Transcribe the narration with word timestamps
    let transcript_path = get_transcript_path(&cache_dir);
    let transcript = if !cli.force && fs::metadata(&transcript_path).await.is_ok() {
        load_transcript(&transcript_path).await?
    } else {
        let transcriber = WhisperCliTranscriber::new(&cli.whisper_model);
        let spinner = create_spinner("Transcribing narration with Whisper...");
        let transcript = transcriber.transcribe(&audio_path).await?;
        spinner.finish_with_message(format!(
            "{} Transcribed: {:.1} min, {} words, {} detected",
            style("✓").green().bold(),
            transcript.duration() / 60.0,
            transcript.tokens.len(),
            style(&transcript.language).yellow()
        ));
        save_transcript(&transcript, &transcript_path).await?;
        transcript
    };

    // Step 4: Align anchors and schedule the cue timeline
    let spinner = create_spinner("Aligning cues against the transcript...");
    let (timeline, misses, conflicts) = align_and_schedule(&script, &transcript);
    spinner.finish_with_message(format!(
        "{} Timeline ready: {} cues, {} misses, {} deferred",
        style("✓").green().bold(),
        timeline.cue_count(),
        misses.len(),
        conflicts.len()
    ));
    for miss in &misses {
        println!(
            "  {} \"{}\" not found in narration audio",
            style("miss:").yellow(),
            miss.phrase
        );
    }

    let timeline_path = get_timeline_path(&cache_dir);
    save_timeline(&timeline, &timeline_path).await?;

    println!(
        "\n{} {}\n",
        style("Saved:").dim(),
        style(timeline_path.display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_timeline_readable(&timeline, &conflicts));

    Ok(())
}
