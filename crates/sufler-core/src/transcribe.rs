use std::path::Path;

use async_trait::async_trait;

use crate::types::Transcript;

/// Speech recognition over the finalized narration audio. Implementations
/// must return tokens in spoken order with non-decreasing start times.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> anyhow::Result<Transcript>;
}
