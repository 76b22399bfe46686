use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sufler_core::{Script, ScriptGenerator};

use crate::provider::Provider;

const SYSTEM_PROMPT: &str = r#"You are a lesson script writer. Your task is to turn a source text into a narrated lesson script with visual cue anchors.

You MUST output ONLY valid JSON matching this exact structure (no markdown, no explanation):
{
  "title": "Lesson title",
  "subtitle": "One-line subtitle",
  "scenes": [
    {
      "index": 1,
      "narration": "Full narration text for this scene",
      "visuals": [{"kind": "image|code|formula", "content": "what to show"}],
      "keywords": ["keyword1", "keyword2"]
    }
  ],
  "anchors": [
    {"phrase": "literal phrase copied from a narration", "kind": "image|code|formula", "asset_hint": "search term for the asset"}
  ]
}

Rules for anchors:
- Every anchor phrase MUST be copied verbatim from one of the scene narrations
- Image anchor phrases are 5 to 10 words long; code and formula anchors at least 5 words
- Never take a phrase from the first or the last scene (those are intro and outro)
- An anchor phrase never ends with sentence punctuation
- Scene indexes are 1-based and contiguous
- Output ONLY the JSON, nothing else"#;

/// Chat-completions backed script generator. One client per pipeline run.
pub struct ChatGenerator {
    provider: Provider,
    api_key: String,
    client: reqwest::Client,
}

impl ChatGenerator {
    pub fn new(provider: Provider) -> Result<Self> {
        let api_key = provider.validate_api_key()?;
        Ok(Self {
            provider,
            api_key,
            client: reqwest::Client::new(),
        })
    }

    async fn chat(&self, user_prompt: &str) -> Result<String> {
        let config = self.provider.config();
        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": [
                    {
                        "role": "system",
                        "content": SYSTEM_PROMPT,
                    },
                    {
                        "role": "user",
                        "content": user_prompt,
                    },
                ],
                "temperature": 0.3,
            }))
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid API response: {:?}", response))?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl ScriptGenerator for ChatGenerator {
    async fn generate(&self, source_text: &str, scene_count: usize) -> Result<String> {
        let user_prompt = format!(
            "Write a lesson script with exactly {} scenes from this source text. \
             Keep the language of the source text.\n\n{}",
            scene_count, source_text
        );
        self.chat(&user_prompt).await
    }

    async fn correct(&self, prior: &Script, invalid_phrase: &str) -> Result<String> {
        let prior_json = serde_json::to_string_pretty(prior)?;
        let user_prompt = format!(
            "This lesson script has one invalid anchor phrase: \"{}\". \
             Replace ONLY that anchor with one that satisfies every anchor rule. \
             Do not change any narration text or any other anchor. \
             Return the full corrected script as JSON.\n\n{}",
            invalid_phrase, prior_json
        );
        self.chat(&user_prompt).await
    }
}
