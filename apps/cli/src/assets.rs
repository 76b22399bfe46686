use anyhow::Result;
use async_trait::async_trait;
use sufler_core::AssetProvider;

/// Openverse image search (CC-licensed media, no API key).
pub struct OpenverseProvider {
    client: reqwest::Client,
}

impl OpenverseProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetProvider for OpenverseProvider {
    fn name(&self) -> &str {
        "openverse"
    }

    async fn search(&self, term: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get("https://api.openverse.org/v1/images/")
            .query(&[("q", term), ("page_size", "5")])
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        let urls = response["results"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .filter_map(|r| r["url"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(urls)
    }
}

/// Wikimedia Commons file search, the fallback when Openverse comes up dry.
pub struct WikimediaProvider {
    client: reqwest::Client,
}

impl WikimediaProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetProvider for WikimediaProvider {
    fn name(&self) -> &str {
        "wikimedia"
    }

    async fn search(&self, term: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get("https://commons.wikimedia.org/w/api.php")
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", term),
                ("gsrnamespace", "6"),
                ("gsrlimit", "5"),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
            ])
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        let urls = response["query"]["pages"]
            .as_object()
            .map(|pages| {
                pages
                    .values()
                    .filter_map(|page| page["imageinfo"][0]["url"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(urls)
    }
}
