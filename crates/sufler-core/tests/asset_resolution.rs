use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use sufler_core::{
    AnchorKind, AnchorPhrase, AssetProvider, AssetResolver, QualifierRotation, Scene, Script,
};

use tokio_util::sync::CancellationToken;

fn chain(providers: Vec<Arc<dyn AssetProvider>>) -> AssetResolver {
    AssetResolver::new(providers)
}

fn anchor(phrase: &str, hint: &str) -> AnchorPhrase {
    AnchorPhrase {
        phrase: phrase.to_string(),
        kind: AnchorKind::Image,
        asset_hint: hint.to_string(),
        asset_ref: None,
    }
}

fn script(anchors: Vec<AnchorPhrase>) -> Script {
    Script {
        title: "t".into(),
        subtitle: "s".into(),
        scenes: vec![Scene {
            index: 1,
            narration: "narracao".into(),
            visuals: Vec::new(),
            keywords: Vec::new(),
        }],
        anchors,
    }
}

/// Records every search term it receives; answers with a fixed response.
struct RecordingProvider {
    name: String,
    terms: Mutex<Vec<String>>,
    response: Vec<String>,
}

impl RecordingProvider {
    fn new(name: &str, response: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            terms: Mutex::new(Vec::new()),
            response,
        })
    }

    fn seen_terms(&self) -> Vec<String> {
        self.terms.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetProvider for RecordingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, term: &str) -> anyhow::Result<Vec<String>> {
        self.terms.lock().unwrap().push(term.to_string());
        Ok(self.response.clone())
    }
}

#[tokio::test]
async fn first_provider_hit_fills_the_asset_ref() {
    let provider = RecordingProvider::new("alpha", vec!["https://a/1.jpg".into()]);
    let resolver = chain(vec![provider.clone()]);

    let (resolved, unresolved) = resolver
        .resolve(
            script(vec![anchor("cinco palavras bem escolhidas aqui", "binary trees")]),
            &mut QualifierRotation::default(),
            &CancellationToken::new(),
        )
        .await;

    assert!(unresolved.is_empty());
    assert_eq!(resolved.anchors[0].asset_ref.as_deref(), Some("https://a/1.jpg"));
    assert_eq!(provider.seen_terms(), vec!["binary trees"]);
}

#[tokio::test]
async fn empty_result_reformulates_with_capped_significant_words() {
    let provider = RecordingProvider::new("alpha", Vec::new());
    let resolver = chain(vec![provider.clone()]).with_attempts_per_provider(2);

    let hint = "the structure of binary search trees";
    let (_, unresolved) = resolver
        .resolve(
            script(vec![anchor("cinco palavras bem escolhidas aqui", hint)]),
            &mut QualifierRotation::new(&["diagram"]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(unresolved.len(), 1);
    let terms = provider.seen_terms();
    assert_eq!(terms[0], hint);
    // Stop-words dropped, capped at 3 words, rotating qualifier appended.
    assert_eq!(terms[1], "structure binary search diagram");
}

#[tokio::test]
async fn chain_falls_through_to_the_next_provider() {
    let empty = RecordingProvider::new("alpha", Vec::new());
    let full = RecordingProvider::new("beta", vec!["https://b/2.jpg".into()]);
    let resolver = chain(vec![empty.clone(), full.clone()]);

    let (resolved, unresolved) = resolver
        .resolve(
            script(vec![anchor("cinco palavras bem escolhidas aqui", "graph theory")]),
            &mut QualifierRotation::default(),
            &CancellationToken::new(),
        )
        .await;

    assert!(unresolved.is_empty());
    assert_eq!(resolved.anchors[0].asset_ref.as_deref(), Some("https://b/2.jpg"));
    assert_eq!(empty.seen_terms().len(), 2, "both attempts on the empty provider");
    assert_eq!(full.seen_terms().len(), 1);
}

#[tokio::test]
async fn provider_error_is_not_fatal_and_falls_through() {
    struct FailingProvider;

    #[async_trait]
    impl AssetProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn search(&self, _term: &str) -> anyhow::Result<Vec<String>> {
            Err(anyhow::anyhow!("upstream 500"))
        }
    }

    let fallback = RecordingProvider::new("beta", vec!["https://b/3.jpg".into()]);
    let resolver = chain(vec![Arc::new(FailingProvider), fallback]);

    let (resolved, unresolved) = resolver
        .resolve(
            script(vec![anchor("cinco palavras bem escolhidas aqui", "sorting")]),
            &mut QualifierRotation::default(),
            &CancellationToken::new(),
        )
        .await;

    assert!(unresolved.is_empty());
    assert!(resolved.anchors[0].asset_ref.is_some());
}

#[tokio::test]
async fn exhausted_chain_reports_unresolved_with_attempt_count() {
    let empty_a = RecordingProvider::new("alpha", Vec::new());
    let empty_b = RecordingProvider::new("beta", Vec::new());
    let resolver =
        chain(vec![empty_a, empty_b]).with_attempts_per_provider(2);

    let (resolved, unresolved) = resolver
        .resolve(
            script(vec![anchor("cinco palavras bem escolhidas aqui", "hash maps")]),
            &mut QualifierRotation::default(),
            &CancellationToken::new(),
        )
        .await;

    assert!(resolved.anchors[0].asset_ref.is_none());
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].phrase, "cinco palavras bem escolhidas aqui");
    // 2 providers x 2 attempts each.
    assert_eq!(unresolved[0].attempts, 4);
}

#[tokio::test]
async fn worker_pool_never_exceeds_the_concurrency_limit() {
    struct GaugedProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl AssetProvider for GaugedProvider {
        fn name(&self) -> &str {
            "gauged"
        }

        async fn search(&self, _term: &str) -> anyhow::Result<Vec<String>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec!["https://g/1.jpg".into()])
        }
    }

    let provider = Arc::new(GaugedProvider {
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let resolver = chain(vec![provider.clone()]).with_concurrency(2);

    let anchors = (0..8)
        .map(|i| anchor(&format!("frase numero {i} com cinco palavras"), "term"))
        .collect();
    let (resolved, unresolved) = resolver
        .resolve(script(anchors), &mut QualifierRotation::default(), &CancellationToken::new())
        .await;

    assert!(unresolved.is_empty());
    assert!(resolved.anchors.iter().all(|a| a.asset_ref.is_some()));
    assert!(provider.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn cancelled_run_keeps_resolved_refs_and_reports_the_rest() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let provider = RecordingProvider::new("alpha", vec!["https://a/1.jpg".into()]);
    let resolver = chain(vec![provider.clone()]);

    let mut already_resolved = anchor("frase antiga com cinco palavras", "old");
    already_resolved.asset_ref = Some("https://kept/0.jpg".into());
    let (resolved, unresolved) = resolver
        .resolve(
            script(vec![
                already_resolved,
                anchor("frase nova com cinco palavras", "new"),
            ]),
            &mut QualifierRotation::default(),
            &cancel,
        )
        .await;

    assert_eq!(resolved.anchors[0].asset_ref.as_deref(), Some("https://kept/0.jpg"));
    assert!(resolved.anchors[1].asset_ref.is_none());
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].phrase, "frase nova com cinco palavras");
    assert!(provider.seen_terms().is_empty());
}

#[tokio::test]
async fn qualifier_rotation_advances_across_anchors() {
    let provider = RecordingProvider::new("alpha", Vec::new());
    let resolver = chain(vec![provider.clone()]).with_attempts_per_provider(2);
    let mut rotation = QualifierRotation::new(&["diagram", "photo"]);

    let (_, unresolved) = resolver
        .resolve(
            script(vec![
                anchor("primeira frase com cinco palavras", "graphs"),
                anchor("segunda frase com cinco palavras", "graphs"),
            ]),
            &mut rotation,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(unresolved.len(), 2);
    let terms = provider.seen_terms();
    assert!(terms.contains(&"graphs diagram".to_string()));
    assert!(terms.contains(&"graphs photo".to_string()));
}
