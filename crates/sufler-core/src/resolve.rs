//! Bounded-concurrency asset resolution. Each anchor phrase is dispatched
//! to a provider chain; workers hand their result back over a channel and a
//! single aggregator task writes the refs into the script, so no shared
//! mutable state exists beyond the channel itself.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    normalize::significant_words,
    types::{Script, UnresolvedAnchor},
};

/// External asset search. Returns candidate URLs best-first; an empty list
/// is a miss, not an error.
#[async_trait]
pub trait AssetProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn search(&self, term: &str) -> anyhow::Result<Vec<String>>;
}

/// Rotating search qualifier, owned and passed in by the caller. Replaces
/// what would otherwise be process-global rotation state.
#[derive(Debug, Clone)]
pub struct QualifierRotation {
    qualifiers: Vec<String>,
    next: usize,
}

impl Default for QualifierRotation {
    fn default() -> Self {
        Self::new(&["illustration", "diagram", "concept art", "photo"])
    }
}

impl QualifierRotation {
    pub fn new(qualifiers: &[&str]) -> Self {
        assert!(!qualifiers.is_empty());
        Self {
            qualifiers: qualifiers.iter().map(|q| q.to_string()).collect(),
            next: 0,
        }
    }

    pub fn next(&mut self) -> String {
        let q = self.qualifiers[self.next % self.qualifiers.len()].clone();
        self.next += 1;
        q
    }
}

/// Search hint capped at 3 significant words plus a rotating qualifier.
fn reformulate(hint: &str, qualifier: &str) -> String {
    let mut words = significant_words(hint, 3);
    words.push(qualifier.to_string());
    words.join(" ")
}

pub struct AssetResolver {
    providers: Vec<Arc<dyn AssetProvider>>,
    concurrency: usize,
    attempts_per_provider: u32,
    call_timeout: Duration,
}

struct WorkerOutcome {
    anchor_index: usize,
    asset_ref: Option<String>,
    attempts: u32,
}

impl AssetResolver {
    pub fn new(providers: Vec<Arc<dyn AssetProvider>>) -> Self {
        Self {
            providers,
            concurrency: 3,
            attempts_per_provider: 2,
            call_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        assert!(concurrency > 0);
        self.concurrency = concurrency;
        self
    }

    pub fn with_attempts_per_provider(mut self, attempts: u32) -> Self {
        assert!(attempts > 0);
        self.attempts_per_provider = attempts;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Fill `asset_ref` on every anchor that still needs one. Anchors that
    /// exhaust the whole chain come back as `UnresolvedAnchor`; a cancelled
    /// run keeps whatever already resolved and reports the rest unresolved.
    pub async fn resolve(
        &self,
        mut script: Script,
        qualifiers: &mut QualifierRotation,
        cancel: &CancellationToken,
    ) -> (Script, Vec<UnresolvedAnchor>) {
        let pending: Vec<usize> = script
            .anchors
            .iter()
            .enumerate()
            .filter(|(_, a)| a.asset_ref.is_none())
            .map(|(i, _)| i)
            .collect();

        if pending.is_empty() || self.providers.is_empty() {
            let unresolved = pending
                .iter()
                .map(|&i| UnresolvedAnchor {
                    phrase: script.anchors[i].phrase.clone(),
                    kind: script.anchors[i].kind,
                    attempts: 0,
                })
                .collect();
            return (script, unresolved);
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<WorkerOutcome>(pending.len());

        for &anchor_index in &pending {
            let anchor = &script.anchors[anchor_index];
            // Attempt terms are fixed up front: the rotation is consumed
            // here, sequentially, never inside a worker.
            let mut terms = vec![anchor.asset_hint.clone()];
            for _ in 1..self.attempts_per_provider {
                terms.push(reformulate(&anchor.asset_hint, &qualifiers.next()));
            }

            let providers = self.providers.clone();
            let call_timeout = self.call_timeout;
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let cancel = cancel.clone();

            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("resolver semaphore closed");
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => WorkerOutcome {
                        anchor_index,
                        asset_ref: None,
                        attempts: 0,
                    },
                    o = run_chain(anchor_index, &providers, &terms, call_timeout) => o,
                };
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut unresolved = Vec::new();
        while let Some(outcome) = rx.recv().await {
            match outcome.asset_ref {
                Some(url) => script.anchors[outcome.anchor_index].asset_ref = Some(url),
                None => unresolved.push(UnresolvedAnchor {
                    phrase: script.anchors[outcome.anchor_index].phrase.clone(),
                    kind: script.anchors[outcome.anchor_index].kind,
                    attempts: outcome.attempts,
                }),
            }
        }
        unresolved.sort_by_key(|u| {
            script
                .anchors
                .iter()
                .position(|a| a.phrase == u.phrase)
                .unwrap_or(usize::MAX)
        });

        (script, unresolved)
    }
}

/// Walk the provider chain with every attempt term until one call yields a
/// candidate URL.
async fn run_chain(
    anchor_index: usize,
    providers: &[Arc<dyn AssetProvider>],
    terms: &[String],
    call_timeout: Duration,
) -> WorkerOutcome {
    let mut attempts = 0;
    for provider in providers {
        for term in terms {
            attempts += 1;
            match tokio::time::timeout(call_timeout, provider.search(term)).await {
                Ok(Ok(urls)) if !urls.is_empty() => {
                    debug!(provider = provider.name(), %term, "asset resolved");
                    return WorkerOutcome {
                        anchor_index,
                        asset_ref: urls.into_iter().next(),
                        attempts,
                    };
                }
                Ok(Ok(_)) => {
                    debug!(provider = provider.name(), %term, "empty result, reformulating");
                }
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), %term, error = %e, "provider call failed");
                }
                Err(_) => {
                    warn!(provider = provider.name(), %term, "provider call timed out");
                }
            }
        }
    }
    WorkerOutcome {
        anchor_index,
        asset_ref: None,
        attempts,
    }
}
