use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::fetcher::FetchService;
use crate::registry::{FeedDescriptor, FeedRegistry};
use crate::render::{render_feed, SharedContainer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("feed index {index} out of range (registry has {len} feeds)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// How a single load ended. Delivered exactly once per accepted load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { feed: String, entries: usize },
    Failed { feed: String, reason: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// Completion of an in-flight load.
#[derive(Debug)]
pub struct LoadHandle {
    feed: String,
    rx: oneshot::Receiver<LoadOutcome>,
}

impl LoadHandle {
    /// Wait for the load to finish. The container has already been updated
    /// by the time this resolves with `Loaded`.
    pub async fn wait(self) -> LoadOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => LoadOutcome::Failed {
                feed: self.feed,
                reason: "load task ended without completing".to_string(),
            },
        }
    }
}

/// Loads one feed at a time from the registry into the render container.
pub struct FeedLoader<F> {
    registry: Arc<FeedRegistry>,
    fetcher: Arc<F>,
    container: SharedContainer,
}

impl<F> Clone for FeedLoader<F> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            fetcher: self.fetcher.clone(),
            container: self.container.clone(),
        }
    }
}

impl<F: FetchService + 'static> FeedLoader<F> {
    pub fn new(registry: Arc<FeedRegistry>, fetcher: Arc<F>, container: SharedContainer) -> Self {
        Self {
            registry,
            fetcher,
            container,
        }
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub fn container(&self) -> &SharedContainer {
        &self.container
    }

    /// Start loading the feed at `index` and return immediately.
    ///
    /// `on_complete` runs exactly once, after the container has been
    /// replaced on success or left untouched on failure. An out-of-range
    /// index is rejected up front and `on_complete` is never called.
    ///
    /// Overlapping loads are not sequenced: whichever finishes last decides
    /// what the container shows.
    pub fn load_feed_with<C>(&self, index: usize, on_complete: C) -> Result<(), LoadError>
    where
        C: FnOnce(LoadOutcome) + Send + 'static,
    {
        let feed = self.descriptor(index)?.clone();
        let fetcher = self.fetcher.clone();
        let container = self.container.clone();

        let feed_name = feed.name.clone();
        let load = tokio::spawn(async move { run_load(fetcher.as_ref(), &container, &feed).await });

        // A panicking fetch must still complete the load
        tokio::spawn(async move {
            let outcome = match load.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Load task for feed '{}' died: {}", feed_name, e);
                    LoadOutcome::Failed {
                        feed: feed_name,
                        reason: "load task panicked".to_string(),
                    }
                }
            };
            on_complete(outcome);
        });

        Ok(())
    }

    /// Like [`load_feed_with`](Self::load_feed_with), with completion
    /// delivered through the returned handle.
    pub fn load_feed(&self, index: usize) -> Result<LoadHandle, LoadError> {
        let feed = self.descriptor(index)?.name.clone();
        let (tx, rx) = oneshot::channel();
        self.load_feed_with(index, move |outcome| {
            // Receiver may have been dropped by a caller that stopped waiting
            let _ = tx.send(outcome);
        })?;

        Ok(LoadHandle { feed, rx })
    }

    fn descriptor(&self, index: usize) -> Result<&FeedDescriptor, LoadError> {
        self.registry.get(index).ok_or_else(|| {
            let err = LoadError::IndexOutOfRange {
                index,
                len: self.registry.len(),
            };
            error!("Rejected feed load: {}", err);
            err
        })
    }
}

async fn run_load<F: FetchService>(
    fetcher: &F,
    container: &SharedContainer,
    feed: &FeedDescriptor,
) -> LoadOutcome {
    let entries = match fetcher.fetch(&feed.source).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to load feed '{}': {}", feed.name, e);
            return LoadOutcome::Failed {
                feed: feed.name.clone(),
                reason: e.to_string(),
            };
        }
    };

    let rendered = match render_feed(feed, &entries) {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!("Failed to render feed '{}': {}", feed.name, e);
            return LoadOutcome::Failed {
                feed: feed.name.clone(),
                reason: e.to_string(),
            };
        }
    };

    container.write().await.replace(rendered);

    info!("Loaded {} entries for feed '{}'", entries.len(), feed.name);
    LoadOutcome::Loaded {
        feed: feed.name.clone(),
        entries: entries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{EntryRecord, FetchError};
    use crate::render::RenderContainer;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify};
    use tokio_test::{assert_err, assert_ok};

    /// Serves canned entries per source; a gated source waits for its
    /// `Notify` before answering.
    #[derive(Default)]
    struct StubFetcher {
        feeds: HashMap<String, Vec<EntryRecord>>,
        gates: HashMap<String, Arc<Notify>>,
    }

    impl StubFetcher {
        fn with_feed(mut self, source: &str, titles: &[&str]) -> Self {
            let entries = titles
                .iter()
                .map(|title| EntryRecord {
                    title: title.to_string(),
                    link: format!("https://{}/{}", source, title),
                    content: format!("{} content", title),
                    published: None,
                })
                .collect();
            self.feeds.insert(source.to_string(), entries);
            self
        }

        fn gated(mut self, source: &str) -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            self.gates.insert(source.to_string(), gate.clone());
            (self, gate)
        }
    }

    impl FetchService for StubFetcher {
        fn fetch(
            &self,
            source: &str,
        ) -> impl Future<Output = Result<Vec<EntryRecord>, FetchError>> + Send {
            let result = self
                .feeds
                .get(source)
                .cloned()
                .ok_or(FetchError::HttpStatus(503));
            let gate = self.gates.get(source).cloned();
            async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                result
            }
        }
    }

    fn registry() -> Arc<FeedRegistry> {
        Arc::new(
            FeedRegistry::new(vec![
                FeedDescriptor::new("A", "urlA"),
                FeedDescriptor::new("B", "urlB"),
                FeedDescriptor::new("Broken", "urlBroken"),
                FeedDescriptor::new("Empty", "urlEmpty"),
            ])
            .unwrap(),
        )
    }

    fn default_stub() -> StubFetcher {
        StubFetcher::default()
            .with_feed("urlA", &["a1", "a2"])
            .with_feed("urlB", &["b1"])
            .with_feed("urlEmpty", &[])
    }

    fn loader(fetcher: StubFetcher) -> FeedLoader<StubFetcher> {
        FeedLoader::new(registry(), Arc::new(fetcher), RenderContainer::shared())
    }

    #[tokio::test]
    async fn test_initial_load_renders_entries() {
        let loader = loader(default_stub());

        let outcome = assert_ok!(loader.load_feed(0)).wait().await;

        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                feed: "A".to_string(),
                entries: 2
            }
        );
        let container = loader.container().read().await;
        assert!(container.has_entries());
        assert_eq!(container.entry_count(), 2);
        assert_eq!(container.title(), Some("A"));
    }

    #[tokio::test]
    async fn test_new_feed_changes_content() {
        let loader = loader(default_stub());

        assert!(loader.load_feed(0).unwrap().wait().await.is_loaded());
        let first = loader.container().read().await.html().to_string();

        assert!(loader.load_feed(1).unwrap().wait().await.is_loaded());
        let second = loader.container().read().await.html().to_string();

        assert!(!first.is_empty());
        assert!(!second.is_empty());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_callback_fires_once_after_container_update() {
        let loader = loader(default_stub());
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let container = loader.container().clone();
        let counter = calls.clone();
        assert_ok!(loader.load_feed_with(0, move |outcome| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Nothing holds the write lock once the container is updated
            let seen = container.try_read().map(|c| c.entry_count()).ok();
            let _ = tx.send((outcome, seen));
        }));

        let (outcome, seen) = rx.recv().await.unwrap();
        assert!(outcome.is_loaded());
        assert_eq!(seen, Some(2));

        // Sender was moved into the callback; the channel closes once it has run
        assert!(rx.recv().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_returns_before_fetch_finishes() {
        let (stub, gate) = default_stub().gated("urlA");
        let loader = loader(stub);

        let handle = loader.load_feed(0).unwrap();
        tokio::task::yield_now().await;
        assert!(!loader.container().read().await.has_entries());

        gate.notify_one();
        assert!(handle.wait().await.is_loaded());
        assert!(loader.container().read().await.has_entries());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_content() {
        let loader = loader(default_stub());
        loader.load_feed(0).unwrap().wait().await;
        let before = loader.container().read().await.html().to_string();

        let outcome = loader.load_feed(2).unwrap().wait().await;

        match outcome {
            LoadOutcome::Failed { feed, reason } => {
                assert_eq!(feed, "Broken");
                assert!(reason.contains("503"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
        let container = loader.container().read().await;
        assert_eq!(container.html(), before);
        assert_eq!(container.title(), Some("A"));
    }

    #[tokio::test]
    async fn test_failed_fetch_on_empty_container_still_completes() {
        let loader = loader(default_stub());
        let (tx, rx) = oneshot::channel();

        loader.load_feed_with(2, move |outcome| {
            let _ = tx.send(outcome);
        })
        .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.is_loaded());
        assert_eq!(loader.container().read().await.html(), "");
    }

    struct PanickingFetcher;

    impl FetchService for PanickingFetcher {
        fn fetch(
            &self,
            source: &str,
        ) -> impl Future<Output = Result<Vec<EntryRecord>, FetchError>> + Send {
            let source = source.to_string();
            async move {
                if !source.is_empty() {
                    panic!("fetch of {} blew up", source);
                }
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn test_callback_fires_when_fetch_panics() {
        let loader = FeedLoader::new(
            registry(),
            Arc::new(PanickingFetcher),
            RenderContainer::shared(),
        );
        let (tx, rx) = oneshot::channel();

        assert_ok!(loader.load_feed_with(0, move |outcome| {
            let _ = tx.send(outcome);
        }));

        let outcome = tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Failed {
                feed: "A".to_string(),
                reason: "load task panicked".to_string()
            }
        );
        assert_eq!(loader.container().read().await.html(), "");
    }

    #[tokio::test]
    async fn test_handle_resolves_when_fetch_panics() {
        let loader = FeedLoader::new(
            registry(),
            Arc::new(PanickingFetcher),
            RenderContainer::shared(),
        );

        let outcome = loader.load_feed(1).unwrap().wait().await;

        assert!(!outcome.is_loaded());
    }

    #[tokio::test]
    async fn test_empty_feed_replaces_content() {
        let loader = loader(default_stub());
        loader.load_feed(0).unwrap().wait().await;

        let outcome = loader.load_feed(3).unwrap().wait().await;

        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                feed: "Empty".to_string(),
                entries: 0
            }
        );
        let container = loader.container().read().await;
        assert!(!container.has_entries());
        assert_eq!(container.title(), Some("Empty"));
    }

    #[tokio::test]
    async fn test_out_of_range_index_fails_fast() {
        let loader = loader(default_stub());
        let called = Arc::new(AtomicUsize::new(0));
        let counter = called.clone();

        let err = assert_err!(loader.load_feed_with(4, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(err, LoadError::IndexOutOfRange { index: 4, len: 4 });

        assert_err!(loader.load_feed(99));

        tokio::task::yield_now().await;
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_last_completed_load_wins() {
        let (stub, gate_a) = default_stub().gated("urlA");
        let loader = loader(stub);

        let slow_a = loader.load_feed(0).unwrap();
        let fast_b = loader.load_feed(1).unwrap();

        assert!(fast_b.wait().await.is_loaded());
        assert_eq!(loader.container().read().await.title(), Some("B"));

        gate_a.notify_one();
        assert!(slow_a.wait().await.is_loaded());
        assert_eq!(loader.container().read().await.title(), Some("A"));
    }

    #[test]
    fn test_load_error_message() {
        let err = LoadError::IndexOutOfRange { index: 7, len: 2 };
        assert_eq!(
            err.to_string(),
            "feed index 7 out of range (registry has 2 feeds)"
        );
    }
}
