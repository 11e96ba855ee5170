//! Asset preload cache for batch rendering.
//!
//! Before a batch job renders N rows x M image elements, every unique image
//! URL is fetched and decoded exactly once; the render pass then reads
//! decoded images synchronously. The cache is an explicit, injectable
//! instance (no hidden module-level singleton) with a `clear()` lifecycle -
//! callers reset it between unrelated jobs.
//!
//! Concurrency-dedup invariant: overlapping [`AssetCache::preload_all`]
//! calls share one underlying load per URL. The first caller registers an
//! in-flight marker and fetches; later callers await the same completion
//! signal.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{EngineError, EngineResult};

/// Per-URL load timeout.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// A decoded image ready for painting.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel).
    pub rgba: Vec<u8>,
}

/// Decode raw bytes into RGBA pixels.
///
/// # Errors
///
/// Returns [`EngineError::Decode`] if the bytes are not a decodable image.
pub fn decode_image(bytes: &[u8]) -> EngineResult<DecodedImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| EngineError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Decode a base64 `data:` URI into RGBA pixels.
///
/// Supports `data:image/png;base64,iVBORw0KGgo...` style sources embedded
/// directly in templates.
///
/// # Errors
///
/// Returns [`EngineError::Decode`] if the URI is malformed, not base64, or
/// the payload is not a decodable image.
pub fn decode_data_uri(uri: &str) -> EngineResult<DecodedImage> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| EngineError::Decode("not a data URI".to_string()))?;
    let comma = rest
        .find(',')
        .ok_or_else(|| EngineError::Decode("data URI missing comma".to_string()))?;
    let (metadata, payload) = rest.split_at(comma);
    if !metadata.contains(";base64") {
        return Err(EngineError::Decode(
            "only base64 data URIs are supported".to_string(),
        ));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&payload[1..])
        .map_err(|e| EngineError::Decode(format!("invalid base64: {e}")))?;
    decode_image(&bytes)
}

/// Source of raw asset bytes. All I/O is delegated through this seam.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch the raw bytes behind a URL.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AssetLoad`] on network or protocol failure.
    async fn fetch(&self, url: &str) -> EngineResult<Vec<u8>>;
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Successfully loaded and decoded URLs.
    pub loaded: u64,
    /// URLs marked failed (network, decode or timeout).
    pub failed: u64,
    /// Synchronous `get` hits.
    pub hits: u64,
    /// Synchronous `get` misses.
    pub misses: u64,
    /// Loads skipped because the URL was already in flight.
    pub deduped: u64,
}

/// Mutable cache state behind the lock.
struct CacheInner {
    /// Decoded images by URL.
    images: HashMap<String, Arc<DecodedImage>>,
    /// URLs whose last load failed. Retried only on an explicit
    /// `preload_all` call.
    failed: HashSet<String>,
    /// Completion signals for in-flight loads.
    in_flight: HashMap<String, watch::Receiver<bool>>,
    /// Running statistics.
    stats: CacheStats,
}

/// Deduplicating URL -> decoded image cache.
pub struct AssetCache {
    /// Byte source for non-data URLs.
    fetcher: Arc<dyn AssetFetcher>,
    /// Per-URL load timeout.
    timeout: Duration,
    /// Cache state. Never held across an await.
    inner: Mutex<CacheInner>,
}

impl AssetCache {
    /// Create a cache with the default 30s per-URL timeout.
    #[must_use]
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self::with_timeout(fetcher, DEFAULT_LOAD_TIMEOUT)
    }

    /// Create a cache with a custom per-URL timeout.
    #[must_use]
    pub fn with_timeout(fetcher: Arc<dyn AssetFetcher>, timeout: Duration) -> Self {
        Self {
            fetcher,
            timeout,
            inner: Mutex::new(CacheInner {
                images: HashMap::new(),
                failed: HashSet::new(),
                in_flight: HashMap::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Fetch and decode every unique URL not already cached.
    ///
    /// Duplicates in the input are collapsed; URLs already cached are
    /// skipped; URLs being loaded by a concurrent call are awaited, not
    /// re-fetched. Individual failures are logged and marked, never
    /// propagated - a bad URL does not fail the batch.
    pub async fn preload_all(&self, urls: &[String]) {
        let mut to_load: Vec<(String, watch::Sender<bool>)> = Vec::new();
        let mut waiters: Vec<watch::Receiver<bool>> = Vec::new();
        {
            let mut inner = self.lock();
            let mut seen = HashSet::new();
            for url in urls {
                if url.is_empty() || !seen.insert(url.as_str()) {
                    continue;
                }
                if inner.images.contains_key(url.as_str()) {
                    continue;
                }
                if let Some(rx) = inner.in_flight.get(url.as_str()).cloned() {
                    inner.stats.deduped += 1;
                    waiters.push(rx);
                    continue;
                }
                let (tx, rx) = watch::channel(false);
                inner.in_flight.insert(url.clone(), rx);
                to_load.push((url.clone(), tx));
            }
        }

        let loads = to_load.into_iter().map(|(url, tx)| async move {
            let outcome = self.load_one(&url).await;
            {
                let mut inner = self.lock();
                match outcome {
                    Ok(decoded) => {
                        inner.failed.remove(&url);
                        inner.images.insert(url.clone(), Arc::new(decoded));
                        inner.stats.loaded += 1;
                    }
                    Err(e) => {
                        tracing::warn!("asset preload failed for {url}: {e}");
                        inner.failed.insert(url.clone());
                        inner.stats.failed += 1;
                    }
                }
                inner.in_flight.remove(&url);
            }
            let _ = tx.send(true);
        });
        futures::future::join_all(loads).await;

        // Wait for loads owned by concurrent callers.
        for mut rx in waiters {
            while !*rx.borrow() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Load and decode one URL, bounded by the cache timeout.
    async fn load_one(&self, url: &str) -> EngineResult<DecodedImage> {
        if url.starts_with("data:") {
            return decode_data_uri(url);
        }
        let bytes = tokio::time::timeout(self.timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| EngineError::AssetTimeout(url.to_string()))??;
        decode_image(&bytes)
    }

    /// Get a decoded image synchronously.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Arc<DecodedImage>> {
        let mut inner = self.lock();
        let found = inner.images.get(url).cloned();
        if found.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        found
    }

    /// Check whether a URL is cached.
    #[must_use]
    pub fn has(&self, url: &str) -> bool {
        self.lock().images.contains_key(url)
    }

    /// Check whether a URL's last load failed.
    #[must_use]
    pub fn is_failed(&self, url: &str) -> bool {
        self.lock().failed.contains(url)
    }

    /// Number of cached images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().images.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().images.is_empty()
    }

    /// Drop all cached and failed entries.
    ///
    /// Must be called between unrelated batch jobs to bound memory and
    /// avoid stale-URL confusion. In-flight loads complete normally.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.images.clear();
        inner.failed.clear();
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    /// Lock the cache state, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// HTTP fetcher backed by `reqwest`.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Create a fetcher with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> EngineResult<Vec<u8>> {
        let into_error = |e: reqwest::Error| EngineError::AssetLoad {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(into_error)?
            .error_for_status()
            .map_err(into_error)?;
        let bytes = response.bytes().await.map_err(into_error)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// 1x1 red PNG.
    const TINY_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    fn tiny_png() -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(TINY_PNG_B64)
            .expect("valid base64")
    }

    /// Serves the tiny PNG for every URL except those containing "bad",
    /// counting fetches per URL.
    struct CountingFetcher {
        fetches: AtomicUsize,
        delay: Duration,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl AssetFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> EngineResult<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if url.contains("bad") {
                return Err(EngineError::AssetLoad {
                    url: url.to_string(),
                    reason: "404".to_string(),
                });
            }
            Ok(tiny_png())
        }
    }

    #[tokio::test]
    async fn test_duplicate_urls_fetch_once() {
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher.clone());

        let url = "https://img.example/a.png".to_string();
        cache
            .preload_all(&[url.clone(), url.clone(), url.clone()])
            .await;

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
        let decoded = cache.get(&url).expect("cached");
        assert_eq!(decoded.width, 1);
        assert_eq!(decoded.height, 1);
    }

    #[tokio::test]
    async fn test_already_cached_not_refetched() {
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher.clone());
        let url = "https://img.example/a.png".to_string();

        cache.preload_all(std::slice::from_ref(&url)).await;
        cache.preload_all(std::slice::from_ref(&url)).await;

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_preloads_share_loads() {
        let fetcher = Arc::new(CountingFetcher::with_delay(Duration::from_millis(5)));
        let cache = AssetCache::new(fetcher.clone());

        let a = "https://img.example/a.png".to_string();
        let b = "https://img.example/b.png".to_string();
        let first = vec![a.clone(), b.clone()];
        let second = vec![a.clone()];

        tokio::join!(cache.preload_all(&first), cache.preload_all(&second));

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
        assert!(cache.has(&a));
        assert!(cache.has(&b));
        assert!(cache.stats().deduped >= 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_poison_batch() {
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher);

        let good = "https://img.example/good.png".to_string();
        let bad = "https://img.example/bad.png".to_string();
        cache.preload_all(&[bad.clone(), good.clone()]).await;

        assert!(cache.has(&good));
        assert!(!cache.has(&bad));
        assert!(cache.is_failed(&bad));
        let stats = cache.stats();
        assert_eq!(stats.loaded, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_failed_url_retried_on_explicit_call() {
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher.clone());
        let bad = "https://img.example/bad.png".to_string();

        cache.preload_all(std::slice::from_ref(&bad)).await;
        cache.preload_all(std::slice::from_ref(&bad)).await;

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_failed() {
        struct HangingFetcher;

        #[async_trait]
        impl AssetFetcher for HangingFetcher {
            async fn fetch(&self, _url: &str) -> EngineResult<Vec<u8>> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }

        let cache =
            AssetCache::with_timeout(Arc::new(HangingFetcher), Duration::from_millis(50));
        let url = "https://img.example/slow.png".to_string();
        cache.preload_all(std::slice::from_ref(&url)).await;

        assert!(cache.is_failed(&url));
        assert!(!cache.has(&url));
    }

    #[tokio::test]
    async fn test_data_uri_decoded_without_fetch() {
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher.clone());
        let uri = format!("data:image/png;base64,{TINY_PNG_B64}");

        cache.preload_all(std::slice::from_ref(&uri)).await;

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 0);
        assert!(cache.has(&uri));
    }

    #[tokio::test]
    async fn test_clear_resets_entries() {
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher);
        let url = "https://img.example/a.png".to_string();
        cache.preload_all(std::slice::from_ref(&url)).await;
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&url).is_none());
    }

    #[test]
    fn test_decode_data_uri_rejects_malformed() {
        assert!(decode_data_uri("not a uri").is_err());
        assert!(decode_data_uri("data:image/png").is_err());
        assert!(decode_data_uri("data:image/png;base64,!!!").is_err());
    }
}
