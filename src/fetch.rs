use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::config::Settings;
use crate::error::FetchError;

/// One page fetched by [`Fetcher::fetch_all`].
pub struct FetchOutcome {
    pub url: String,
    pub body: Result<String, FetchError>,
    pub latency_ms: u64,
}

/// HTTP client with a per-process page cache. One attempt per URL.
pub struct Fetcher {
    client: reqwest::Client,
    cache: Mutex<TtlCache<String>>,
    concurrency: usize,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Fetcher {
            client,
            cache: Mutex::new(TtlCache::new(Duration::from_secs(settings.cache_ttl_secs))),
            concurrency: settings.concurrency.max(1),
        })
    }

    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        if let Some(body) = self.cached(url) {
            debug!(url, "cache hit");
            return Ok(body);
        }

        let http = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url).send().await.map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await.map_err(http)?;

        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url, body.clone());
        Ok(body)
    }

    fn cached(&self, url: &str) -> Option<String> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(url)
    }

    /// Fetch every URL with bounded concurrency. Outcomes come back in the
    /// order of `urls`.
    pub async fn fetch_all(
        self: &Arc<Self>,
        urls: Vec<String>,
        progress: bool,
    ) -> Vec<FetchOutcome> {
        let total = urls.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let pb = if progress {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
                .map(|s| s.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        // Workers send results, this loop collects them
        let (tx, mut rx) =
            tokio::sync::mpsc::channel::<(usize, FetchOutcome)>(self.concurrency * 2);

        for (i, url) in urls.iter().cloned().enumerate() {
            let fetcher = Arc::clone(self);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return;
                };
                let t0 = Instant::now();
                let body = fetcher.fetch_html(&url).await;
                if let Err(e) = &body {
                    warn!("Fetch failed for {}: {}", url, e);
                }
                let outcome = FetchOutcome {
                    url,
                    body,
                    latency_ms: t0.elapsed().as_millis() as u64,
                };
                let _ = tx.send((i, outcome)).await;
            });
        }

        // Drop our copy of tx so rx closes when all spawned tasks finish
        drop(tx);

        let mut slots: Vec<Option<FetchOutcome>> = (0..total).map(|_| None).collect();
        let mut errors = 0usize;
        while let Some((i, outcome)) = rx.recv().await {
            if outcome.body.is_err() {
                errors += 1;
            }
            slots[i] = Some(outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!("Fetched {} pages ({} errors)", total, errors);
        fill_missing(urls, slots)
    }
}

/// A slot left empty means its task died before reporting; keep the URL as an
/// error instead of losing it.
fn fill_missing(urls: Vec<String>, slots: Vec<Option<FetchOutcome>>) -> Vec<FetchOutcome> {
    urls.into_iter()
        .zip(slots)
        .map(|(url, slot)| {
            slot.unwrap_or_else(|| {
                warn!("Fetch task for {} ended without a result", url);
                FetchOutcome {
                    body: Err(FetchError::Incomplete { url: url.clone() }),
                    url,
                    latency_ms: 0,
                }
            })
        })
        .collect()
}
