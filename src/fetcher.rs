use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::config::UpstreamConfig;
use crate::fallback::fallback_response;
use crate::models::NewsResponse;
use crate::query::NewsFilter;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {0}")]
    Status(StatusCode),

    #[error("upstream payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream rejected the query with status '{0}'")]
    Rejected(String),
}

/// Where a proxied response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Upstream,
    Cache,
    Fallback,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Upstream => "upstream",
            Origin::Cache => "cache",
            Origin::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Shared = Option<(NewsResponse, Origin)>;

pub struct NewsFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    cache: ResponseCache<NewsFilter, NewsResponse>,
    /// Upstream requests currently running, so identical misses share one.
    inflight: Mutex<HashMap<NewsFilter, watch::Receiver<Shared>>>,
}

/// Clears the in-flight slot even if the leading request is cancelled.
struct InflightSlot<'a> {
    inflight: &'a Mutex<HashMap<NewsFilter, watch::Receiver<Shared>>>,
    key: &'a NewsFilter,
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.key);
    }
}

impl NewsFetcher {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("NewsPulse/1.0 (News Aggregator)")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            cache: ResponseCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.max_cache_entries,
            ),
            inflight: Mutex::new(HashMap::new()),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// Serve from cache, then upstream, then the placeholder set. Never fails.
    ///
    /// Concurrent misses for the same key wait on a single upstream request.
    pub async fn fetch(&self, filter: &NewsFilter) -> (NewsResponse, Origin) {
        let key = filter.cache_key();
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Serving '{}' from cache", filter.topic());
            return (cached, Origin::Cache);
        }

        let leader = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match inflight.get(&key) {
                Some(rx) => Err(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    inflight.insert(key.clone(), rx);
                    Ok(tx)
                }
            }
        };

        match leader {
            Ok(tx) => {
                let _slot = InflightSlot {
                    inflight: &self.inflight,
                    key: &key,
                };
                let result = self.fetch_fresh(filter, &key).await;
                tx.send_replace(Some(result.clone()));
                result
            }
            Err(mut rx) => {
                debug!("Waiting on in-flight request for '{}'", filter.topic());
                let shared = rx.wait_for(Option::is_some).await.ok().and_then(|r| (*r).clone());
                match shared {
                    Some(result) => result,
                    // The leading request was cancelled before it answered.
                    None => self.fetch_fresh(filter, &key).await,
                }
            }
        }
    }

    async fn fetch_fresh(&self, filter: &NewsFilter, key: &NewsFilter) -> (NewsResponse, Origin) {
        match self.fetch_upstream(filter).await {
            Ok(response) => {
                info!(
                    "Fetched {} articles for '{}'",
                    response.articles.len(),
                    filter.topic()
                );
                self.cache.insert(key.clone(), response.clone()).await;
                (response, Origin::Upstream)
            }
            Err(e) => {
                warn!(
                    "Upstream fetch for '{}' failed, serving fallback: {}",
                    filter.topic(),
                    e
                );
                (fallback_response(filter.topic(), Utc::now()), Origin::Fallback)
            }
        }
    }

    pub async fn fetch_upstream(&self, filter: &NewsFilter) -> Result<NewsResponse, FetchError> {
        let url = filter.upstream_url(&self.base_url, &self.api_key)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let payload: NewsResponse = serde_json::from_slice(&bytes)?;
        if !payload.is_ok() {
            return Err(FetchError::Rejected(payload.status));
        }

        Ok(payload)
    }
}
