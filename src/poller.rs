//! Client-side polling loop.
//!
//! A [`Poller`] owns the filter state and the auto-refresh timer. It fetches
//! once when spawned, again whenever the filter changes, and every `period`
//! while auto-refresh is on. Observers follow the result through a
//! [`watch::Receiver<ViewState>`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::NewsSource;
use crate::models::{Article, NewsResponse};
use crate::query::{Category, NewsFilter, SortBy, DEFAULT_KEYWORDS};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub loading: bool,
    pub articles: Vec<Article>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ViewState {
    /// Full-page loading indicator: only while nothing has been shown yet.
    pub fn show_spinner(&self) -> bool {
        self.loading && self.articles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Controls {
    filter: NewsFilter,
    auto_refresh: bool,
}

pub struct Poller {
    controls: watch::Sender<Controls>,
    view: watch::Receiver<ViewState>,
    refresh: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn(
        source: Arc<dyn NewsSource>,
        filter: NewsFilter,
        auto_refresh: bool,
        period: Duration,
    ) -> Self {
        let (controls, controls_rx) = watch::channel(Controls {
            filter,
            auto_refresh,
        });
        let (view_tx, view) = watch::channel(ViewState::default());
        let refresh = Arc::new(Notify::new());

        let task = tokio::spawn(run(source, controls_rx, view_tx, refresh.clone(), period));

        Self {
            controls,
            view,
            refresh,
            task: Some(task),
        }
    }

    pub fn filter(&self) -> NewsFilter {
        self.controls.borrow().filter.clone()
    }

    pub fn set_filter(&self, filter: NewsFilter) {
        self.update_filter(|f| *f = filter);
    }

    /// Blank input falls back to the default keywords, like the proxy does.
    pub fn set_keywords(&self, keywords: &str) {
        let keywords = match keywords.trim() {
            "" => DEFAULT_KEYWORDS.to_string(),
            k => k.to_string(),
        };
        self.update_filter(|f| f.keywords = keywords);
    }

    pub fn set_category(&self, category: Option<Category>) {
        self.update_filter(|f| f.category = category);
    }

    pub fn set_sort_by(&self, sort_by: SortBy) {
        self.update_filter(|f| f.sort_by = sort_by);
    }

    pub fn auto_refresh(&self) -> bool {
        self.controls.borrow().auto_refresh
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        self.controls.send_if_modified(|c| {
            if c.auto_refresh == enabled {
                return false;
            }
            c.auto_refresh = enabled;
            true
        });
    }

    /// Flip auto-refresh and return the new setting.
    pub fn toggle_auto_refresh(&self) -> bool {
        let enabled = !self.auto_refresh();
        self.set_auto_refresh(enabled);
        enabled
    }

    /// Fetch now, regardless of the timer.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.view.clone()
    }

    pub fn state(&self) -> ViewState {
        self.view.borrow().clone()
    }

    /// Stop polling and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    fn update_filter(&self, change: impl FnOnce(&mut NewsFilter)) {
        self.controls.send_if_modified(|c| {
            let before = c.filter.clone();
            change(&mut c.filter);
            c.filter != before
        });
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    source: Arc<dyn NewsSource>,
    mut controls: watch::Receiver<Controls>,
    view: watch::Sender<ViewState>,
    refresh: Arc<Notify>,
    period: Duration,
) {
    loop {
        let current = controls.borrow_and_update().clone();
        view.send_modify(|v| v.loading = true);

        // A response for a filter the user has already left is never shown.
        let result = tokio::select! {
            result = source.fetch(&current.filter) => result,
            changed = filter_changed(&mut controls, &current.filter) => {
                if changed.is_err() {
                    debug!("Poller controls dropped, stopping");
                    return;
                }
                debug!("Filter changed mid-fetch, dropping request for '{}'", current.filter.topic());
                continue;
            }
        };
        apply(&view, &current.filter, result);

        let mut auto_refresh = controls.borrow().auto_refresh;
        let mut deadline = auto_refresh.then(|| Instant::now() + period);

        loop {
            tokio::select! {
                changed = controls.changed() => {
                    if changed.is_err() {
                        debug!("Poller controls dropped, stopping");
                        return;
                    }
                    let next = controls.borrow().clone();
                    if next.filter != current.filter {
                        break;
                    }
                    if next.auto_refresh != auto_refresh {
                        auto_refresh = next.auto_refresh;
                        deadline = auto_refresh.then(|| Instant::now() + period);
                        debug!("Auto-refresh {}", if auto_refresh { "enabled" } else { "disabled" });
                    }
                }
                _ = wait_until(deadline) => break,
                _ = refresh.notified() => break,
            }
        }
    }
}

/// Resolves once the filter differs from `filter`. Auto-refresh toggles are
/// consumed here; the caller rereads the setting afterwards.
async fn filter_changed(
    controls: &mut watch::Receiver<Controls>,
    filter: &NewsFilter,
) -> Result<(), watch::error::RecvError> {
    loop {
        controls.changed().await?;
        if controls.borrow().filter != *filter {
            return Ok(());
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn apply(view: &watch::Sender<ViewState>, filter: &NewsFilter, result: anyhow::Result<NewsResponse>) {
    view.send_modify(|v| {
        v.loading = false;
        match result {
            Ok(response) if response.is_ok() => {
                debug!(
                    "Loaded {} articles for '{}'",
                    response.articles.len(),
                    filter.topic()
                );
                v.articles = response.articles;
                v.last_updated = Some(Utc::now());
                v.last_error = None;
            }
            Ok(response) => {
                warn!("News server answered with status '{}'", response.status);
                v.last_error = Some(format!("server answered with status '{}'", response.status));
            }
            Err(e) => {
                warn!("Error fetching news: {}", e);
                v.last_error = Some(e.to_string());
            }
        }
    });
}
