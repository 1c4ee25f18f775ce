use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::fetcher::{NewsFetcher, Origin};
use crate::format::ArticleView;
use crate::models::NewsResponse;
use crate::query::{Category, FilterError, NewsFilter, NewsQuery, SortBy};

pub const ORIGIN_HEADER: &str = "x-news-origin";

pub struct AppState {
    pub fetcher: Arc<NewsFetcher>,
    pub poll_interval_secs: u64,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/articles", get(articles))
        .route("/api/news", get(api_news))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub keywords: String,
    pub categories: Vec<SelectOption>,
    pub sort_options: Vec<SelectOption>,
    pub poll_interval_secs: u64,
    pub articles: Vec<ArticleView>,
    pub last_updated: String,
}

#[derive(Template)]
#[template(path = "articles.html")]
pub struct ArticlesTemplate {
    /// Keywords the list was fetched with; polling reuses them, not the live search box.
    pub keywords: String,
    pub articles: Vec<ArticleView>,
    pub last_updated: String,
}

pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn category_options(selected: Option<Category>) -> Vec<SelectOption> {
    let mut options = vec![SelectOption {
        value: "",
        label: "All",
        selected: selected.is_none(),
    }];
    options.extend(Category::ALL.into_iter().map(|c| SelectOption {
        value: c.as_str(),
        label: c.label(),
        selected: selected == Some(c),
    }));
    options
}

fn sort_options(selected: SortBy) -> Vec<SelectOption> {
    SortBy::ALL
        .into_iter()
        .map(|s| SelectOption {
            value: s.as_str(),
            label: s.label(),
            selected: s == selected,
        })
        .collect()
}

fn render_articles(response: &NewsResponse) -> (Vec<ArticleView>, String) {
    let now = Utc::now();
    (
        ArticleView::list(&response.articles, now),
        now.format("%H:%M:%S UTC").to_string(),
    )
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, format!("Error: {}", self.message)).into_response()
    }
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }
}

// Route handlers
pub async fn api_news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = NewsFilter::from_query(query)?;
    let (response, origin) = state.fetcher.fetch(&filter).await;

    // Placeholder articles must not outlive the outage that produced them.
    let cache_control = match origin {
        Origin::Fallback => "no-store".to_string(),
        Origin::Upstream | Origin::Cache => {
            format!("public, max-age={}", state.fetcher.cache_ttl().as_secs())
        }
    };
    let headers = [
        (ORIGIN_HEADER, origin.as_str().to_string()),
        ("cache-control", cache_control),
    ];

    Ok((headers, Json(response)))
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = NewsFilter::from_query(query)?;
    let (response, _) = state.fetcher.fetch(&filter).await;
    let (articles, last_updated) = render_articles(&response);

    Ok(HtmlTemplate(IndexTemplate {
        keywords: filter.keywords.clone(),
        categories: category_options(filter.category),
        sort_options: sort_options(filter.sort_by),
        poll_interval_secs: state.poll_interval_secs,
        articles,
        last_updated,
    }))
}

pub async fn articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = NewsFilter::from_query(query)?;
    let (response, _) = state.fetcher.fetch(&filter).await;
    let (articles, last_updated) = render_articles(&response);

    Ok(HtmlTemplate(ArticlesTemplate {
        keywords: filter.keywords.clone(),
        articles,
        last_updated,
    }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
