use chrono::{DateTime, Utc};

use crate::models::Article;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Human distance between `then` and `now`, e.g. "about 3 hours ago".
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }

    let minutes = (secs + MINUTE / 2) / MINUTE;
    let phrase = if secs < 30 {
        "less than a minute".to_string()
    } else if minutes < 45 {
        plural(minutes.max(1), "minute")
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if secs < DAY {
        format!("about {}", plural((secs + HOUR / 2) / HOUR, "hour"))
    } else if secs < 42 * HOUR {
        "1 day".to_string()
    } else if secs < MONTH {
        plural((secs + DAY / 2) / DAY, "day")
    } else if secs < 45 * DAY {
        "about 1 month".to_string()
    } else if secs < YEAR {
        plural(((secs + MONTH / 2) / MONTH).max(2), "month")
    } else {
        format!("about {}", plural(secs / YEAR, "year"))
    };

    format!("{} ago", phrase)
}

/// Display projection of an article for the HTML page and the terminal client.
pub struct ArticleView {
    pub source: String,
    pub title: String,
    pub summary: String,
    pub author: String,
    pub url: String,
    pub image_url: Option<String>,
    pub published_ago: String,
}

impl ArticleView {
    pub fn new(article: &Article, now: DateTime<Utc>) -> Self {
        let summary = article
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or(article.content.as_deref())
            .unwrap_or_default()
            .to_string();

        Self {
            source: article.source.name.clone(),
            title: article.title.clone(),
            summary,
            author: article
                .author
                .clone()
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "Unknown Author".to_string()),
            url: article.url.clone(),
            image_url: article.url_to_image.clone(),
            published_ago: time_ago(article.published_at, now),
        }
    }

    pub fn list(articles: &[Article], now: DateTime<Utc>) -> Vec<Self> {
        articles.iter().map(|a| Self::new(a, now)).collect()
    }
}
