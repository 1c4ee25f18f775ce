//! Placeholder articles served when the upstream news API cannot be reached.

use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::models::{Article, NewsResponse, Source};

pub const FALLBACK_ARTICLE_COUNT: usize = 10;

/// Build the placeholder set for `topic`, newest first, one hour apart.
pub fn generate_articles(topic: &str, now: DateTime<Utc>) -> Vec<Article> {
    (0..FALLBACK_ARTICLE_COUNT)
        .map(|i| {
            let n = i + 1;
            Article {
                source: Source {
                    id: None,
                    name: format!("News Source {}", n),
                },
                author: Some(format!("Author {}", n)),
                title: format!(
                    "Breaking: {} - Major developments in the industry ({})",
                    topic, n
                ),
                description: Some(format!(
                    "Latest updates on {}. Experts discuss the implications and what this \
                     means for the future. This is a detailed analysis of recent events and trends.",
                    topic
                )),
                url: format!("https://example.com/article-{}", n),
                url_to_image: image_url(topic, i),
                published_at: now - Duration::hours(i as i64),
                content: Some(format!(
                    "Full article content about {}. This includes detailed information, \
                     analysis, and expert opinions on the subject matter. Stay tuned for more updates.",
                    topic
                )),
            }
        })
        .collect()
}

pub fn fallback_response(topic: &str, now: DateTime<Utc>) -> NewsResponse {
    NewsResponse::ok(generate_articles(topic, now))
}

fn image_url(topic: &str, index: usize) -> Option<String> {
    let mut url = Url::parse("https://picsum.photos/seed/").ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(&format!("{}-{}", topic, index))
        .push("800")
        .push("600");
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_generates_ten_articles() {
        let articles = generate_articles("technology", fixed_now());
        assert_eq!(articles.len(), FALLBACK_ARTICLE_COUNT);
    }

    #[test]
    fn test_article_text_mentions_topic() {
        let articles = generate_articles("robotics", fixed_now());

        let first = &articles[0];
        assert_eq!(first.source.name, "News Source 1");
        assert!(first.source.id.is_none());
        assert_eq!(first.author.as_deref(), Some("Author 1"));
        assert_eq!(
            first.title,
            "Breaking: robotics - Major developments in the industry (1)"
        );
        assert_eq!(
            first.description.as_deref(),
            Some(
                "Latest updates on robotics. Experts discuss the implications and what this \
                 means for the future. This is a detailed analysis of recent events and trends."
            )
        );
        assert_eq!(
            first.content.as_deref(),
            Some(
                "Full article content about robotics. This includes detailed information, \
                 analysis, and expert opinions on the subject matter. Stay tuned for more updates."
            )
        );

        let last = &articles[9];
        assert_eq!(last.source.name, "News Source 10");
        assert_eq!(last.url, "https://example.com/article-10");
        assert!(last.title.ends_with("(10)"));
    }

    #[test]
    fn test_timestamps_step_back_one_hour() {
        let now = fixed_now();
        let articles = generate_articles("science", now);

        assert_eq!(articles[0].published_at, now);
        for pair in articles.windows(2) {
            assert_eq!(
                pair[0].published_at - pair[1].published_at,
                Duration::hours(1)
            );
        }
        assert_eq!(articles[9].published_at, now - Duration::hours(9));
    }

    #[test]
    fn test_image_urls_are_seeded_by_topic_and_index() {
        let articles = generate_articles("health", fixed_now());
        assert_eq!(
            articles[0].url_to_image.as_deref(),
            Some("https://picsum.photos/seed/health-0/800/600")
        );
        assert_eq!(
            articles[9].url_to_image.as_deref(),
            Some("https://picsum.photos/seed/health-9/800/600")
        );
    }

    #[test]
    fn test_image_url_encodes_topic() {
        let articles = generate_articles("space exploration/mars", fixed_now());
        let image = articles[0].url_to_image.as_deref().unwrap();
        assert!(!image.contains(' '));
        assert!(image.starts_with("https://picsum.photos/seed/space%20exploration%2Fmars-0/"));
        assert!(image.ends_with("/800/600"));
    }

    #[test]
    fn test_urls_are_unique() {
        let articles = generate_articles("business", fixed_now());
        let mut urls: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), FALLBACK_ARTICLE_COUNT);
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let now = fixed_now();
        assert_eq!(generate_articles("sports", now), generate_articles("sports", now));
    }

    #[test]
    fn test_fallback_response_shape() {
        let response = fallback_response("general", fixed_now());
        assert!(response.is_ok());
        assert_eq!(response.total_results, 10);
        assert_eq!(response.articles.len(), 10);
    }
}
