use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_KEYWORDS: &str = "technology";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("unknown sort order '{0}'")]
    UnknownSort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Business,
    Entertainment,
    General,
    Health,
    Science,
    Sports,
    Technology,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Business,
        Category::Entertainment,
        Category::General,
        Category::Health,
        Category::Science,
        Category::Sports,
        Category::Technology,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Business => "business",
            Category::Entertainment => "entertainment",
            Category::General => "general",
            Category::Health => "health",
            Category::Science => "science",
            Category::Sports => "sports",
            Category::Technology => "technology",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Business => "Business",
            Category::Entertainment => "Entertainment",
            Category::General => "General",
            Category::Health => "Health",
            Category::Science => "Science",
            Category::Sports => "Sports",
            Category::Technology => "Technology",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| FilterError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortBy {
    #[default]
    PublishedAt,
    Relevancy,
    Popularity,
}

impl SortBy {
    pub const ALL: [SortBy; 3] = [SortBy::PublishedAt, SortBy::Relevancy, SortBy::Popularity];

    /// Upstream spelling of the sort order.
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::PublishedAt => "publishedAt",
            SortBy::Relevancy => "relevancy",
            SortBy::Popularity => "popularity",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortBy::PublishedAt => "Latest",
            SortBy::Relevancy => "Relevancy",
            SortBy::Popularity => "Popularity",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SortBy::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FilterError::UnknownSort(s.to_string()))
    }
}

/// Filter parameters as they arrive on the query string.
#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub keywords: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewsFilter {
    pub keywords: String,
    pub category: Option<Category>,
    pub sort_by: SortBy,
}

impl Default for NewsFilter {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.to_string(),
            category: None,
            sort_by: SortBy::default(),
        }
    }
}

impl NewsFilter {
    pub fn from_query(query: NewsQuery) -> Result<Self, FilterError> {
        let keywords = query
            .keywords
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| DEFAULT_KEYWORDS.to_string());

        let category = match query.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(name.parse()?),
        };

        let sort_by = match query.sort_by.as_deref().map(str::trim) {
            None | Some("") => SortBy::default(),
            Some(name) => name.parse()?,
        };

        Ok(Self {
            keywords,
            category,
            sort_by,
        })
    }

    /// What the results are about: the category when one is chosen, else the keywords.
    pub fn topic(&self) -> &str {
        match self.category {
            Some(category) => category.as_str(),
            None => &self.keywords,
        }
    }

    /// The filter reduced to what the upstream actually sees. Headlines ignore
    /// keywords, so they are blanked when a category is set.
    pub fn cache_key(&self) -> NewsFilter {
        match self.category {
            Some(_) => NewsFilter {
                keywords: String::new(),
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// Headlines endpoint for a category, full-text search otherwise.
    pub fn upstream_url(&self, base_url: &str, api_key: &str) -> Result<Url, url::ParseError> {
        let base = base_url.trim_end_matches('/');

        let url = match self.category {
            Some(category) => {
                let mut url = Url::parse(&format!("{}/top-headlines", base))?;
                url.query_pairs_mut()
                    .append_pair("category", category.as_str())
                    .append_pair("sortBy", self.sort_by.as_str())
                    .append_pair("apiKey", api_key);
                url
            }
            None => {
                let mut url = Url::parse(&format!("{}/everything", base))?;
                url.query_pairs_mut()
                    .append_pair("q", &self.keywords)
                    .append_pair("sortBy", self.sort_by.as_str())
                    .append_pair("language", "en")
                    .append_pair("apiKey", api_key);
                url
            }
        };

        Ok(url)
    }

    /// Query parameters a client sends to the proxy for this filter.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("keywords", self.keywords.clone()),
            ("sortBy", self.sort_by.as_str().to_string()),
        ];
        if let Some(category) = self.category {
            pairs.push(("category", category.as_str().to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(keywords: Option<&str>, category: Option<&str>, sort_by: Option<&str>) -> NewsQuery {
        NewsQuery {
            keywords: keywords.map(str::to_string),
            category: category.map(str::to_string),
            sort_by: sort_by.map(str::to_string),
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_empty_query_uses_defaults() {
            let filter = NewsFilter::from_query(NewsQuery::default()).unwrap();
            assert_eq!(filter, NewsFilter::default());
            assert_eq!(filter.keywords, "technology");
            assert_eq!(filter.category, None);
            assert_eq!(filter.sort_by, SortBy::PublishedAt);
        }

        #[test]
        fn test_blank_values_use_defaults() {
            let filter = NewsFilter::from_query(query(Some("   "), Some(""), Some(""))).unwrap();
            assert_eq!(filter, NewsFilter::default());
        }

        #[test]
        fn test_full_query() {
            let filter =
                NewsFilter::from_query(query(Some(" rust "), Some("Science"), Some("popularity")))
                    .unwrap();
            assert_eq!(filter.keywords, "rust");
            assert_eq!(filter.category, Some(Category::Science));
            assert_eq!(filter.sort_by, SortBy::Popularity);
        }

        #[test]
        fn test_unknown_category() {
            let result = NewsFilter::from_query(query(None, Some("gossip"), None));
            assert_eq!(result, Err(FilterError::UnknownCategory("gossip".to_string())));
        }

        #[test]
        fn test_unknown_sort() {
            let result = NewsFilter::from_query(query(None, None, Some("random")));
            assert_eq!(result, Err(FilterError::UnknownSort("random".to_string())));
        }

        #[test]
        fn test_sort_is_case_insensitive() {
            assert_eq!("PUBLISHEDAT".parse::<SortBy>(), Ok(SortBy::PublishedAt));
            assert_eq!("publishedat".parse::<SortBy>(), Ok(SortBy::PublishedAt));
        }

        #[test]
        fn test_every_category_parses_from_its_name() {
            for category in Category::ALL {
                assert_eq!(category.as_str().parse::<Category>(), Ok(category));
                assert_eq!(category.to_string(), category.as_str());
            }
        }
    }

    mod topic_tests {
        use super::*;

        #[test]
        fn test_topic_is_keywords_without_category() {
            let filter = NewsFilter {
                keywords: "space".to_string(),
                ..Default::default()
            };
            assert_eq!(filter.topic(), "space");
        }

        #[test]
        fn test_topic_prefers_category() {
            let filter = NewsFilter {
                keywords: "space".to_string(),
                category: Some(Category::Health),
                ..Default::default()
            };
            assert_eq!(filter.topic(), "health");
        }

        #[test]
        fn test_cache_key_ignores_keywords_under_category() {
            let space = NewsFilter {
                keywords: "space".to_string(),
                category: Some(Category::Health),
                ..Default::default()
            };
            let oceans = NewsFilter {
                keywords: "oceans".to_string(),
                ..space.clone()
            };
            assert_ne!(space, oceans);
            assert_eq!(space.cache_key(), oceans.cache_key());

            let popular = NewsFilter {
                sort_by: SortBy::Popularity,
                ..space.clone()
            };
            assert_ne!(space.cache_key(), popular.cache_key());
        }

        #[test]
        fn test_cache_key_keeps_keywords_for_search() {
            let filter = NewsFilter {
                keywords: "space".to_string(),
                ..Default::default()
            };
            assert_eq!(filter.cache_key(), filter);
        }
    }

    mod upstream_url_tests {
        use super::*;

        #[test]
        fn test_search_url() {
            let filter = NewsFilter {
                keywords: "rust lang & c++".to_string(),
                category: None,
                sort_by: SortBy::Relevancy,
            };

            let url = filter
                .upstream_url("https://newsapi.org/v2", "demo")
                .unwrap();

            assert_eq!(url.path(), "/v2/everything");
            let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
            assert_eq!(
                pairs,
                vec![
                    ("q".to_string(), "rust lang & c++".to_string()),
                    ("sortBy".to_string(), "relevancy".to_string()),
                    ("language".to_string(), "en".to_string()),
                    ("apiKey".to_string(), "demo".to_string()),
                ]
            );
            assert!(!url.as_str().contains(' '));
        }

        #[test]
        fn test_headlines_url() {
            let filter = NewsFilter {
                keywords: "ignored".to_string(),
                category: Some(Category::Sports),
                sort_by: SortBy::PublishedAt,
            };

            let url = filter
                .upstream_url("https://newsapi.org/v2/", "key")
                .unwrap();

            assert_eq!(
                url.as_str(),
                "https://newsapi.org/v2/top-headlines?category=sports&sortBy=publishedAt&apiKey=key"
            );
        }

        #[test]
        fn test_invalid_base_url() {
            let filter = NewsFilter::default();
            assert!(filter.upstream_url("not a url", "key").is_err());
        }
    }

    mod query_pairs_tests {
        use super::*;

        #[test]
        fn test_pairs_without_category() {
            let pairs = NewsFilter::default().to_query_pairs();
            let encoded = serde_urlencoded::to_string(&pairs).unwrap();
            assert_eq!(encoded, "keywords=technology&sortBy=publishedAt");
        }

        #[test]
        fn test_pairs_with_category() {
            let filter = NewsFilter {
                keywords: "open source".to_string(),
                category: Some(Category::Business),
                sort_by: SortBy::Popularity,
            };
            let encoded = serde_urlencoded::to_string(filter.to_query_pairs()).unwrap();
            assert_eq!(
                encoded,
                "keywords=open+source&sortBy=popularity&category=business"
            );
        }

        #[test]
        fn test_pairs_parse_back_into_the_same_filter() {
            let filter = NewsFilter {
                keywords: "climate".to_string(),
                category: Some(Category::Science),
                sort_by: SortBy::Relevancy,
            };
            let encoded = serde_urlencoded::to_string(filter.to_query_pairs()).unwrap();
            let query: NewsQuery = serde_urlencoded::from_str(&encoded).unwrap();
            assert_eq!(NewsFilter::from_query(query).unwrap(), filter);
        }
    }
}
