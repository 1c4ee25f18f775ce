use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::models::NewsResponse;
use crate::query::NewsFilter;

/// Anything that can answer a filter with a page of news.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, filter: &NewsFilter) -> anyhow::Result<NewsResponse>;
}

/// Talks to a running proxy over HTTP.
pub struct HttpNewsSource {
    client: Client,
    endpoint: String,
}

impl HttpNewsSource {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("NewsWatch/1.0")
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/news", server_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NewsSource for HttpNewsSource {
    async fn fetch(&self, filter: &NewsFilter) -> anyhow::Result<NewsResponse> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&filter.to_query_pairs())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<NewsResponse>().await?)
    }
}
