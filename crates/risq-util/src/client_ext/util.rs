use anyhow::Result;
use reqwest::Client;
use std::future::Future;
use tracing::{error, trace};

pub trait ClientUtilExt {
    /// GET request `url` and deserialize the JSON body.
    fn fetch_json<T>(&self, url: &str) -> impl Future<Output = Result<T>> + Send
    where
        T: serde::de::DeserializeOwned + Send;
}

impl ClientUtilExt for Client {
    async fn fetch_json<T>(&self, url: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let time = std::time::Instant::now();
        // urls carry api keys: only the path is logged, and returned errors drop the url
        let response = self
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                error!(
                    "GET {} failed: {}",
                    e.url().map(|u| u.path()).unwrap_or("<unknown>"),
                    e.status().map(|s| s.to_string()).unwrap_or_default()
                );
                e.without_url()
            })?;
        let data: T = response.json().await.map_err(reqwest::Error::without_url)?;
        trace!("GET completed, elapsed time: {} ms", time.elapsed().as_millis());
        Ok(data)
    }
}
