//! REST data source

use async_trait::async_trait;
use multidash_core::{apply_transform, DataSourceAdapter, DataSourceError};
use multidash_types::{DataSourceType, HttpMethod, RestSourceConfig, Transformer};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;
use url::Url;

use crate::http;

/// Fetches JSON from an HTTP endpoint
pub struct RestAdapter {
    config: RestSourceConfig,
    url: Url,
    client: Client,
    transformer: Option<Transformer>,
    /// Cancel triggers for every request in flight, keyed by fetch id
    in_flight: Mutex<HashMap<u64, oneshot::Sender<()>>>,
    next_fetch: AtomicU64,
}

impl RestAdapter {
    pub fn new(
        config: RestSourceConfig,
        transformer: Option<Transformer>,
        client: Client,
        backend_url: &str,
    ) -> Result<Self, DataSourceError> {
        if config.url.trim().is_empty() {
            return Err(DataSourceError::validation("REST adapter requires a URL"));
        }
        let url = http::resolve_url(backend_url, &config.url)
            .map_err(|_| DataSourceError::validation("Invalid URL provided to REST adapter"))?;

        Ok(Self {
            config,
            url,
            client,
            transformer,
            in_flight: Mutex::new(HashMap::new()),
            next_fetch: AtomicU64::new(0),
        })
    }

    /// Full request URL including query parameters
    pub fn request_url(&self) -> Url {
        let mut url = self.url.clone();
        if let Some(params) = self.config.params.as_ref().filter(|p| !p.is_empty()) {
            url.query_pairs_mut().extend_pairs(params.iter());
        }
        url
    }

    /// Number of requests currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn build_request(&self) -> reqwest::RequestBuilder {
        let method = match self.config.method() {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut request = self
            .client
            .request(method, self.request_url())
            .header(CONTENT_TYPE, "application/json");
        if let Some(headers) = &self.config.headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        if let Some(body) = &self.config.body {
            if self.config.method() != HttpMethod::Get {
                request = request.body(body.to_string());
            }
        }
        request
    }

    async fn send(&self) -> Result<Value, DataSourceError> {
        let response = self
            .build_request()
            .send()
            .await
            .map_err(http::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataSourceError::fetch(http::status_line(status)));
        }
        http::read_json(response).await
    }
}

struct Registration<'a> {
    in_flight: &'a Mutex<HashMap<u64, oneshot::Sender<()>>>,
    fetch_id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.fetch_id);
        }
    }
}

#[async_trait]
impl DataSourceAdapter for RestAdapter {
    fn source_type(&self) -> DataSourceType {
        DataSourceType::Rest
    }

    async fn fetch(&self) -> Result<Value, DataSourceError> {
        let (tx, rx) = oneshot::channel();
        let fetch_id = self.next_fetch.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.insert(fetch_id, tx);
        }
        // Deregisters even when this future is dropped mid-request
        let _registration = Registration {
            in_flight: &self.in_flight,
            fetch_id,
        };

        log::debug!("REST {} {}", self.config.method().as_str(), self.url);
        let result = tokio::select! {
            result = self.send() => result,
            Ok(()) = rx => Err(DataSourceError::Cancelled),
        };

        apply_transform(self.transformer.as_ref(), result?)
    }

    fn cancel(&self) {
        let pending: Vec<_> = match self.in_flight.lock() {
            Ok(mut in_flight) => in_flight.drain().map(|(_, tx)| tx).collect(),
            Err(_) => return,
        };
        if !pending.is_empty() {
            log::debug!("Cancelling {} REST request(s) to {}", pending.len(), self.url);
        }
        for tx in pending {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn adapter(config: RestSourceConfig) -> Result<RestAdapter, DataSourceError> {
        RestAdapter::new(config, None, Client::new(), "http://127.0.0.1:3001")
    }

    #[test]
    fn test_requires_url() {
        let err = adapter(RestSourceConfig::new("")).err().unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert_eq!(err.message(), "REST adapter requires a URL");
    }

    #[test]
    fn test_params_appended() {
        let mut config = RestSourceConfig::new("/api/sales?region=eu");
        config.params = Some(BTreeMap::from([("period".to_string(), "7d".to_string())]));
        let adapter = adapter(config).unwrap();
        assert_eq!(
            adapter.request_url().as_str(),
            "http://127.0.0.1:3001/api/sales?region=eu&period=7d"
        );
    }
}
