//! GraphQL data source

use async_trait::async_trait;
use multidash_core::{apply_transform, DataSourceAdapter, DataSourceError};
use multidash_types::{DataSourceType, GraphqlSourceConfig, Transformer};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use crate::http;

pub const GRAPHQL_ERROR_CODE: &str = "GRAPHQL_ERROR";

/// Posts a query document and returns the `data` member of the response
pub struct GraphqlAdapter {
    config: GraphqlSourceConfig,
    endpoint: Url,
    client: Client,
    transformer: Option<Transformer>,
}

impl GraphqlAdapter {
    pub fn new(
        config: GraphqlSourceConfig,
        transformer: Option<Transformer>,
        client: Client,
        backend_url: &str,
    ) -> Result<Self, DataSourceError> {
        if config.endpoint.trim().is_empty() {
            return Err(DataSourceError::validation(
                "GraphQL adapter requires an endpoint",
            ));
        }
        if config.query.trim().is_empty() {
            return Err(DataSourceError::validation("GraphQL adapter requires a query"));
        }
        let endpoint = http::resolve_url(backend_url, &config.endpoint).map_err(|_| {
            DataSourceError::validation("Invalid endpoint provided to GraphQL adapter")
        })?;

        Ok(Self {
            config,
            endpoint,
            client,
            transformer,
        })
    }
}

/// Pull `data` out of a GraphQL response, turning `errors` into a fetch error
fn unwrap_response(mut body: Value) -> Result<Value, DataSourceError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DataSourceError::fetch_with_code(message, GRAPHQL_ERROR_CODE));
        }
    }
    Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null))
}

#[async_trait]
impl DataSourceAdapter for GraphqlAdapter {
    fn source_type(&self) -> DataSourceType {
        DataSourceType::Graphql
    }

    async fn fetch(&self) -> Result<Value, DataSourceError> {
        let payload = json!({
            "query": self.config.query,
            "variables": self.config.variables.clone().unwrap_or_default(),
        });

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(headers) = &self.config.headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        log::debug!("GraphQL query to {}", self.endpoint);
        let response = request.send().await.map_err(http::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataSourceError::fetch(http::status_line(status)));
        }

        let data = unwrap_response(http::read_json(response).await?)?;
        apply_transform(self.transformer.as_ref(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_array() {
        let err = unwrap_response(json!({
            "data": null,
            "errors": [{"message": "Unknown field 'revenu'"}, {"message": "second"}]
        }))
        .unwrap_err();
        assert_eq!(err.code(), GRAPHQL_ERROR_CODE);
        assert_eq!(err.message(), "Unknown field 'revenu'; second");
    }

    #[test]
    fn test_data_extracted() {
        let data = unwrap_response(json!({"data": {"sales": [1, 2]}, "errors": []})).unwrap();
        assert_eq!(data, json!({"sales": [1, 2]}));
    }

    #[test]
    fn test_requires_query() {
        let config = GraphqlSourceConfig {
            endpoint: "/graphql".into(),
            ..Default::default()
        };
        let err = GraphqlAdapter::new(config, None, Client::new(), "http://localhost")
            .err()
            .unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
