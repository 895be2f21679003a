//! InfluxDB 2.x data source (Flux over HTTP)

use async_trait::async_trait;
use multidash_core::{apply_transform, DataSourceAdapter, DataSourceError};
use multidash_types::{DataSourceType, InfluxDbSourceConfig, Transformer};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::http;

pub struct InfluxDbAdapter {
    config: InfluxDbSourceConfig,
    client: Client,
    transformer: Option<Transformer>,
}

impl InfluxDbAdapter {
    pub fn new(
        config: InfluxDbSourceConfig,
        transformer: Option<Transformer>,
        client: Client,
    ) -> Result<Self, DataSourceError> {
        let required = [
            (&config.url, "InfluxDB URL is required"),
            (&config.token, "InfluxDB token is required"),
            (&config.org, "InfluxDB organization is required"),
            (&config.bucket, "InfluxDB bucket is required"),
        ];
        for (value, message) in required {
            if value.trim().is_empty() {
                return Err(DataSourceError::validation(message));
            }
        }

        Ok(Self {
            config,
            client,
            transformer,
        })
    }

    fn url(&self, path: &str) -> String {
        http::join_path(&self.config.url, path)
    }

    fn auth(&self) -> String {
        format!("Token {}", self.config.token)
    }

    async fn query(&self, flux: &str) -> Result<reqwest::Response, DataSourceError> {
        self.client
            .post(self.url("api/v2/query"))
            .header(AUTHORIZATION, self.auth())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&json!({
                "type": "flux",
                "org": self.config.org,
                "query": flux,
            }))
            .send()
            .await
            .map_err(http::transport_error)
    }

    /// Health endpoint reports `status: "pass"`
    pub async fn test_connection(&self) -> bool {
        let response = self
            .client
            .get(self.url("health"))
            .header(AUTHORIZATION, self.auth())
            .send()
            .await;
        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(body) => body.get("status").and_then(Value::as_str) == Some("pass"),
                Err(e) => {
                    log::error!("InfluxDB health response unreadable: {}", e);
                    false
                }
            },
            Ok(resp) => {
                log::warn!("InfluxDB health check returned {}", resp.status());
                false
            }
            Err(e) => {
                log::error!("InfluxDB connection test failed: {}", e);
                false
            }
        }
    }

    pub async fn get_buckets(&self) -> Vec<String> {
        let response = self
            .client
            .get(self.url("api/v2/buckets"))
            .header(AUTHORIZATION, self.auth())
            .send()
            .await;
        let body = match response {
            Ok(resp) if resp.status().is_success() => resp.json::<Value>().await.ok(),
            Ok(_) => None,
            Err(e) => {
                log::error!("Failed to fetch InfluxDB buckets: {}", e);
                None
            }
        };
        body.and_then(|b| {
            b.get("buckets").and_then(Value::as_array).map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|b| b.get("name").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
        })
        .unwrap_or_default()
    }

    /// Measurement names in the configured bucket
    pub async fn get_measurements(&self) -> Vec<String> {
        let flux = format!(
            "import \"influxdata/influxdb/schema\"\nschema.measurements(bucket: \"{}\")",
            self.config.bucket
        );
        let text = match self.query(&flux).await {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            Ok(_) => None,
            Err(e) => {
                log::error!("Failed to fetch InfluxDB measurements: {}", e);
                None
            }
        };
        let Some(text) = text else {
            return Vec::new();
        };
        parse_csv(&text)
            .iter()
            .filter_map(|row| row.get("_value").and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}

/// Flatten `[{records: [{values}]}]` into a list of value objects.
/// Any other shape is returned unchanged.
pub fn flatten_tables(body: Value) -> Value {
    match body {
        Value::Array(tables) => Value::Array(
            tables
                .into_iter()
                .flat_map(|mut table| match table.get_mut("records").map(Value::take) {
                    Some(Value::Array(records)) => records
                        .into_iter()
                        .map(|mut r| r.get_mut("values").map(Value::take).unwrap_or(Value::Null))
                        .collect(),
                    _ => Vec::new(),
                })
                .collect(),
        ),
        other => other,
    }
}

/// Parse annotated CSV into rows keyed by the header line.
///
/// Blank lines and `#` annotation lines are skipped. The first remaining
/// line is the header; cells missing from a short row are left out.
pub fn parse_csv(text: &str) -> Vec<Value> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    lines
        .map(|line| {
            let mut row = Map::new();
            for (column, cell) in columns.iter().zip(line.split(',').map(str::trim)) {
                row.insert(column.to_string(), Value::String(cell.to_string()));
            }
            Value::Object(row)
        })
        .collect()
}

#[async_trait]
impl DataSourceAdapter for InfluxDbAdapter {
    fn source_type(&self) -> DataSourceType {
        DataSourceType::Influxdb
    }

    async fn fetch(&self) -> Result<Value, DataSourceError> {
        log::debug!("InfluxDB query on {} (org {})", self.config.url, self.config.org);
        let response = self.query(&self.config.query).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataSourceError::fetch(format!(
                "InfluxDB query failed: {} - {}",
                http::reason(status),
                body
            )));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        let data = if is_json {
            flatten_tables(http::read_json(response).await?)
        } else {
            let text = response
                .text()
                .await
                .map_err(|e| DataSourceError::fetch(format!("Failed to read InfluxDB response: {}", e)))?;
            Value::Array(parse_csv(&text))
        };
        apply_transform(self.transformer.as_ref(), data)
    }
}
