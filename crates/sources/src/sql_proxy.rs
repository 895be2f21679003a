//! PostgreSQL and MySQL through the backend query proxy
//!
//! The backend exposes `POST /api/datasource/{postgresql|mysql}` taking the
//! connection parameters plus the query and answering `{data}` or `{error}`.
//! Sibling endpoints `/test` and `/tables` answer `{success}` and `{tables}`.

use async_trait::async_trait;
use multidash_core::{apply_transform, DataSourceAdapter, DataSourceError};
use multidash_types::source_configs::{DEFAULT_MYSQL_PORT, DEFAULT_POSTGRES_PORT};
use multidash_types::{DataSourceType, SqlSourceConfig, Transformer};
use reqwest::Client;
use serde_json::{json, Value};

use crate::http;

/// Which database the proxy should talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    Mysql,
}

impl SqlDialect {
    pub fn label(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "PostgreSQL",
            SqlDialect::Mysql => "MySQL",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "api/datasource/postgresql",
            SqlDialect::Mysql => "api/datasource/mysql",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            SqlDialect::Postgres => DEFAULT_POSTGRES_PORT,
            SqlDialect::Mysql => DEFAULT_MYSQL_PORT,
        }
    }

    fn source_type(&self) -> DataSourceType {
        match self {
            SqlDialect::Postgres => DataSourceType::Postgresql,
            SqlDialect::Mysql => DataSourceType::Mysql,
        }
    }
}

pub struct SqlProxyAdapter {
    dialect: SqlDialect,
    config: SqlSourceConfig,
    endpoint: String,
    client: Client,
    transformer: Option<Transformer>,
}

impl SqlProxyAdapter {
    pub fn new(
        dialect: SqlDialect,
        config: SqlSourceConfig,
        transformer: Option<Transformer>,
        client: Client,
        backend_url: &str,
    ) -> Result<Self, DataSourceError> {
        let label = dialect.label();
        if config.host.trim().is_empty() {
            return Err(DataSourceError::validation(format!("{} host is required", label)));
        }
        if config.database.trim().is_empty() {
            return Err(DataSourceError::validation(format!(
                "{} database is required",
                label
            )));
        }
        if config.username.trim().is_empty() {
            return Err(DataSourceError::validation(format!(
                "{} username is required",
                label
            )));
        }

        Ok(Self {
            dialect,
            config,
            endpoint: http::join_path(backend_url, dialect.path()),
            client,
            transformer,
        })
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Connection parameters without the query
    fn connection_body(&self) -> Value {
        json!({
            "host": self.config.host,
            "port": self.config.port.unwrap_or_else(|| self.dialect.default_port()),
            "database": self.config.database,
            "username": self.config.username,
            "password": self.config.password,
            "ssl": self.config.ssl.unwrap_or(false),
        })
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, DataSourceError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!("{} query failed: {}", self.dialect.label(), http::reason(status))
                });
            return Err(DataSourceError::fetch(message));
        }
        http::read_json(response).await
    }

    /// Ask the proxy whether the database is reachable
    pub async fn test_connection(&self) -> bool {
        let url = http::join_path(&self.endpoint, "test");
        match self.post(&url, &self.connection_body()).await {
            Ok(result) => result.get("success").and_then(Value::as_bool) == Some(true),
            Err(e) => {
                log::error!("{} connection test failed: {}", self.dialect.label(), e);
                false
            }
        }
    }

    /// Table names, for query-builder helpers
    pub async fn get_tables(&self) -> Vec<String> {
        let url = http::join_path(&self.endpoint, "tables");
        match self.post(&url, &self.connection_body()).await {
            Ok(result) => result
                .get("tables")
                .and_then(Value::as_array)
                .map(|tables| {
                    tables
                        .iter()
                        .filter_map(|t| t.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) => {
                log::error!("Failed to fetch {} tables: {}", self.dialect.label(), e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DataSourceAdapter for SqlProxyAdapter {
    fn source_type(&self) -> DataSourceType {
        self.dialect.source_type()
    }

    async fn fetch(&self) -> Result<Value, DataSourceError> {
        let mut body = self.connection_body();
        body["query"] = Value::String(self.config.query.clone());

        log::debug!("{} query via {}", self.dialect.label(), self.endpoint);
        let mut result = self.post(&self.endpoint, &body).await.map_err(|e| {
            log::error!("{} adapter error: {}", self.dialect.label(), e);
            e
        })?;

        if let Some(error) = result.get("error").filter(|e| !e.is_null()) {
            let error = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(DataSourceError::fetch(format!(
                "{} Error: {}",
                self.dialect.label(),
                error
            )));
        }

        let data = result.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        apply_transform(self.transformer.as_ref(), data)
    }
}
