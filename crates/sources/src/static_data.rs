//! Static data source

use async_trait::async_trait;
use multidash_core::{apply_transform, DataSourceAdapter, DataSourceError};
use multidash_types::{DataSourceType, StaticSourceConfig, Transformer};
use serde_json::Value;
use std::time::Duration;

/// Simulated latency of every static fetch
pub const STATIC_DELAY: Duration = Duration::from_millis(100);

/// Returns a literal payload
pub struct StaticAdapter {
    data: Value,
    transformer: Option<Transformer>,
}

impl StaticAdapter {
    pub fn new(
        config: StaticSourceConfig,
        transformer: Option<Transformer>,
    ) -> Result<Self, DataSourceError> {
        let data = config
            .data
            .ok_or_else(|| DataSourceError::validation("Static adapter requires data property"))?;
        Ok(Self { data, transformer })
    }
}

#[async_trait]
impl DataSourceAdapter for StaticAdapter {
    fn source_type(&self) -> DataSourceType {
        DataSourceType::Static
    }

    async fn fetch(&self) -> Result<Value, DataSourceError> {
        tokio::time::sleep(STATIC_DELAY).await;
        apply_transform(self.transformer.as_ref(), self.data.clone())
    }
}
