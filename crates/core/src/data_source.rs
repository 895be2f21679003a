//! Data source adapter trait and related types

use async_trait::async_trait;
use multidash_types::{DataSource, DataSourceType, Transformer};
use serde::Serialize;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::DataSourceError;

/// Descriptive metadata about a data source type, for selection UIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTypeInfo {
    #[serde(rename = "type")]
    pub source_type: DataSourceType,
    /// Human-readable name
    pub name: &'static str,
    /// Icon identifier
    pub icon: &'static str,
    /// Description of what this source provides
    pub description: &'static str,
    /// Needs the backend proxy to reach the real system
    pub requires_backend: bool,
}

/// Trait for all data source adapters
///
/// Adapters talk to one kind of external system and hand back JSON that has
/// already been passed through the configured transform. Every failure is
/// reported as a [`DataSourceError`].
#[async_trait]
pub trait DataSourceAdapter: Send + Sync {
    /// The source type this adapter serves
    fn source_type(&self) -> DataSourceType;

    /// Fetch data from the source
    async fn fetch(&self) -> Result<Value, DataSourceError>;

    /// Abort an in-flight request, if the transport supports it
    fn cancel(&self) {}

    /// Release sockets, background tasks and timers
    fn cleanup(&self) {
        self.cancel();
    }
}

/// Type-erased adapter for dynamic dispatch
pub type BoxedAdapter = Box<dyn DataSourceAdapter>;

/// Something that can turn a data source into a live adapter
///
/// Bindings only see this trait, so tests can hand them scripted adapters.
pub trait AdapterProvider: Send + Sync {
    fn adapter_for(&self, source: &DataSource) -> Result<BoxedAdapter, DataSourceError>;
}

/// Apply an optional transform to a parsed payload.
///
/// Both an `Err` from the transform and a panic inside it are reported as
/// [`DataSourceError::Transform`].
pub fn apply_transform(
    transformer: Option<&Transformer>,
    data: Value,
) -> Result<Value, DataSourceError> {
    let Some(transformer) = transformer else {
        return Ok(data);
    };

    match catch_unwind(AssertUnwindSafe(|| transformer.call(data))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            log::error!("Data transformation error: {:#}", e);
            Err(DataSourceError::Transform(format!("{:#}", e)))
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "transform panicked".to_string());
            log::error!("Data transformation panicked: {}", message);
            Err(DataSourceError::Transform(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    #[test]
    fn test_no_transform_passes_through() {
        let data = json!({"value": 42});
        assert_eq!(apply_transform(None, data.clone()).unwrap(), data);
    }

    #[test]
    fn test_transform_applied() {
        let double = Transformer::new(|d| {
            let v = d["value"]
                .as_i64()
                .ok_or_else(|| anyhow!("value is not an integer"))?;
            Ok(json!(v * 2))
        });
        assert_eq!(
            apply_transform(Some(&double), json!({"value": 42})).unwrap(),
            json!(84)
        );

        let err = apply_transform(Some(&double), json!({"value": "x"})).unwrap_err();
        assert_eq!(
            err,
            DataSourceError::Transform("value is not an integer".into())
        );
    }

    #[test]
    fn test_transform_panic_is_caught() {
        let broken = Transformer::new(|_| panic!("index out of range"));
        let err = apply_transform(Some(&broken), json!(null)).unwrap_err();
        assert_eq!(err.code(), "TRANSFORM_ERROR");
        assert!(err.message().contains("index out of range"));
    }
}
