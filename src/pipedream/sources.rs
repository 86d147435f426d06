// SPDX-License-Identifier: MIT

//! Built-in data sources available to every CLI pipeline

use std::env;

use crate::engine::data_source::DataSource;
use crate::engine::error::BoxError;
use crate::engine::execution::ExecutionContext;
use crate::engine::pipeline::PipelineExecutor;
use crate::engine::value::Value;

/// `echo`: returns its params unchanged
pub fn echo() -> DataSource {
    DataSource::new("echo", |_ectx: ExecutionContext, params: Value| async move {
        Ok::<_, BoxError>(params)
    })
}

/// `env`: reads an environment variable; a missing variable is an error
pub fn env() -> DataSource {
    DataSource::new("env", |_ectx: ExecutionContext, name: String| async move {
        env::var(&name).map_err(|e| BoxError::from(format!("{}: {}", name, e)))
    })
}

/// `json_file`: reads and parses a JSON file
pub fn json_file() -> DataSource {
    DataSource::new("json_file", |ectx: ExecutionContext, path: String| async move {
        let content = tokio::select! {
            read = tokio::fs::read_to_string(&path) => read?,
            _ = ectx.cancelled() => return Err::<Value, BoxError>("read cancelled".into()),
        };
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Ok::<_, BoxError>(Value::from(json))
    })
}

/// Register every built-in data source with the executor
pub async fn register_builtins(executor: &PipelineExecutor) {
    for source in [echo(), env(), json_file()] {
        log::debug!("Registering built-in data source '{}'", source.name());
        executor.register_data_source(source).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::DataSourceError;
    use std::io::Write;

    #[tokio::test]
    async fn test_echo() {
        let ectx = ExecutionContext::new();
        let value = Value::from(serde_json::json!({"a": [1, 2]}));
        assert_eq!(echo().query(&ectx, value.clone()).await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_env() {
        let ectx = ExecutionContext::new();
        std::env::set_var("PIPEDREAM_SOURCES_TEST", "on");
        let set = env()
            .query(&ectx, Value::from("PIPEDREAM_SOURCES_TEST"))
            .await
            .unwrap();
        assert_eq!(set, Value::from("on"));

        let missing = env()
            .query(&ectx, Value::from("PIPEDREAM_SURELY_UNSET_VARIABLE"))
            .await;
        assert!(matches!(missing, Err(DataSourceError::Query(_))));

        let wrong_type = env().query(&ectx, Value::I32(1)).await;
        assert!(matches!(
            wrong_type,
            Err(DataSourceError::ParamTypeDoesNotMatch { expected: "string", .. })
        ));
    }

    #[tokio::test]
    async fn test_json_file() {
        let path = std::env::temp_dir().join(format!("pipedream-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"limit": 3}}"#).unwrap();

        let ectx = ExecutionContext::new();
        let value = json_file()
            .query(&ectx, Value::from(path.to_string_lossy().to_string()))
            .await
            .unwrap();
        assert_eq!(value, Value::from(serde_json::json!({"limit": 3})));

        std::fs::remove_file(&path).unwrap();

        let missing = json_file()
            .query(&ectx, Value::from(path.to_string_lossy().to_string()))
            .await;
        assert!(matches!(missing, Err(DataSourceError::Query(_))));
    }

    #[tokio::test]
    async fn test_register_builtins() {
        let executor = PipelineExecutor::new();
        register_builtins(&executor).await;
        assert_eq!(
            executor.data_sources().names().await,
            vec!["echo", "env", "json_file"]
        );
    }
}
