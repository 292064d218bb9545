//! Connection settings for the MongoDB driver.

use serde::{Deserialize, Serialize};

use crate::driver::MongoDbDriverBuilder;

/// Connection settings, usually read from a configuration file.
///
/// ```ignore
/// let config: MongoDbConfig = serde_json::from_str(r#"{ "dsn": "mongodb://localhost", "database": "zoo" }"#)?;
/// let driver = config.into_builder().build().await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoDbConfig {
    pub dsn: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

impl MongoDbConfig {
    /// Settings for `database` on the deployment at `dsn`.
    pub fn new(dsn: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            database: database.into(),
            app_name: None,
        }
    }

    /// Turns the settings into a driver builder.
    pub fn into_builder(self) -> MongoDbDriverBuilder {
        MongoDbDriverBuilder::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_optional() {
        let config: MongoDbConfig =
            serde_json::from_str(r#"{ "dsn": "mongodb://localhost:27017", "database": "zoo" }"#).unwrap();

        assert_eq!(config, MongoDbConfig::new("mongodb://localhost:27017", "zoo"));
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            serde_json::json!({ "dsn": "mongodb://localhost:27017", "database": "zoo" })
        );
    }

    #[test]
    fn builder_keeps_settings() {
        let config: MongoDbConfig = serde_json::from_str(
            r#"{ "dsn": "mongodb://db:27017", "database": "zoo", "app_name": "keeper" }"#,
        )
        .unwrap();

        assert_eq!(config.clone().into_builder().config(), &config);
    }
}
