//! Subcommand handlers

pub mod config;
pub mod download;
pub mod export;
pub mod merge;
pub mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};
use bridge_desktop::ReqwestHttpClient;
use core_bitable::{CatalogPolicy, TableExporter};
use core_runtime::config::{include_system_fields_from_env, AppConfig};
use provider_feishu::FeishuConnector;

/// App config with environment overrides, validated for API use
fn load_app_config() -> Result<AppConfig> {
    let config = AppConfig::load_default()
        .context("failed to load app config")?
        .with_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn connect(config: &AppConfig) -> Result<Arc<FeishuConnector>> {
    let http = ReqwestHttpClient::new().context("failed to build HTTP client")?;
    Ok(Arc::new(FeishuConnector::new(
        Arc::new(http),
        config.feishu.app_id.clone(),
        config.feishu.app_secret.clone(),
    )))
}

fn table_exporter(connector: &Arc<FeishuConnector>) -> TableExporter {
    TableExporter::new(connector.clone(), connector.clone()).with_policy(CatalogPolicy {
        include_system_fields: include_system_fields_from_env(),
    })
}
