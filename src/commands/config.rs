use anyhow::{Context, Result};
use clap::Args;
use core_runtime::config::AppConfig;
use core_runtime::logging::redact_if_sensitive;
use tracing::info;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Feishu app id
    #[arg(long = "app-id", alias = "appId")]
    app_id: Option<String>,

    /// Feishu app secret
    #[arg(long = "app-secret", alias = "appSecret")]
    app_secret: Option<String>,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    let path = AppConfig::default_path()?;
    let mut config = AppConfig::load(&path)?;

    let updated = args.app_id.is_some() || args.app_secret.is_some();
    if let Some(app_id) = args.app_id {
        config.feishu.app_id = app_id;
    }
    if let Some(app_secret) = args.app_secret {
        config.feishu.app_secret = app_secret;
    }
    if updated {
        config.save(&path)?;
        info!(path = %path.display(), "Saved app config");
    }

    let mut shown = config.clone();
    shown.feishu.app_secret = redact_if_sensitive("app_secret", &config.feishu.app_secret);

    println!("Configuration file: {}", path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(&shown).context("failed to render app config")?
    );
    Ok(())
}
