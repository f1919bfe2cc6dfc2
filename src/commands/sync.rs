use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use bridge_traits::document::DocumentProvider;
use clap::Subcommand;
use core_runtime::config::{DocConfig, SyncConfig};
use core_sync::{
    DocumentDownloader, DocumentTarget, DownloadSettings, ProviderDocuments, SyncOrchestrator,
};
use tracing::info;

use super::{connect, load_app_config, table_exporter};

#[derive(Subcommand, Debug)]
pub enum SyncCommand {
    /// Write a starter configuration file
    Init {
        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Add a document to the configuration
    Add {
        /// Document link
        url: String,

        /// Document name, also used as the output file name
        #[arg(long)]
        name: String,

        /// Document group (sub-directory of the output dir)
        #[arg(long, default_value = "")]
        group: String,

        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List configured documents
    List {
        /// Only list one group
        #[arg(long)]
        group: Option<String>,

        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Sync configured documents
    Run {
        /// Only sync one group
        #[arg(long)]
        group: Option<String>,

        /// Clean the output dir and re-download everything
        #[arg(long)]
        force: bool,

        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Remove a document by name or list index
    Remove {
        name_or_index: String,

        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub async fn run(command: SyncCommand) -> Result<()> {
    match command {
        SyncCommand::Init { config } => init(config),
        SyncCommand::Add {
            url,
            name,
            group,
            config,
        } => {
            let (mut sync_config, path) = SyncConfig::load(config.as_deref())?;
            sync_config.add_document(&name, &url, &group)?;
            let path = sync_config.save(&path)?;
            println!("Added document '{}' to {}", name, path.display());
            Ok(())
        }
        SyncCommand::List { group, config } => {
            let (sync_config, _) = SyncConfig::load(config.as_deref())?;
            list(&sync_config, group.as_deref());
            Ok(())
        }
        SyncCommand::Run {
            group,
            force,
            config,
        } => sync(config, group, force).await,
        SyncCommand::Remove {
            name_or_index,
            config,
        } => {
            let (mut sync_config, path) = SyncConfig::load(config.as_deref())?;
            let removed = sync_config.remove_document(&name_or_index)?;
            sync_config.save(&path)?;
            println!("Removed document '{}'", removed.name);
            Ok(())
        }
    }
}

fn init(config: Option<PathBuf>) -> Result<()> {
    let path = SyncConfig::resolve_path(config.as_deref())?;
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    let mut sync_config = SyncConfig::default();
    sync_config.documents.push(DocConfig {
        name: "Example".to_string(),
        url: "https://example.feishu.cn/docx/example".to_string(),
        group: "examples".to_string(),
        ..Default::default()
    });
    let path = sync_config.save(&path)?;

    println!("Sync configuration initialized at {}", path.display());
    println!("Next steps:");
    println!("  1. feishu2md config --app-id <id> --app-secret <secret>");
    println!("  2. feishu2md sync add <url> --name <name> --group <group>");
    println!("  3. feishu2md sync run");
    Ok(())
}

fn list(sync_config: &SyncConfig, group: Option<&str>) {
    let documents = sync_config.documents(group);
    if documents.is_empty() {
        println!("No documents configured");
        return;
    }

    println!("Output directory: {}", sync_config.sync.output_dir);
    println!("Organize by group: {}", sync_config.sync.organize_by_group);
    println!("Concurrent downloads: {}", sync_config.sync.concurrency());
    println!("Sync mode: {}", sync_config.sync.sync_mode);

    // Indexes follow config order so they match `sync remove <index>`
    let mut groups: BTreeMap<&str, Vec<(usize, &DocConfig)>> = BTreeMap::new();
    for (index, doc) in sync_config.documents.iter().enumerate() {
        if documents.iter().any(|selected| std::ptr::eq(*selected, doc)) {
            groups.entry(doc.group.as_str()).or_default().push((index, doc));
        }
    }

    for (group, docs) in groups {
        println!();
        println!("[{}]", if group.is_empty() { "(root)" } else { group });
        for (index, doc) in docs {
            let target = DocumentTarget::from_config(doc, &sync_config.sync);
            println!("  {}. {} ({})", index, doc.name, target.kind);
            println!("     {}", doc.url);
        }
    }

    println!();
    println!("Total: {} documents", documents.len());
}

async fn sync(config: Option<PathBuf>, group: Option<String>, force: bool) -> Result<()> {
    let (sync_config, path) = SyncConfig::load(config.as_deref())?;
    info!(path = %path.display(), "Loaded sync config");

    let documents = sync_config.documents(group.as_deref());
    if documents.is_empty() {
        println!("No documents to sync");
        return Ok(());
    }
    let targets: Vec<DocumentTarget> = documents
        .iter()
        .map(|doc| DocumentTarget::from_config(doc, &sync_config.sync))
        .collect();

    let app_config = load_app_config()?;
    let connector = connect(&app_config)?;
    let provider: Arc<dyn DocumentProvider> = connector.clone();

    let orchestrator = SyncOrchestrator::new(
        DocumentDownloader::new(provider.clone(), DownloadSettings::from(&app_config.output)),
        table_exporter(&connector),
        Arc::new(ProviderDocuments::new(provider)),
        sync_config.sync.clone(),
    );

    println!(
        "Syncing {} documents into {} ({})",
        targets.len(),
        sync_config.sync.output_dir,
        if force {
            "forced".to_string()
        } else {
            sync_config.sync.sync_mode.to_string()
        }
    );

    let started = Instant::now();
    let report = orchestrator.run(&targets, force).await;

    println!();
    println!(
        "Sync finished in {:.1?}: {} succeeded, {} failed, {} up to date",
        started.elapsed(),
        report.succeeded,
        report.failures.len(),
        report.skipped()
    );
    for failure in &report.failures {
        println!("  - {}: {}", failure.name, failure.error);
    }

    if !report.is_success() {
        bail!("{} documents failed to sync", report.failures.len());
    }
    Ok(())
}
