//! Merge downloaded Markdown into one file

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use core_runtime::config::{MergeSettings, SyncConfig};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Levels added to every heading of a merged file
const HEADING_DEMOTION: usize = 2;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the Markdown files (overrides config)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory of the merged file (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Merged file name (overrides config)
    #[arg(short, long)]
    filename: Option<String>,
}

pub fn run(args: MergeArgs) -> Result<()> {
    let (config, _) = SyncConfig::load(args.config.as_deref())?;
    let settings = config.merge;

    let input = args.input.unwrap_or_else(|| {
        if settings.input_dir.trim().is_empty() {
            PathBuf::from(&config.sync.output_dir)
        } else {
            PathBuf::from(&settings.input_dir)
        }
    });
    let output_dir = args
        .output
        .unwrap_or_else(|| PathBuf::from(&settings.output_dir));
    let filename = args.filename.unwrap_or_else(|| settings.filename.clone());
    let output_path = output_dir.join(&filename);

    if !input.is_dir() {
        bail!("input directory {} does not exist", input.display());
    }

    let files = find_markdown_files(&input, settings.sort_files, &output_path)?;
    if files.is_empty() {
        bail!("no .md files found in {}", input.display());
    }
    info!(input = %input.display(), files = files.len(), "Merging markdown files");

    let generated_at = settings
        .include_timestamp
        .then(|| Local::now().format(TIMESTAMP_FORMAT).to_string());
    let merged = merge_markdown(&input, &files, &settings, generated_at.as_deref());

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    fs::write(&output_path, merged)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!("Merged {} files into {}", files.len(), output_path.display());
    Ok(())
}

/// `.md` files under `dir`, excluding `exclude` (the merge target itself)
pub fn find_markdown_files(dir: &Path, sort: bool, exclude: &Path) -> Result<Vec<PathBuf>> {
    let excluded = fs::canonicalize(exclude).ok();
    let mut files = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_markdown = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("md"))
            .unwrap_or(false);
        if !is_markdown {
            continue;
        }
        if excluded.is_some() && fs::canonicalize(entry.path()).ok() == excluded {
            debug!(path = %entry.path().display(), "Skipping merge target");
            continue;
        }
        files.push(entry.into_path());
    }

    if sort {
        files.sort();
    }
    Ok(files)
}

/// Build the merged document; unreadable files are skipped with a warning
pub fn merge_markdown(
    root: &Path,
    files: &[PathBuf],
    settings: &MergeSettings,
    generated_at: Option<&str>,
) -> String {
    let mut out = format!("# {}\n\n> Generated by feishu2md\n", settings.header_title);
    if let Some(generated_at) = generated_at {
        out.push_str(&format!("> Generated at: {}\n", generated_at));
    }
    out.push_str(&format!("> Documents: {}\n", files.len()));

    for path in files {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                continue;
            }
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        let title = relative.with_extension("");
        out.push_str(&format!("\n---\n\n## {}\n\n", title.display()));
        out.push_str(&demote_headings(&content));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

/// Push ATX headings down so they nest under the per-file section
fn demote_headings(content: &str) -> String {
    let mut in_fence = false;
    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                return line.to_string();
            }

            let level = trimmed.chars().take_while(|c| *c == '#').count();
            let is_heading = level > 0
                && level <= 6
                && trimmed[level..]
                    .chars()
                    .next()
                    .map_or(true, |c| c == ' ' || c == '\t');
            if !is_heading {
                return line.to_string();
            }

            let demoted = (level + HEADING_DEMOTION).min(6);
            format!("{}{}", "#".repeat(demoted), &trimmed[level..])
        })
        .collect();

    let mut joined = lines.join("\n");
    if content.ends_with('\n') {
        joined.push('\n');
    }
    joined
}
