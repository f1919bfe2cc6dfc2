use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use core_sync::{DocumentDownloader, DocumentRequest, DownloadSettings};

use super::{connect, load_app_config};

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Document, drive folder or wiki space link
    url: String,

    /// Output directory
    #[arg(short, long, default_value = "./")]
    output: PathBuf,

    /// Download every document in a drive folder
    #[arg(long, conflicts_with = "wiki")]
    batch: bool,

    /// Download every document in a wiki space
    #[arg(long)]
    wiki: bool,

    /// Keep image tokens instead of downloading images
    #[arg(long)]
    skip_images: bool,

    /// Also write the raw API response as JSON
    #[arg(long)]
    dump: bool,
}

pub async fn run(args: DownloadArgs) -> Result<()> {
    let config = load_app_config()?;
    let connector = connect(&config)?;

    let mut settings = DownloadSettings::from(&config.output);
    settings.dump_json = args.dump;
    let downloader = DocumentDownloader::new(connector, settings);

    if args.batch {
        let downloaded = downloader
            .download_folder(&args.url, &args.output, args.skip_images)
            .await?;
        println!("Downloaded {} documents to {}", downloaded, args.output.display());
    } else if args.wiki {
        let downloaded = downloader
            .download_wiki_space(&args.url, &args.output, args.skip_images)
            .await?;
        println!("Downloaded {} documents to {}", downloaded, args.output.display());
    } else {
        let request = DocumentRequest {
            output_dir: args.output,
            name: None,
            use_original_title: false,
            skip_images: args.skip_images,
        };
        let outcome = downloader.download_document(&args.url, &request).await?;
        println!("Downloaded markdown file to {}", outcome.path.display());
    }

    Ok(())
}
