use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use core_bitable::{BitableError, ExportFormat, ExportRequest};

use super::{connect, load_app_config, table_exporter};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Bitable, wiki or docx link carrying a `table` query parameter
    url: String,

    /// Output format: csv or xlsx
    #[arg(long, default_value = "csv")]
    format: String,

    /// Output directory
    #[arg(short, long, default_value = "./")]
    output: PathBuf,

    /// File name without extension; defaults to `App_Table[_View]`
    #[arg(long)]
    name: Option<String>,

    /// Export only the columns visible in the link's view
    #[arg(long)]
    view_fields_only: bool,

    /// Drop image attachments from attachment and text cells
    #[arg(long)]
    filter_images: bool,
}

pub async fn run(args: ExportArgs) -> Result<()> {
    let format: ExportFormat = args
        .format
        .parse()
        .map_err(|_| BitableError::UnsupportedFormat(args.format.clone()))?;

    let config = load_app_config()?;
    let connector = connect(&config)?;

    let mut request = ExportRequest::new(args.url, format, args.output);
    request.base_name = args.name.filter(|name| !name.trim().is_empty());
    request.view_scoped = args.view_fields_only;
    request.filter_images = args.filter_images;

    let outcome = table_exporter(&connector).export(&request).await?;
    println!("Exported {} rows to {}", outcome.rows, outcome.path.display());
    Ok(())
}
