//! Document, folder and wiki space downloads
//!
//! Documents render to `<output>/<name>.md` with images stored beside them in
//! `<output>/<name>/`. Containers mirror their hierarchy as directories and
//! download their docx children concurrently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::document::{DocumentProvider, DocxBlock, DocumentInfo};
use bridge_traits::error::BridgeError;
use core_bitable::sanitize_file_name_or;
use core_docx::{collect_mention_user_ids, render_document, RenderOptions};
use core_runtime::config::OutputConfig;
use provider_feishu::url::{parse_folder_url, parse_wiki_space_url, DocumentKind};
use serde::Serialize;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::metadata::Fingerprint;
use crate::remote::{fingerprint_content, link_token, resolve_document_id};

/// Upper bound on concurrent document downloads inside one container
pub const CONTAINER_CONCURRENCY: usize = 10;

/// Output flags from the application config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSettings {
    pub title_as_filename: bool,
    pub use_html_tags: bool,
    pub skip_img_download: bool,
    /// Also write the raw API response as `<token>.json`
    pub dump_json: bool,
}

impl From<&OutputConfig> for DownloadSettings {
    fn from(output: &OutputConfig) -> Self {
        Self {
            title_as_filename: output.title_as_filename,
            use_html_tags: output.use_html_tags,
            skip_img_download: output.skip_img_download,
            dump_json: false,
        }
    }
}

/// Where and under which name a single document lands
#[derive(Debug, Clone, Default)]
pub struct DocumentRequest {
    pub output_dir: PathBuf,
    pub name: Option<String>,
    pub use_original_title: bool,
    pub skip_images: bool,
}

impl DocumentRequest {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Markdown file name relative to the output dir
    pub file_name: String,
    pub path: PathBuf,
    pub title: String,
    pub fingerprint: Fingerprint,
}

#[derive(Serialize)]
struct DumpedDocument<'a> {
    document: &'a DocumentInfo,
    blocks: &'a [DocxBlock],
}

#[derive(Clone)]
pub struct DocumentDownloader {
    provider: Arc<dyn DocumentProvider>,
    settings: DownloadSettings,
}

impl DocumentDownloader {
    pub fn new(provider: Arc<dyn DocumentProvider>, settings: DownloadSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Download one docx or wiki page
    #[instrument(skip(self, request), fields(output = %request.output_dir.display()))]
    pub async fn download_document(
        &self,
        url: &str,
        request: &DocumentRequest,
    ) -> Result<DownloadOutcome> {
        let (kind, document_id) = resolve_document_id(self.provider.as_ref(), url).await?;
        let info = self.provider.document_info(&document_id).await?;
        let blocks = self.provider.document_blocks(&document_id).await?;

        let names = self.mention_names(&blocks).await;
        let rendered = render_document(
            &info,
            &blocks,
            &names,
            &RenderOptions {
                use_html_tags: self.settings.use_html_tags,
            },
        )?;

        let stem = self.file_stem(url, &info.title, &document_id, request);
        let mut markdown = rendered.markdown;

        if request.skip_images || self.settings.skip_img_download {
            if !rendered.image_tokens.is_empty() {
                info!(images = rendered.image_tokens.len(), "Skipping image download");
            }
        } else {
            let image_dir = request.output_dir.join(&stem);
            for token in &rendered.image_tokens {
                let file_name = self.download_image(token, &image_dir).await?;
                markdown = markdown.replacen(
                    &format!("]({})", token),
                    &format!("]({}/{})", stem, file_name),
                    1,
                );
            }
        }

        fs::create_dir_all(&request.output_dir).await?;

        if self.settings.dump_json {
            let dump = serde_json::to_string_pretty(&DumpedDocument {
                document: &info,
                blocks: &blocks,
            })
            .map_err(|e| SyncError::Task(format!("failed to serialize {}: {}", document_id, e)))?;
            let dump_path = request.output_dir.join(format!("{}.json", document_id));
            fs::write(&dump_path, dump).await?;
            info!(path = %dump_path.display(), "Dumped API response");
        }

        let file_name = format!("{}.md", stem);
        let path = request.output_dir.join(&file_name);
        fs::write(&path, &markdown).await?;
        info!(path = %path.display(), "Downloaded markdown");

        let fingerprint = match kind {
            DocumentKind::Docx => Fingerprint::Revision(info.revision_id),
            _ => Fingerprint::ContentHash(fingerprint_content(&info, &blocks)?.content_hash()),
        };

        Ok(DownloadOutcome {
            file_name,
            path,
            title: info.title,
            fingerprint,
        })
    }

    /// Download every docx under a drive folder; returns the number downloaded
    #[instrument(skip(self), fields(output = %output_dir.display()))]
    pub async fn download_folder(
        &self,
        url: &str,
        output_dir: &Path,
        skip_images: bool,
    ) -> Result<usize> {
        let folder_token = parse_folder_url(url)?;
        info!(folder = %folder_token, "Downloading folder");

        let semaphore = Arc::new(Semaphore::new(CONTAINER_CONCURRENCY));
        let mut tasks = JoinSet::new();
        let mut pending = vec![(output_dir.to_path_buf(), folder_token)];

        while let Some((dir, token)) = pending.pop() {
            let files = self.provider.folder_files(&token).await?;
            for file in files {
                match file.file_type.as_str() {
                    "folder" => pending.push((
                        dir.join(sanitize_file_name_or(&file.name, &file.token)),
                        file.token,
                    )),
                    "docx" => {
                        let request = DocumentRequest {
                            output_dir: dir.clone(),
                            name: Some(file.name),
                            use_original_title: false,
                            skip_images,
                        };
                        self.spawn_download(&mut tasks, &semaphore, file.url, request);
                    }
                    other => debug!(name = %file.name, kind = other, "Skipping non-document file"),
                }
            }
        }

        join_downloads(tasks).await
    }

    /// Download a whole wiki space under `<output>/<space name>`
    #[instrument(skip(self), fields(output = %output_dir.display()))]
    pub async fn download_wiki_space(
        &self,
        url: &str,
        output_dir: &Path,
        skip_images: bool,
    ) -> Result<usize> {
        let space = parse_wiki_space_url(url)?;
        let info = self.provider.wiki_space(&space.space_id).await?;
        if info.name.is_empty() {
            return Err(SyncError::Provider(BridgeError::OperationFailed(format!(
                "wiki space {} has no name",
                space.space_id
            ))));
        }
        info!(space = %info.name, "Downloading wiki space");

        let semaphore = Arc::new(Semaphore::new(CONTAINER_CONCURRENCY));
        let mut tasks = JoinSet::new();
        let mut pending = vec![(output_dir.join(sanitize_file_name_or(&info.name, &space.space_id)), None)];

        while let Some((dir, parent)) = pending.pop() {
            let nodes = self.provider.wiki_children(&space.space_id, parent).await?;
            for node in nodes {
                if node.has_child {
                    pending.push((
                        dir.join(sanitize_file_name_or(&node.title, &node.node_token)),
                        Some(node.node_token.clone()),
                    ));
                }
                if node.obj_type == "docx" {
                    let request = DocumentRequest {
                        output_dir: dir.clone(),
                        name: Some(node.title),
                        use_original_title: false,
                        skip_images,
                    };
                    let node_url = format!("{}/wiki/{}", space.prefix, node.node_token);
                    self.spawn_download(&mut tasks, &semaphore, node_url, request);
                }
            }
        }

        join_downloads(tasks).await
    }

    fn spawn_download(
        &self,
        tasks: &mut JoinSet<Result<DownloadOutcome>>,
        semaphore: &Arc<Semaphore>,
        url: String,
        request: DocumentRequest,
    ) {
        let downloader = self.clone();
        let semaphore = Arc::clone(semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| SyncError::Task(e.to_string()))?;
            downloader.download_document(&url, &request).await
        });
    }

    async fn mention_names(&self, blocks: &[DocxBlock]) -> HashMap<String, String> {
        let user_ids = collect_mention_user_ids(blocks);
        if user_ids.is_empty() {
            return HashMap::new();
        }

        match self.provider.user_names(&user_ids).await {
            Ok(names) => {
                if names.len() < user_ids.len() {
                    warn!(
                        resolved = names.len(),
                        total = user_ids.len(),
                        "Some mentions could not be resolved; the app may lack contact read permission"
                    );
                } else {
                    debug!(resolved = names.len(), "Resolved mentions");
                }
                names
            }
            Err(e) => {
                warn!(error = %e, "Mention lookup failed");
                HashMap::new()
            }
        }
    }

    /// Markdown file stem; a blank title or name falls back to the link token
    /// so the planner can predict the same name on the next run
    fn file_stem(
        &self,
        url: &str,
        title: &str,
        document_id: &str,
        request: &DocumentRequest,
    ) -> String {
        if request.use_original_title {
            return sanitize_file_name_or(title, &link_token(url));
        }
        match request.name.as_deref() {
            Some(name) => sanitize_file_name_or(name, &link_token(url)),
            None if self.settings.title_as_filename => sanitize_file_name_or(title, document_id),
            None => document_id.to_string(),
        }
    }

    /// Store one image as `<dir>/<token><ext>`, returning the file name
    async fn download_image(&self, token: &str, dir: &Path) -> Result<String> {
        let media = self.provider.download_media(token).await?;
        let extension = Path::new(&media.file_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let file_name = format!("{}{}", token, extension);

        fs::create_dir_all(dir).await?;
        fs::write(dir.join(&file_name), &media.content).await?;
        debug!(token, file = %file_name, "Downloaded image");
        Ok(file_name)
    }
}

/// Wait for every download; the first failure is returned after all finish
async fn join_downloads(mut tasks: JoinSet<Result<DownloadOutcome>>) -> Result<usize> {
    let mut downloaded = 0;
    let mut first_error = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(_)) => downloaded += 1,
            Ok(Err(e)) => {
                warn!(error = %e, "Document download failed");
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(SyncError::Task(e.to_string()));
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(downloaded),
    }
}
