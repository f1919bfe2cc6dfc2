//! Remote document state as seen by the planner

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::document::{DocumentInfo, DocumentProvider, DocxBlock};
use core_docx::{render_document, RenderOptions};
use provider_feishu::url::{parse_document_url, DocumentKind};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::error::{Result, SyncError};

/// Title and plain-rendered Markdown of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContent {
    pub title: String,
    pub markdown: String,
}

impl RemoteContent {
    /// Hex SHA-256 over title followed by Markdown
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update(self.markdown.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
pub trait RemoteDocuments: Send + Sync {
    /// Remote title, used to predict file names
    async fn document_title(&self, url: &str) -> Result<String>;

    /// Revision id for docx links; `None` for kinds without a usable revision
    async fn document_revision(&self, url: &str) -> Result<Option<i64>>;

    /// Title and rendered Markdown for content hashing
    async fn document_content(&self, url: &str) -> Result<RemoteContent>;
}

/// Document id behind a docx or wiki link; wiki nodes are resolved
pub(crate) async fn resolve_document_id(
    provider: &dyn DocumentProvider,
    url: &str,
) -> Result<(DocumentKind, String)> {
    let reference = parse_document_url(url)?;
    match reference.kind {
        DocumentKind::Docx => Ok((DocumentKind::Docx, reference.token)),
        DocumentKind::Wiki => {
            let node = provider.wiki_node(&reference.token).await?;
            match node.obj_type.as_str() {
                "docx" => Ok((DocumentKind::Wiki, node.obj_token)),
                "doc" => Err(SyncError::Unsupported(
                    "Feishu Docs is no longer supported; convert the document to docx".to_string(),
                )),
                other => Err(SyncError::Unsupported(format!(
                    "wiki node {} is a {}, not a document",
                    reference.token, other
                ))),
            }
        }
        DocumentKind::Docs => Err(SyncError::Unsupported(
            "Feishu Docs is no longer supported; convert the document to docx".to_string(),
        )),
    }
}

/// Token in a document link, the stable stand-in for a blank title or name
pub(crate) fn link_token(url: &str) -> String {
    parse_document_url(url)
        .map(|reference| reference.token)
        .unwrap_or_default()
}

/// Render without name resolution or HTML tags so the hash only moves with content
pub fn fingerprint_content(info: &DocumentInfo, blocks: &[DocxBlock]) -> Result<RemoteContent> {
    let rendered = render_document(info, blocks, &HashMap::new(), &RenderOptions::default())?;
    Ok(RemoteContent {
        title: info.title.clone(),
        markdown: rendered.markdown,
    })
}

/// `RemoteDocuments` over a document provider
pub struct ProviderDocuments {
    provider: Arc<dyn DocumentProvider>,
}

impl ProviderDocuments {
    pub fn new(provider: Arc<dyn DocumentProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RemoteDocuments for ProviderDocuments {
    #[instrument(skip(self))]
    async fn document_title(&self, url: &str) -> Result<String> {
        let (_, document_id) = resolve_document_id(self.provider.as_ref(), url).await?;
        Ok(self.provider.document_info(&document_id).await?.title)
    }

    #[instrument(skip(self))]
    async fn document_revision(&self, url: &str) -> Result<Option<i64>> {
        let (kind, document_id) = resolve_document_id(self.provider.as_ref(), url).await?;
        if kind != DocumentKind::Docx {
            return Ok(None);
        }
        Ok(Some(self.provider.document_info(&document_id).await?.revision_id))
    }

    #[instrument(skip(self))]
    async fn document_content(&self, url: &str) -> Result<RemoteContent> {
        let (_, document_id) = resolve_document_id(self.provider.as_ref(), url).await?;
        let info = self.provider.document_info(&document_id).await?;
        let blocks = self.provider.document_blocks(&document_id).await?;
        fingerprint_content(&info, &blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDocuments;
    use bridge_traits::document::{TextBlock, TextElement, TextRun, WikiNode};

    fn page(document_id: &str, body: &str) -> Vec<DocxBlock> {
        let run = |content: &str| TextBlock {
            elements: vec![TextElement {
                text_run: Some(TextRun {
                    content: content.to_string(),
                    text_element_style: Default::default(),
                }),
                ..Default::default()
            }],
            ..Default::default()
        };

        vec![
            DocxBlock {
                block_id: document_id.to_string(),
                children: vec!["t1".to_string()],
                block_type: 1,
                page: Some(run("Title")),
                ..Default::default()
            },
            DocxBlock {
                block_id: "t1".to_string(),
                parent_id: Some(document_id.to_string()),
                block_type: 2,
                text: Some(run(body)),
                ..Default::default()
            },
        ]
    }

    fn info(document_id: &str, revision_id: i64) -> DocumentInfo {
        DocumentInfo {
            document_id: document_id.to_string(),
            revision_id,
            title: "Title".to_string(),
        }
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let content = RemoteContent {
            title: "a".to_string(),
            markdown: "b".to_string(),
        };
        // sha256("ab")
        assert_eq!(
            content.content_hash(),
            "fb8e20fc2e4c3f248c60c39bd652f3c1347298bb977b8b4d5903b85055620603"
        );
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let before = fingerprint_content(&info("doc", 1), &page("doc", "one")).unwrap();
        let same = fingerprint_content(&info("doc", 2), &page("doc", "one")).unwrap();
        let after = fingerprint_content(&info("doc", 3), &page("doc", "two")).unwrap();

        assert_eq!(before.content_hash(), same.content_hash());
        assert_ne!(before.content_hash(), after.content_hash());
    }

    #[tokio::test]
    async fn test_docx_revision() {
        let mut provider = MockDocuments::new();
        provider
            .expect_document_info()
            .withf(|id| id == "docTok")
            .returning(|id| Ok(info(id, 17)));

        let remote = ProviderDocuments::new(Arc::new(provider));
        let revision = remote
            .document_revision("https://x.feishu.cn/docx/docTok")
            .await
            .unwrap();

        assert_eq!(revision, Some(17));
    }

    #[tokio::test]
    async fn test_wiki_has_no_revision_but_has_content() {
        let mut provider = MockDocuments::new();
        provider.expect_wiki_node().returning(|_| {
            Ok(WikiNode {
                obj_token: "docBehind".to_string(),
                obj_type: "docx".to_string(),
                ..Default::default()
            })
        });
        provider
            .expect_document_info()
            .returning(|id| Ok(info(id, 5)));
        provider
            .expect_document_blocks()
            .withf(|id| id == "docBehind")
            .returning(|id| Ok(page(id, "body")));

        let remote = ProviderDocuments::new(Arc::new(provider));
        let url = "https://x.feishu.cn/wiki/wikTok";

        assert_eq!(remote.document_revision(url).await.unwrap(), None);
        let content = remote.document_content(url).await.unwrap();
        assert_eq!(content.title, "Title");
        assert!(content.markdown.contains("body"));
        assert_eq!(remote.document_title(url).await.unwrap(), "Title");
    }

    #[tokio::test]
    async fn test_legacy_docs_are_unsupported() {
        let remote = ProviderDocuments::new(Arc::new(MockDocuments::new()));
        let result = remote.document_title("https://x.feishu.cn/docs/old").await;
        assert!(matches!(result, Err(SyncError::Unsupported(_))));
    }
}
