//! Mocks shared by unit tests

use async_trait::async_trait;
use bridge_traits::document::{
    DocumentInfo, DocumentProvider, DocxBlock, DriveFile, MediaFile, WikiNode, WikiSpace,
};
use mockall::mock;
use std::collections::HashMap;

use crate::remote::{RemoteContent, RemoteDocuments};

mock! {
    pub Documents {}

    #[async_trait]
    impl DocumentProvider for Documents {
        async fn document_info(&self, document_id: &str) -> bridge_traits::error::Result<DocumentInfo>;
        async fn document_blocks(&self, document_id: &str) -> bridge_traits::error::Result<Vec<DocxBlock>>;
        async fn wiki_node(&self, node_token: &str) -> bridge_traits::error::Result<WikiNode>;
        async fn wiki_space(&self, space_id: &str) -> bridge_traits::error::Result<WikiSpace>;
        async fn wiki_children(&self, space_id: &str, parent: Option<String>) -> bridge_traits::error::Result<Vec<WikiNode>>;
        async fn folder_files(&self, folder_token: &str) -> bridge_traits::error::Result<Vec<DriveFile>>;
        async fn download_media(&self, token: &str) -> bridge_traits::error::Result<MediaFile>;
        async fn user_names(&self, user_ids: &[String]) -> bridge_traits::error::Result<HashMap<String, String>>;
    }
}

mock! {
    pub Remote {}

    #[async_trait]
    impl RemoteDocuments for Remote {
        async fn document_title(&self, url: &str) -> crate::error::Result<String>;
        async fn document_revision(&self, url: &str) -> crate::error::Result<Option<i64>>;
        async fn document_content(&self, url: &str) -> crate::error::Result<RemoteContent>;
    }
}
