//! Provider mocks shared by unit tests

use async_trait::async_trait;
use bridge_traits::document::{
    BitableApp, BitableProvider, BitableTable, BitableView, DocumentInfo, DocumentProvider,
    DocxBlock, DriveFile, MediaFile, RecordPage, RemoteField, WikiNode, WikiSpace,
};
use bridge_traits::error::Result;
use mockall::mock;
use std::collections::HashMap;

mock! {
    pub Documents {}

    #[async_trait]
    impl DocumentProvider for Documents {
        async fn document_info(&self, document_id: &str) -> Result<DocumentInfo>;
        async fn document_blocks(&self, document_id: &str) -> Result<Vec<DocxBlock>>;
        async fn wiki_node(&self, node_token: &str) -> Result<WikiNode>;
        async fn wiki_space(&self, space_id: &str) -> Result<WikiSpace>;
        async fn wiki_children(&self, space_id: &str, parent: Option<String>) -> Result<Vec<WikiNode>>;
        async fn folder_files(&self, folder_token: &str) -> Result<Vec<DriveFile>>;
        async fn download_media(&self, token: &str) -> Result<MediaFile>;
        async fn user_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>>;
    }
}

mock! {
    pub Bitables {}

    #[async_trait]
    impl BitableProvider for Bitables {
        async fn bitable_app(&self, app_token: &str) -> Result<BitableApp>;
        async fn bitable_tables(&self, app_token: &str) -> Result<Vec<BitableTable>>;
        async fn bitable_views(&self, app_token: &str, table_id: &str) -> Result<Vec<BitableView>>;
        async fn list_fields(
            &self,
            app_token: &str,
            table_id: &str,
            view_id: Option<String>,
        ) -> Result<Vec<RemoteField>>;
        async fn list_records(
            &self,
            app_token: &str,
            table_id: &str,
            view_id: Option<String>,
            page_token: Option<String>,
            page_size: u32,
        ) -> Result<RecordPage>;
    }
}
