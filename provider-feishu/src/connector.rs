//! Feishu open platform connector
//!
//! Implements `DocumentProvider` and `BitableProvider` on top of the
//! `HttpClient` bridge.

use async_trait::async_trait;
use bridge_traits::document::{
    BitableApp, BitableProvider, BitableTable, BitableView, DocumentInfo, DocumentProvider,
    DocxBlock, DriveFile, MediaFile, RawRecord, RecordPage, RemoteField, WikiNode, WikiSpace,
};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::auth::TenantAuth;
use crate::error::{FeishuError, Result};
use crate::types::{
    BitableAppData, DocumentData, DriveFilesData, Envelope, Paged, UsersBatchData, WikiNodeData,
    WikiSpaceData,
};

/// Feishu open API base URL
pub const FEISHU_API_BASE: &str = "https://open.feishu.cn/open-apis";

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const BLOCK_PAGE_SIZE: u32 = 500;
const WIKI_PAGE_SIZE: u32 = 50;
const DRIVE_PAGE_SIZE: u32 = 200;
const BITABLE_PAGE_SIZE: u32 = 100;
const USER_BATCH_SIZE: usize = 50;

/// Business codes meaning the tenant token is invalid or expired
const TOKEN_ERROR_CODES: [i64; 3] = [99991661, 99991663, 99991668];

/// Feishu API connector
///
/// # Features
///
/// - Tenant token authentication with caching
/// - Exhaustive paging of blocks, wiki nodes, drive folders and Bitable schema
/// - Exponential backoff on 429 and 5xx responses
/// - Envelope `code` checking with remote error codes preserved
///
/// # Example
///
/// ```ignore
/// use provider_feishu::FeishuConnector;
/// use bridge_traits::DocumentProvider;
///
/// let connector = FeishuConnector::new(http_client, app_id, app_secret);
/// let info = connector.document_info("doxcnAbC").await?;
/// ```
pub struct FeishuConnector {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    auth: TenantAuth,
}

impl FeishuConnector {
    /// Create a connector against the public Feishu endpoint
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self::with_base_url(http_client, FEISHU_API_BASE, app_id, app_secret)
    }

    /// Create a connector against a custom endpoint (Lark, test servers)
    pub fn with_base_url(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let auth = TenantAuth::new(http_client.clone(), base_url.clone(), app_id, app_secret);
        Self {
            http_client,
            base_url,
            auth,
        }
    }

    /// Execute an authenticated GET with retry logic
    ///
    /// Retries 429/5xx and transport errors with exponential backoff. A
    /// rejected token is dropped and fetched again once per attempt.
    #[instrument(skip(self), fields(url = %url))]
    async fn execute_with_retry(&self, url: String, max_retries: u32) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            let token = self.auth.token().await?;
            let request = HttpRequest::new(HttpMethod::Get, url.clone())
                .bearer_token(token)
                .header("Accept", "application/json")
                .timeout(REQUEST_TIMEOUT);

            match self.http_client.execute(request).await {
                Ok(response) => {
                    let status = response.status;

                    if status == 200 {
                        debug!("API request succeeded: status={}", status);
                        return Ok(response);
                    }

                    let envelope_code = serde_json::from_slice::<Envelope<serde_json::Value>>(
                        &response.body,
                    )
                    .ok()
                    .map(|envelope| (envelope.code, envelope.msg));

                    let token_rejected = status == 401
                        || matches!(&envelope_code, Some((code, _)) if TOKEN_ERROR_CODES.contains(code));

                    if token_rejected || response.is_retryable() {
                        attempt += 1;
                        if attempt >= max_retries {
                            warn!(
                                "API request failed after {} attempts: status={}",
                                max_retries, status
                            );
                            return Err(match envelope_code {
                                Some((code, msg)) if code != 0 => FeishuError::Api { code, msg },
                                _ => FeishuError::ApiError {
                                    status_code: status,
                                    message: format!(
                                        "Request failed after {} retries",
                                        max_retries
                                    ),
                                },
                            });
                        }

                        if token_rejected {
                            self.auth.invalidate().await;
                        }

                        let backoff_ms = 100u64 * 2u64.pow(attempt);
                        warn!(
                            "API request failed (attempt {}/{}): status={}, retrying in {}ms",
                            attempt, max_retries, status, backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    } else {
                        warn!("API request failed: status={}", status);
                        return Err(match envelope_code {
                            Some((code, msg)) if code != 0 => FeishuError::Api { code, msg },
                            _ => FeishuError::ApiError {
                                status_code: status,
                                message: String::from_utf8_lossy(&response.body).to_string(),
                            },
                        });
                    }
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        warn!("API request failed after {} attempts: {}", max_retries, e);
                        return Err(e.into());
                    }

                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        "API request failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt, max_retries, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    /// GET an enveloped endpoint and return its `data`
    async fn get_data<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.execute_with_retry(url, MAX_RETRIES).await?;

        let envelope: Envelope<T> = serde_json::from_slice(&response.body).map_err(|e| {
            FeishuError::ParseError(format!("Failed to parse {}: {}", context, e))
        })?;

        if envelope.code != 0 {
            return Err(FeishuError::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        envelope
            .data
            .ok_or_else(|| FeishuError::ParseError(format!("{}: response has no data", context)))
    }

    /// Drain a paged listing
    ///
    /// Stops when `has_more` is false, the token is empty, or the server
    /// hands back the token it was just given.
    async fn collect_pages<T, F>(&self, build_path: F, context: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(Option<&str>) -> String,
    {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let path = build_path(page_token.as_deref());
            let page: Paged<T> = self.get_data(&path, context).await?;
            let (mut batch, next, has_more) = page.into_parts();
            items.append(&mut batch);

            match next {
                Some(next) if has_more && !next.is_empty() && page_token.as_deref() != Some(next.as_str()) => {
                    page_token = Some(next);
                }
                _ => break,
            }
        }

        Ok(items)
    }

    #[instrument(skip(self))]
    async fn fetch_document_blocks(&self, document_id: &str) -> Result<Vec<DocxBlock>> {
        let document_id = urlencoding::encode(document_id).into_owned();
        let blocks: Vec<DocxBlock> = self
            .collect_pages(
                |page_token| {
                    let mut path = format!(
                        "/docx/v1/documents/{}/blocks?page_size={}&document_revision_id=-1",
                        document_id, BLOCK_PAGE_SIZE
                    );
                    if let Some(token) = page_token {
                        path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
                    }
                    path
                },
                "document blocks",
            )
            .await?;

        info!("Fetched {} blocks", blocks.len());
        Ok(blocks)
    }

    #[instrument(skip(self))]
    async fn fetch_wiki_children(
        &self,
        space_id: &str,
        parent: Option<String>,
    ) -> Result<Vec<WikiNode>> {
        let space_id = urlencoding::encode(space_id).into_owned();
        self.collect_pages(
            |page_token| {
                let mut path = format!(
                    "/wiki/v2/spaces/{}/nodes?page_size={}",
                    space_id, WIKI_PAGE_SIZE
                );
                if let Some(parent) = parent.as_deref() {
                    path.push_str(&format!(
                        "&parent_node_token={}",
                        urlencoding::encode(parent)
                    ));
                }
                if let Some(token) = page_token {
                    path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
                }
                path
            },
            "wiki nodes",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn fetch_folder_files(&self, folder_token: &str) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut path = format!(
                "/drive/v1/files?folder_token={}&page_size={}",
                urlencoding::encode(folder_token),
                DRIVE_PAGE_SIZE
            );
            if let Some(token) = page_token.as_deref() {
                path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
            }

            let data: DriveFilesData = self.get_data(&path, "folder listing").await?;
            files.extend(data.files.unwrap_or_default());

            match data.next_page_token {
                Some(next)
                    if data.has_more
                        && !next.is_empty()
                        && page_token.as_deref() != Some(next.as_str()) =>
                {
                    page_token = Some(next);
                }
                _ => break,
            }
        }

        info!("Listed {} entries in folder", files.len());
        Ok(files)
    }

    #[instrument(skip(self))]
    async fn fetch_media(&self, token: &str) -> Result<MediaFile> {
        let url = format!(
            "{}/drive/v1/medias/{}/download",
            self.base_url,
            urlencoding::encode(token)
        );
        let response = self.execute_with_retry(url, MAX_RETRIES).await?;

        let file_name = response
            .header("Content-Disposition")
            .and_then(content_disposition_file_name)
            .unwrap_or_else(|| token.to_string());

        info!("Downloaded {} bytes ({})", response.body.len(), file_name);

        Ok(MediaFile {
            file_name,
            content: response.body,
        })
    }

    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn fetch_user_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>> {
        let mut names = HashMap::new();

        for chunk in user_ids.chunks(USER_BATCH_SIZE) {
            let query = chunk
                .iter()
                .map(|id| format!("user_ids={}", urlencoding::encode(id)))
                .collect::<Vec<_>>()
                .join("&");
            let path = format!("/contact/v3/users/batch?{}&user_id_type=open_id", query);

            let data: UsersBatchData = self.get_data(&path, "user batch").await?;
            for user in data.items.unwrap_or_default() {
                let id = if user.open_id.is_empty() {
                    user.user_id
                } else {
                    user.open_id
                };
                if !id.is_empty() && !user.name.is_empty() {
                    names.insert(id, user.name);
                }
            }
        }

        debug!("Resolved {} of {} user names", names.len(), user_ids.len());
        Ok(names)
    }

    fn bitable_path(app_token: &str, rest: &str) -> String {
        format!(
            "/bitable/v1/apps/{}{}",
            urlencoding::encode(app_token),
            rest
        )
    }
}

/// Extract the file name from a `Content-Disposition` header
///
/// Prefers the RFC 5987 `filename*=UTF-8''...` form over `filename="..."`.
pub fn content_disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;

    for part in header.split(';').map(str::trim) {
        if let Some(encoded) = part.strip_prefix("filename*=") {
            let encoded = encoded.trim_matches('"');
            let value = match encoded.find("''") {
                Some(index) => &encoded[index + 2..],
                None => encoded,
            };
            if let Ok(decoded) = urlencoding::decode(value) {
                if !decoded.is_empty() {
                    return Some(decoded.into_owned());
                }
            }
        } else if let Some(value) = part.strip_prefix("filename=") {
            let value = value.trim_matches('"');
            if !value.is_empty() {
                plain = Some(value.to_string());
            }
        }
    }

    plain
}

#[async_trait]
impl DocumentProvider for FeishuConnector {
    #[instrument(skip(self))]
    async fn document_info(&self, document_id: &str) -> BridgeResult<DocumentInfo> {
        info!("Fetching document info: {}", document_id);
        let path = format!("/docx/v1/documents/{}", urlencoding::encode(document_id));
        let data: DocumentData = self.get_data(&path, "document info").await?;
        Ok(data.document)
    }

    async fn document_blocks(&self, document_id: &str) -> BridgeResult<Vec<DocxBlock>> {
        Ok(self.fetch_document_blocks(document_id).await?)
    }

    #[instrument(skip(self))]
    async fn wiki_node(&self, node_token: &str) -> BridgeResult<WikiNode> {
        let path = format!(
            "/wiki/v2/spaces/get_node?token={}",
            urlencoding::encode(node_token)
        );
        let data: WikiNodeData = self.get_data(&path, "wiki node").await?;
        Ok(data.node)
    }

    #[instrument(skip(self))]
    async fn wiki_space(&self, space_id: &str) -> BridgeResult<WikiSpace> {
        let path = format!("/wiki/v2/spaces/{}", urlencoding::encode(space_id));
        let data: WikiSpaceData = self.get_data(&path, "wiki space").await?;
        Ok(data.space)
    }

    async fn wiki_children(
        &self,
        space_id: &str,
        parent: Option<String>,
    ) -> BridgeResult<Vec<WikiNode>> {
        Ok(self.fetch_wiki_children(space_id, parent).await?)
    }

    async fn folder_files(&self, folder_token: &str) -> BridgeResult<Vec<DriveFile>> {
        Ok(self.fetch_folder_files(folder_token).await?)
    }

    async fn download_media(&self, token: &str) -> BridgeResult<MediaFile> {
        Ok(self.fetch_media(token).await?)
    }

    async fn user_names(&self, user_ids: &[String]) -> BridgeResult<HashMap<String, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self.fetch_user_names(user_ids).await?)
    }
}

#[async_trait]
impl BitableProvider for FeishuConnector {
    #[instrument(skip(self))]
    async fn bitable_app(&self, app_token: &str) -> BridgeResult<BitableApp> {
        let data: BitableAppData = self
            .get_data(&Self::bitable_path(app_token, ""), "bitable app")
            .await?;
        Ok(data.app)
    }

    #[instrument(skip(self))]
    async fn bitable_tables(&self, app_token: &str) -> BridgeResult<Vec<BitableTable>> {
        let tables = self
            .collect_pages(
                |page_token| {
                    let mut path = Self::bitable_path(
                        app_token,
                        &format!("/tables?page_size={}", BITABLE_PAGE_SIZE),
                    );
                    if let Some(token) = page_token {
                        path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
                    }
                    path
                },
                "bitable tables",
            )
            .await?;
        Ok(tables)
    }

    #[instrument(skip(self))]
    async fn bitable_views(
        &self,
        app_token: &str,
        table_id: &str,
    ) -> BridgeResult<Vec<BitableView>> {
        let table_id = urlencoding::encode(table_id).into_owned();
        let views = self
            .collect_pages(
                |page_token| {
                    let mut path = Self::bitable_path(
                        app_token,
                        &format!("/tables/{}/views?page_size={}", table_id, BITABLE_PAGE_SIZE),
                    );
                    if let Some(token) = page_token {
                        path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
                    }
                    path
                },
                "bitable views",
            )
            .await?;
        Ok(views)
    }

    #[instrument(skip(self))]
    async fn list_fields(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: Option<String>,
    ) -> BridgeResult<Vec<RemoteField>> {
        let table_id = urlencoding::encode(table_id).into_owned();
        let fields: Vec<RemoteField> = self
            .collect_pages(
                |page_token| {
                    let mut path = Self::bitable_path(
                        app_token,
                        &format!(
                            "/tables/{}/fields?page_size={}",
                            table_id, BITABLE_PAGE_SIZE
                        ),
                    );
                    if let Some(view_id) = view_id.as_deref() {
                        path.push_str(&format!("&view_id={}", urlencoding::encode(view_id)));
                    }
                    if let Some(token) = page_token {
                        path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
                    }
                    path
                },
                "bitable fields",
            )
            .await?;

        info!("Listed {} fields", fields.len());
        Ok(fields)
    }

    #[instrument(skip(self))]
    async fn list_records(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: Option<String>,
        page_token: Option<String>,
        page_size: u32,
    ) -> BridgeResult<RecordPage> {
        let mut path = Self::bitable_path(
            app_token,
            &format!(
                "/tables/{}/records?page_size={}&display_formula_ref=true",
                urlencoding::encode(table_id),
                page_size
            ),
        );
        if let Some(view_id) = view_id.as_deref() {
            path.push_str(&format!("&view_id={}", urlencoding::encode(view_id)));
        }
        if let Some(token) = page_token.as_deref() {
            path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
        }

        let page: Paged<RawRecord> = self.get_data(&path, "bitable records").await?;
        let (items, page_token, has_more) = page.into_parts();
        debug!("Fetched {} records (has_more={})", items.len(), has_more);

        Ok(RecordPage {
            items,
            page_token,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bytes::Bytes;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn is_token_request(req: &HttpRequest) -> bool {
        req.url.contains("tenant_access_token")
    }

    /// Mock that answers the token endpoint any number of times
    fn mock_with_token() -> MockHttpClient {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(is_token_request)
            .returning(|_| {
                Ok(ok(
                    r#"{"code":0,"msg":"ok","tenant_access_token":"t-test","expire":7200}"#,
                ))
            });
        mock_http
    }

    fn connector(mock_http: MockHttpClient) -> FeishuConnector {
        FeishuConnector::with_base_url(Arc::new(mock_http), "https://api.test/", "cli_a", "s")
    }

    #[test]
    fn test_content_disposition_file_name() {
        assert_eq!(
            content_disposition_file_name(r#"attachment; filename="chart.png""#).as_deref(),
            Some("chart.png")
        );
        assert_eq!(
            content_disposition_file_name(
                "attachment; filename=\"x.png\"; filename*=UTF-8''%E5%9B%BE.png"
            )
            .as_deref(),
            Some("图.png")
        );
        assert_eq!(content_disposition_file_name("inline"), None);
    }

    #[tokio::test]
    async fn test_document_info_success() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(1)
            .returning(|req| {
                assert_eq!(req.url, "https://api.test/docx/v1/documents/doxcnA");
                assert_eq!(
                    req.headers.get("Authorization").map(String::as_str),
                    Some("Bearer t-test")
                );
                Ok(ok(
                    r#"{"code":0,"msg":"ok","data":{"document":{"document_id":"doxcnA","revision_id":7,"title":"Roadmap"}}}"#,
                ))
            });

        let info = connector(mock_http).document_info("doxcnA").await.unwrap();

        assert_eq!(info.title, "Roadmap");
        assert_eq!(info.revision_id, 7);
    }

    #[tokio::test]
    async fn test_business_error_keeps_code() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(1)
            .returning(|_| Ok(ok(r#"{"code":1770002,"msg":"not found"}"#)));

        let result = connector(mock_http).document_info("doxcnA").await;

        assert!(matches!(
            result,
            Err(BridgeError::Remote { code: 1770002, .. })
        ));
    }

    #[tokio::test]
    async fn test_forbidden_status_with_envelope() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 403,
                    headers: HashMap::new(),
                    body: Bytes::from(r#"{"code":1770032,"msg":"forbidden"}"#),
                })
            });

        let result = connector(mock_http).wiki_node("wikcnA").await;

        assert!(matches!(
            result,
            Err(BridgeError::Remote { code: 1770032, .. })
        ));
    }

    #[tokio::test]
    async fn test_retry_on_server_error() {
        let mut mock_http = mock_with_token();
        let mut calls = 0;
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Ok(HttpResponse {
                        status: 503,
                        headers: HashMap::new(),
                        body: Bytes::new(),
                    })
                } else {
                    Ok(ok(
                        r#"{"code":0,"data":{"space":{"space_id":"7001","name":"Team"}}}"#,
                    ))
                }
            });

        let space = connector(mock_http).wiki_space("7001").await.unwrap();
        assert_eq!(space.name, "Team");
    }

    #[tokio::test]
    async fn test_document_blocks_paged_until_has_more_false() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(2)
            .returning(|req| {
                if req.url.contains("page_token=p2") {
                    Ok(ok(
                        r#"{"code":0,"data":{"items":[{"block_id":"b2","block_type":2}],"has_more":false}}"#,
                    ))
                } else {
                    assert!(req.url.contains("page_size=500"));
                    assert!(req.url.contains("document_revision_id=-1"));
                    Ok(ok(
                        r#"{"code":0,"data":{"items":[{"block_id":"b1","block_type":1}],"page_token":"p2","has_more":true}}"#,
                    ))
                }
            });

        let blocks = connector(mock_http).document_blocks("doxcnA").await.unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_id, "b1");
        assert_eq!(blocks[1].block_id, "b2");
    }

    #[tokio::test]
    async fn test_wiki_children_stop_on_repeated_token() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(2)
            .returning(|req| {
                assert!(req.url.contains("parent_node_token=wikcnRoot"));
                Ok(ok(
                    r#"{"code":0,"data":{"items":[{"node_token":"n","obj_token":"o","obj_type":"docx","title":"T"}],"page_token":"same","has_more":true}}"#,
                ))
            });

        let nodes = connector(mock_http)
            .wiki_children("7001", Some("wikcnRoot".to_string()))
            .await
            .unwrap();

        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_folder_files_follow_next_page_token() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(2)
            .returning(|req| {
                if req.url.contains("page_token=n2") {
                    Ok(ok(
                        r#"{"code":0,"data":{"files":[{"token":"f2","name":"B","type":"folder"}],"has_more":false}}"#,
                    ))
                } else {
                    Ok(ok(
                        r#"{"code":0,"data":{"files":[{"token":"f1","name":"A","type":"docx"}],"next_page_token":"n2","has_more":true}}"#,
                    ))
                }
            });

        let files = connector(mock_http).folder_files("fldcn").await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[1].file_type, "folder");
    }

    #[tokio::test]
    async fn test_download_media_uses_header_name() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(1)
            .returning(|req| {
                assert!(req.url.ends_with("/drive/v1/medias/boxcnImg/download"));
                let mut headers = HashMap::new();
                headers.insert(
                    "content-disposition".to_string(),
                    r#"attachment; filename="diagram.png""#.to_string(),
                );
                Ok(HttpResponse {
                    status: 200,
                    headers,
                    body: Bytes::from_static(b"\x89PNG"),
                })
            });

        let media = connector(mock_http).download_media("boxcnImg").await.unwrap();

        assert_eq!(media.file_name, "diagram.png");
        assert_eq!(media.content.len(), 4);
    }

    #[tokio::test]
    async fn test_user_names_skip_request_when_empty() {
        let mock_http = MockHttpClient::new();
        let names = connector(mock_http).user_names(&[]).await.unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_user_names_resolved() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(1)
            .returning(|req| {
                assert!(req.url.contains("user_ids=ou_1&user_ids=ou_2"));
                Ok(ok(
                    r#"{"code":0,"data":{"items":[{"open_id":"ou_1","name":"Alice"}]}}"#,
                ))
            });

        let names = connector(mock_http)
            .user_names(&["ou_1".to_string(), "ou_2".to_string()])
            .await
            .unwrap();

        assert_eq!(names.get("ou_1").map(String::as_str), Some("Alice"));
        assert!(!names.contains_key("ou_2"));
    }

    #[tokio::test]
    async fn test_list_fields_with_view() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(1)
            .returning(|req| {
                assert!(req.url.contains("/bitable/v1/apps/bascnA/tables/tblB/fields?page_size=100"));
                assert!(req.url.contains("view_id=vewC"));
                Ok(ok(
                    r#"{"code":0,"data":{"items":[{"field_id":"fld1","field_name":"Status","type":3,"property":{"options":[{"name":"Done"}]}}],"has_more":false}}"#,
                ))
            });

        let fields = connector(mock_http)
            .list_fields("bascnA", "tblB", Some("vewC".to_string()))
            .await
            .unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_type, 3);
    }

    #[tokio::test]
    async fn test_list_records_page() {
        let mut mock_http = mock_with_token();
        mock_http
            .expect_execute()
            .withf(|req| !is_token_request(req))
            .times(1)
            .returning(|req| {
                assert!(req.url.contains("page_size=200"));
                assert!(req.url.contains("display_formula_ref=true"));
                assert!(req.url.contains("page_token=pt"));
                Ok(ok(
                    r#"{"code":0,"data":{"items":[{"record_id":"rec1","fields":{"Name":"A"}}],"page_token":"pt2","has_more":true}}"#,
                ))
            });

        let page = connector(mock_http)
            .list_records("bascnA", "tblB", None, Some("pt".to_string()), 200)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_token(), Some("pt2"));
    }
}
