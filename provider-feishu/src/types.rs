//! Feishu API response types
//!
//! Data structures for deserializing Feishu open platform responses. Most
//! endpoints wrap their payload in a `{code, msg, data}` envelope.

use bridge_traits::document::{
    BitableApp, DocumentInfo, DriveFile, WikiNode, WikiSpace,
};
use serde::{Deserialize, Serialize};

/// Standard response envelope
///
/// See: https://open.feishu.cn/document/server-docs/api-call-guide/generic-error-code
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// Request body of the internal tenant token endpoint
#[derive(Debug, Serialize)]
pub struct TenantTokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

/// Tenant token response (not enveloped)
#[derive(Debug, Deserialize)]
pub struct TenantTokenResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub tenant_access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expire: i64,
}

/// Generic paged listing (`items` / `page_token` / `has_more`)
#[derive(Debug, Deserialize)]
pub struct Paged<T> {
    #[serde(default = "Option::default")]
    pub items: Option<Vec<T>>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Paged<T> {
    pub fn into_parts(self) -> (Vec<T>, Option<String>, bool) {
        (self.items.unwrap_or_default(), self.page_token, self.has_more)
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentData {
    pub document: DocumentInfo,
}

#[derive(Debug, Deserialize)]
pub struct WikiNodeData {
    pub node: WikiNode,
}

#[derive(Debug, Deserialize)]
pub struct WikiSpaceData {
    pub space: WikiSpace,
}

/// Drive listing uses `files` / `next_page_token`
#[derive(Debug, Deserialize)]
pub struct DriveFilesData {
    #[serde(default = "Option::default")]
    pub files: Option<Vec<DriveFile>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct BitableAppData {
    pub app: BitableApp,
}

/// Contact user (only the fields needed for mention rendering)
#[derive(Debug, Deserialize)]
pub struct ContactUser {
    #[serde(default)]
    pub open_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UsersBatchData {
    #[serde(default = "Option::default")]
    pub items: Option<Vec<ContactUser>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::document::{DocxBlock, RawRecord};

    #[test]
    fn test_envelope_with_data() {
        let json = r#"{
            "code": 0,
            "msg": "success",
            "data": {
                "document": {
                    "document_id": "doxcnABC",
                    "revision_id": 42,
                    "title": "Weekly"
                }
            }
        }"#;

        let envelope: Envelope<DocumentData> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.code, 0);
        let document = envelope.data.unwrap().document;
        assert_eq!(document.revision_id, 42);
        assert_eq!(document.title, "Weekly");
    }

    #[test]
    fn test_envelope_error_without_data() {
        let json = r#"{"code": 1770002, "msg": "not found"}"#;
        let envelope: Envelope<DocumentData> = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.code, 1770002);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_paged_blocks_with_null_items() {
        let json = r#"{"items": null, "has_more": false}"#;
        let page: Paged<DocxBlock> = serde_json::from_str(json).unwrap();
        let (items, token, has_more) = page.into_parts();

        assert!(items.is_empty());
        assert!(token.is_none());
        assert!(!has_more);
    }

    #[test]
    fn test_paged_records() {
        let json = r#"{
            "items": [
                {"record_id": "rec1", "fields": {"Name": "Alice", "Score": 3.5}}
            ],
            "page_token": "p2",
            "has_more": true,
            "total": 12
        }"#;

        let page: Paged<RawRecord> = serde_json::from_str(json).unwrap();
        let (items, token, has_more) = page.into_parts();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fields["Name"], "Alice");
        assert_eq!(token.as_deref(), Some("p2"));
        assert!(has_more);
    }

    #[test]
    fn test_tenant_token_response() {
        let json = r#"{"code": 0, "msg": "ok", "tenant_access_token": "t-abc", "expire": 7200}"#;
        let response: TenantTokenResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.tenant_access_token, "t-abc");
        assert_eq!(response.expire, 7200);
    }

    #[test]
    fn test_drive_files_data() {
        let json = r#"{
            "files": [
                {"token": "doxcn1", "name": "Roadmap", "type": "docx", "parent_token": "fld"},
                {"token": "fld2", "name": "Sub", "type": "folder"}
            ],
            "has_more": false
        }"#;

        let data: DriveFilesData = serde_json::from_str(json).unwrap();
        let files = data.files.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].file_type, "folder");
    }
}
