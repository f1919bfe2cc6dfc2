//! Parsing of Feishu document links
//!
//! Links look like `https://<tenant>.feishu.cn/<kind>/<token>?...`. Wiki
//! spaces use `/wiki/settings/<space_id>`, drive folders
//! `/drive/folder/<token>` and standalone Bitable apps `/base/<app_token>`.

use url::Url;

use crate::error::{FeishuError, Result};

/// Kind of a single-document link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// New-generation document
    Docx,
    /// Legacy document (no longer served by the API)
    Docs,
    /// Wiki node; resolves to its backing object
    Wiki,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Docx => "docx",
            DocumentKind::Docs => "docs",
            DocumentKind::Wiki => "wiki",
        }
    }
}

/// Parsed single-document link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub token: String,
}

/// Parsed wiki space link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiSpaceRef {
    /// `scheme://host`, used to build child node links
    pub prefix: String,
    pub space_id: String,
}

/// Table and view selected by a Bitable link's query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitableParams {
    pub table_id: String,
    pub view_id: Option<String>,
}

fn parse(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| FeishuError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "https" | "http" if url.host_str().is_some() => Ok(url),
        _ => Err(FeishuError::InvalidUrl(format!(
            "{}: expected an http(s) link",
            raw
        ))),
    }
}

fn is_token(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric())
}

fn segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|parts| parts.filter(|part| !part.is_empty()).collect())
        .unwrap_or_default()
}

/// Parse a docx, legacy docs or wiki page link
pub fn parse_document_url(raw: &str) -> Result<DocumentRef> {
    let url = parse(raw)?;
    let parts = segments(&url);

    let (kind, token) = match parts.as_slice() {
        ["docx", token, ..] => (DocumentKind::Docx, *token),
        ["docs", token, ..] => (DocumentKind::Docs, *token),
        ["wiki", token, ..] if *token != "settings" => (DocumentKind::Wiki, *token),
        _ => {
            return Err(FeishuError::InvalidUrl(format!(
                "{}: expected a /docx/, /docs/ or /wiki/ link",
                raw
            )))
        }
    };

    if !is_token(token) {
        return Err(FeishuError::InvalidUrl(format!(
            "{}: malformed document token",
            raw
        )));
    }

    Ok(DocumentRef {
        kind,
        token: token.to_string(),
    })
}

/// Parse a drive folder link, returning the folder token
pub fn parse_folder_url(raw: &str) -> Result<String> {
    let url = parse(raw)?;
    let parts = segments(&url);

    parts
        .windows(2)
        .find(|pair| pair[0] == "folder" && is_token(pair[1]))
        .map(|pair| pair[1].to_string())
        .ok_or_else(|| FeishuError::InvalidUrl(format!("{}: expected a folder link", raw)))
}

/// Parse a wiki space settings link
pub fn parse_wiki_space_url(raw: &str) -> Result<WikiSpaceRef> {
    let url = parse(raw)?;
    let parts = segments(&url);

    match parts.as_slice() {
        ["wiki", "settings", space_id, ..] if is_token(space_id) => Ok(WikiSpaceRef {
            prefix: format!(
                "{}://{}",
                url.scheme(),
                url.host_str().unwrap_or_default()
            ),
            space_id: space_id.to_string(),
        }),
        _ => Err(FeishuError::InvalidUrl(format!(
            "{}: expected a /wiki/settings/<space_id> link",
            raw
        ))),
    }
}

/// Read `table` (required) and `view` (optional) from the query string
pub fn parse_bitable_params(raw: &str) -> Result<BitableParams> {
    let url = parse(raw)?;
    let mut table_id = None;
    let mut view_id = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "table" if !value.is_empty() => table_id = Some(value.into_owned()),
            "view" if !value.is_empty() => view_id = Some(value.into_owned()),
            _ => {}
        }
    }

    let table_id = table_id.ok_or_else(|| {
        FeishuError::InvalidUrl(format!("{}: missing `table` query parameter", raw))
    })?;

    Ok(BitableParams { table_id, view_id })
}

/// App token of a standalone `/base/<app_token>` link
pub fn parse_base_url(raw: &str) -> Option<String> {
    let url = parse(raw).ok()?;
    let parts = segments(&url);

    parts
        .windows(2)
        .find(|pair| pair[0] == "base" && is_token(pair[1]))
        .map(|pair| pair[1].to_string())
}
