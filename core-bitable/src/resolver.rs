//! Container token discovery
//!
//! A table link may point at a standalone Bitable app (`/base/<app>`), at a
//! wiki node backed by an app, or at a wiki node / docx document that embeds
//! one or more tables. The latter case needs a walk over the block tree.

use std::collections::{HashMap, HashSet};

use bridge_traits::document::{BitableProvider, DocumentProvider, DocxBlock};
use provider_feishu::url::{parse_base_url, parse_document_url, DocumentKind};
use tracing::{debug, info, instrument, warn};

use crate::error::{BitableError, Result};

/// Bitable block type code in a docx block tree
const BITABLE_BLOCK: i64 = 18;

/// App tokens of embedded tables, in document order without duplicates
///
/// The walk starts at the root block (no parent, or parent equal to itself);
/// without a root every block is used as a start.
pub fn discover_bitable_tokens(blocks: &[DocxBlock]) -> Vec<String> {
    let index: HashMap<&str, usize> = blocks
        .iter()
        .enumerate()
        .map(|(position, block)| (block.block_id.as_str(), position))
        .collect();

    let root = blocks.iter().position(|block| match block.parent_id.as_deref() {
        None | Some("") => true,
        Some(parent) => parent == block.block_id,
    });
    let starts: Vec<usize> = match root {
        Some(root) => vec![root],
        None => (0..blocks.len()).collect(),
    };

    let mut visited = vec![false; blocks.len()];
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for start in starts {
        let mut stack = vec![start];
        while let Some(position) = stack.pop() {
            if visited[position] {
                continue;
            }
            visited[position] = true;
            let block = &blocks[position];

            if block.block_type == BITABLE_BLOCK {
                if let Some(app) = block
                    .bitable
                    .as_ref()
                    .and_then(|bitable| app_token_of(&bitable.token))
                {
                    if seen.insert(app.clone()) {
                        tokens.push(app);
                    }
                }
            }

            // Reverse so children pop in document order
            for child in block.children.iter().rev() {
                if let Some(&child) = index.get(child.as_str()) {
                    if !visited[child] {
                        stack.push(child);
                    }
                }
            }
        }
    }

    tokens
}

/// `<app>_<table>` embed tokens carry the app token before the first `_`
fn app_token_of(token: &str) -> Option<String> {
    let app = token.split('_').next().unwrap_or_default().trim();
    if app.is_empty() {
        None
    } else {
        Some(app.to_string())
    }
}

/// Resolve the app token behind a table link
#[instrument(skip(documents, bitables))]
pub async fn resolve_app_token(
    documents: &dyn DocumentProvider,
    bitables: &dyn BitableProvider,
    url: &str,
    table_id: &str,
) -> Result<String> {
    if let Some(app) = parse_base_url(url) {
        return Ok(app);
    }

    let reference = parse_document_url(url)?;
    let document_id = match reference.kind {
        DocumentKind::Wiki => {
            let node = documents.wiki_node(&reference.token).await?;
            match node.obj_type.as_str() {
                "bitable" if !node.obj_token.is_empty() => {
                    debug!(app = %node.obj_token, "Wiki node is backed by a bitable app");
                    return Ok(node.obj_token);
                }
                "docx" => node.obj_token,
                other => {
                    warn!(obj_type = other, "Wiki node is neither a bitable nor a docx");
                    return Err(BitableError::UnresolvedContainer {
                        url: url.to_string(),
                    });
                }
            }
        }
        DocumentKind::Docx => reference.token,
        DocumentKind::Docs => {
            return Err(BitableError::UnresolvedContainer {
                url: url.to_string(),
            })
        }
    };

    let blocks = documents.document_blocks(&document_id).await?;
    let candidates = discover_bitable_tokens(&blocks);
    debug!(count = candidates.len(), "Discovered embedded table candidates");

    for candidate in &candidates {
        match bitables.list_fields(candidate, table_id, None).await {
            Ok(_) => {
                info!(app = %candidate, "Resolved bitable app token");
                return Ok(candidate.clone());
            }
            Err(e) => debug!(app = %candidate, error = %e, "Candidate does not hold the table"),
        }
    }

    match candidates.into_iter().next() {
        Some(first) => {
            warn!(app = %first, "No candidate answered the field lookup; using the first");
            Ok(first)
        }
        None => Err(BitableError::UnresolvedContainer {
            url: url.to_string(),
        }),
    }
}
