//! Markdown rendering of docx block trees
//!
//! Blocks arrive as a flat list; parents reference children by id. Rendering
//! starts at the page block and walks children in order. Every rendered block
//! ends with a newline; paragraphs are separated by a blank line while
//! consecutive list items are kept together.

use bridge_traits::document::{DocumentInfo, DocxBlock, TextBlock, TextElement, TextElementStyle};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{DocxError, Result};
use crate::language::language_name;

/// Numeric block type codes
pub mod block_type {
    pub const PAGE: i64 = 1;
    pub const TEXT: i64 = 2;
    pub const HEADING1: i64 = 3;
    pub const HEADING9: i64 = 11;
    pub const BULLET: i64 = 12;
    pub const ORDERED: i64 = 13;
    pub const CODE: i64 = 14;
    pub const QUOTE: i64 = 15;
    pub const EQUATION: i64 = 16;
    pub const TODO: i64 = 17;
    pub const BITABLE: i64 = 18;
    pub const CALLOUT: i64 = 19;
    pub const DIVIDER: i64 = 22;
    pub const FILE: i64 = 23;
    pub const GRID: i64 = 24;
    pub const GRID_COLUMN: i64 = 25;
    pub const IMAGE: i64 = 27;
    pub const TABLE: i64 = 31;
    pub const TABLE_CELL: i64 = 32;
    pub const QUOTE_CONTAINER: i64 = 34;
}

const LIST_INDENT: &str = "    ";

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Render underline and strikethrough as HTML tags
    pub use_html_tags: bool,
}

/// Rendered Markdown plus the image tokens it references, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub markdown: String,
    pub image_tokens: Vec<String>,
}

/// Render a document's block tree to Markdown
///
/// Image blocks are emitted as `![](<token>)`; the caller replaces tokens
/// with local paths once the images are downloaded.
pub fn render_document(
    info: &DocumentInfo,
    blocks: &[DocxBlock],
    user_names: &HashMap<String, String>,
    options: &RenderOptions,
) -> Result<RenderedDocument> {
    let mut renderer = Renderer::new(blocks, user_names, options);

    let root = blocks
        .iter()
        .find(|block| block.block_id == info.document_id)
        .or_else(|| blocks.iter().find(|block| block.block_type == block_type::PAGE))
        .ok_or_else(|| DocxError::MissingRoot {
            document_id: info.document_id.clone(),
        })?;

    let mut markdown = renderer.render_block(root, 0)?;
    if root.block_type == block_type::PAGE && root.text_block().map_or(true, is_blank) {
        // Page block without inline title; fall back to the document header
        markdown = if markdown.is_empty() {
            format!("# {}\n", info.title)
        } else {
            format!("# {}\n\n{}", info.title, markdown)
        };
    }

    debug!(
        blocks = blocks.len(),
        images = renderer.image_tokens.len(),
        "Rendered document"
    );

    Ok(RenderedDocument {
        markdown,
        image_tokens: renderer.image_tokens,
    })
}

/// Unique ids of mentioned users, in first-seen order
pub fn collect_mention_user_ids(blocks: &[DocxBlock]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for block in blocks {
        let Some(text) = block.text_block() else {
            continue;
        };
        for element in &text.elements {
            if let Some(mention) = &element.mention_user {
                if !mention.user_id.is_empty() && seen.insert(mention.user_id.clone()) {
                    ids.push(mention.user_id.clone());
                }
            }
        }
    }

    ids
}

fn is_blank(text: &TextBlock) -> bool {
    text.elements.iter().all(|element| {
        element
            .text_run
            .as_ref()
            .map_or(true, |run| run.content.trim().is_empty())
            && element.mention_user.is_none()
            && element.mention_doc.is_none()
            && element.equation.is_none()
    })
}

fn is_list_item(kind: i64) -> bool {
    matches!(
        kind,
        block_type::BULLET | block_type::ORDERED | block_type::TODO
    )
}

/// Prefix every non-empty line
fn prefix_lines(text: &str, prefix: &str, empty_line: &str) -> String {
    let mut out = String::with_capacity(text.len() + prefix.len() * 4);
    for line in text.lines() {
        if line.is_empty() {
            out.push_str(empty_line);
        } else {
            out.push_str(prefix);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

fn decode_url(url: &str) -> String {
    urlencoding::decode(url)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| url.to_string())
}

/// Split `"  text  "` into leading whitespace, core and trailing whitespace
fn split_padding(content: &str) -> (&str, &str, &str) {
    let start_trimmed = content.trim_start();
    let lead = &content[..content.len() - start_trimmed.len()];
    let core = start_trimmed.trim_end();
    let trail = &start_trimmed[core.len()..];
    (lead, core, trail)
}

fn escape_cell(text: &str) -> String {
    text.trim()
        .replace('|', "\\|")
        .replace("\n\n", "<br/>")
        .replace('\n', "<br/>")
}

struct Renderer<'a> {
    blocks: HashMap<&'a str, &'a DocxBlock>,
    user_names: &'a HashMap<String, String>,
    options: &'a RenderOptions,
    image_tokens: Vec<String>,
    visiting: HashSet<&'a str>,
}

impl<'a> Renderer<'a> {
    fn new(
        blocks: &'a [DocxBlock],
        user_names: &'a HashMap<String, String>,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            blocks: blocks
                .iter()
                .map(|block| (block.block_id.as_str(), block))
                .collect(),
            user_names,
            options,
            image_tokens: Vec::new(),
            visiting: HashSet::new(),
        }
    }

    /// Render one block; `ordinal` is its position in a run of ordered items
    fn render_block(&mut self, block: &'a DocxBlock, ordinal: usize) -> Result<String> {
        if !self.visiting.insert(block.block_id.as_str()) {
            return Err(DocxError::CyclicBlock(block.block_id.clone()));
        }
        let rendered = self.render_block_body(block, ordinal);
        self.visiting.remove(block.block_id.as_str());
        rendered
    }

    fn render_block_body(&mut self, block: &'a DocxBlock, ordinal: usize) -> Result<String> {
        let text = block.text_block();
        let inline = text.map(|text| self.render_inline(text)).unwrap_or_default();

        let out = match block.block_type {
            block_type::PAGE => {
                let mut out = String::new();
                if !inline.trim().is_empty() {
                    out.push_str(&format!("# {}\n", inline.trim()));
                }
                self.append_section(&mut out, block)?;
                out
            }
            block_type::TEXT => {
                let mut out = String::new();
                if !inline.trim().is_empty() {
                    out.push_str(&inline);
                    out.push('\n');
                }
                self.append_section(&mut out, block)?;
                out
            }
            kind @ block_type::HEADING1..=block_type::HEADING9 => {
                let level = (kind - block_type::HEADING1 + 1) as usize;
                let mut out = format!("{} {}\n", "#".repeat(level), inline.trim());
                self.append_section(&mut out, block)?;
                out
            }
            block_type::BULLET => self.list_item(block, format!("- {}", inline))?,
            block_type::ORDERED => self.list_item(block, format!("{}. {}", ordinal.max(1), inline))?,
            block_type::TODO => {
                let done = text.map_or(false, |text| text.style.done);
                let marker = if done { "- [x]" } else { "- [ ]" };
                self.list_item(block, format!("{} {}", marker, inline))?
            }
            block_type::CODE => {
                let language = text
                    .and_then(|text| text.style.language)
                    .map(language_name)
                    .unwrap_or("");
                let code = text.map(plain_text).unwrap_or_default();
                format!("```{}\n{}\n```\n", language, code.trim_end_matches('\n'))
            }
            block_type::QUOTE => {
                let mut body = inline.clone();
                if !block.children.is_empty() {
                    body.push('\n');
                    body.push_str(&self.render_children(&block.children)?);
                }
                prefix_lines(&body, "> ", ">")
            }
            block_type::EQUATION => {
                let formula = text.map(plain_text).unwrap_or_default();
                format!("$$\n{}\n$$\n", formula.trim())
            }
            block_type::DIVIDER => "---\n".to_string(),
            block_type::IMAGE => match &block.image {
                Some(image) if !image.token.is_empty() => {
                    self.image_tokens.push(image.token.clone());
                    format!("![]({})\n", image.token)
                }
                _ => String::new(),
            },
            block_type::FILE => match &block.file {
                Some(file) if !file.name.is_empty() => format!("{}\n", file.name),
                Some(file) => format!("{}\n", file.token),
                None => String::new(),
            },
            block_type::BITABLE => match &block.bitable {
                Some(bitable) => format!("[Bitable]({})\n", bitable.token),
                None => String::new(),
            },
            block_type::TABLE => self.render_table(block)?,
            block_type::QUOTE_CONTAINER => {
                let body = self.render_children(&block.children)?;
                prefix_lines(&body, "> ", ">")
            }
            // Callout, grid, grid column, table cell and unknown containers
            _ => {
                let mut out = String::new();
                if !inline.trim().is_empty() {
                    out.push_str(&inline);
                    out.push('\n');
                }
                self.append_section(&mut out, block)?;
                out
            }
        };

        Ok(out)
    }

    /// Append children after a paragraph-like block, separated by a blank line
    fn append_section(&mut self, out: &mut String, block: &'a DocxBlock) -> Result<()> {
        let children = self.render_children(&block.children)?;
        if !children.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&children);
        }
        Ok(())
    }

    /// List item line followed by its indented children
    fn list_item(&mut self, block: &'a DocxBlock, line: String) -> Result<String> {
        let mut out = line.trim_end().to_string();
        out.push('\n');
        let children = self.render_children(&block.children)?;
        if !children.is_empty() {
            out.push_str(&prefix_lines(&children, LIST_INDENT, ""));
        }
        Ok(out)
    }

    fn render_children(&mut self, ids: &[String]) -> Result<String> {
        let mut out = String::new();
        let mut ordinal = 0usize;
        let mut previous_was_list = false;

        for id in ids {
            let Some(&child) = self.blocks.get(id.as_str()) else {
                debug!(block_id = %id, "Skipping missing child block");
                continue;
            };

            ordinal = if child.block_type == block_type::ORDERED {
                ordinal + 1
            } else {
                0
            };

            let rendered = self.render_block(child, ordinal)?;
            if rendered.is_empty() {
                continue;
            }

            let is_list = is_list_item(child.block_type);
            if !out.is_empty() && !(previous_was_list && is_list) {
                out.push('\n');
            }
            out.push_str(&rendered);
            previous_was_list = is_list;
        }

        Ok(out)
    }

    fn render_table(&mut self, block: &'a DocxBlock) -> Result<String> {
        let Some(table) = &block.table else {
            return Ok(String::new());
        };

        let cells: &[String] = if table.cells.is_empty() {
            &block.children
        } else {
            &table.cells
        };
        if cells.is_empty() {
            return Ok(String::new());
        }

        let columns = if table.property.column_size > 0 {
            table.property.column_size
        } else {
            cells.len()
        };

        let mut rows = Vec::new();
        for row in cells.chunks(columns) {
            let mut rendered = Vec::with_capacity(columns);
            for id in row {
                let content = match self.blocks.get(id.as_str()) {
                    Some(&cell) => self.render_block(cell, 0)?,
                    None => String::new(),
                };
                rendered.push(escape_cell(&content));
            }
            rendered.resize(columns, String::new());
            rows.push(rendered);
        }

        let mut out = String::new();
        for (index, row) in rows.iter().enumerate() {
            out.push_str(&format!("| {} |\n", row.join(" | ")));
            if index == 0 {
                out.push_str(&format!("|{}\n", " --- |".repeat(columns)));
            }
        }
        Ok(out)
    }

    fn render_inline(&self, text: &TextBlock) -> String {
        text.elements
            .iter()
            .map(|element| self.render_element(element))
            .collect()
    }

    fn render_element(&self, element: &TextElement) -> String {
        if let Some(run) = &element.text_run {
            return self.style_text(&run.content, &run.text_element_style);
        }
        if let Some(mention) = &element.mention_user {
            return match self.user_names.get(&mention.user_id) {
                Some(name) if !name.is_empty() => format!("@{}", name),
                _ => "@user".to_string(),
            };
        }
        if let Some(mention) = &element.mention_doc {
            return format!("[{}]({})", mention.title, decode_url(&mention.url));
        }
        if let Some(equation) = &element.equation {
            return format!("${}$", equation.content.trim());
        }
        String::new()
    }

    fn style_text(&self, content: &str, style: &TextElementStyle) -> String {
        let (lead, core, trail) = split_padding(content);
        if core.is_empty() {
            return content.to_string();
        }

        let mut text = core.to_string();
        if style.inline_code {
            text = format!("`{}`", text);
        }
        if style.bold {
            text = format!("**{}**", text);
        }
        if style.italic {
            text = format!("*{}*", text);
        }
        if style.strikethrough {
            text = if self.options.use_html_tags {
                format!("<del>{}</del>", text)
            } else {
                format!("~~{}~~", text)
            };
        }
        if style.underline && self.options.use_html_tags {
            text = format!("<u>{}</u>", text);
        }
        if let Some(link) = &style.link {
            text = format!("[{}]({})", text, decode_url(&link.url));
        }

        format!("{}{}{}", lead, text, trail)
    }
}

/// Unstyled text of a block (code and equation bodies)
fn plain_text(text: &TextBlock) -> String {
    text.elements
        .iter()
        .map(|element| {
            if let Some(run) = &element.text_run {
                run.content.clone()
            } else if let Some(equation) = &element.equation {
                equation.content.clone()
            } else {
                String::new()
            }
        })
        .collect()
}
