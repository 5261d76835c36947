//! Typed document endpoints and wire payload mapping
//!
//! The platform's block JSON pairs a fixed `block_type` discriminant with
//! exactly one content field named after the variant. These shapes are
//! external interoperability constants; changing a field name or
//! discriminant breaks persisted documents.

use larkdown_domain::{Block, TableStructure, TextElement};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::instrument;

use super::client::ApiClient;
use super::errors::ApiError;

/// A block the platform created, as reported by append-children.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedBlock {
    pub block_id: String,
    #[serde(default)]
    pub block_type: i64,
}

#[derive(Debug, Deserialize)]
struct CreateDocumentData {
    document: DocumentMeta,
}

#[derive(Debug, Deserialize)]
struct DocumentMeta {
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct AppendChildrenData {
    #[serde(default)]
    children: Vec<CreatedBlock>,
}

#[derive(Debug, Deserialize)]
struct GetBlockData {
    block: BlockMeta,
}

#[derive(Debug, Deserialize)]
struct BlockMeta {
    #[serde(default)]
    children: Vec<String>,
}

impl ApiClient {
    /// Create an empty document and return its id.
    ///
    /// The document id doubles as the root container block id for
    /// subsequent child inserts.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    #[instrument(skip(self))]
    pub async fn create_document(&self, title: &str) -> Result<String, ApiError> {
        let data: CreateDocumentData = self
            .post("/open-apis/docx/v1/documents", json!({ "title": title }))
            .await?;
        Ok(data.document.document_id)
    }

    /// Append `children` under `parent_block_id`, preserving order.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    #[instrument(skip(self, children), fields(count = children.len()))]
    pub async fn append_children(
        &self,
        document_id: &str,
        parent_block_id: &str,
        children: Vec<Value>,
    ) -> Result<Vec<CreatedBlock>, ApiError> {
        let path = format!(
            "/open-apis/docx/v1/documents/{document_id}/blocks/{parent_block_id}/children"
        );
        let data: AppendChildrenData = self.post(&path, json!({ "children": children })).await?;
        Ok(data.children)
    }

    /// Fetch one block and return its child block ids.
    ///
    /// Used to learn the platform-assigned cell ids of a freshly created
    /// table shell; they are not predictable in advance.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    #[instrument(skip(self))]
    pub async fn get_block_children(
        &self,
        document_id: &str,
        block_id: &str,
    ) -> Result<Vec<String>, ApiError> {
        let path = format!("/open-apis/docx/v1/documents/{document_id}/blocks/{block_id}");
        let data: GetBlockData = self
            .request(Method::GET, &path, None)
            .await?;
        Ok(data.block.children)
    }
}

/// Serialize one block to its wire shape.
///
/// Table shells resolve their dimensions through the conversion's table
/// list, correlated by the shell's index.
#[must_use]
pub fn block_to_wire(block: &Block, tables: &[TableStructure]) -> Value {
    match block {
        Block::Text { elements } => {
            json!({ "block_type": block.block_type(), "text": elements_payload(elements) })
        }
        Block::Heading { level, elements } => {
            let mut object = Map::new();
            object.insert("block_type".to_string(), json!(block.block_type()));
            object.insert(format!("heading{level}"), elements_payload(elements));
            Value::Object(object)
        }
        Block::Code { language, elements } => json!({
            "block_type": block.block_type(),
            "code": {
                "style": { "language": language },
                "elements": elements.iter().map(element_payload).collect::<Vec<_>>(),
            }
        }),
        Block::Quote { elements } => {
            json!({ "block_type": block.block_type(), "quote": elements_payload(elements) })
        }
        Block::BulletItem { elements } => {
            json!({ "block_type": block.block_type(), "bullet": elements_payload(elements) })
        }
        Block::OrderedItem { elements } => {
            json!({ "block_type": block.block_type(), "ordered": elements_payload(elements) })
        }
        Block::Divider => json!({ "block_type": block.block_type(), "divider": {} }),
        Block::TableShell { index } => {
            let property = tables.get(*index).map_or_else(
                || json!({}),
                |table| {
                    json!({
                        "row_size": table.row_size,
                        "column_size": table.column_size,
                        "column_width": table.column_widths,
                    })
                },
            );
            json!({ "block_type": block.block_type(), "table": { "property": property } })
        }
    }
}

fn elements_payload(elements: &[TextElement]) -> Value {
    json!({ "elements": elements.iter().map(element_payload).collect::<Vec<_>>() })
}

fn element_payload(element: &TextElement) -> Value {
    let mut style = Map::new();
    style.insert("bold".to_string(), json!(element.style.bold));
    style.insert("italic".to_string(), json!(element.style.italic));
    style.insert("strikethrough".to_string(), json!(element.style.strikethrough));
    style.insert("inline_code".to_string(), json!(element.style.inline_code));
    if let Some(url) = &element.style.link {
        style.insert("link".to_string(), json!({ "url": url }));
    }

    json!({
        "text_run": {
            "content": element.content,
            "text_element_style": Value::Object(style),
        }
    })
}
