// src/model/block.rs
//! Blocks as the traversal sees them.
//!
//! Only four things about a block matter for counting: its id, its type tag,
//! whether it has children, and whether its type-specific payload carries a
//! `rich_text` list. Everything else in the API response is kept in an
//! untyped map so new Notion block types never break deserialization.

use crate::types::NotionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type tag of a block that embeds a database.
pub const CHILD_DATABASE: &str = "child_database";
/// Type tag of a block that embeds a page.
pub const CHILD_PAGE: &str = "child_page";

/// A Notion block: atomic unit of page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: NotionId,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub has_children: bool,
    /// Remaining response fields, including the payload keyed by `block_type`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Block {
    /// Builds a block from its parts; `payload` is stored under the type tag.
    pub fn new(id: NotionId, block_type: impl Into<String>, has_children: bool, payload: Value) -> Self {
        let block_type = block_type.into();
        let mut fields = Map::new();
        fields.insert(block_type.clone(), payload);
        Self {
            id,
            block_type,
            has_children,
            fields,
        }
    }

    /// The type-specific payload, e.g. the `paragraph` object of a paragraph.
    pub fn payload(&self) -> Option<&Value> {
        self.fields.get(&self.block_type)
    }

    /// The block's rich-text spans, if its payload carries a list of them.
    pub fn rich_text(&self) -> Option<&Vec<Value>> {
        self.payload()?.get("rich_text")?.as_array()
    }

    /// Sum of the `plain_text` lengths of every rich-text span, in characters.
    ///
    /// Spans without `plain_text` contribute nothing.
    pub fn rich_text_len(&self) -> Option<u64> {
        self.rich_text().map(|spans| {
            spans
                .iter()
                .filter_map(|span| span.get("plain_text").and_then(Value::as_str))
                .map(|text| text.chars().count() as u64)
                .sum()
        })
    }

    pub fn is_child_database(&self) -> bool {
        self.block_type == CHILD_DATABASE
    }
}

/// A database row. Rows are pages, so only the id is needed to walk them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowPage {
    pub id: NotionId,
}

/// What a plan's root identifier turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedType {
    Database,
    Page,
    /// Any other block type; there is nothing to count under it.
    Unsupported(String),
}

impl DetectedType {
    pub fn from_block_type(block_type: &str) -> Self {
        match block_type {
            CHILD_DATABASE => Self::Database,
            CHILD_PAGE => Self::Page,
            other => Self::Unsupported(other.to_string()),
        }
    }
}
