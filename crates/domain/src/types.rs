//! Document model types shared across the workspace.
//!
//! A converted markdown document is an ordered sequence of [`Block`]s plus
//! zero or more out-of-band [`TableStructure`]s holding per-cell content.
//! Both are created per conversion call and consumed immediately by the sync
//! service; nothing here is persisted as intermediate state.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BLOCK_TYPE_BULLET, BLOCK_TYPE_CODE, BLOCK_TYPE_DIVIDER, BLOCK_TYPE_HEADING1,
    BLOCK_TYPE_ORDERED, BLOCK_TYPE_QUOTE, BLOCK_TYPE_TABLE, BLOCK_TYPE_TEXT,
};

/// Style flags carried by a single text run.
///
/// Flags accumulate down a token's ancestor chain: bold text inside a link
/// yields one element with both `bold` and `link` set. Accumulation only
/// ever adds flags; an inner token never clears what an outer token set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub inline_code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl TextStyle {
    /// Copy of this style with the bold flag set.
    #[must_use]
    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Copy of this style with the italic flag set.
    #[must_use]
    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Copy of this style with the strikethrough flag set.
    #[must_use]
    pub fn with_strikethrough(mut self) -> Self {
        self.strikethrough = true;
        self
    }

    /// Copy of this style with the inline-code flag set.
    #[must_use]
    pub fn with_inline_code(mut self) -> Self {
        self.inline_code = true;
        self
    }

    /// Copy of this style carrying a link target.
    ///
    /// An already-set link is kept: markdown cannot nest links, and the
    /// outermost target wins if a malformed tree ever presents one.
    #[must_use]
    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        if self.link.is_none() {
            self.link = Some(url.into());
        }
        self
    }

    /// True when no flag is set and no link is carried.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.strikethrough && !self.inline_code && self.link.is_none()
    }
}

/// An atomic styled text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextElement {
    pub content: String,
    pub style: TextStyle,
}

impl TextElement {
    /// Create a styled run.
    #[must_use]
    pub fn new(content: impl Into<String>, style: TextStyle) -> Self {
        Self { content: content.into(), style }
    }

    /// Create an unstyled run.
    #[must_use]
    pub fn plain(content: impl Into<String>) -> Self {
        Self::new(content, TextStyle::default())
    }

    /// A hard line break: a run whose content is a single newline, keeping
    /// its position in the element sequence instead of starting a new block.
    #[must_use]
    pub fn hard_break() -> Self {
        Self::plain("\n")
    }
}

/// One persisted document content unit.
///
/// Exactly one content payload exists per variant, matching the fixed
/// external discriminant reported by [`Block::block_type`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Heading with depth clamped to 1..=6.
    Heading { level: u8, elements: Vec<TextElement> },
    /// Plain paragraph text.
    Text { elements: Vec<TextElement> },
    /// Fenced code with a platform language id.
    Code { language: i64, elements: Vec<TextElement> },
    /// Block quote.
    Quote { elements: Vec<TextElement> },
    /// Bullet list item.
    BulletItem { elements: Vec<TextElement> },
    /// Ordered list item.
    OrderedItem { elements: Vec<TextElement> },
    /// Horizontal rule.
    Divider,
    /// Table shell. Carries the index of its [`TableStructure`] in the
    /// conversion output; per-cell content travels out-of-band.
    TableShell { index: usize },
}

impl Block {
    /// The fixed external block-type discriminant for this variant.
    #[must_use]
    pub fn block_type(&self) -> i64 {
        match self {
            Self::Heading { level, .. } => BLOCK_TYPE_HEADING1 + i64::from(level.saturating_sub(1)),
            Self::Text { .. } => BLOCK_TYPE_TEXT,
            Self::Code { .. } => BLOCK_TYPE_CODE,
            Self::Quote { .. } => BLOCK_TYPE_QUOTE,
            Self::BulletItem { .. } => BLOCK_TYPE_BULLET,
            Self::OrderedItem { .. } => BLOCK_TYPE_ORDERED,
            Self::Divider => BLOCK_TYPE_DIVIDER,
            Self::TableShell { .. } => BLOCK_TYPE_TABLE,
        }
    }
}

/// Three-layer persistence plan for one table: the shell dimensions plus the
/// per-cell content blocks, header row first, then body rows left-to-right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStructure {
    pub row_size: usize,
    pub column_size: usize,
    /// Allocated column widths; sums exactly to the width budget.
    pub column_widths: Vec<u32>,
    /// Row-major cell content; `cells.len() == row_size * column_size`.
    pub cells: Vec<Vec<Block>>,
}

impl TableStructure {
    /// Number of cell entries the platform will create for this shell.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.row_size * self.column_size
    }
}

/// Progress phases emitted while persisting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPhase {
    CreatingDocument,
    CreatingBlocks,
    CreatingTable,
    Done,
    Error,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::CreatingDocument => "creating-document",
            Self::CreatingBlocks => "creating-blocks",
            Self::CreatingTable => "creating-table",
            Self::Done => "done",
            Self::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Outcome of a successful document persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReceipt {
    pub document_id: String,
    pub document_url: String,
}

#[cfg(test)]
mod tests {
    //! Unit tests for the document model types.
    use super::*;

    /// Validates `TextStyle` accumulation for the nested emphasis scenario.
    ///
    /// Assertions:
    /// - Ensures flags union rather than overwrite across nesting.
    /// - Ensures an inner token never clears an outer flag.
    #[test]
    fn test_style_flags_accumulate() {
        let style = TextStyle::default().with_link("https://example.com").with_bold();

        assert!(style.bold);
        assert_eq!(style.link.as_deref(), Some("https://example.com"));

        let deeper = style.clone().with_italic();
        assert!(deeper.bold, "outer bold must survive inner italic");
        assert!(deeper.italic);
        assert_eq!(deeper.link.as_deref(), Some("https://example.com"));
    }

    /// Validates `TextStyle::with_link` behavior for the already-linked
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the first link target is kept.
    #[test]
    fn test_existing_link_is_kept() {
        let style = TextStyle::default().with_link("https://a.example").with_link("https://b.example");
        assert_eq!(style.link.as_deref(), Some("https://a.example"));
    }

    /// Validates `Block::block_type` behavior for the discriminant mapping
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms each variant maps to its fixed external discriminant.
    #[test]
    fn test_block_type_discriminants() {
        assert_eq!(Block::Text { elements: vec![] }.block_type(), 2);
        assert_eq!(Block::Heading { level: 1, elements: vec![] }.block_type(), 3);
        assert_eq!(Block::Heading { level: 6, elements: vec![] }.block_type(), 8);
        assert_eq!(Block::BulletItem { elements: vec![] }.block_type(), 12);
        assert_eq!(Block::OrderedItem { elements: vec![] }.block_type(), 13);
        assert_eq!(Block::Quote { elements: vec![] }.block_type(), 14);
        assert_eq!(Block::Code { language: 1, elements: vec![] }.block_type(), 15);
        assert_eq!(Block::Divider.block_type(), 22);
        assert_eq!(Block::TableShell { index: 0 }.block_type(), 31);
    }

    /// Validates `TextElement::hard_break` behavior for the newline run
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the content is exactly one newline with no styling.
    #[test]
    fn test_hard_break_is_a_newline_run() {
        let el = TextElement::hard_break();
        assert_eq!(el.content, "\n");
        assert!(el.style.is_plain());
    }

    /// Validates `TableStructure::cell_count` behavior for the dimensions
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `cell_count` equals `row_size * column_size`.
    #[test]
    fn test_cell_count() {
        let table = TableStructure {
            row_size: 3,
            column_size: 4,
            column_widths: vec![180; 4],
            cells: Vec::new(),
        };
        assert_eq!(table.cell_count(), 12);
    }
}
