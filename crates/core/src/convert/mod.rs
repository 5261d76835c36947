//! Markdown token stream → document block conversion
//!
//! Depth-first over the tokenizer's event stream with one production rule
//! per token discriminant. Unsupported and whitespace-only tokens are
//! silently dropped; conversion never fails and never emits a partial or
//! garbled block. Nested inline tokens flatten into a [`TextElement`]
//! sequence with accumulating style flags. Table sections delegate to
//! [`table::TableStructureBuilder`]; the shell block is spliced into the
//! block sequence in place while its per-cell content travels out-of-band,
//! correlated by index.

pub mod table;
pub mod width;

use larkdown_domain::constants::{code_language_id, DEFAULT_TABLE_WIDTH_BUDGET, PLAINTEXT_LANGUAGE_ID};
use larkdown_domain::{Block, TableStructure, TextElement, TextStyle};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use tracing::debug;

use self::table::{TableRows, TableStructureBuilder};

/// Result of one conversion: the ordered block sequence plus the table
/// structures referenced by the [`Block::TableShell`] entries within it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    pub blocks: Vec<Block>,
    pub tables: Vec<TableStructure>,
}

/// Converts markdown token streams into document blocks.
#[derive(Debug, Clone, Copy)]
pub struct BlockConverter {
    table_width_budget: u32,
}

impl Default for BlockConverter {
    fn default() -> Self {
        Self { table_width_budget: DEFAULT_TABLE_WIDTH_BUDGET }
    }
}

impl BlockConverter {
    /// Create a converter allocating table columns within `width_budget`.
    #[must_use]
    pub fn new(table_width_budget: u32) -> Self {
        Self { table_width_budget }
    }

    /// Tokenize and convert a markdown document.
    ///
    /// Enables the table and strikethrough extensions the block model
    /// understands.
    #[must_use]
    pub fn convert_markdown(&self, markdown: &str) -> Conversion {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        self.convert(Parser::new_ext(markdown, options))
    }

    /// Convert an already-tokenized event stream.
    #[must_use]
    pub fn convert<'a>(&self, tokens: impl Iterator<Item = Event<'a>>) -> Conversion {
        let mut state = ConvertState::new(self.table_width_budget);
        for event in tokens {
            state.handle(event);
        }
        state.finish()
    }
}

/// The leaf block currently collecting inline elements.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Leaf {
    Paragraph,
    Heading(u8),
    Code(i64),
    Item,
}

/// In-flight table collection state.
#[derive(Debug, Default)]
struct TableCollector {
    rows: TableRows,
    current_row: Vec<Vec<TextElement>>,
    cell: Vec<TextElement>,
    in_cell: bool,
}

struct ConvertState {
    table_width_budget: u32,
    blocks: Vec<Block>,
    tables: Vec<TableStructure>,
    /// Active style per open inline container; the last entry is current.
    style_stack: Vec<TextStyle>,
    inline: Vec<TextElement>,
    leaf: Option<Leaf>,
    /// Ordered flags of the open lists, innermost last.
    list_stack: Vec<bool>,
    quote_depth: usize,
    /// Depth of dropped subtrees (images, raw HTML); while positive, text
    /// events contribute nothing.
    suppress_depth: usize,
    table: Option<TableCollector>,
}

impl ConvertState {
    fn new(table_width_budget: u32) -> Self {
        Self {
            table_width_budget,
            blocks: Vec::new(),
            tables: Vec::new(),
            style_stack: vec![TextStyle::default()],
            inline: Vec::new(),
            leaf: None,
            list_stack: Vec::new(),
            quote_depth: 0,
            suppress_depth: 0,
            table: None,
        }
    }

    fn finish(mut self) -> Conversion {
        // A well-formed stream closes every leaf; flush defensively anyway.
        self.flush_leaf();
        Conversion { blocks: self.blocks, tables: self.tables }
    }

    fn current_style(&self) -> TextStyle {
        self.style_stack.last().cloned().unwrap_or_default()
    }

    fn push_style(&mut self, style: TextStyle) {
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    /// Route an inline element to the open table cell or the leaf buffer.
    fn push_element(&mut self, element: TextElement) {
        if self.suppress_depth > 0 {
            return;
        }
        if let Some(table) = self.table.as_mut() {
            if table.in_cell {
                table.cell.push(element);
                return;
            }
        }
        if self.leaf.is_some() {
            self.inline.push(element);
        }
    }

    fn begin_leaf(&mut self, leaf: Leaf) {
        self.flush_leaf();
        self.leaf = Some(leaf);
    }

    fn flush_leaf(&mut self) {
        let Some(leaf) = self.leaf.take() else { return };
        let elements = std::mem::take(&mut self.inline);
        if elements.is_empty() {
            return;
        }

        let block = match leaf {
            Leaf::Paragraph if self.quote_depth > 0 => Block::Quote { elements },
            Leaf::Paragraph => Block::Text { elements },
            Leaf::Heading(level) => Block::Heading { level, elements },
            Leaf::Code(language) => Block::Code { language, elements },
            Leaf::Item => match self.list_stack.last() {
                Some(true) => Block::OrderedItem { elements },
                _ => Block::BulletItem { elements },
            },
        };
        self.blocks.push(block);
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.handle_start(tag),
            Event::End(end) => self.handle_end(end),

            Event::Text(text) => {
                let style = if matches!(self.leaf, Some(Leaf::Code(_))) {
                    TextStyle::default()
                } else {
                    self.current_style()
                };
                self.push_element(TextElement::new(text.into_string(), style));
            }

            Event::Code(code) => {
                let style = self.current_style().with_inline_code();
                self.push_element(TextElement::new(code.into_string(), style));
            }

            // A hard break keeps its position in the element sequence
            // instead of starting a new block.
            Event::HardBreak => self.push_element(TextElement::hard_break()),

            Event::SoftBreak => self.push_element(TextElement::new(" ", self.current_style())),

            Event::Rule => {
                self.flush_leaf();
                self.blocks.push(Block::Divider);
            }

            other => {
                // Raw HTML, math, footnote references, task markers:
                // unsupported, contribute nothing.
                debug!(token = ?other, "dropping unsupported inline token");
            }
        }
    }

    fn handle_start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                // Inside a list item, paragraphs fold into the item's run;
                // a later paragraph continues after a line break.
                if matches!(self.leaf, Some(Leaf::Item)) {
                    if !self.inline.is_empty() {
                        self.inline.push(TextElement::hard_break());
                    }
                } else if self.table.is_none() {
                    self.begin_leaf(Leaf::Paragraph);
                }
            }

            Tag::Heading { level, .. } => {
                self.begin_leaf(Leaf::Heading(clamp_heading(level)));
            }

            Tag::BlockQuote(_) => {
                self.flush_leaf();
                self.quote_depth += 1;
            }

            Tag::CodeBlock(kind) => {
                let language = match &kind {
                    CodeBlockKind::Fenced(info) => fence_language(info),
                    CodeBlockKind::Indented => PLAINTEXT_LANGUAGE_ID,
                };
                self.begin_leaf(Leaf::Code(language));
            }

            Tag::List(start) => {
                self.flush_leaf();
                self.list_stack.push(start.is_some());
            }

            Tag::Item => self.begin_leaf(Leaf::Item),

            Tag::Table(_) => {
                self.flush_leaf();
                self.table = Some(TableCollector::default());
            }

            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.current_row.clear();
                }
            }

            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.clear();
                    table.in_cell = true;
                }
            }

            Tag::Emphasis => self.push_style(self.current_style().with_italic()),
            Tag::Strong => self.push_style(self.current_style().with_bold()),
            Tag::Strikethrough => self.push_style(self.current_style().with_strikethrough()),
            Tag::Link { dest_url, .. } => {
                let style = self.current_style().with_link(dest_url.into_string());
                self.push_style(style);
            }

            Tag::Image { .. } | Tag::HtmlBlock | Tag::FootnoteDefinition(_)
            | Tag::MetadataBlock(_) => {
                self.suppress_depth += 1;
            }

            other => {
                debug!(token = ?other, "dropping unsupported container token");
            }
        }
    }

    fn handle_end(&mut self, end: TagEnd) {
        match end {
            TagEnd::Paragraph => {
                if !matches!(self.leaf, Some(Leaf::Item)) {
                    self.flush_leaf();
                }
            }

            TagEnd::Heading(_) | TagEnd::Item => self.flush_leaf(),

            TagEnd::CodeBlock => {
                trim_trailing_newline(&mut self.inline);
                self.flush_leaf();
            }

            TagEnd::BlockQuote(_) => {
                self.flush_leaf();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }

            TagEnd::List(_) => {
                self.flush_leaf();
                self.list_stack.pop();
            }

            TagEnd::Table => {
                if let Some(collector) = self.table.take() {
                    if collector.rows.is_empty() {
                        debug!("dropping table with no rows");
                    } else {
                        let structure =
                            TableStructureBuilder::build(collector.rows, self.table_width_budget);
                        self.blocks.push(Block::TableShell { index: self.tables.len() });
                        self.tables.push(structure);
                    }
                }
            }

            TagEnd::TableHead | TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.current_row);
                    table.rows.push(row);
                }
            }

            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.current_row.push(cell);
                    table.in_cell = false;
                }
            }

            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.pop_style();
            }

            TagEnd::Image | TagEnd::HtmlBlock | TagEnd::FootnoteDefinition
            | TagEnd::MetadataBlock(_) => {
                self.suppress_depth = self.suppress_depth.saturating_sub(1);
            }

            _ => {}
        }
    }
}

fn clamp_heading(level: HeadingLevel) -> u8 {
    (level as u8).clamp(1, 6)
}

/// First token of the fence info string decides the language.
fn fence_language(info: &str) -> i64 {
    let name = info.split(|c: char| c.is_whitespace() || c == ',').next().unwrap_or("");
    code_language_id(name)
}

/// Fenced code arrives with a trailing newline that is fence syntax, not
/// content.
fn trim_trailing_newline(elements: &mut Vec<TextElement>) {
    if let Some(last) = elements.last_mut() {
        if let Some(stripped) = last.content.strip_suffix('\n') {
            last.content = stripped.to_string();
        }
        if last.content.is_empty() {
            elements.pop();
        }
    }
}
