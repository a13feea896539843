//! Markdown parsing into an owned syntax tree.
//!
//! `pulldown-cmark` yields a flat stream of start/end events. The PDF renderer needs
//! a tree instead: list items look at their first paragraph, tables look for their
//! header row, and every block renderer recurses into its children. [`parse`] folds
//! the event stream into [`Node`]s, each annotated with the byte span of the source
//! it came from.
//!
//! ## Tight list items
//!
//! CommonMark emits the inline content of a tight list item (`- foo`) without a
//! paragraph around it. Such runs of inline nodes are collected into a synthetic
//! [`NodeKind::TextBlock`] so that "the first paragraph or text block of an item"
//! is well defined for both tight and loose lists.
//!
//! ## Line breaks
//!
//! Soft and hard breaks are not separate nodes. They are recorded as flags on the
//! [`NodeKind::Text`] node that precedes them, creating an empty text node when
//! nothing precedes the break in its container.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::ops::Range;
use tracing::debug;

/// The kind of a syntax tree node, along with any content it owns directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    /// Heading with its level (1-6).
    Heading(u8),
    Paragraph,
    /// Inline content of a tight list item.
    TextBlock,
    FencedCodeBlock {
        info: String,
        code: String,
    },
    /// Indented code block.
    CodeBlock {
        code: String,
    },
    ThematicBreak,
    List {
        ordered: bool,
    },
    ListItem,
    Blockquote,
    Table,
    TableHeaderRow,
    TableRow,
    TableCell,
    Text {
        text: String,
        soft_break: bool,
        hard_break: bool,
    },
    InlineCode(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    HtmlBlock,
    /// Raw HTML, either inline or as the content of an HTML block.
    Html,
    Other,
}

impl NodeKind {
    /// Inline nodes live inside paragraphs, headings, table cells, and text blocks.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text { .. }
                | NodeKind::InlineCode(_)
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Strikethrough
                | NodeKind::Link
                | NodeKind::Image
                | NodeKind::Html
        )
    }
}

/// A node in the syntax tree. Parents own their children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte range in the source this node was parsed from.
    pub span: Range<usize>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, span: Range<usize>) -> Node {
        Node {
            kind,
            span,
            children: Vec::new(),
        }
    }

    fn text(text: impl Into<String>, span: Range<usize>) -> Node {
        Node::new(
            NodeKind::Text {
                text: text.into(),
                soft_break: false,
                hard_break: false,
            },
            span,
        )
    }
}

/// A parsed Markdown document and the source it references.
///
/// The source is never modified once parsed; node spans index into it.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    pub root: Node,
}

impl Document {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The source text covered by a span.
    #[cfg(test)]
    pub fn slice(&self, span: &Range<usize>) -> &str {
        self.source.get(span.clone()).unwrap_or_default()
    }
}

/// Parse Markdown text into a [`Document`].
///
/// GitHub-flavoured tables, strikethrough and task lists are enabled. Parsing never
/// fails: CommonMark assigns a meaning to every input.
pub fn parse(source: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::new(source.len());
    for (event, span) in Parser::new_ext(source, options).into_offset_iter() {
        builder.push(event, span);
    }
    let root = builder.finish();
    debug!(blocks = root.children.len(), "parsed markdown document");

    Document {
        source: source.to_string(),
        root,
    }
}

/// Folds `pulldown-cmark` events into a tree using a stack of open nodes.
struct TreeBuilder {
    stack: Vec<Node>,
}

impl TreeBuilder {
    fn new(len: usize) -> TreeBuilder {
        TreeBuilder {
            stack: vec![Node::new(NodeKind::Document, 0..len)],
        }
    }

    fn push(&mut self, event: Event<'_>, span: Range<usize>) {
        match event {
            Event::Start(tag) => {
                let kind = kind_for_tag(tag);
                self.stack.push(Node::new(kind, span));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(node) = self.stack.last_mut() {
                    trim_code(&mut node.kind);
                }
                self.close();
            }
            Event::End(_) => self.close(),
            Event::Text(text) => {
                // code block content stays verbatim inside its block
                if let Some(Node {
                    kind: NodeKind::FencedCodeBlock { code, .. } | NodeKind::CodeBlock { code },
                    ..
                }) = self.stack.last_mut()
                {
                    code.push_str(&text);
                    return;
                }
                self.attach(Node::text(text.to_string(), span));
            }
            Event::Code(code) => {
                self.attach(Node::new(NodeKind::InlineCode(code.to_string()), span))
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.attach(Node::text(math.to_string(), span))
            }
            Event::Html(_) | Event::InlineHtml(_) => {
                self.attach(Node::new(NodeKind::Html, span))
            }
            Event::FootnoteReference(label) => {
                self.attach(Node::text(format!("[^{label}]"), span))
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.attach(Node::text(marker, span))
            }
            Event::SoftBreak => self.mark_break(span, false),
            Event::HardBreak => self.mark_break(span, true),
            Event::Rule => self.attach(Node::new(NodeKind::ThematicBreak, span)),
        }
    }

    /// Pop the innermost open node and attach it to its parent.
    fn close(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(node) = self.stack.pop() {
            self.attach(node);
        }
    }

    /// Attach a finished node to the innermost open node, wrapping inline nodes of
    /// a tight list item in a text block.
    fn attach(&mut self, node: Node) {
        if node.kind.is_inline() {
            let parent = self.inline_parent(&node.span);
            parent.span.end = parent.span.end.max(node.span.end);
            parent.children.push(node);
        } else if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        }
    }

    fn inline_parent(&mut self, span: &Range<usize>) -> &mut Node {
        let last = self.stack.len() - 1;
        let parent = &mut self.stack[last];
        if parent.kind != NodeKind::ListItem {
            return parent;
        }

        let needs_block = !matches!(
            parent.children.last(),
            Some(Node {
                kind: NodeKind::TextBlock,
                ..
            })
        );
        if needs_block {
            parent
                .children
                .push(Node::new(NodeKind::TextBlock, span.clone()));
        }
        let len = parent.children.len();
        &mut parent.children[len - 1]
    }

    fn mark_break(&mut self, span: Range<usize>, hard: bool) {
        let parent = self.inline_parent(&span);
        let has_text = matches!(
            parent.children.last(),
            Some(Node {
                kind: NodeKind::Text { .. },
                ..
            })
        );
        if !has_text {
            parent.children.push(Node::text("", span.clone()));
        }
        parent.span.end = parent.span.end.max(span.end);
        if let Some(Node {
            kind:
                NodeKind::Text {
                    soft_break,
                    hard_break,
                    ..
                },
            ..
        }) = parent.children.last_mut()
        {
            if hard {
                *hard_break = true;
            } else {
                *soft_break = true;
            }
        }
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack
            .pop()
            .unwrap_or_else(|| Node::new(NodeKind::Document, 0..0))
    }
}

fn kind_for_tag(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => NodeKind::Heading(level as u8),
        Tag::BlockQuote(_) => NodeKind::Blockquote,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::FencedCodeBlock {
            info: info.to_string(),
            code: String::new(),
        },
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock {
            code: String::new(),
        },
        Tag::HtmlBlock => NodeKind::HtmlBlock,
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
        },
        Tag::Item => NodeKind::ListItem,
        Tag::Table(_) => NodeKind::Table,
        Tag::TableHead => NodeKind::TableHeaderRow,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link { .. } => NodeKind::Link,
        Tag::Image { .. } => NodeKind::Image,
        _ => NodeKind::Other,
    }
}

/// Code blocks end with the newline of their last line; drop it.
fn trim_code(kind: &mut NodeKind) {
    if let NodeKind::FencedCodeBlock { code, .. } | NodeKind::CodeBlock { code } = kind {
        if code.ends_with('\n') {
            code.pop();
            if code.ends_with('\r') {
                code.pop();
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(node: &Node) -> Vec<&NodeKind> {
        node.children.iter().map(|n| &n.kind).collect()
    }

    #[test]
    fn can_parse_headings_with_levels() {
        let doc = parse("# One\n\n### Three\n\n###### Six\n");
        assert_eq!(
            kinds(&doc.root),
            vec![
                &NodeKind::Heading(1),
                &NodeKind::Heading(3),
                &NodeKind::Heading(6)
            ]
        );
    }

    #[test]
    fn spans_point_into_the_source() {
        let doc = parse("# Hello\n\nWorld");
        let paragraph = &doc.root.children[1];
        assert_eq!(paragraph.kind, NodeKind::Paragraph);
        assert_eq!(doc.slice(&paragraph.span), "World");
        assert_eq!(doc.source(), "# Hello\n\nWorld");
    }

    #[test]
    fn fenced_code_is_verbatim_without_trailing_newline() {
        let doc = parse("```rust\nfn main() {\n    *x = 1;\n}\n```\n");
        match &doc.root.children[0].kind {
            NodeKind::FencedCodeBlock { info, code } => {
                assert_eq!(info, "rust");
                assert_eq!(code, "fn main() {\n    *x = 1;\n}");
            }
            other => panic!("expected fenced code block, got {other:?}"),
        }
    }

    #[test]
    fn indented_code_is_a_code_block() {
        let doc = parse("    let a = 1;\n    let b = 2;\n");
        assert_eq!(
            doc.root.children[0].kind,
            NodeKind::CodeBlock {
                code: "let a = 1;\nlet b = 2;".to_string()
            }
        );
    }

    #[test]
    fn soft_breaks_are_flagged_on_preceding_text() {
        let doc = parse("first\nsecond");
        let paragraph = &doc.root.children[0];
        match &paragraph.children[0].kind {
            NodeKind::Text {
                text, soft_break, ..
            } => {
                assert_eq!(text, "first");
                assert!(soft_break);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn tight_list_items_wrap_inlines_in_text_blocks() {
        let doc = parse("- A\n  - B\n");
        let list = &doc.root.children[0];
        assert_eq!(list.kind, NodeKind::List { ordered: false });
        let item = &list.children[0];
        assert_eq!(
            kinds(item),
            vec![&NodeKind::TextBlock, &NodeKind::List { ordered: false }]
        );
    }

    #[test]
    fn loose_list_items_keep_paragraphs() {
        let doc = parse("1. A\n\n2. B\n");
        let list = &doc.root.children[0];
        assert_eq!(list.kind, NodeKind::List { ordered: true });
        assert_eq!(kinds(&list.children[0]), vec![&NodeKind::Paragraph]);
    }

    #[test]
    fn tables_have_a_header_row() {
        let doc = parse("| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |\n");
        let table = &doc.root.children[0];
        assert_eq!(table.kind, NodeKind::Table);
        assert_eq!(
            kinds(table),
            vec![
                &NodeKind::TableHeaderRow,
                &NodeKind::TableRow,
                &NodeKind::TableRow
            ]
        );
        assert_eq!(table.children[0].children.len(), 2);
    }

    #[test]
    fn thematic_breaks_and_quotes_are_blocks() {
        let doc = parse("> quoted\n\n---\n");
        assert_eq!(
            kinds(&doc.root),
            vec![&NodeKind::Blockquote, &NodeKind::ThematicBreak]
        );
    }
}
