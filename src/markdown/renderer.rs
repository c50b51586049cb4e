//! Markdown parsing and tree walking.

use anyhow::{Context, Result};
use comrak::nodes::{AstNode, ListDelimType, ListType, NodeValue, TableAlignment};
use comrak::{Arena, Options, parse_document};
use std::path::Path;

use super::chat::ChatRenderer;
use super::node::{Alignment, CellFlags, LinkNode, NodeRenderer};
use crate::formatting::escape_html;
use crate::options::FormattingOptions;

/// Renders chat message markdown to HTML fragments.
///
/// Parses with comrak (tables, strikethrough and bare URL autolinks
/// enabled), then walks the tree depth first. Children are rendered before
/// their parent and handed to the parent's [`NodeRenderer`] method as
/// finished fragments.
pub struct MarkdownRenderer<'a> {
    options: Options<'a>,
    hard_breaks: bool,
}

impl<'a> MarkdownRenderer<'a> {
    /// Creates renderer with chat parsing options.
    ///
    /// - Tables, strikethrough and bare URL autolinks are enabled
    /// - Task list markers are left in the text for the list item renderer
    /// - Single newlines inside a paragraph render as line breaks
    pub fn new() -> Self {
        let mut options = Options::default();

        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = false;

        Self {
            options,
            hard_breaks: true,
        }
    }

    /// Sets whether soft line breaks render as hard breaks.
    ///
    /// When off, a newline inside a paragraph is kept as a newline in the
    /// output.
    pub fn with_hard_breaks(mut self, hard_breaks: bool) -> Self {
        self.hard_breaks = hard_breaks;
        self
    }

    /// Renders markdown content with chat formatting.
    ///
    /// # Arguments
    ///
    /// * `content`: Markdown content to render
    /// * `formatting`: Options for this render
    ///
    /// # Returns
    ///
    /// HTML fragment
    ///
    /// # Errors
    ///
    /// Returns error if the site URL in `formatting` is malformed
    pub fn render(&self, content: &str, formatting: &FormattingOptions) -> Result<String> {
        let renderer = ChatRenderer::new(formatting).context("Invalid formatting options")?;
        let html = self.render_with(content, &renderer, formatting);

        tracing::debug!(
            input_bytes = content.len(),
            output_bytes = html.len(),
            singleline = formatting.singleline,
            "Rendered markdown"
        );

        Ok(html)
    }

    /// Renders markdown content with any node renderer.
    pub fn render_with<R: NodeRenderer>(
        &self,
        content: &str,
        renderer: &R,
        formatting: &FormattingOptions,
    ) -> String {
        let arena = Arena::new();
        let root = parse_document(&arena, content, &self.options);

        let walker = Walker {
            source: content,
            renderer,
            formatting,
            hard_breaks: self.hard_breaks,
        };
        walker.render_node(root)
    }

    /// Renders markdown file at given path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or rendering fails
    pub fn render_file(
        &self,
        path: impl AsRef<Path>,
        formatting: &FormattingOptions,
    ) -> Result<String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read markdown file: {}", path.display()))?;
        self.render(&content, formatting)
    }
}

impl<'a> Default for MarkdownRenderer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders markdown with default parsing options.
///
/// # Errors
///
/// Returns error if the site URL in `options` is malformed
pub fn render(markdown: &str, options: &FormattingOptions) -> Result<String> {
    MarkdownRenderer::new().render(markdown, options)
}

struct Walker<'r, R> {
    source: &'r str,
    renderer: &'r R,
    formatting: &'r FormattingOptions,
    hard_breaks: bool,
}

impl<R: NodeRenderer> Walker<'_, R> {
    fn render_node<'a>(&self, node: &'a AstNode<'a>) -> String {
        let renderer = self.renderer;
        let opts = self.formatting;
        let ast = node.data.borrow();

        match &ast.value {
            NodeValue::Document => self.render_children(node),
            NodeValue::FrontMatter(_) => String::new(),
            NodeValue::Paragraph => {
                let text = self.render_children(node);
                if in_tight_list(node) {
                    text
                } else {
                    renderer.paragraph(&text, opts)
                }
            }
            NodeValue::Heading(heading) => {
                renderer.heading(&self.render_children(node), heading.level, opts)
            }
            NodeValue::CodeBlock(block) => {
                let language = block.info.split_whitespace().next().unwrap_or("");
                renderer.code(block.literal.trim_end_matches('\n'), language, opts)
            }
            NodeValue::Code(code) => renderer.codespan(&code.literal, opts),
            NodeValue::LineBreak => renderer.br(opts),
            NodeValue::SoftBreak => {
                if self.hard_breaks {
                    renderer.br(opts)
                } else {
                    "\n".to_string()
                }
            }
            NodeValue::Link(link) => {
                let href = escape_html(&link.url);
                let title = (!link.title.is_empty()).then(|| escape_html(&link.title));
                let node_link = LinkNode {
                    href: &href,
                    title: title.as_deref(),
                    is_autolinked_url: !self.written_as_bracket_link(node)
                        && is_autolinked_url(node, &link.url, &link.title),
                };
                renderer.link(&node_link, &self.render_children(node), opts)
            }
            NodeValue::Image(link) => {
                let title = (!link.title.is_empty()).then(|| escape_html(&link.title));
                renderer.image(
                    &escape_html(&link.url),
                    title.as_deref(),
                    &escape_html(&plain_text(node)),
                    opts,
                )
            }
            NodeValue::List(list) => {
                let ordered = list.list_type == ListType::Ordered;
                renderer.list(&self.render_children(node), ordered, list.start, opts)
            }
            NodeValue::Item(item) => {
                let bullet = match item.list_type {
                    ListType::Bullet => char::from(item.bullet_char).to_string(),
                    ListType::Ordered => {
                        let delimiter = match item.delimiter {
                            ListDelimType::Period => '.',
                            ListDelimType::Paren => ')',
                        };
                        format!("{}{}", item.start, delimiter)
                    }
                };
                renderer.listitem(&self.render_children(node), &bullet, opts)
            }
            NodeValue::Table(table) => self.render_table(node, &table.alignments),
            NodeValue::BlockQuote => renderer.blockquote(&self.render_children(node), opts),
            NodeValue::ThematicBreak => renderer.hr(opts),
            NodeValue::HtmlBlock(block) => renderer.html(&block.literal, opts),
            NodeValue::HtmlInline(html) => renderer.html(html, opts),
            NodeValue::Emph => renderer.em(&self.render_children(node), opts),
            NodeValue::Strong => renderer.strong(&self.render_children(node), opts),
            NodeValue::Strikethrough => renderer.del(&self.render_children(node), opts),
            NodeValue::Text(text) => renderer.text(text, opts),
            _ => self.render_children(node),
        }
    }

    /// Renders children in order, merging adjacent text nodes so the text
    /// formatter sees whole runs of text.
    fn render_children<'a>(&self, node: &'a AstNode<'a>) -> String {
        let mut output = String::new();
        let mut pending = String::new();

        for child in node.children() {
            if let NodeValue::Text(ref text) = child.data.borrow().value {
                pending.push_str(text);
                continue;
            }

            self.flush_text(&mut pending, &mut output);
            output.push_str(&self.render_node(child));
        }

        self.flush_text(&mut pending, &mut output);
        output
    }

    fn flush_text(&self, pending: &mut String, output: &mut String) {
        if pending.is_empty() {
            return;
        }

        output.push_str(&self.renderer.text(pending, self.formatting));
        pending.clear();
    }

    /// Whether the link node starts with `[` in the source, as written for
    /// `[text](url)` and reference links.
    fn written_as_bracket_link<'a>(&self, node: &'a AstNode<'a>) -> bool {
        let start = node.data.borrow().sourcepos.start;

        if start.line == 0 || start.column == 0 {
            return false;
        }

        self.source
            .lines()
            .nth(start.line - 1)
            .and_then(|line| line.as_bytes().get(start.column - 1))
            .is_some_and(|byte| *byte == b'[')
    }

    fn render_table<'a>(&self, node: &'a AstNode<'a>, alignments: &[TableAlignment]) -> String {
        let mut header = String::new();
        let mut body = String::new();

        for row in node.children() {
            let is_header = match row.data.borrow().value {
                NodeValue::TableRow(is_header) => is_header,
                _ => continue,
            };

            let cells: String = row
                .children()
                .enumerate()
                .map(|(index, cell)| {
                    let flags = CellFlags {
                        header: is_header,
                        align: alignments.get(index).copied().and_then(alignment),
                    };
                    self.renderer
                        .tablecell(&self.render_children(cell), flags, self.formatting)
                })
                .collect();

            let rendered = self.renderer.tablerow(&cells, self.formatting);
            if is_header {
                header.push_str(&rendered);
            } else {
                body.push_str(&rendered);
            }
        }

        self.renderer.table(&header, &body, self.formatting)
    }
}

fn alignment(align: TableAlignment) -> Option<Alignment> {
    match align {
        TableAlignment::None => None,
        TableAlignment::Left => Some(Alignment::Left),
        TableAlignment::Center => Some(Alignment::Center),
        TableAlignment::Right => Some(Alignment::Right),
    }
}

/// Paragraphs in tight lists render without their wrapper.
fn in_tight_list<'a>(node: &'a AstNode<'a>) -> bool {
    let Some(list) = node.parent().and_then(|item| item.parent()) else {
        return false;
    };

    match list.data.borrow().value {
        NodeValue::List(ref list) => list.tight,
        _ => false,
    }
}

/// Concatenated text of every descendant, without markup.
fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();

    for descendant in node.descendants() {
        match descendant.data.borrow().value {
            NodeValue::Text(ref literal) => text.push_str(literal),
            NodeValue::Code(ref code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }

    text
}

/// A link that is not bracketed in the source is an autolinked URL when its
/// text is the URL itself, as written in a bare `www.`, `http://` or email
/// address.
fn is_autolinked_url<'a>(node: &'a AstNode<'a>, url: &str, title: &str) -> bool {
    if !title.is_empty() {
        return false;
    }

    let text = plain_text(node);

    text == url
        || url.strip_prefix("mailto:") == Some(text.as_str())
        || url.strip_prefix("http://") == Some(text.as_str())
}
