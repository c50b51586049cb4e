//! Per-node rendering interface and its neutral default implementation.

use crate::formatting::escape_html;
use crate::options::FormattingOptions;

/// Horizontal alignment of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// Table cell properties handed to [`NodeRenderer::tablecell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellFlags {
    pub header: bool,
    pub align: Option<Alignment>,
}

/// A link as handed over by the parser.
///
/// `href` and `title` are already HTML-escaped for use inside a quoted
/// attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode<'a> {
    pub href: &'a str,
    pub title: Option<&'a str>,
    /// Link came from a bare URL in the text rather than `[text](url)`.
    pub is_autolinked_url: bool,
}

/// One render method per Markdown node kind.
///
/// Container methods receive their children already rendered. Every method
/// returns a finished HTML fragment and takes the formatting options of the
/// current render explicitly.
pub trait NodeRenderer {
    /// Fenced or indented code block. `code` is the raw, unescaped content.
    fn code(&self, code: &str, language: &str, options: &FormattingOptions) -> String;
    /// Inline code span. `text` is the raw, unescaped content.
    fn codespan(&self, text: &str, options: &FormattingOptions) -> String;
    fn br(&self, options: &FormattingOptions) -> String;
    fn heading(&self, text: &str, level: u8, options: &FormattingOptions) -> String;
    fn hr(&self, options: &FormattingOptions) -> String;
    fn blockquote(&self, body: &str, options: &FormattingOptions) -> String;
    /// Raw HTML from the source, block or inline.
    fn html(&self, html: &str, options: &FormattingOptions) -> String;
    fn list(
        &self,
        body: &str,
        ordered: bool,
        start: usize,
        options: &FormattingOptions,
    ) -> String;
    /// `bullet` is the item marker as written, such as `-` or `3.`.
    fn listitem(&self, text: &str, bullet: &str, options: &FormattingOptions) -> String;
    fn paragraph(&self, text: &str, options: &FormattingOptions) -> String;
    fn table(&self, header: &str, body: &str, options: &FormattingOptions) -> String;
    fn tablerow(&self, content: &str, options: &FormattingOptions) -> String;
    fn tablecell(&self, content: &str, flags: CellFlags, options: &FormattingOptions) -> String;
    fn strong(&self, text: &str, options: &FormattingOptions) -> String;
    fn em(&self, text: &str, options: &FormattingOptions) -> String;
    fn del(&self, text: &str, options: &FormattingOptions) -> String;
    fn link(&self, link: &LinkNode<'_>, text: &str, options: &FormattingOptions) -> String;
    /// `alt` is the plain-text alternative, already escaped.
    fn image(
        &self,
        href: &str,
        title: Option<&str>,
        alt: &str,
        options: &FormattingOptions,
    ) -> String;
    /// Plain text. `text` is raw and must be escaped by the renderer.
    fn text(&self, text: &str, options: &FormattingOptions) -> String;
}

/// Generic HTML output with no chat-specific behaviour.
///
/// Raw HTML from the source is escaped rather than passed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRenderer;

impl NodeRenderer for DefaultRenderer {
    fn code(&self, code: &str, language: &str, _options: &FormattingOptions) -> String {
        let code = escape_html(code);

        if language.is_empty() {
            return format!("<pre><code>{}</code></pre>\n", code);
        }

        format!(
            "<pre><code class=\"lang-{}\">{}</code></pre>\n",
            escape_html(language),
            code
        )
    }

    fn codespan(&self, text: &str, _options: &FormattingOptions) -> String {
        format!("<code>{}</code>", escape_html(text))
    }

    fn br(&self, _options: &FormattingOptions) -> String {
        "<br>".to_string()
    }

    fn heading(&self, text: &str, level: u8, _options: &FormattingOptions) -> String {
        format!("<h{level}>{text}</h{level}>\n")
    }

    fn hr(&self, _options: &FormattingOptions) -> String {
        "<hr>\n".to_string()
    }

    fn blockquote(&self, body: &str, _options: &FormattingOptions) -> String {
        format!("<blockquote>\n{}</blockquote>\n", body)
    }

    fn html(&self, html: &str, _options: &FormattingOptions) -> String {
        escape_html(html)
    }

    fn list(
        &self,
        body: &str,
        ordered: bool,
        start: usize,
        _options: &FormattingOptions,
    ) -> String {
        if !ordered {
            return format!("<ul>\n{}</ul>\n", body);
        }

        if start != 1 {
            format!("<ol start=\"{}\">\n{}</ol>\n", start, body)
        } else {
            format!("<ol>\n{}</ol>\n", body)
        }
    }

    fn listitem(&self, text: &str, _bullet: &str, _options: &FormattingOptions) -> String {
        format!("<li>{}</li>\n", text)
    }

    fn paragraph(&self, text: &str, _options: &FormattingOptions) -> String {
        format!("<p>{}</p>\n", text)
    }

    fn table(&self, header: &str, body: &str, _options: &FormattingOptions) -> String {
        format!(
            "<table>\n<thead>\n{}</thead>\n<tbody>\n{}</tbody>\n</table>\n",
            header, body
        )
    }

    fn tablerow(&self, content: &str, _options: &FormattingOptions) -> String {
        format!("<tr>\n{}</tr>\n", content)
    }

    fn tablecell(&self, content: &str, flags: CellFlags, _options: &FormattingOptions) -> String {
        let tag = if flags.header { "th" } else { "td" };

        match flags.align {
            Some(align) => format!(
                "<{tag} style=\"text-align:{}\">{content}</{tag}>\n",
                align.as_str()
            ),
            None => format!("<{tag}>{content}</{tag}>\n"),
        }
    }

    fn strong(&self, text: &str, _options: &FormattingOptions) -> String {
        format!("<strong>{}</strong>", text)
    }

    fn em(&self, text: &str, _options: &FormattingOptions) -> String {
        format!("<em>{}</em>", text)
    }

    fn del(&self, text: &str, _options: &FormattingOptions) -> String {
        format!("<del>{}</del>", text)
    }

    fn link(&self, link: &LinkNode<'_>, text: &str, _options: &FormattingOptions) -> String {
        match link.title {
            Some(title) => format!(
                "<a href=\"{}\" title=\"{}\">{}</a>",
                link.href, title, text
            ),
            None => format!("<a href=\"{}\">{}</a>", link.href, text),
        }
    }

    fn image(
        &self,
        href: &str,
        title: Option<&str>,
        alt: &str,
        _options: &FormattingOptions,
    ) -> String {
        let title = title
            .map(|title| format!(" title=\"{}\"", title))
            .unwrap_or_default();

        format!(
            "<img src=\"{}\" alt=\"{}\"{} class=\"markdown-inline-img\">",
            href, alt, title
        )
    }

    fn text(&self, text: &str, _options: &FormattingOptions) -> String {
        escape_html(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_code_escapes_content() {
        // Arrange
        let renderer = DefaultRenderer;
        let options = FormattingOptions::default();

        // Act
        let html = renderer.code("<b>x</b>", "rust", &options);

        // Assert
        assert_eq!(
            html,
            "<pre><code class=\"lang-rust\">&lt;b&gt;x&lt;/b&gt;</code></pre>\n"
        );
    }

    #[test]
    fn test_default_ordered_list_start() {
        let options = FormattingOptions::default();
        assert_eq!(
            DefaultRenderer.list("<li>a</li>\n", true, 4, &options),
            "<ol start=\"4\">\n<li>a</li>\n</ol>\n"
        );
        assert_eq!(
            DefaultRenderer.list("<li>a</li>\n", true, 1, &options),
            "<ol>\n<li>a</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_default_tablecell_alignment() {
        // Arrange
        let flags = CellFlags {
            header: true,
            align: Some(Alignment::Center),
        };

        // Act
        let html = DefaultRenderer.tablecell("Name", flags, &FormattingOptions::default());

        // Assert
        assert_eq!(html, "<th style=\"text-align:center\">Name</th>\n");
    }

    #[test]
    fn test_default_html_is_escaped() {
        let html = DefaultRenderer.html("<script>x</script>", &FormattingOptions::default());
        assert_eq!(html, "&lt;script&gt;x&lt;/script&gt;");
    }

    #[test]
    fn test_default_image_carries_inline_class() {
        let html = DefaultRenderer.image("a.png", None, "logo", &FormattingOptions::default());
        assert_eq!(
            html,
            "<img src=\"a.png\" alt=\"logo\" class=\"markdown-inline-img\">"
        );
    }
}
