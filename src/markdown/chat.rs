//! Chat-flavoured node rendering.
//!
//! [`ChatRenderer`] overrides the nodes whose output the chat UI depends on
//! and forwards everything else to [`DefaultRenderer`].

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

use super::links::{InternalLinks, get_scheme, is_url_safe, unescape_html_entities};
use super::node::{CellFlags, DefaultRenderer, LinkNode, NodeRenderer};
use crate::formatting::{
    Tokens, do_format_text, escape_html, escape_text, highlight_search_terms, replace_tokens,
    strip_anchor_tags,
};
use crate::options::FormattingOptions;

static TASK_LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([ xX])\] ").expect("valid task list regex"));

static ORDINAL_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+.$").expect("valid bullet regex"));

/// Marker class the default image renderer puts on inline images.
const INLINE_IMAGE_CLASS: &str = "class=\"markdown-inline-img\"";

/// Renders nodes as security-hardened HTML for chat messages.
///
/// Holds only the internal link predicate compiled from the site URL of
/// the render it was created for.
#[derive(Debug, Clone)]
pub struct ChatRenderer {
    base: DefaultRenderer,
    internal_links: InternalLinks,
}

impl ChatRenderer {
    /// Creates renderer for one render call.
    ///
    /// # Errors
    ///
    /// Returns error if `options.site_url` is malformed. No link can be
    /// classified without it, so the whole render fails.
    pub fn new(options: &FormattingOptions) -> Result<Self> {
        Ok(Self {
            base: DefaultRenderer,
            internal_links: InternalLinks::new(&options.site_url)?,
        })
    }

    /// Resolves the href an anchor may use, or `None` if the link must be
    /// dropped in favour of its text.
    fn checked_href(&self, link: &LinkNode<'_>, options: &FormattingOptions) -> Option<String> {
        let mut href = link.href.to_string();

        if !link.href.starts_with('/') {
            match get_scheme(link.href) {
                None => href = format!("http://{}", href),
                Some(scheme) if link.is_autolinked_url => {
                    if let Some(allowed) = &options.autolinked_url_schemes {
                        let scheme = scheme.to_lowercase();
                        if !allowed.iter().any(|s| s.to_lowercase() == scheme) {
                            tracing::debug!(
                                href = link.href,
                                scheme = %scheme,
                                "Dropping autolink with disallowed scheme"
                            );
                            return None;
                        }
                    }
                }
                Some(_) => {}
            }
        }

        if !is_url_safe(&unescape_html_entities(&href)) {
            tracing::debug!(href = link.href, "Dropping link with unsafe URL");
            return None;
        }

        Some(href)
    }
}

impl NodeRenderer for ChatRenderer {
    fn code(&self, code: &str, language: &str, _options: &FormattingOptions) -> String {
        let mut language = language.to_lowercase();

        if language == "tex" || language == "latex" {
            return format!("<div data-latex=\"{}\"></div>", escape_html(code));
        }

        // html is highlighted as xml so nothing in it reads as live markup
        if language == "html" {
            language = "xml".to_string();
        }

        let language_attr = if language.is_empty() {
            String::new()
        } else {
            format!(" data-language=\"{}\"", escape_html(&language))
        };

        // Content stays raw: the downstream highlighter owns escaping.
        format!(
            "<div class=\"post-code post-code--wrap\"{}><code class=\"hljs\">{}</code></div>",
            language_attr, code
        )
    }

    fn codespan(&self, text: &str, options: &FormattingOptions) -> String {
        let mut output = escape_text(text);

        if options.has_search_patterns() {
            let mut tokens = Tokens::new();
            output = highlight_search_terms(&output, &mut tokens, &options.search_patterns);
            output = replace_tokens(&output, &tokens);
        }

        format!(
            "<span class=\"codespan__pre-wrap\"><code>{}</code></span>",
            output
        )
    }

    fn br(&self, options: &FormattingOptions) -> String {
        if options.singleline {
            return " ".to_string();
        }

        self.base.br(options)
    }

    fn heading(&self, text: &str, level: u8, _options: &FormattingOptions) -> String {
        format!("<h{level} class=\"markdown__heading\">{text}</h{level}>")
    }

    fn hr(&self, options: &FormattingOptions) -> String {
        self.base.hr(options)
    }

    fn blockquote(&self, body: &str, options: &FormattingOptions) -> String {
        self.base.blockquote(body, options)
    }

    fn html(&self, html: &str, options: &FormattingOptions) -> String {
        self.base.html(html, options)
    }

    fn list(&self, body: &str, ordered: bool, start: usize, options: &FormattingOptions) -> String {
        self.base.list(body, ordered, start, options)
    }

    fn listitem(&self, text: &str, bullet: &str, _options: &FormattingOptions) -> String {
        if let Some(caps) = TASK_LIST_ITEM.captures(text) {
            let checked = if &caps[1] == " " {
                ""
            } else {
                "checked=\"checked\" "
            };
            let rest = &text[caps[0].len()..];

            return format!(
                "<li class=\"list-item--task-list\"><input type=\"checkbox\" disabled=\"disabled\" {}/> {}</li>",
                checked, rest
            );
        }

        // A numbered marker overrides the list's running count.
        if let Some(value) = ORDINAL_BULLET
            .is_match(bullet)
            .then(|| leading_number(bullet))
            .flatten()
        {
            return format!("<li value=\"{}\">{}</li>", value, text);
        }

        format!("<li>{}</li>", text)
    }

    fn paragraph(&self, text: &str, options: &FormattingOptions) -> String {
        if !options.singleline {
            return self.base.paragraph(text, options);
        }

        // A div may hold the image wrapper where a p may not.
        if text.contains(INLINE_IMAGE_CLASS) {
            format!("<div class=\"markdown__paragraph-inline\">{}</div>", text)
        } else {
            format!("<p class=\"markdown__paragraph-inline\">{}</p>", text)
        }
    }

    fn table(&self, header: &str, body: &str, _options: &FormattingOptions) -> String {
        format!(
            "<div class=\"table-responsive\"><table class=\"markdown__table\"><thead>{}</thead><tbody>{}</tbody></table></div>",
            header, body
        )
    }

    fn tablerow(&self, content: &str, _options: &FormattingOptions) -> String {
        format!("<tr>{}</tr>", content)
    }

    fn tablecell(&self, content: &str, flags: CellFlags, options: &FormattingOptions) -> String {
        self.base
            .tablecell(content, flags, options)
            .trim()
            .to_string()
    }

    fn strong(&self, text: &str, options: &FormattingOptions) -> String {
        self.base.strong(text, options)
    }

    fn em(&self, text: &str, options: &FormattingOptions) -> String {
        self.base.em(text, options)
    }

    fn del(&self, text: &str, options: &FormattingOptions) -> String {
        self.base.del(text, options)
    }

    fn link(&self, link: &LinkNode<'_>, text: &str, options: &FormattingOptions) -> String {
        let Some(href) = self.checked_href(link, options) else {
            return text.to_string();
        };

        let mut output = String::from("<a class=\"theme markdown__link");

        if options
            .search_patterns
            .iter()
            .any(|pattern| pattern.pattern.is_match(link.href))
        {
            output.push_str(" search-highlight");
        }

        output.push_str("\" href=\"");
        output.push_str(&href);
        output.push_str("\" rel=\"noreferrer\"");

        // Team invites, channels and permalinks navigate inside the app.
        if self.internal_links.is_internal(&href) {
            output.push_str(" data-link=\"");
            output.push_str(&self.internal_links.in_app_path(&href));
            output.push('"');
        } else {
            output.push_str(" target=\"_blank\"");
        }

        if let Some(title) = link.title {
            output.push_str(" title=\"");
            output.push_str(title);
            output.push('"');
        }

        // Mention and hashtag links inside the text would nest anchors.
        output.push('>');
        output.push_str(&strip_anchor_tags(text));
        output.push_str("</a>");

        output
    }

    fn image(
        &self,
        href: &str,
        title: Option<&str>,
        alt: &str,
        options: &FormattingOptions,
    ) -> String {
        if !is_url_safe(&unescape_html_entities(href)) {
            tracing::debug!(href, "Dropping image with unsafe URL");
            return alt.to_string();
        }

        self.base.image(href, title, alt, options)
    }

    fn text(&self, text: &str, options: &FormattingOptions) -> String {
        do_format_text(text, options)
    }
}

/// Parses the digits a list bullet starts with.
fn leading_number(bullet: &str) -> Option<u64> {
    let end = bullet
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(bullet.len());
    bullet[..end].parse().ok()
}
