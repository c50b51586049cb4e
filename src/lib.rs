//! Security-hardened Markdown to HTML rendering for chat messages.

mod config;
pub mod formatting;
pub mod markdown;
mod options;

pub use config::Config;
pub use formatting::{MentionKey, SearchPattern, do_format_text, escape_html, escape_regex};
pub use markdown::{
    ChatRenderer, DefaultRenderer, InternalLinks, LinkNode, MarkdownRenderer, NodeRenderer,
    get_scheme, is_url_safe, render,
};
pub use options::FormattingOptions;
