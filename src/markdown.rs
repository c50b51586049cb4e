//! Markdown rendering for chat messages.
//!
//! This module parses markdown with comrak and renders each node through a
//! [`NodeRenderer`]. [`ChatRenderer`] is the chat flavour: link safety
//! filtering, internal link detection, task lists, single line mode and
//! search highlighting. Node kinds it does not customise fall through to
//! [`DefaultRenderer`].

mod chat;
mod links;
mod node;
mod renderer;

pub use chat::ChatRenderer;
pub use links::{InternalLinks, get_scheme, is_url_safe, unescape_html_entities};
pub use node::{Alignment, CellFlags, DefaultRenderer, LinkNode, NodeRenderer};
pub use renderer::{MarkdownRenderer, render};
