//! Shared test utilities for integration tests.
//!
//! Provides formatting option presets and a render helper used across
//! multiple test files.

#![allow(dead_code)]

use anyhow::Result;
use chatmark::{FormattingOptions, SearchPattern, render};

/// Site URL used by presets that classify internal links.
pub const SITE_URL: &str = "https://example.com";

/// Formatting options for a chat server hosted at [`SITE_URL`].
pub fn site_options() -> FormattingOptions {
    FormattingOptions::new().with_site_url(SITE_URL)
}

/// Site options with search highlighting for the given terms.
///
/// # Errors
///
/// Returns error if a term cannot be compiled
pub fn search_options(terms: &[&str]) -> Result<FormattingOptions> {
    let patterns = terms
        .iter()
        .map(|term| SearchPattern::from_term(term))
        .collect::<Result<Vec<_>>>()?;

    Ok(site_options().with_search_patterns(patterns))
}

/// Renders markdown and strips the trailing newline block renderers add.
///
/// # Errors
///
/// Returns error if rendering fails
pub fn render_trimmed(markdown: &str, options: &FormattingOptions) -> Result<String> {
    Ok(render(markdown, options)?.trim_end().to_string())
}
