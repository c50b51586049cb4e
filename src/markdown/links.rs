//! Link safety checks and internal link classification.

use anyhow::{Context, Result, bail};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;

use crate::formatting::escape_regex;

static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").expect("valid scheme regex")
});

static HTML_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([#\w]+);").expect("valid entity regex"));

/// Schemes that execute code or embed arbitrary content when followed.
const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Extracts the scheme of a URL, without the trailing `:`.
///
/// Returns `None` for scheme-less input such as bare domains or relative
/// paths, and for anything that does not start with a well formed scheme.
pub fn get_scheme(url: &str) -> Option<&str> {
    SCHEME
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Checks whether a URL may be rendered as a link target.
///
/// Percent-encoding is decoded and every character other than word
/// characters and `:` is dropped before comparing against known script
/// schemes, so `java%0Ascript:` and `JaVa Script:` are both caught. Input
/// that does not decode to valid UTF-8 is rejected as malformed.
pub fn is_url_safe(url: &str) -> bool {
    let decoded = match percent_decode_str(url).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => return false,
    };

    let normalized: String = decoded
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .flat_map(char::to_lowercase)
        .collect();

    !UNSAFE_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

/// Decodes the HTML entities that can hide a scheme separator.
///
/// Only `&colon;` and numeric references are decoded. Every other named
/// entity is removed. Invalid code points decode to nothing.
pub fn unescape_html_entities(html: &str) -> String {
    HTML_ENTITY
        .replace_all(html, |caps: &regex::Captures| {
            let name = caps[1].to_lowercase();

            if name == "colon" {
                return ":".to_string();
            }

            let Some(number) = name.strip_prefix('#') else {
                return String::new();
            };

            let code = match number.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => number.parse::<u32>().ok(),
            };

            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Classifies links that point inside the chat application.
///
/// Team invites, the system console, permalinks, channel and direct message
/// links are internal whether written app-relative or under the site URL.
/// The classification is path based; callers only rely on
/// [`InternalLinks::is_internal`] and [`InternalLinks::in_app_path`].
#[derive(Debug, Clone)]
pub struct InternalLinks {
    site_url: String,
    pattern: Regex,
}

impl InternalLinks {
    /// Compiles the internal link predicate for a site URL.
    ///
    /// An empty site URL only recognises app-relative paths.
    ///
    /// # Errors
    ///
    /// Returns error if the site URL is not an absolute URL or the predicate
    /// cannot be compiled.
    pub fn new(site_url: &str) -> Result<Self> {
        if !site_url.is_empty() {
            let parsed = url::Url::parse(site_url)
                .with_context(|| format!("Invalid site URL: {site_url}"))?;

            if parsed.cannot_be_a_base() {
                bail!("Site URL cannot be used as a link base: {}", site_url);
            }
        }

        let pattern = Regex::new(&format!(
            r"^({})?/(?:signup_user_complete|admin_console|[^/]+/(?:pl|channels|messages))/",
            escape_regex(site_url)
        ))
        .with_context(|| format!("Failed to build internal link pattern for {site_url}"))?;

        Ok(Self {
            site_url: site_url.to_string(),
            pattern,
        })
    }

    /// Whether `href` navigates within the application.
    pub fn is_internal(&self, href: &str) -> bool {
        self.pattern.is_match(href)
    }

    /// Returns `href` with the site URL prefix removed.
    pub fn in_app_path(&self, href: &str) -> String {
        if self.site_url.is_empty() {
            return href.to_string();
        }

        href.replacen(&self.site_url, "", 1)
    }
}
