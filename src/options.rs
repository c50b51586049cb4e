//! Per-render formatting configuration.

use crate::formatting::{MentionKey, SearchPattern};

/// Minimum hashtag length (characters after `#`) when none is configured.
pub const DEFAULT_MINIMUM_HASHTAG_LENGTH: usize = 3;

/// Options controlling how a single message is rendered.
///
/// Constructed once per render call and only ever read during it. The type
/// is `Send + Sync`, so one instance can be shared by reference across
/// threads rendering different messages.
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Collapse block constructs into markup that is safe in single line
    /// contexts such as channel previews.
    pub singleline: bool,

    /// Base URL of the hosting application. Links under it are treated as
    /// in-app navigation. Empty when not configured.
    pub site_url: String,

    /// Schemes allowed for bare autolinked URLs.
    ///
    /// `None` allows every scheme. `Some` is an allow-list, so an empty list
    /// rejects every autolinked URL that carries a scheme.
    pub autolinked_url_schemes: Option<Vec<String>>,

    /// Terms to highlight in text, inline code and link targets.
    pub search_patterns: Vec<SearchPattern>,

    /// Turn `@name` into mention links.
    pub at_mentions: bool,

    /// Mark up `:name:` emoticons.
    pub emoticons: bool,

    /// Highlight occurrences of `mention_keys`.
    pub mention_highlight: bool,

    /// Words that mention the current user.
    pub mention_keys: Vec<MentionKey>,

    /// Shortest hashtag, excluding `#`, that is turned into a link.
    pub minimum_hashtag_length: usize,
}

impl FormattingOptions {
    /// Creates options with chat defaults: block mode, emoticons and
    /// mention highlighting on, no site URL, no search terms.
    pub fn new() -> Self {
        Self {
            singleline: false,
            site_url: String::new(),
            autolinked_url_schemes: None,
            search_patterns: Vec::new(),
            at_mentions: false,
            emoticons: true,
            mention_highlight: true,
            mention_keys: Vec::new(),
            minimum_hashtag_length: DEFAULT_MINIMUM_HASHTAG_LENGTH,
        }
    }

    pub fn with_singleline(mut self, singleline: bool) -> Self {
        self.singleline = singleline;
        self
    }

    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = site_url.into();
        self
    }

    pub fn with_autolinked_url_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.autolinked_url_schemes = Some(schemes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_search_patterns(mut self, patterns: Vec<SearchPattern>) -> Self {
        self.search_patterns = patterns;
        self
    }

    pub fn with_at_mentions(mut self, at_mentions: bool) -> Self {
        self.at_mentions = at_mentions;
        self
    }

    pub fn with_emoticons(mut self, emoticons: bool) -> Self {
        self.emoticons = emoticons;
        self
    }

    pub fn with_mention_highlight(mut self, mention_highlight: bool) -> Self {
        self.mention_highlight = mention_highlight;
        self
    }

    pub fn with_mention_keys(mut self, keys: Vec<MentionKey>) -> Self {
        self.mention_keys = keys;
        self
    }

    /// Whether search highlighting is configured.
    pub fn has_search_patterns(&self) -> bool {
        !self.search_patterns.is_empty()
    }
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        // Arrange & Act
        let options = FormattingOptions::default();

        // Assert
        assert!(!options.singleline);
        assert!(options.site_url.is_empty());
        assert!(options.autolinked_url_schemes.is_none());
        assert!(!options.has_search_patterns());
        assert!(options.emoticons, "Emoticons should be on by default");
        assert!(options.mention_highlight);
        assert!(!options.at_mentions);
        assert_eq!(options.minimum_hashtag_length, 3);
    }

    #[test]
    fn test_builder_chain() {
        // Arrange & Act
        let options = FormattingOptions::new()
            .with_singleline(true)
            .with_site_url("https://chat.example.com")
            .with_autolinked_url_schemes(["http", "https"])
            .with_mention_highlight(false);

        // Assert
        assert!(options.singleline);
        assert!(!options.mention_highlight);
        assert_eq!(options.site_url, "https://chat.example.com");
        assert_eq!(
            options.autolinked_url_schemes,
            Some(vec!["http".to_string(), "https".to_string()])
        );
    }

    #[test]
    fn test_options_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FormattingOptions>();
    }
}
