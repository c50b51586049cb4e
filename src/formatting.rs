//! Text formatting for chat message content.
//!
//! Escapes raw text and substitutes mentions, hashtags, emoticons and
//! highlights. Each substitution is first parked behind a token alias so
//! later passes never match inside markup produced by an earlier pass;
//! [`replace_tokens`] swaps the aliases for their markup at the end.
//!
//! Aliases are spelled in private-use code points that are stripped from
//! message text, so text can never forge one and no word pattern can match
//! inside one.

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use crate::options::FormattingOptions;

static AT_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\B@([a-z0-9_.\-]*[a-z0-9_])").expect("valid at-mention regex")
});

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\p{L}\d_])#(\p{L}[\p{L}\d\-_.]*[\p{L}\d])").expect("valid hashtag regex")
});

static EMOTICON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\s):([a-z0-9_+\-]+):").expect("valid emoticon regex")
});

static CJK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Han}|\p{Hiragana}|\p{Katakana}|\p{Hangul}").expect("valid cjk regex")
});

/// Entities produced by [`escape_html`].
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:amp|lt|gt|quot|#39);").expect("valid entity regex"));

const ALIAS_OPEN: char = '\u{E000}';
const ALIAS_CLOSE: char = '\u{E001}';
const ALIAS_DIGITS: [char; 10] = [
    '\u{E010}', '\u{E011}', '\u{E012}', '\u{E013}', '\u{E014}', '\u{E015}', '\u{E016}',
    '\u{E017}', '\u{E018}', '\u{E019}',
];
const ALIAS_CHARS: RangeInclusive<char> = '\u{E000}'..='\u{E019}';

/// Token kind of a parked HTML entity. Entities are never highlighted.
const ENTITY_KIND: &str = "ENTITY";

static ANCHOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?a[^>]*>").expect("valid anchor tag regex"));

/// A search term compiled for highlighting.
///
/// `pattern` must capture the text preceding the term in group 1 and the
/// term itself in group 2. Patterns without those groups highlight the whole
/// match.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    pub pattern: Regex,
    pub term: String,
}

impl SearchPattern {
    /// Compiles a user search term into a case-insensitive pattern.
    ///
    /// - Terms containing CJK characters match anywhere, `*` stripped
    /// - `term*` matches words starting with `term`
    /// - `@name` and `#tag` match up to a word boundary
    /// - Anything else matches whole words only
    ///
    /// # Errors
    ///
    /// Returns error if the compiled pattern exceeds regex size limits.
    pub fn from_term(term: &str) -> Result<Self> {
        let cleaned = strip_alias_chars(term);
        let body = if CJK.is_match(&cleaned) {
            format!("()({})", escape_regex(&cleaned.replace('*', "")))
        } else if let Some(prefix) = cleaned.strip_suffix('*') {
            format!(r"\b()({})", escape_regex(prefix))
        } else if cleaned.starts_with('@') || cleaned.starts_with('#') {
            format!(r"()({})\b", escape_regex(&cleaned))
        } else {
            format!(r"\b()({})\b", escape_regex(&cleaned))
        };

        let pattern = Regex::new(&format!("(?i){body}"))
            .with_context(|| format!("Failed to compile search term: {term}"))?;

        Ok(Self {
            pattern,
            term: term.to_string(),
        })
    }
}

/// A word that mentions the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionKey {
    pub key: String,
    pub case_sensitive: bool,
}

impl MentionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            case_sensitive: true,
        }
    }

    fn matches(&self, text: &str) -> bool {
        if self.case_sensitive {
            self.key == text
        } else {
            self.key.to_lowercase() == text.to_lowercase()
        }
    }
}

/// Markup parked behind an alias until [`replace_tokens`] runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: &'static str,
    pub value: String,
    pub original_text: String,
}

/// Insertion-ordered alias to token map.
#[derive(Debug, Clone, Default)]
pub struct Tokens {
    entries: Vec<(String, Token)>,
}

impl Tokens {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores markup and returns the alias that stands in for it.
    pub fn push(&mut self, kind: &'static str, value: String, original_text: String) -> String {
        let alias = alias_for(self.entries.len());
        self.entries.push((
            alias.clone(),
            Token {
                kind,
                value,
                original_text,
            },
        ));
        alias
    }

    #[cfg(test)]
    fn get(&self, alias: &str) -> Option<&Token> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, token)| token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Token)> {
        self.entries.iter().map(|(alias, token)| (alias.as_str(), token))
    }
}

fn alias_for(index: usize) -> String {
    let mut alias = String::from(ALIAS_OPEN);
    for digit in index.to_string().bytes() {
        alias.push(ALIAS_DIGITS[usize::from(digit - b'0')]);
    }
    alias.push(ALIAS_CLOSE);
    alias
}

fn strip_alias_chars(text: &str) -> String {
    text.chars().filter(|c| !ALIAS_CHARS.contains(c)).collect()
}

/// Escapes message text for the formatter, dropping any characters
/// reserved for token aliases.
pub(crate) fn escape_text(text: &str) -> String {
    escape_html(&strip_alias_chars(text))
}

/// Parks every HTML entity behind a token so highlighting never splits one.
fn park_entities(text: &str, tokens: &mut Tokens) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            tokens.push(ENTITY_KIND, caps[0].to_string(), caps[0].to_string())
        })
        .into_owned()
}

/// Escapes HTML special characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escapes text so it matches literally when embedded in a regex.
pub fn escape_regex(text: &str) -> String {
    regex::escape(text)
}

/// Removes `<a ...>` and `</a>` tags, keeping their inner text.
pub fn strip_anchor_tags(text: &str) -> String {
    ANCHOR_TAG.replace_all(text, "").into_owned()
}

/// Formats raw message text into HTML.
///
/// The text is escaped first; every later pass only adds markup through
/// tokens, so user input can never introduce tags of its own.
pub fn do_format_text(text: &str, options: &FormattingOptions) -> String {
    let mut tokens = Tokens::new();
    let mut output = escape_text(text);

    if options.at_mentions {
        output = autolink_at_mentions(&output, &mut tokens);
    }

    output = autolink_hashtags(&output, &mut tokens, options.minimum_hashtag_length);

    if options.emoticons {
        output = handle_emoticons(&output, &mut tokens);
    }

    if options.has_search_patterns() {
        output = highlight_search_terms(&output, &mut tokens, &options.search_patterns);
    }

    if options.mention_highlight {
        output = highlight_current_mentions(&output, &mut tokens, &options.mention_keys);
    }

    replace_tokens(&output, &tokens)
}

/// Substitutes every alias in `text` with its markup.
///
/// Aliases are replaced newest first, once each.
pub fn replace_tokens(text: &str, tokens: &Tokens) -> String {
    let mut output = text.to_string();

    for (alias, token) in tokens.entries.iter().rev() {
        output = output.replacen(alias.as_str(), &token.value, 1);
    }

    output
}

fn autolink_at_mentions(text: &str, tokens: &mut Tokens) -> String {
    AT_MENTION
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            tokens.push(
                "ATMENTION",
                format!(
                    "<a class=\"mention-link\" href=\"#\" data-mention=\"{name}\">@{name}</a>"
                ),
                format!("@{name}"),
            )
        })
        .into_owned()
}

fn autolink_hashtags(text: &str, tokens: &mut Tokens, minimum_length: usize) -> String {
    HASHTAG
        .replace_all(text, |caps: &Captures| {
            let prefix = &caps[1];
            let tag = &caps[2];

            if tag.chars().count() < minimum_length {
                return caps[0].to_string();
            }

            let alias = tokens.push(
                "HASHTAG",
                format!(
                    "<a class=\"mention-link\" href=\"#\" data-hashtag=\"#{tag}\">#{tag}</a>"
                ),
                format!("#{tag}"),
            );
            format!("{prefix}{alias}")
        })
        .into_owned()
}

fn handle_emoticons(text: &str, tokens: &mut Tokens) -> String {
    EMOTICON
        .replace_all(text, |caps: &Captures| {
            let prefix = &caps[1];
            let name = caps[2].to_lowercase();
            let alias = tokens.push(
                "EMOTICON",
                format!("<span data-emoticon=\"{name}\">:{name}:</span>"),
                format!(":{name}:"),
            );
            format!("{prefix}{alias}")
        })
        .into_owned()
}

/// Wraps search term matches in `search-highlight` spans.
///
/// Tokens created by earlier passes whose original text matches a pattern
/// are re-wrapped in place, so a highlighted `@mention` keeps its link.
/// `text` is escaped HTML; entities in it are left whole.
pub fn highlight_search_terms(
    text: &str,
    tokens: &mut Tokens,
    patterns: &[SearchPattern],
) -> String {
    let mut output = park_entities(text, tokens);

    for pattern in patterns {
        let matching: Vec<(String, Token)> = tokens
            .iter()
            .filter(|(_, token)| {
                token.kind != ENTITY_KIND && pattern.pattern.is_match(&token.original_text)
            })
            .map(|(alias, token)| (alias.to_string(), token.clone()))
            .collect();

        for (alias, token) in matching {
            let new_alias = tokens.push(
                "SEARCHTERM",
                format!("<span class=\"search-highlight\">{}</span>", token.value),
                token.original_text,
            );
            output = output.replacen(&alias, &new_alias, 1);
        }

        output = pattern
            .pattern
            .replace_all(&output, |caps: &Captures| {
                let (prefix, word) = split_highlight_captures(caps);
                let alias = tokens.push(
                    "SEARCHTERM",
                    format!("<span class=\"search-highlight\">{word}</span>"),
                    word.to_string(),
                );
                format!("{prefix}{alias}")
            })
            .into_owned();
    }

    output
}

fn highlight_current_mentions(text: &str, tokens: &mut Tokens, keys: &[MentionKey]) -> String {
    if keys.is_empty() {
        return text.to_string();
    }

    let mut output = park_entities(text, tokens);

    let matching: Vec<(String, Token)> = tokens
        .iter()
        .filter(|(_, token)| {
            token.kind != ENTITY_KIND && keys.iter().any(|key| key.matches(&token.original_text))
        })
        .map(|(alias, token)| (alias.to_string(), token.clone()))
        .collect();

    for (alias, token) in matching {
        let new_alias = tokens.push(
            "MENTION",
            format!("<span class=\"mention--highlight\">{}</span>", token.value),
            token.original_text,
        );
        output = output.replacen(&alias, &new_alias, 1);
    }

    for key in keys.iter().filter(|key| !key.key.is_empty()) {
        let flags = if key.case_sensitive { "" } else { "(?i)" };
        let pattern = match Regex::new(&format!(
            r"{flags}(^|\W)({})\b",
            escape_regex(&key.key)
        )) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::debug!(key = %key.key, error = %e, "Skipping mention key");
                continue;
            }
        };

        output = pattern
            .replace_all(&output, |caps: &Captures| {
                let (prefix, word) = split_highlight_captures(caps);
                let alias = tokens.push(
                    "MENTION",
                    format!("<span class=\"mention--highlight\">{word}</span>"),
                    word.to_string(),
                );
                format!("{prefix}{alias}")
            })
            .into_owned();
    }

    output
}

fn split_highlight_captures<'t>(caps: &Captures<'t>) -> (&'t str, &'t str) {
    match (caps.get(1), caps.get(2)) {
        (Some(prefix), Some(word)) => (prefix.as_str(), word.as_str()),
        _ => ("", caps.get(0).map_or("", |m| m.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain_options() -> FormattingOptions {
        FormattingOptions::new().with_emoticons(false)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_escape_regex_matches_literally() {
        // Arrange
        let site = "https://chat.example.com:8065/sub(path)";

        // Act
        let pattern = Regex::new(&format!("^{}$", escape_regex(site))).expect("valid regex");

        // Assert
        assert!(pattern.is_match(site));
        assert!(!pattern.is_match("https://chatXexample.com:8065/sub(path)"));
    }

    #[test]
    fn test_strip_anchor_tags() {
        let text = r##"see <a class="mention-link" href="#">@bob</a> now"##;
        assert_eq!(strip_anchor_tags(text), "see @bob now");
    }

    #[test]
    fn test_format_plain_text_is_escaped() {
        // Act
        let html = do_format_text("a < b && <b>bold</b>", &plain_options());

        // Assert
        assert_eq!(html, "a &lt; b &amp;&amp; &lt;b&gt;bold&lt;/b&gt;");
    }

    #[test]
    fn test_format_at_mentions() {
        // Arrange
        let options = plain_options().with_at_mentions(true);

        // Act
        let html = do_format_text("ping @alice.smith, thanks", &options);

        // Assert
        assert_eq!(
            html,
            "ping <a class=\"mention-link\" href=\"#\" data-mention=\"alice.smith\">@alice.smith</a>, thanks"
        );
    }

    #[test]
    fn test_email_is_not_a_mention() {
        let options = plain_options().with_at_mentions(true);
        let html = do_format_text("mail bob@example.com", &options);
        assert_eq!(html, "mail bob@example.com");
    }

    #[test]
    fn test_format_hashtags_respect_minimum_length() {
        // Act
        let html = do_format_text("#release and #ab", &plain_options());

        // Assert
        assert!(
            html.starts_with(
                "<a class=\"mention-link\" href=\"#\" data-hashtag=\"#release\">#release</a>"
            ),
            "Should link long hashtag: {}",
            html
        );
        assert!(html.ends_with(" and #ab"), "Short tag stays text: {}", html);
    }

    #[test]
    fn test_escaped_apostrophe_is_not_a_hashtag() {
        let html = do_format_text("it's", &plain_options());
        assert_eq!(html, "it&#39;s");
    }

    #[test]
    fn test_format_emoticons() {
        // Arrange
        let options = FormattingOptions::new();

        // Act
        let html = do_format_text("nice :Thumbsup:", &options);

        // Assert
        assert_eq!(
            html,
            "nice <span data-emoticon=\"thumbsup\">:thumbsup:</span>"
        );
    }

    #[test]
    fn test_emoticons_disabled() {
        let html = do_format_text("nice :thumbsup:", &plain_options());
        assert_eq!(html, "nice :thumbsup:");
    }

    #[test]
    fn test_search_term_highlighting() {
        // Arrange
        let pattern = SearchPattern::from_term("deploy").expect("valid term");
        let options = plain_options().with_search_patterns(vec![pattern]);

        // Act
        let html = do_format_text("Deploy the deployment", &options);

        // Assert
        assert_eq!(
            html,
            "<span class=\"search-highlight\">Deploy</span> the deployment"
        );
    }

    #[test]
    fn test_prefix_search_term() {
        // Arrange
        let pattern = SearchPattern::from_term("deploy*").expect("valid term");
        let options = plain_options().with_search_patterns(vec![pattern]);

        // Act
        let html = do_format_text("redeploy the deployment", &options);

        // Assert
        assert_eq!(
            html,
            "redeploy the <span class=\"search-highlight\">deploy</span>ment"
        );
    }

    #[test]
    fn test_search_highlight_wraps_existing_mention_token() {
        // Arrange
        let pattern = SearchPattern::from_term("@bob").expect("valid term");
        let options = plain_options()
            .with_at_mentions(true)
            .with_search_patterns(vec![pattern]);

        // Act
        let html = do_format_text("hi @bob", &options);

        // Assert
        assert_eq!(
            html,
            "hi <span class=\"search-highlight\"><a class=\"mention-link\" href=\"#\" data-mention=\"bob\">@bob</a></span>"
        );
    }

    #[test]
    fn test_mention_key_highlighting() {
        // Arrange
        let options = plain_options().with_mention_keys(vec![MentionKey::new("Alice")]);

        // Act
        let html = do_format_text("hey alice, and malice", &options);

        // Assert
        assert_eq!(
            html,
            "hey <span class=\"mention--highlight\">alice</span>, and malice"
        );
    }

    #[test]
    fn test_case_sensitive_mention_key() {
        let options = plain_options().with_mention_keys(vec![MentionKey::case_sensitive("Ops")]);
        let html = do_format_text("ops and Ops", &options);
        assert_eq!(
            html,
            "ops and <span class=\"mention--highlight\">Ops</span>"
        );
    }

    #[test]
    fn test_replace_tokens_newest_first() {
        // Arrange
        let mut tokens = Tokens::new();
        let first = tokens.push("A", "<i>one</i>".to_string(), "one".to_string());
        let second = tokens.push("B", "<b>two</b>".to_string(), "two".to_string());
        let text = format!("{first} and {second}");

        // Act
        let output = replace_tokens(&text, &tokens);

        // Assert
        assert_eq!(output, "<i>one</i> and <b>two</b>");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.get(&first).map(|t| t.original_text.as_str()), Some("one"));
    }

    #[test]
    fn test_replace_tokens_empty_map_is_identity() {
        let tokens = Tokens::new();
        assert!(tokens.is_empty());
        assert_eq!(replace_tokens("x &lt; y", &tokens), "x &lt; y");
    }

    #[test]
    fn test_cjk_search_term_matches_inside_words() {
        // Arrange
        let pattern = SearchPattern::from_term("日本*").expect("valid term");

        // Act
        let mut tokens = Tokens::new();
        let output = highlight_search_terms("私は日本語", &mut tokens, &[pattern]);

        // Assert
        assert_eq!(
            replace_tokens(&output, &tokens),
            "私は<span class=\"search-highlight\">日本</span>語"
        );
    }

    #[test]
    fn test_search_term_never_splits_entities() {
        // Arrange
        let options = plain_options().with_search_patterns(vec![
            SearchPattern::from_term("39").expect("valid term"),
            SearchPattern::from_term("amp").expect("valid term"),
        ]);

        // Act
        let html = do_format_text("it's 39 degrees, Tom & Jerry", &options);

        // Assert
        assert_eq!(
            html,
            "it&#39;s <span class=\"search-highlight\">39</span> degrees, Tom &amp; Jerry"
        );
    }

    #[test]
    fn test_mention_key_never_splits_entities() {
        let options = plain_options().with_mention_keys(vec![MentionKey::new("quot")]);
        let html = do_format_text("say \"quot\"", &options);
        assert_eq!(
            html,
            "say &quot;<span class=\"mention--highlight\">quot</span>&quot;"
        );
    }

    #[test]
    fn test_literal_alias_text_stays_literal() {
        // Act
        let html = do_format_text("$MM_HASHTAG0$ #release", &plain_options());

        // Assert
        assert_eq!(
            html,
            "$MM_HASHTAG0$ <a class=\"mention-link\" href=\"#\" data-hashtag=\"#release\">#release</a>"
        );
    }

    #[test]
    fn test_prefix_search_does_not_match_inside_aliases() {
        // Arrange
        let pattern = SearchPattern::from_term("mm*").expect("valid term");
        let options = plain_options().with_search_patterns(vec![pattern]);

        // Act
        let html = do_format_text("#release mm", &options);

        // Assert
        assert_eq!(
            html,
            "<a class=\"mention-link\" href=\"#\" data-hashtag=\"#release\">#release</a> <span class=\"search-highlight\">mm</span>"
        );
    }

    #[test]
    fn test_alias_characters_are_stripped_from_input() {
        // Arrange
        let mut tokens = Tokens::new();
        let forged = tokens.push("HASHTAG", "<b>x</b>".to_string(), "x".to_string());

        // Act
        let html = do_format_text(&format!("a{forged}b"), &plain_options());

        // Assert
        assert_eq!(html, "ab");
    }
}
