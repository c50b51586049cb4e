//! Command line configuration.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;

use crate::formatting::{MentionKey, SearchPattern};
use crate::options::FormattingOptions;

/// Command line configuration for chatmark.
#[derive(Debug, Clone, Parser)]
#[command(name = "chatmark", version, about, long_about = None)]
pub struct Config {
    /// Markdown file to render, `-` for stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Site URL used to detect in-app links
    #[arg(long, default_value = "")]
    pub site_url: String,

    /// Render for single line contexts
    #[arg(long)]
    pub singleline: bool,

    /// Scheme allowed for bare URLs (repeatable or comma separated)
    #[arg(long = "autolink-scheme", value_delimiter = ',')]
    pub autolink_schemes: Vec<String>,

    /// Search term to highlight (repeatable)
    #[arg(long = "search")]
    pub search_terms: Vec<String>,

    /// Word that mentions the reader (repeatable)
    #[arg(long = "mention-key")]
    pub mention_keys: Vec<String>,

    /// Link @mentions
    #[arg(long)]
    pub at_mentions: bool,

    /// Leave :emoticon: names as plain text
    #[arg(long)]
    pub no_emoticons: bool,

    /// Do not highlight mention keys
    #[arg(long)]
    pub no_mention_highlight: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parses configuration from command line arguments.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Validates configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the input file does not exist or a search term is empty.
    pub fn validate(&self) -> Result<()> {
        if !self.reads_stdin() && !self.input.exists() {
            bail!("Input file does not exist: {}", self.input.display());
        }

        if self.search_terms.iter().any(|term| term.trim().is_empty()) {
            bail!("Search terms must not be empty");
        }

        Ok(())
    }

    /// Whether input comes from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }

    /// Builds formatting options from the command line.
    ///
    /// # Errors
    ///
    /// Returns error if a search term cannot be compiled.
    pub fn formatting_options(&self) -> Result<FormattingOptions> {
        let search_patterns = self
            .search_terms
            .iter()
            .map(|term| SearchPattern::from_term(term))
            .collect::<Result<Vec<_>>>()
            .context("Invalid search terms")?;

        let mut options = FormattingOptions::new()
            .with_singleline(self.singleline)
            .with_site_url(self.site_url.trim_end_matches('/'))
            .with_search_patterns(search_patterns)
            .with_at_mentions(self.at_mentions)
            .with_emoticons(!self.no_emoticons)
            .with_mention_highlight(!self.no_mention_highlight)
            .with_mention_keys(self.mention_keys.iter().map(MentionKey::new).collect());

        if !self.autolink_schemes.is_empty() {
            options = options.with_autolinked_url_schemes(self.autolink_schemes.iter().cloned());
        }

        Ok(options)
    }
}
