use anyhow::{Context, Result};
use chatmark::{Config, MarkdownRenderer};
use std::fs;
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Config::parse();

    // --verbose enables DEBUG, otherwise RUST_LOG or WARN
    let filter = if config.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    config.validate().context("Invalid configuration")?;
    let formatting = config.formatting_options()?;

    let markdown = if config.reads_stdin() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read markdown from stdin")?;
        buffer
    } else {
        fs::read_to_string(&config.input)
            .with_context(|| format!("Failed to read {}", config.input.display()))?
    };

    let html = MarkdownRenderer::new()
        .render(&markdown, &formatting)
        .context("Failed to render markdown")?;

    match &config.output {
        Some(path) => {
            fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = html.len(), "Wrote HTML");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(html.as_bytes())
                .context("Failed to write HTML to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
