//! CLI output formatting utilities.

use crate::index::SourceSummary;
use crate::rag::Source;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an indexed document.
    pub fn document_info(summary: &SourceSummary) {
        println!(
            "  {} {} ({} chunks, {} pages, indexed {})",
            style("*").cyan(),
            style(&summary.source).bold(),
            summary.chunk_count,
            summary.pages,
            summary.indexed_at.format("%Y-%m-%d %H:%M")
        );
    }

    /// Print a retrieved passage.
    pub fn passage(source: &Source, max_len: usize) {
        println!(
            "\n{} {} (distance: {:.3})",
            style(">>").green(),
            style(source.citation()).bold(),
            source.distance
        );
        println!("   {}", content_preview(&source.text, max_len));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Flatten whitespace and truncate to `max_chars` with an ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short\ntext", 50), "short text");
        assert_eq!(content_preview("abcdefgh", 4), "abcd...");
        // Never cuts inside a multi-byte char.
        assert_eq!(content_preview("ééééé", 2), "éé...");
    }
}
