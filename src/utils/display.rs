//! Terminal display utilities for CLI table output.
//!
//! Handles terminal width detection and unicode-aware truncation of
//! citation columns.

use std::io::{self, IsTerminal};
use std::sync::OnceLock;
use terminal_size::terminal_size;

/// Default width when terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 100;

/// Terminal information with cached size and capabilities.
#[derive(Debug, Clone)]
pub struct Terminal {
    width: usize,
    is_tty: bool,
}

static TERMINAL_INFO: OnceLock<Terminal> = OnceLock::new();

/// Get the global terminal information, initialized on first call.
pub fn terminal_info() -> &'static Terminal {
    TERMINAL_INFO.get_or_init(|| {
        let width = terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(DEFAULT_WIDTH);

        Terminal {
            width,
            is_tty: io::stdout().is_terminal(),
        }
    })
}

/// Get the current terminal width in characters.
#[inline]
pub fn terminal_width() -> usize {
    terminal_info().width
}

/// Check if stdout is a terminal.
#[inline]
pub fn is_terminal() -> bool {
    terminal_info().is_tty
}

fn char_width(c: char) -> usize {
    unicode_width::UnicodeWidthChar::width(c).unwrap_or(1)
}

/// Truncate text to fit within the specified width using unicode-aware truncation.
///
/// # Examples
///
/// ```
/// use citation_registry::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let total_width: usize = text.chars().map(char_width).sum();
    if total_width <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut current_width = 0;
    let truncated: String = text
        .chars()
        .take_while(|c| {
            current_width += char_width(*c);
            current_width <= budget
        })
        .collect();

    format!("{}...", truncated)
}

/// Truncate text at the last word boundary that fits, falling back to
/// [`truncate_with_ellipsis`].
pub fn truncate_at_word(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let total_width: usize = text.chars().map(char_width).sum();
    if total_width <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut width = 0;
    let mut last_space = None;
    for (i, c) in text.char_indices() {
        if c == ' ' {
            last_space = Some(i);
        }
        width += char_width(c);
        if width > budget {
            break;
        }
    }

    match last_space {
        Some(idx) if idx > 0 => format!("{}...", text[..idx].trim_end()),
        _ => truncate_with_ellipsis(text, max_width),
    }
}

/// Column width configuration for table display.
#[derive(Debug, Clone, Copy)]
pub struct ColumnConfig {
    pub min_width: usize,
    pub max_width: usize,
    pub weight: usize,
}

impl ColumnConfig {
    /// Create a new column config with minimum width.
    pub fn new(min_width: usize) -> Self {
        ColumnConfig {
            min_width,
            max_width: usize::MAX,
            weight: 1,
        }
    }

    /// Set the maximum width.
    pub fn max(mut self, max_width: usize) -> Self {
        self.max_width = max_width;
        self
    }

    /// Set the weight for space distribution.
    pub fn weight(mut self, weight: usize) -> Self {
        self.weight = weight;
        self
    }
}

/// Distribute `terminal_width` across columns: every column gets its
/// minimum, the rest is shared by weight up to each column's maximum.
pub fn calculate_column_widths(terminal_width: usize, configs: &[ColumnConfig]) -> Vec<usize> {
    // Borders and padding: 3 characters per column plus one
    let overhead = configs.len() * 3 + 1;
    let available = terminal_width.saturating_sub(overhead);

    let mut widths: Vec<usize> = configs.iter().map(|c| c.min_width).collect();
    let min_sum: usize = widths.iter().sum();
    if min_sum >= available {
        return widths;
    }

    let mut remaining = available - min_sum;
    let total_weight: usize = configs.iter().map(|c| c.weight).sum();
    if total_weight == 0 {
        return widths;
    }

    let snapshot = remaining;
    for (width, config) in widths.iter_mut().zip(configs) {
        let share = snapshot * config.weight / total_weight;
        let room = config.max_width.saturating_sub(*width);
        let take = share.min(room).min(remaining);
        *width += take;
        remaining -= take;
    }

    widths
}

/// Column widths for the citation table: (authors, year, title, url).
///
/// `title_cap` bounds the title column regardless of terminal width.
pub fn citation_table_columns(terminal_width: usize, title_cap: usize) -> (usize, usize, usize, usize) {
    let configs = [
        ColumnConfig::new(12).max(40).weight(1),
        ColumnConfig::new(4).max(4).weight(0),
        ColumnConfig::new(20).max(title_cap.max(20)).weight(3),
        ColumnConfig::new(12).max(60).weight(1),
    ];
    let widths = calculate_column_widths(terminal_width, &configs);
    (widths[0], widths[1], widths[2], widths[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis_basic() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
    }

    #[test]
    fn test_truncate_with_ellipsis_empty() {
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 0), "");
        assert_eq!(truncate_with_ellipsis("Hello", 1), "...");
    }

    #[test]
    fn test_truncate_at_word() {
        assert_eq!(truncate_at_word("The quick brown fox", 12), "The quick...");
        assert_eq!(truncate_at_word("Short", 12), "Short");
    }

    #[test]
    fn test_column_widths_respect_minimums() {
        let configs = [ColumnConfig::new(30), ColumnConfig::new(30)];
        assert_eq!(calculate_column_widths(40, &configs), vec![30, 30]);
    }

    #[test]
    fn test_citation_table_fits_terminal() {
        let (authors, year, title, url) = citation_table_columns(120, 60);
        assert_eq!(year, 4);
        assert!(title <= 60);
        assert!(authors + year + title + url + 13 <= 120);
    }
}
