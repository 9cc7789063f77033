use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub static DOCUMENT: Emoji<'_, '_> = Emoji("📄 ", "");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "");
pub static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "");
pub static ERROR: Emoji<'_, '_> = Emoji("❌ ", "");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "");

pub fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// First `max_chars` chars of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}

/// `p.3 [450..950)` or `[450..950)` for page-unaware chunks.
pub fn location(page: Option<u32>, start: usize, end: usize) -> String {
    match page {
        Some(page) => format!("p.{page} [{start}..{end})"),
        None => format!("[{start}..{end})"),
    }
}

pub fn print_error(message: &str) {
    eprintln!("{}{}", ERROR, style(message).red());
}
