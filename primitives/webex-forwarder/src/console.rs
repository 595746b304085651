//! Terminal styling for the interactive prompts.

use colored::Colorize;

pub fn question(text: &str) -> String {
    format!("? {text} > ").bold().to_string()
}

pub fn answer(text: &str) -> String {
    format!("! {text}").bright_green().to_string()
}

pub fn error(text: &str) -> String {
    format!("ERROR: {text}").bright_red().to_string()
}

/// Welcome banner shown before the first prompt.
pub fn banner() -> String {
    let title = format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let about = env!("CARGO_PKG_DESCRIPTION");
    let width = title.len().max(about.len()) + 4;
    let rule = "=".repeat(width);

    format!(
        "{rule}\n  {}\n  {about}\n{rule}",
        title.bright_cyan().bold()
    )
}
