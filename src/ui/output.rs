use crate::symbol::ContextItem;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn header(text: &str) {
    println!("{} {}", Icons::MAG, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("{} {}", Icons::STATS, title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn file_heading(path: &Path) {
    println!();
    println!("{} {}", Icons::FILE, path.display().style(theme().header.clone()));
}

/// `kind name L3-7`, prefixed with the file when items from several files are mixed.
pub fn item_heading(item: &ContextItem, path: Option<&Path>) {
    let location = match path {
        Some(path) => format!("{}:{}-{}", path.display(), item.range.start_line, item.range.end_line),
        None => format!("L{}-{}", item.range.start_line, item.range.end_line),
    };
    println!(
        "  {} {} {}",
        item.kind.style(theme().kind.clone()),
        item.qualified_name.style(theme().name.clone()),
        muted(&location)
    );
}

/// Excerpt text with a line-number gutter.
pub fn excerpt(item: &ContextItem) {
    for (offset, line) in item.text.lines().enumerate() {
        let number = format!("{:>5} │", item.range.start_line + offset);
        println!("  {} {}", muted(&number), line);
    }
}

pub fn outline_row(depth: usize, item: &ContextItem) {
    println!(
        "{}{} {} {}",
        "  ".repeat(depth + 1),
        item.kind.style(theme().kind.clone()),
        item.qualified_name.style(theme().name.clone()),
        muted(&format!("L{}-{}", item.range.start_line, item.range.end_line))
    );
}

pub fn include_row(include: &str, resolved: Option<&Path>) {
    match resolved {
        Some(path) => println!(
            "  {} {} {} {}",
            Icons::LINK,
            include.style(theme().name.clone()),
            dim("->"),
            path.display()
        ),
        None => println!(
            "  {} {} {}",
            Icons::CROSS,
            include.style(theme().name.clone()),
            "unresolved".style(theme().warn.clone())
        ),
    }
}
