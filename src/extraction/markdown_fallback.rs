// Markdown fallback - last-resort conversion of a markdown-shaped reply
// into a structure candidate when no JSON could be recovered
//
// The output is a plain JSON object (title, description, content sections),
// never typed modules; validation decides what it is worth downstream.

use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkdownFallbackError {
    #[error("Text has no '##' section headings, markdown fallback cannot apply")]
    NoSections,
}

static TITLE_PATTERN: OnceLock<Regex> = OnceLock::new();
static SECTION_PATTERN: OnceLock<Regex> = OnceLock::new();

fn title_pattern() -> &'static Regex {
    // exactly one '#': the next char must not be another '#'
    TITLE_PATTERN.get_or_init(|| Regex::new(r"(?m)^#[ \t]+(.+)$").unwrap())
}

fn section_pattern() -> &'static Regex {
    SECTION_PATTERN.get_or_init(|| Regex::new(r"(?m)^##[ \t]+(.+)$").unwrap())
}

/// Build a structure candidate from markdown headings.
///
/// `# Heading` becomes the title, a `## 説明` or `## description` section
/// becomes the description, and every other `##` section becomes an entry in
/// `content` keyed by the section name. Bulleted lines become `item_N`
/// entries, plain lines `paragraph_N`. Fails only when the text has no `##`
/// sections at all.
pub fn from_markdown(text: &str) -> Result<Value, MarkdownFallbackError> {
    let sections = collect_sections(text);
    if sections.is_empty() {
        return Err(MarkdownFallbackError::NoSections);
    }

    let title = title_pattern()
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    let mut description = String::new();
    let mut content = Map::new();

    for (name, body) in sections {
        if is_description_heading(&name) {
            description = body.trim().to_string();
        } else {
            content.insert(name, section_to_value(&body));
        }
    }

    log::debug!(
        "Markdown fallback produced {} content section(s)",
        content.len()
    );

    Ok(json!({
        "title": title,
        "description": description,
        "content": Value::Object(content),
    }))
}

fn is_description_heading(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == "description" || name == "説明" || name == "概要"
}

/// Split the text into (section name, section body) pairs, body running
/// until the next `##` heading or end of text
fn collect_sections(text: &str) -> Vec<(String, String)> {
    let matches: Vec<_> = section_pattern().captures_iter(text).collect();
    let positions: Vec<_> = section_pattern().find_iter(text).collect();

    let mut sections = Vec::with_capacity(matches.len());
    for (i, caps) in matches.iter().enumerate() {
        let name = caps[1].trim().to_string();
        let body_start = positions[i].end();
        let body_end = positions
            .get(i + 1)
            .map(|m| m.start())
            .unwrap_or(text.len());
        sections.push((name, text[body_start..body_end].to_string()));
    }
    sections
}

/// Convert a section body into a map of item_N / paragraph_N entries.
/// Bulleted lines become individual items; prose becomes one paragraph per
/// blank-line-separated chunk, not one per line.
fn section_to_value(body: &str) -> Value {
    let mut entries = Map::new();
    let mut item_count = 0;
    let mut paragraph_count = 0;

    for chunk in body.split("\n\n") {
        let mut prose = vec![];
        for line in chunk.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(rest) = bullet_text(trimmed) {
                item_count += 1;
                entries.insert(
                    format!("item_{}", item_count),
                    Value::String(rest.to_string()),
                );
            } else {
                prose.push(trimmed);
            }
        }
        if !prose.is_empty() {
            paragraph_count += 1;
            entries.insert(
                format!("paragraph_{}", paragraph_count),
                Value::String(prose.join("\n")),
            );
        }
    }

    Value::Object(entries)
}

fn bullet_text(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "・"] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_become_title_and_sections() {
        let md = "# タスク管理アプリ\n\n## 説明\n毎日のタスクを管理する。\n\n## 主要機能\n- タスク追加\n- タスク削除\n";
        let value = from_markdown(md).unwrap();
        assert_eq!(value["title"], "タスク管理アプリ");
        assert_eq!(value["description"], "毎日のタスクを管理する。");
        assert_eq!(value["content"]["主要機能"]["item_1"], "タスク追加");
        assert_eq!(value["content"]["主要機能"]["item_2"], "タスク削除");
    }

    #[test]
    fn test_english_description_heading() {
        let md = "# App\n\n## Description\nA small app.\n\n## Screens\nHome screen first.\n\nSettings after.\n";
        let value = from_markdown(md).unwrap();
        assert_eq!(value["description"], "A small app.");
        assert_eq!(value["content"]["Screens"]["paragraph_1"], "Home screen first.");
        assert_eq!(value["content"]["Screens"]["paragraph_2"], "Settings after.");
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines_not_line_breaks() {
        let md = "# App\n\n## Screens\nHome screen first.\nIt has a list.\n\nSettings after.\n";
        let value = from_markdown(md).unwrap();
        let screens = value["content"]["Screens"].as_object().unwrap();
        assert_eq!(screens.len(), 2);
        assert_eq!(
            screens["paragraph_1"],
            "Home screen first.\nIt has a list."
        );
        assert_eq!(screens["paragraph_2"], "Settings after.");
    }

    #[test]
    fn test_no_sections_is_an_error() {
        assert_eq!(
            from_markdown("just some prose\nwith no headings"),
            Err(MarkdownFallbackError::NoSections)
        );
        // a lone title without sections is still a failure
        assert_eq!(
            from_markdown("# Title only"),
            Err(MarkdownFallbackError::NoSections)
        );
    }

    #[test]
    fn test_title_is_optional() {
        let md = "## features\n- one\n";
        let value = from_markdown(md).unwrap();
        assert_eq!(value["title"], "");
        assert_eq!(value["content"]["features"]["item_1"], "one");
    }
}
