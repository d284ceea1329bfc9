// JSON extraction - recovers a structure candidate object from free-form
// LLM output
//
// Strategy order, first success wins:
//   1. fenced code blocks (```json or untagged)
//   2. balanced brace-span scan over the whole text, longest span wins
//   3. key repair + bounded reparse loop on the chosen candidate
//   4. markdown heading fallback
// Every stage is heuristic; failures are typed, never panics.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::key_repair::KeyRepairer;
use super::markdown_fallback;
use super::ExtractionError;

const MAX_PARSE_ATTEMPTS: usize = 3;
const EXCERPT_CHARS: usize = 200;

static FENCE_PATTERN: OnceLock<Regex> = OnceLock::new();
static TRUE_PATTERN: OnceLock<Regex> = OnceLock::new();
static FALSE_PATTERN: OnceLock<Regex> = OnceLock::new();
static NONE_PATTERN: OnceLock<Regex> = OnceLock::new();
static STRAY_ESCAPE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn fence_pattern() -> &'static Regex {
    FENCE_PATTERN.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").unwrap())
}

fn true_pattern() -> &'static Regex {
    TRUE_PATTERN.get_or_init(|| Regex::new(r"\bTrue\b").unwrap())
}

fn false_pattern() -> &'static Regex {
    FALSE_PATTERN.get_or_init(|| Regex::new(r"\bFalse\b").unwrap())
}

fn none_pattern() -> &'static Regex {
    NONE_PATTERN.get_or_init(|| Regex::new(r"\bNone\b").unwrap())
}

fn stray_escape_pattern() -> &'static Regex {
    // backslash before a char that is not a valid JSON escape introducer
    STRAY_ESCAPE_PATTERN.get_or_init(|| Regex::new(r#"\\([^"\\/bfnrtu])"#).unwrap())
}

/// Heuristic extractor turning raw model output into a JSON object
pub struct TextToJSONExtractor {
    repairer: KeyRepairer,
}

impl TextToJSONExtractor {
    pub fn new() -> Self {
        Self {
            repairer: KeyRepairer::new(),
        }
    }

    /// Extract the best JSON object candidate from `text`
    pub fn extract(&self, text: &str) -> Result<Value, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyInput);
        }

        let normalized = normalize_whitespace(text);

        // fenced blocks first: an explicit ```json fence is the strongest
        // signal the model gave us
        for block in fenced_blocks(&normalized) {
            if let Some(candidate) = longest_span(&block) {
                log::debug!("Trying fenced-block candidate ({} chars)", candidate.len());
                if let Ok(value) = self.parse_candidate(candidate) {
                    return Ok(value);
                }
            }
        }

        // whole-text scan
        if let Some(candidate) = longest_span(&normalized) {
            log::debug!("Trying whole-text candidate ({} chars)", candidate.len());
            match self.parse_candidate(candidate) {
                Ok(value) => return Ok(value),
                Err(detail) => {
                    // markdown may still rescue this reply
                    if let Ok(value) = markdown_fallback::from_markdown(text) {
                        log::info!("JSON candidate unparseable, markdown fallback succeeded");
                        return Ok(value);
                    }
                    return Err(ExtractionError::MalformedJson {
                        detail,
                        excerpt: excerpt(text),
                        candidate: candidate.to_string(),
                    });
                }
            }
        }

        match markdown_fallback::from_markdown(text) {
            Ok(value) => {
                log::info!("No JSON candidate found, markdown fallback succeeded");
                Ok(value)
            }
            Err(_) => Err(ExtractionError::NoJsonFound {
                excerpt: excerpt(text),
            }),
        }
    }

    /// Repair a candidate and parse it, retrying with progressively more
    /// aggressive fixes. Bounded at three attempts.
    fn parse_candidate(&self, candidate: &str) -> Result<Value, String> {
        let mut current = self.repairer.repair(candidate);
        let mut last_error = String::new();

        for attempt in 1..=MAX_PARSE_ATTEMPTS {
            match serde_json::from_str::<Value>(&current) {
                Ok(value) if value.is_object() => return Ok(value),
                Ok(other) => {
                    return Err(format!("candidate parsed but is not an object: {}", other))
                }
                Err(e) => {
                    last_error = e.to_string();
                    log::debug!("Parse attempt {} failed: {}", attempt, last_error);
                }
            }
            let fixed = match attempt {
                1 => fix_python_literals(&current),
                2 => fix_stray_escapes(&current),
                _ => break,
            };
            if fixed == current {
                // fix did nothing, the next attempt would fail identically
                current = fixed;
                continue;
            }
            current = fixed;
        }

        Err(last_error)
    }
}

impl Default for TextToJSONExtractor {
    fn default() -> Self {
        TextToJSONExtractor::new()
    }
}

/// First `EXCERPT_CHARS` chars of the input, for error reporting
pub(crate) fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Cosmetic whitespace cleanup outside string literals: runs of whitespace
/// adjacent to structural characters vanish, other runs collapse to a single
/// space. Content inside string literals is copied through untouched.
fn normalize_whitespace(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            let mut end = i;
            while end < chars.len() && chars[end].is_whitespace() {
                end += 1;
            }
            let prev_structural = out.chars().next_back().map(is_structural).unwrap_or(true);
            let next_structural = end < chars.len() && is_structural(chars[end]);
            if !(prev_structural || next_structural) {
                // keep one newline so heading-based fallbacks still work
                if chars[i..end].contains(&'\n') {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            i = end;
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

fn is_structural(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']' | ':' | ',')
}

/// All fenced code block bodies, in order of appearance
fn fenced_blocks(text: &str) -> Vec<String> {
    fence_pattern()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Scan for balanced `{...}` spans (string and escape aware) and return the
/// longest one; on equal lengths the earliest wins. Nested objects are not
/// reported separately unless their enclosing braces never balance.
fn longest_span(text: &str) -> Option<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut best: Option<(usize, usize)> = None;
    let mut i = 0;

    while i < chars.len() {
        if chars[i].1 == '{' {
            if let Some(close) = matching_close(&chars, i) {
                let start_byte = chars[i].0;
                let end_byte = chars[close].0 + 1; // '}' is one byte
                let len = end_byte - start_byte;
                let better = match best {
                    Some((s, e)) => len > e - s,
                    None => true,
                };
                if better {
                    best = Some((start_byte, end_byte));
                }
                i = close + 1;
                continue;
            }
        }
        i += 1;
    }

    best.map(|(s, e)| &text[s..e])
}

/// Index of the `}` balancing the `{` at `open`, if the span ever closes
fn matching_close(chars: &[(usize, char)], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = open;

    while i < chars.len() {
        let c = chars[i].1;
        if in_string {
            match c {
                '\\' => i += 1,
                '"' => in_string = false,
                _ => {}
            }
        } else {
            match c {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Translate Python-style literals into their JSON forms
fn fix_python_literals(text: &str) -> String {
    let out = true_pattern().replace_all(text, "true");
    let out = false_pattern().replace_all(&out, "false");
    none_pattern().replace_all(&out, "null").into_owned()
}

/// Drop backslashes that do not introduce a valid JSON escape
fn fix_stray_escapes(text: &str) -> String {
    stray_escape_pattern().replace_all(text, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(text: &str) -> Result<Value, ExtractionError> {
        TextToJSONExtractor::new().extract(text)
    }

    #[test]
    fn test_clean_json_passes_through() {
        let value = extract(r#"{"title": "App", "modules": []}"#).unwrap();
        assert_eq!(value["title"], "App");
    }

    #[test]
    fn test_prose_wrapped_json() {
        let text = "Sure! Here is the structure you asked for:\n\n{\"title\": \"Todo\", \"modules\": []}\n\nLet me know if you need changes.";
        let value = extract(text).unwrap();
        assert_eq!(value["title"], "Todo");
    }

    #[test]
    fn test_fenced_block_wins_over_prose_braces() {
        let text = "Some context {not json here}\n```json\n{\"title\": \"Fenced\", \"modules\": []}\n```\n";
        let value = extract(text).unwrap();
        assert_eq!(value["title"], "Fenced");
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n{\"title\": \"Plain fence\", \"modules\": []}\n```";
        let value = extract(text).unwrap();
        assert_eq!(value["title"], "Plain fence");
    }

    #[test]
    fn test_unquoted_keys_are_repaired() {
        let text = r#"構成: {title: "メモ帳", modules: [{id: "m1", type: "page", title: "Home", layout: {}}]}"#;
        let value = extract(text).unwrap();
        assert_eq!(value["title"], "メモ帳");
        assert_eq!(value["modules"][0]["type"], "page");
    }

    #[test]
    fn test_python_literals_are_translated() {
        let text = r#"{"title": "X", "active": True, "legacy": None, "hidden": False}"#;
        let value = extract(text).unwrap();
        assert_eq!(value["active"], json!(true));
        assert_eq!(value["legacy"], json!(null));
        assert_eq!(value["hidden"], json!(false));
    }

    #[test]
    fn test_trailing_commas_are_stripped() {
        let text = r#"{"title": "X", "modules": [{"id": "a", "type": "page", "title": "A", "layout": {},},],}"#;
        let value = extract(text).unwrap();
        assert_eq!(value["modules"][0]["id"], "a");
    }

    #[test]
    fn test_truncated_outer_falls_back_to_complete_inner() {
        // outer object never closes; the complete inner object is recovered
        let text = r#"{"wrapper": "oops", "inner": {"title": "Inner", "modules": []}"#;
        let value = extract(text).unwrap();
        assert_eq!(value["title"], "Inner");
    }

    #[test]
    fn test_longest_span_wins() {
        let text = r#"small {"a": 1} then bigger {"title": "Big", "modules": [1, 2, 3]}"#;
        let value = extract(text).unwrap();
        assert_eq!(value["title"], "Big");
    }

    #[test]
    fn test_equal_length_spans_pick_first() {
        let text = r#"{"pick": 1} and {"pick": 2}"#;
        let value = extract(text).unwrap();
        assert_eq!(value["pick"], json!(1));
    }

    #[test]
    fn test_empty_object_extracts() {
        let value = extract("the result is {} apparently").unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(extract("   \n\t "), Err(ExtractionError::EmptyInput)));
    }

    #[test]
    fn test_no_json_reports_excerpt() {
        let text = "x".repeat(500);
        match extract(&text) {
            Err(ExtractionError::NoJsonFound { excerpt }) => {
                assert_eq!(excerpt.chars().count(), 200);
            }
            other => panic!("expected NoJsonFound, got {:?}", other),
        }
    }

    #[test]
    fn test_markdown_fallback_engages() {
        let md = "# My App\n\n## description\nAn app.\n\n## features\n- search\n";
        let value = extract(md).unwrap();
        assert_eq!(value["title"], "My App");
        assert_eq!(value["content"]["features"]["item_1"], "search");
    }

    #[test]
    fn test_unrecoverable_candidate_is_malformed() {
        // braces balance but the contents cannot be made into JSON
        let text = "{: : : totally broken : : :}";
        match extract(text) {
            Err(ExtractionError::MalformedJson { candidate, .. }) => {
                assert!(candidate.starts_with('{'));
            }
            other => panic!("expected MalformedJson, got {:?}", other),
        }
    }

    #[test]
    fn test_string_contents_survive_normalization() {
        let text = "{\"note\":   \"two  spaces   kept\", \"modules\": []}";
        let value = extract(text).unwrap();
        assert_eq!(value["note"], "two  spaces   kept");
    }

    #[test]
    fn test_round_trip() {
        let original = json!({
            "title": "Round Trip",
            "modules": [
                {"id": "m1", "type": "form", "title": "F", "fields": [
                    {"label": "L", "name": "n", "type": "text", "required": false}
                ]}
            ]
        });
        let serialized = serde_json::to_string_pretty(&original).unwrap();
        let value = extract(&serialized).unwrap();
        assert_eq!(value, original);
    }
}
