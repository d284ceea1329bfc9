// Structure validation - checks an extracted JSON candidate against the
// document and module schema rules
//
// Validation is deliberately tolerant of partially-good output: a document
// counts as valid when its top level is sound and at least one module passes,
// so a mostly-broken reply with one usable module still gets through.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::ModuleKind;

/// One module that failed its schema checks
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidModule {
    pub index: usize,
    /// Best-effort display name (title, then id, then the index)
    pub name: String,
    pub errors: Vec<String>,
}

/// Outcome of validating one candidate document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    /// Top-level fields that are missing or unusable
    pub missing_fields: Vec<String>,
    pub invalid_modules: Vec<InvalidModule>,
    pub module_count: usize,
    pub valid_module_count: usize,
}

/// Validate a candidate document object
pub fn validate_structure(candidate: &Value) -> ValidationReport {
    let mut missing_fields = vec![];
    let mut invalid_modules = vec![];
    let mut module_count = 0;
    let mut valid_module_count = 0;

    let obj = match candidate.as_object() {
        Some(obj) => obj,
        None => {
            return ValidationReport {
                valid: false,
                missing_fields: vec!["title".to_string(), "modules".to_string()],
                invalid_modules: vec![],
                module_count: 0,
                valid_module_count: 0,
            }
        }
    };

    if non_empty_string(obj, "title").is_none() {
        missing_fields.push("title".to_string());
    }

    match obj.get("modules").and_then(|v| v.as_array()) {
        Some(modules) if !modules.is_empty() => {
            module_count = modules.len();
            for (index, module) in modules.iter().enumerate() {
                let errors = validate_module(module, index);
                if errors.is_empty() {
                    valid_module_count += 1;
                } else {
                    invalid_modules.push(InvalidModule {
                        index,
                        name: module_name(module, index),
                        errors,
                    });
                }
            }
        }
        _ => missing_fields.push("modules".to_string()),
    }

    let valid = missing_fields.is_empty() && valid_module_count > 0;
    if !valid {
        log::debug!(
            "Candidate failed validation: {} missing field(s), {}/{} modules invalid",
            missing_fields.len(),
            invalid_modules.len(),
            module_count
        );
    }

    ValidationReport {
        valid,
        missing_fields,
        invalid_modules,
        module_count,
        valid_module_count,
    }
}

/// Validate a single module object; returns the list of schema errors
/// (empty means the module is well-formed)
pub fn validate_module(module: &Value, index: usize) -> Vec<String> {
    let obj = match module.as_object() {
        Some(obj) => obj,
        None => return vec![format!("module {} is not an object", index + 1)],
    };

    let mut errors = vec![];
    for field in ["id", "type", "title"] {
        if non_empty_string(obj, field).is_none() {
            errors.push(format!("missing required field '{}'", field));
        }
    }

    let kind_tag = non_empty_string(obj, "type").unwrap_or_default();
    let kind = ModuleKind::parse(&kind_tag);

    // unknown types only need the shared fields
    if let Some(payload_field) = kind.required_payload_field() {
        match obj.get(payload_field) {
            None => errors.push(format!("missing '{}' for type '{}'", payload_field, kind_tag)),
            Some(payload) => {
                if kind.payload_is_sequence() {
                    match payload.as_array() {
                        Some(items) if !items.is_empty() => {
                            errors.extend(validate_payload_elements(kind, payload_field, items));
                        }
                        Some(_) => errors.push(format!("'{}' must not be empty", payload_field)),
                        None => errors.push(format!("'{}' must be a sequence", payload_field)),
                    }
                } else if !payload.is_object() {
                    errors.push(format!("'{}' must be a mapping", payload_field));
                }
            }
        }
    }

    errors
}

/// Element-level checks for the sequence payloads that have a fixed
/// per-element shape
fn validate_payload_elements(kind: ModuleKind, field: &str, items: &[Value]) -> Vec<String> {
    let required: &[&str] = match kind {
        ModuleKind::Form => &["label", "name", "type"],
        ModuleKind::Table => &["key", "label", "type"],
        ModuleKind::Api => &["method", "path"],
        // database tables and config settings carry free-form entries
        _ => return vec![],
    };

    let mut errors = vec![];
    for (i, item) in items.iter().enumerate() {
        match item.as_object() {
            Some(obj) => {
                for key in required {
                    if non_empty_string(obj, key).is_none() {
                        errors.push(format!("{}[{}] missing '{}'", field, i, key));
                    }
                }
            }
            None => errors.push(format!("{}[{}] is not an object", field, i)),
        }
    }
    errors
}

fn module_name(module: &Value, index: usize) -> String {
    module
        .get("title")
        .or_else(|| module.get("id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("module {}", index + 1))
}

fn non_empty_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_document() {
        let doc = json!({
            "title": "App",
            "modules": [
                {"id": "m1", "type": "form", "title": "Login", "fields": [
                    {"label": "Email", "name": "email", "type": "text"}
                ]}
            ]
        });
        let report = validate_structure(&doc);
        assert!(report.valid);
        assert_eq!(report.valid_module_count, 1);
        assert!(report.invalid_modules.is_empty());
    }

    #[test]
    fn test_empty_object_is_invalid() {
        let report = validate_structure(&json!({}));
        assert!(!report.valid);
        assert_eq!(report.missing_fields, vec!["title", "modules"]);
    }

    #[test]
    fn test_empty_modules_array_counts_as_missing() {
        let report = validate_structure(&json!({"title": "App", "modules": []}));
        assert!(!report.valid);
        assert_eq!(report.missing_fields, vec!["modules"]);
    }

    #[test]
    fn test_one_valid_module_carries_the_document() {
        let doc = json!({
            "title": "App",
            "modules": [
                {"id": "bad", "type": "form", "title": "Broken"},
                {"id": "ok", "type": "page", "title": "Home", "layout": {}}
            ]
        });
        let report = validate_structure(&doc);
        assert!(report.valid);
        assert_eq!(report.valid_module_count, 1);
        assert_eq!(report.invalid_modules.len(), 1);
        assert_eq!(report.invalid_modules[0].name, "Broken");
    }

    #[test]
    fn test_all_modules_invalid_fails_the_document() {
        let doc = json!({
            "title": "App",
            "modules": [{"id": "bad", "type": "table", "title": "T", "columns": []}]
        });
        let report = validate_structure(&doc);
        assert!(!report.valid);
        assert!(report.missing_fields.is_empty());
    }

    #[test]
    fn test_sequence_payload_rules() {
        let errors = validate_module(
            &json!({"id": "a", "type": "api", "title": "API", "endpoints": [
                {"method": "GET", "path": "/users"},
                {"method": "POST"}
            ]}),
            0,
        );
        assert_eq!(errors, vec!["endpoints[1] missing 'path'"]);
    }

    #[test]
    fn test_map_payload_rules() {
        let ok = validate_module(
            &json!({"id": "c", "type": "chart", "title": "Sales", "chart_config": {}}),
            0,
        );
        assert!(ok.is_empty());

        let bad = validate_module(
            &json!({"id": "c", "type": "chart", "title": "Sales", "chart_config": [1]}),
            0,
        );
        assert_eq!(bad, vec!["'chart_config' must be a mapping"]);
    }

    #[test]
    fn test_unknown_type_needs_only_shared_fields() {
        let errors = validate_module(
            &json!({"id": "w", "type": "widget", "title": "Gadget"}),
            0,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_non_object_module() {
        let errors = validate_module(&json!("nope"), 2);
        assert_eq!(errors, vec!["module 3 is not an object"]);
    }
}
