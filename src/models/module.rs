// Module model - tagged union over the fixed set of module types
//
// Candidate objects coming out of extraction are plain JSON values; they only
// become typed `Module`s after validation. Deserialization is deliberately
// lenient: unknown or malformed payloads demote to the `Unknown` variant
// instead of failing the whole document read, and the legacy `name -> detail`
// mapping shape is normalized to a sequence.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// The fixed enumeration of module types, with an open fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Form,
    Table,
    Api,
    Chart,
    Auth,
    Database,
    Config,
    Page,
    Component,
    Unknown,
}

impl ModuleKind {
    /// Parse a type tag. Unrecognized tags map to `Unknown` rather than
    /// erroring; the enumeration is open on the read side.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "form" => ModuleKind::Form,
            "table" => ModuleKind::Table,
            "api" => ModuleKind::Api,
            "chart" => ModuleKind::Chart,
            "auth" => ModuleKind::Auth,
            "database" => ModuleKind::Database,
            "config" => ModuleKind::Config,
            "page" => ModuleKind::Page,
            "component" => ModuleKind::Component,
            _ => ModuleKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Form => "form",
            ModuleKind::Table => "table",
            ModuleKind::Api => "api",
            ModuleKind::Chart => "chart",
            ModuleKind::Auth => "auth",
            ModuleKind::Database => "database",
            ModuleKind::Config => "config",
            ModuleKind::Page => "page",
            ModuleKind::Component => "component",
            ModuleKind::Unknown => "unknown",
        }
    }

    /// Name of the type-specific payload field this kind requires, if any
    pub fn required_payload_field(&self) -> Option<&'static str> {
        match self {
            ModuleKind::Form => Some("fields"),
            ModuleKind::Table => Some("columns"),
            ModuleKind::Api => Some("endpoints"),
            ModuleKind::Chart => Some("chart_config"),
            ModuleKind::Auth => Some("auth_config"),
            ModuleKind::Database => Some("tables"),
            ModuleKind::Config => Some("settings"),
            ModuleKind::Page => Some("layout"),
            ModuleKind::Component => Some("component_config"),
            ModuleKind::Unknown => None,
        }
    }

    /// Whether the payload field is a sequence (and must be non-empty),
    /// as opposed to a map
    pub fn payload_is_sequence(&self) -> bool {
        matches!(
            self,
            ModuleKind::Form
                | ModuleKind::Table
                | ModuleKind::Api
                | ModuleKind::Database
                | ModuleKind::Config
        )
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Payload element types
// ============================================================================

/// One input field of a form module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub label: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
}

/// One column of a table module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

/// One endpoint of an api module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Type-specific payload, one variant per module kind
#[derive(Debug, Clone, PartialEq)]
pub enum ModulePayload {
    Form { fields: Vec<FormField> },
    Table { columns: Vec<TableColumn> },
    Api { endpoints: Vec<ApiEndpoint> },
    Chart { chart_config: Map<String, Value> },
    Auth { auth_config: Map<String, Value> },
    Database { tables: Vec<Value> },
    Config { settings: Vec<Value> },
    Page { layout: Map<String, Value> },
    Component { component_config: Map<String, Value> },
    /// Unrecognized type tag or malformed payload; keeps the raw fields so
    /// nothing is lost on a round trip
    Unknown { kind: String, extra: Map<String, Value> },
}

impl ModulePayload {
    pub fn kind(&self) -> ModuleKind {
        match self {
            ModulePayload::Form { .. } => ModuleKind::Form,
            ModulePayload::Table { .. } => ModuleKind::Table,
            ModulePayload::Api { .. } => ModuleKind::Api,
            ModulePayload::Chart { .. } => ModuleKind::Chart,
            ModulePayload::Auth { .. } => ModuleKind::Auth,
            ModulePayload::Database { .. } => ModuleKind::Database,
            ModulePayload::Config { .. } => ModuleKind::Config,
            ModulePayload::Page { .. } => ModuleKind::Page,
            ModulePayload::Component { .. } => ModuleKind::Component,
            ModulePayload::Unknown { .. } => ModuleKind::Unknown,
        }
    }

    /// The type tag to serialize; `Unknown` keeps whatever tag it carried
    pub fn kind_str(&self) -> &str {
        match self {
            ModulePayload::Unknown { kind, .. } => kind,
            other => other.kind().as_str(),
        }
    }
}

// ============================================================================
// Module
// ============================================================================

/// A single functional unit inside a structure document
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,
    pub payload: ModulePayload,
}

impl Module {
    pub fn kind(&self) -> ModuleKind {
        self.payload.kind()
    }

    /// Required fields (per the module-schema contract) that this module is
    /// missing. A well-formed module returns an empty list.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if self.id.trim().is_empty() {
            missing.push("id");
        }
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        match &self.payload {
            ModulePayload::Form { fields } if fields.is_empty() => missing.push("fields"),
            ModulePayload::Table { columns } if columns.is_empty() => missing.push("columns"),
            ModulePayload::Api { endpoints } if endpoints.is_empty() => missing.push("endpoints"),
            ModulePayload::Database { tables } if tables.is_empty() => missing.push("tables"),
            ModulePayload::Config { settings } if settings.is_empty() => missing.push("settings"),
            // map payloads only need to exist, which the variant guarantees;
            // unknown kinds have no payload requirement
            _ => {}
        }
        missing
    }

    /// Build a module from a plain JSON object.
    ///
    /// Lenient by design: `name` is accepted as a title alias, missing ids
    /// derive from the title (or `fallback_id`), and payloads that do not
    /// match their declared type demote to `Unknown` instead of erroring.
    /// Only a non-object input is an error.
    pub fn from_value(value: &Value, fallback_id: &str) -> Result<Module, String> {
        match value.as_object() {
            Some(obj) => Ok(Module::from_object(obj, fallback_id)),
            None => Err(format!("module is not an object: {}", value)),
        }
    }

    /// Build a module from an already-unwrapped object; cannot fail
    pub fn from_object(obj: &Map<String, Value>, fallback_id: &str) -> Module {
        let title = string_field(obj, "title")
            .or_else(|| string_field(obj, "name"))
            .unwrap_or_default();
        let id = string_field(obj, "id").unwrap_or_else(|| {
            if title.is_empty() {
                fallback_id.to_string()
            } else {
                slug(&title)
            }
        });
        let description = string_field(obj, "description")
            .or_else(|| string_field(obj, "detail"))
            .unwrap_or_default();
        let kind_tag = string_field(obj, "type").unwrap_or_else(|| "unknown".to_string());

        let payload = parse_payload(&kind_tag, obj);
        Module {
            id,
            title,
            description,
            payload,
        }
    }

    /// Convert back to a plain JSON object (the canonical serialized shape)
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        obj.insert(
            "type".to_string(),
            Value::String(self.payload.kind_str().to_string()),
        );
        obj.insert("title".to_string(), Value::String(self.title.clone()));
        if !self.description.is_empty() {
            obj.insert(
                "description".to_string(),
                Value::String(self.description.clone()),
            );
        }
        match &self.payload {
            ModulePayload::Form { fields } => {
                obj.insert("fields".to_string(), to_json(fields));
            }
            ModulePayload::Table { columns } => {
                obj.insert("columns".to_string(), to_json(columns));
            }
            ModulePayload::Api { endpoints } => {
                obj.insert("endpoints".to_string(), to_json(endpoints));
            }
            ModulePayload::Chart { chart_config } => {
                obj.insert("chart_config".to_string(), Value::Object(chart_config.clone()));
            }
            ModulePayload::Auth { auth_config } => {
                obj.insert("auth_config".to_string(), Value::Object(auth_config.clone()));
            }
            ModulePayload::Database { tables } => {
                obj.insert("tables".to_string(), Value::Array(tables.clone()));
            }
            ModulePayload::Config { settings } => {
                obj.insert("settings".to_string(), Value::Array(settings.clone()));
            }
            ModulePayload::Page { layout } => {
                obj.insert("layout".to_string(), Value::Object(layout.clone()));
            }
            ModulePayload::Component { component_config } => {
                obj.insert(
                    "component_config".to_string(),
                    Value::Object(component_config.clone()),
                );
            }
            ModulePayload::Unknown { extra, .. } => {
                for (k, v) in extra {
                    obj.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }
        Value::Object(obj)
    }
}

fn to_json<T: Serialize>(items: &[T]) -> Value {
    serde_json::to_value(items).unwrap_or(Value::Array(vec![]))
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Derive a stable id from a human-readable name
pub(crate) fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed = out.trim_end_matches('-').to_string();
    if trimmed.is_empty() {
        "module".to_string()
    } else {
        trimmed
    }
}

fn parse_payload(kind_tag: &str, obj: &Map<String, Value>) -> ModulePayload {
    let kind = ModuleKind::parse(kind_tag);
    let typed = match kind {
        ModuleKind::Form => obj
            .get("fields")
            .and_then(|v| serde_json::from_value::<Vec<FormField>>(v.clone()).ok())
            .map(|fields| ModulePayload::Form { fields }),
        ModuleKind::Table => obj
            .get("columns")
            .and_then(|v| serde_json::from_value::<Vec<TableColumn>>(v.clone()).ok())
            .map(|columns| ModulePayload::Table { columns }),
        ModuleKind::Api => obj
            .get("endpoints")
            .and_then(|v| serde_json::from_value::<Vec<ApiEndpoint>>(v.clone()).ok())
            .map(|endpoints| ModulePayload::Api { endpoints }),
        ModuleKind::Chart => obj
            .get("chart_config")
            .and_then(|v| v.as_object())
            .map(|m| ModulePayload::Chart {
                chart_config: m.clone(),
            }),
        ModuleKind::Auth => obj
            .get("auth_config")
            .and_then(|v| v.as_object())
            .map(|m| ModulePayload::Auth {
                auth_config: m.clone(),
            }),
        ModuleKind::Database => obj
            .get("tables")
            .and_then(|v| v.as_array())
            .map(|a| ModulePayload::Database { tables: a.clone() }),
        ModuleKind::Config => obj
            .get("settings")
            .and_then(|v| v.as_array())
            .map(|a| ModulePayload::Config { settings: a.clone() }),
        ModuleKind::Page => obj
            .get("layout")
            .and_then(|v| v.as_object())
            .map(|m| ModulePayload::Page { layout: m.clone() }),
        ModuleKind::Component => obj
            .get("component_config")
            .and_then(|v| v.as_object())
            .map(|m| ModulePayload::Component {
                component_config: m.clone(),
            }),
        ModuleKind::Unknown => None,
    };

    typed.unwrap_or_else(|| {
        if kind != ModuleKind::Unknown {
            log::debug!(
                "module payload for type '{}' missing or malformed, keeping raw fields",
                kind_tag
            );
        }
        let extra: Map<String, Value> = obj
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "id" | "type" | "title" | "description"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ModulePayload::Unknown {
            kind: kind_tag.to_string(),
            extra,
        }
    })
}

impl Serialize for Module {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Module {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Module::from_value(&value, "module").map_err(serde::de::Error::custom)
    }
}

/// Deserialize the `modules` field of a document, accepting both the
/// canonical sequence and the legacy `name -> detail` mapping.
pub fn deserialize_modules<'de, D>(deserializer: D) -> Result<Vec<Module>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(modules_from_value(&value))
}

/// Normalize any historical `modules` shape into an ordered sequence.
/// Entries that are not objects (or map values that are not strings/objects)
/// are dropped with a warning rather than failing the whole document.
pub fn modules_from_value(value: &Value) -> Vec<Module> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                match Module::from_value(item, &format!("module-{}", i + 1)) {
                    Ok(module) => Some(module),
                    Err(e) => {
                        log::warn!("Dropping malformed module at index {}: {}", i, e);
                        None
                    }
                }
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(name, detail)| legacy_module(name, detail))
            .collect(),
        Value::Null => vec![],
        other => {
            log::warn!("Unexpected modules shape, treating as empty: {}", other);
            vec![]
        }
    }
}

/// Convert one legacy `name -> detail` mapping entry into a module
fn legacy_module(name: &str, detail: &Value) -> Module {
    match detail {
        Value::Object(obj) => {
            let mut body = obj.clone();
            body.entry("title".to_string())
                .or_insert_with(|| Value::String(name.to_string()));
            Module::from_object(&body, &slug(name))
        }
        Value::String(text) => Module {
            id: slug(name),
            title: name.to_string(),
            description: text.clone(),
            payload: ModulePayload::Unknown {
                kind: "unknown".to_string(),
                extra: Map::new(),
            },
        },
        other => {
            log::warn!("Legacy module '{}' has unexpected detail: {}", name, other);
            Module {
                id: slug(name),
                title: name.to_string(),
                description: String::new(),
                payload: ModulePayload::Unknown {
                    kind: "unknown".to_string(),
                    extra: Map::new(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse_known_and_unknown() {
        assert_eq!(ModuleKind::parse("form"), ModuleKind::Form);
        assert_eq!(ModuleKind::parse("TABLE"), ModuleKind::Table);
        assert_eq!(ModuleKind::parse("widget"), ModuleKind::Unknown);
    }

    #[test]
    fn test_required_payload_fields() {
        assert_eq!(ModuleKind::Form.required_payload_field(), Some("fields"));
        assert_eq!(ModuleKind::Chart.required_payload_field(), Some("chart_config"));
        assert_eq!(ModuleKind::Unknown.required_payload_field(), None);
        assert!(ModuleKind::Database.payload_is_sequence());
        assert!(!ModuleKind::Page.payload_is_sequence());
    }

    #[test]
    fn test_form_module_round_trip() {
        let value = json!({
            "id": "login-form",
            "type": "form",
            "title": "Login",
            "description": "Sign-in form",
            "fields": [
                {"label": "Email", "name": "email", "type": "text", "required": true}
            ]
        });

        let module = Module::from_value(&value, "m-1").unwrap();
        assert_eq!(module.kind(), ModuleKind::Form);
        match &module.payload {
            ModulePayload::Form { fields } => {
                assert_eq!(fields.len(), 1);
                assert!(fields[0].required);
            }
            other => panic!("expected form payload, got {:?}", other),
        }

        assert_eq!(module.to_value(), value);
    }

    #[test]
    fn test_unknown_type_keeps_raw_fields() {
        let value = json!({
            "id": "w-1",
            "type": "widget",
            "title": "Gadget",
            "knobs": [1, 2, 3]
        });

        let module = Module::from_value(&value, "m-1").unwrap();
        assert_eq!(module.kind(), ModuleKind::Unknown);
        let out = module.to_value();
        assert_eq!(out["type"], "widget");
        assert_eq!(out["knobs"], json!([1, 2, 3]));
    }

    #[test]
    fn test_malformed_payload_demotes_to_unknown() {
        // declared form, but fields is not a list of field objects
        let value = json!({
            "id": "f-1",
            "type": "form",
            "title": "Broken",
            "fields": "not a list"
        });

        let module = Module::from_value(&value, "m-1").unwrap();
        assert_eq!(module.payload.kind(), ModuleKind::Unknown);
        assert_eq!(module.payload.kind_str(), "form");
    }

    #[test]
    fn test_missing_required_fields() {
        let ok = Module::from_value(
            &json!({
                "id": "t-1", "type": "table", "title": "People",
                "columns": [{"key": "name", "label": "Name", "type": "text"}]
            }),
            "m-1",
        )
        .unwrap();
        assert!(ok.missing_required_fields().is_empty());

        let empty_fields = Module::from_value(
            &json!({"id": "f-1", "type": "form", "title": "Empty", "fields": []}),
            "m-1",
        )
        .unwrap();
        assert_eq!(empty_fields.missing_required_fields(), vec!["fields"]);

        let untitled = Module::from_value(&json!({"id": "x", "type": "page", "layout": {}}), "m-1")
            .unwrap();
        assert_eq!(untitled.missing_required_fields(), vec!["title"]);
    }

    #[test]
    fn test_name_alias_and_id_fallback() {
        let value = json!({"name": "User List", "detail": "shows users"});
        let module = Module::from_value(&value, "module-3").unwrap();
        assert_eq!(module.title, "User List");
        assert_eq!(module.id, "user-list");
        assert_eq!(module.description, "shows users");
    }

    #[test]
    fn test_modules_from_value_array_drops_garbage() {
        let value = json!([
            {"id": "a", "type": "page", "title": "Home", "layout": {}},
            42,
            {"id": "b", "type": "page", "title": "About", "layout": {}}
        ]);
        let modules = modules_from_value(&value);
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[1].id, "b");
    }

    #[test]
    fn test_legacy_mapping_with_object_detail() {
        let value = json!({
            "ログイン": "サインイン処理",
            "reports": {"type": "table", "title": "Reports", "columns": [
                {"key": "month", "label": "Month", "type": "text"}
            ]}
        });
        let modules = modules_from_value(&value);
        assert_eq!(modules.len(), 2);

        let reports = modules.iter().find(|m| m.id == "reports").unwrap();
        assert_eq!(reports.kind(), ModuleKind::Table);

        let login = modules.iter().find(|m| m.title == "ログイン").unwrap();
        assert_eq!(login.description, "サインイン処理");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("User List"), "user-list");
        assert_eq!(slug("  API / v2  "), "api-v2");
        assert_eq!(slug("---"), "module");
    }
}
