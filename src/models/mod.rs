// Structure document models - canonical type definitions for the persisted
// structure documents and their embedded records

pub mod completeness;
pub mod module;

pub use completeness::{
    can_transition, transition_state, CompletenessState, CompletenessTransitionError,
    CompletenessTrigger,
};
pub use module::{ApiEndpoint, FormField, Module, ModuleKind, ModulePayload, TableColumn};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Provider / Role Enums
// ============================================================================

/// LLM providers the orchestration layer can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Chatgpt,
    Claude,
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Chatgpt => "chatgpt",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chatgpt" | "openai" | "gpt" => Ok(Provider::Chatgpt),
            "claude" => Ok(Provider::Claude),
            "gemini" => Ok(Provider::Gemini),
            _ => Err(format!(
                "Invalid provider: '{}'. Expected 'chatgpt', 'claude', or 'gemini'",
                s
            )),
        }
    }
}

/// Enum for chat message roles with compile-time validation.
/// Serializes/deserializes as lowercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            _ => Err(format!(
                "Invalid message role: '{}'. Expected 'user', 'assistant', or 'system'",
                s
            )),
        }
    }
}

// ============================================================================
// Embedded Records
// ============================================================================

/// Result of one evaluation run against one provider.
/// Appended to the document's evaluation log, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub provider: Provider,
    /// Quality score in [0.0, 1.0]
    pub score: f64,
    pub feedback: String,
    /// Provider-specific metric details
    #[serde(default)]
    pub details: Map<String, Value>,
    pub is_valid: bool,
    pub timestamp: String,
}

/// Outcome status of a completion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Success,
    Failed,
    Error,
    Skipped,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Success => "success",
            CompletionStatus::Failed => "failed",
            CompletionStatus::Error => "error",
            CompletionStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of one completion attempt (success or failure).
/// Appended to the document's completion log, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub provider: Provider,
    pub status: CompletionStatus,
    /// Raw provider output, when any was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Structured object extracted from the output, when extraction succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: String,
}

/// A single chat turn recorded on the document.
/// The message log is append-only from the core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureMessage {
    pub role: MessageRole,
    pub content: String,
    /// Which provider or subsystem produced this turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub timestamp: String,
    /// Optional tag distinguishing e.g. generation turns from evaluation turns
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

// ============================================================================
// Structure Document
// ============================================================================

/// The persisted unit: one app-structure document, stored as one JSON file.
///
/// `id` is set at creation and never changes. `modules` is canonically an
/// ordered sequence; a legacy `name -> detail` mapping still deserializes and
/// is normalized to a sequence (so it serializes back as one).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDocument {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "module::deserialize_modules")]
    pub modules: Vec<Module>,
    /// Free-text narrative sections (target users, main functions, ...) as
    /// produced by conversational generation or the markdown fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Map<String, Value>>,
    #[serde(default)]
    pub evaluations: Vec<EvaluationRecord>,
    #[serde(default)]
    pub completions: Vec<CompletionRecord>,
    #[serde(default)]
    pub messages: Vec<StructureMessage>,
    pub created_at: String,
    pub updated_at: String,
}

impl StructureDocument {
    /// Create a new, empty document with a fresh id
    pub fn new(title: &str, description: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            modules: vec![],
            content: None,
            evaluations: vec![],
            completions: vec![],
            messages: vec![],
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Refresh the updated-at timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().to_rfc3339();
    }

    /// Append a chat turn to the message log
    pub fn add_message(&mut self, role: MessageRole, content: &str, source: Option<&str>) {
        self.messages.push(StructureMessage {
            role,
            content: content.to_string(),
            source: source.map(|s| s.to_string()),
            timestamp: Utc::now().to_rfc3339(),
            message_type: None,
        });
    }

    /// Append an evaluation record
    pub fn record_evaluation(&mut self, record: EvaluationRecord) {
        self.evaluations.push(record);
        self.touch();
    }

    /// Append a completion record
    pub fn record_completion(&mut self, record: CompletionRecord) {
        self.completions.push(record);
        self.touch();
    }

    /// Most recent evaluation, if any run has happened
    pub fn latest_evaluation(&self) -> Option<&EvaluationRecord> {
        self.evaluations.last()
    }
}
