// Completeness analysis - classifies a structure document as empty,
// incomplete, or complete, and explains what is still missing
//
// Pure functions over the document; nothing here mutates state or talks to
// a provider. The pipeline uses the report to decide whether an automatic
// completion pass is worth running.

use serde::Serialize;
use serde_json::Value;

use crate::models::{CompletenessState, StructureDocument};

/// Minimum latest-evaluation score for a document to count as complete
pub const COMPLETION_SCORE_THRESHOLD: f64 = 0.7;

/// Narrative sections expected in the free-text content map. Documents come
/// from a bilingual corpus, so each section accepts several key spellings.
const NARRATIVE_SECTIONS: &[(&str, &[&str])] = &[
    ("target_users", &["target_users", "対象ユーザー"]),
    ("main_functions", &["main_functions", "主要機能", "機能"]),
    (
        "technical_requirements",
        &["technical_requirements", "技術要件"],
    ),
    ("screens", &["screens", "画面構成", "画面"]),
];

/// One module still missing required fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteModule {
    pub id: String,
    pub title: String,
    pub missing: Vec<String>,
}

/// Classification result for one document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessReport {
    pub state: CompletenessState,
    pub total_modules: usize,
    pub incomplete_modules: Vec<IncompleteModule>,
    /// Document-wide gaps (absent narrative sections)
    pub missing_fields: Vec<String>,
    /// Share of modules with all required fields, rounded to two decimals
    pub completion_rate: f64,
    /// Human-readable summary of what to do next
    pub message: String,
}

/// Classify a document's completeness
pub fn analyze_completeness(doc: &StructureDocument) -> CompletenessReport {
    if doc.modules.is_empty() {
        return CompletenessReport {
            state: CompletenessState::Empty,
            total_modules: 0,
            incomplete_modules: vec![],
            missing_fields: vec![],
            completion_rate: 0.0,
            message: "No modules yet. Describe the app to generate an initial structure."
                .to_string(),
        };
    }

    let total = doc.modules.len();
    let incomplete_modules: Vec<IncompleteModule> = doc
        .modules
        .iter()
        .filter_map(|module| {
            let missing = module.missing_required_fields();
            if missing.is_empty() {
                None
            } else {
                Some(IncompleteModule {
                    id: module.id.clone(),
                    title: module.title.clone(),
                    missing: missing.into_iter().map(|s| s.to_string()).collect(),
                })
            }
        })
        .collect();

    let missing_fields = missing_narrative_sections(doc);
    let completion_rate = round2((total - incomplete_modules.len()) as f64 / total as f64);

    let score_too_low = doc
        .latest_evaluation()
        .map(|eval| eval.score < COMPLETION_SCORE_THRESHOLD)
        .unwrap_or(false);

    let state = if incomplete_modules.is_empty() && missing_fields.is_empty() && !score_too_low {
        CompletenessState::Complete
    } else {
        CompletenessState::Incomplete
    };

    let message = build_message(
        state,
        total,
        &incomplete_modules,
        &missing_fields,
        score_too_low,
    );

    CompletenessReport {
        state,
        total_modules: total,
        incomplete_modules,
        missing_fields,
        completion_rate,
        message,
    }
}

/// Completion rate penalized by document-wide gaps, floored at zero.
/// The pipeline treats this as the document's overall quality.
pub fn quality_score(doc: &StructureDocument) -> f64 {
    let report = analyze_completeness(doc);
    let penalized = report.completion_rate - 0.1 * report.missing_fields.len() as f64;
    round2(penalized.max(0.0))
}

/// Narrative sections absent from the content map. A document without a
/// content map has no narrative obligations.
fn missing_narrative_sections(doc: &StructureDocument) -> Vec<String> {
    let content = match &doc.content {
        Some(content) => content,
        None => return vec![],
    };

    NARRATIVE_SECTIONS
        .iter()
        .filter(|(_, keys)| !keys.iter().any(|key| section_present(content.get(*key))))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn section_present(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Object(m)) => !m.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn build_message(
    state: CompletenessState,
    total: usize,
    incomplete: &[IncompleteModule],
    missing_fields: &[String],
    score_too_low: bool,
) -> String {
    if state == CompletenessState::Complete {
        return format!("Structure is complete with {} module(s).", total);
    }

    let mut parts = vec![];
    if !incomplete.is_empty() {
        parts.push(format!(
            "{} of {} module(s) are missing required fields",
            incomplete.len(),
            total
        ));
    }
    if !missing_fields.is_empty() {
        parts.push(format!("missing sections: {}", missing_fields.join(", ")));
    }
    if score_too_low {
        parts.push(format!(
            "latest evaluation scored below {}",
            COMPLETION_SCORE_THRESHOLD
        ));
    }
    format!("Structure is incomplete: {}.", parts.join("; "))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
