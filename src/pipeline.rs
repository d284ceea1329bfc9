// Pipeline - generation, evaluation and completion flows over one document
//
// `StructureEngine` owns an `LlmClient` implementation and a prompt resolver
// and drives the extract -> validate -> merge cycle. Every attempt leaves a
// record on the document, success or not; failures are returned as typed
// errors, never panics, and the engine never invents a default structure.

use serde_json::{json, Value};
use thiserror::Error;

use crate::analysis::{self, CompletenessReport};
use crate::extraction::{extract_structure, ExtractionError};
use crate::llm::{CallOptions, LlmClient, LlmMessage, ProviderError};
use crate::models::{
    CompletionRecord, CompletionStatus, EvaluationRecord, MessageRole, Provider,
    StructureDocument,
};
use crate::prompts::{PromptResolver, PROMPT_COMPLETE, PROMPT_EVALUATE, PROMPT_GENERATE};
use crate::validation::{validate_structure, ValidationReport};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Prompt(#[from] anyhow::Error),

    #[error("Evaluation reply had no usable score: {detail}")]
    MalformedEvaluation { detail: String },
}

/// Drives structure generation and refinement against an LLM backend
pub struct StructureEngine<C: LlmClient> {
    client: C,
    prompts: PromptResolver,
    options: CallOptions,
}

impl<C: LlmClient> StructureEngine<C> {
    pub fn new(client: C, prompts: PromptResolver) -> Self {
        Self {
            client,
            prompts,
            options: CallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one generation turn: prompt the provider with the conversation so
    /// far plus `user_input`, extract and validate the reply, and merge a
    /// valid candidate into the document.
    ///
    /// The user/assistant turns and a completion record are appended whatever
    /// the outcome. An invalid-but-extractable candidate is not an error; the
    /// returned report says what was wrong with it.
    pub fn generate(
        &self,
        doc: &mut StructureDocument,
        provider: Provider,
        user_input: &str,
    ) -> Result<ValidationReport, EngineError> {
        let prompt = self.prompts.get_prompt(provider, PROMPT_GENERATE)?;

        let mut messages = vec![LlmMessage::system(prompt)];
        for msg in &doc.messages {
            messages.push(LlmMessage {
                role: msg.role,
                content: msg.content.clone(),
            });
        }
        messages.push(LlmMessage::user(user_input));

        let response = match self.client.call(provider, &messages, &self.options) {
            Ok(response) => response,
            Err(e) => {
                doc.record_completion(error_record(provider, &e.to_string()));
                return Err(e.into());
            }
        };

        doc.add_message(MessageRole::User, user_input, None);
        doc.add_message(
            MessageRole::Assistant,
            &response.content,
            Some(provider.as_str()),
        );

        let candidate = match extract_structure(&response.content) {
            Ok(candidate) => candidate,
            Err(e) => {
                log::warn!("Extraction failed for {} reply: {}", provider, e);
                doc.record_completion(CompletionRecord {
                    provider,
                    status: CompletionStatus::Failed,
                    content: Some(response.content.clone()),
                    extracted_json: None,
                    error_message: Some(e.to_string()),
                    timestamp: now(),
                });
                return Err(e.into());
            }
        };

        let report = validate_structure(&candidate);
        if report.valid {
            merge_candidate(doc, &candidate);
        } else {
            log::info!(
                "Candidate from {} failed validation, document left unchanged",
                provider
            );
        }

        doc.record_completion(CompletionRecord {
            provider,
            status: if report.valid {
                CompletionStatus::Success
            } else {
                CompletionStatus::Failed
            },
            content: Some(response.content),
            extracted_json: Some(candidate),
            error_message: None,
            timestamp: now(),
        });

        Ok(report)
    }

    /// Ask a provider to score the current document and append the result
    /// to the evaluation log
    pub fn evaluate(
        &self,
        doc: &mut StructureDocument,
        provider: Provider,
    ) -> Result<EvaluationRecord, EngineError> {
        let prompt = self.prompts.get_prompt(provider, PROMPT_EVALUATE)?;
        let body = document_body(doc);
        let messages = [
            LlmMessage::system(prompt),
            LlmMessage::user(pretty(&body)),
        ];

        let response = self.client.call(provider, &messages, &self.options)?;
        let reply = extract_structure(&response.content)?;

        let score = reply
            .get("score")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| EngineError::MalformedEvaluation {
                detail: format!("reply was {}", reply),
            })?
            .clamp(0.0, 1.0);
        let feedback = reply
            .get("feedback")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let details = reply.as_object().cloned().unwrap_or_default();
        let record = EvaluationRecord {
            provider,
            score,
            feedback,
            details,
            is_valid: validate_structure(&body).valid,
            timestamp: now(),
        };
        doc.record_evaluation(record.clone());
        log::info!("{} scored document {} at {:.2}", provider, doc.id, score);
        Ok(record)
    }

    /// Run a completion pass when the analyzer says the document is
    /// incomplete. Empty documents get a skipped record (there is nothing to
    /// complete yet); complete documents are left untouched.
    pub fn complete_if_needed(
        &self,
        doc: &mut StructureDocument,
        provider: Provider,
    ) -> Result<CompletionStatus, EngineError> {
        let report = analysis::analyze_completeness(doc);
        match report.state {
            crate::models::CompletenessState::Complete => {
                log::debug!("Document {} already complete, skipping", doc.id);
                Ok(CompletionStatus::Skipped)
            }
            crate::models::CompletenessState::Empty => {
                doc.record_completion(CompletionRecord {
                    provider,
                    status: CompletionStatus::Skipped,
                    content: None,
                    extracted_json: None,
                    error_message: Some("document has no modules to complete".to_string()),
                    timestamp: now(),
                });
                Ok(CompletionStatus::Skipped)
            }
            crate::models::CompletenessState::Incomplete => {
                self.run_completion(doc, provider, &report)
            }
        }
    }

    fn run_completion(
        &self,
        doc: &mut StructureDocument,
        provider: Provider,
        report: &CompletenessReport,
    ) -> Result<CompletionStatus, EngineError> {
        let prompt = self.prompts.get_prompt(provider, PROMPT_COMPLETE)?;
        let request = json!({
            "document": document_body(doc),
            "diagnosis": report.message,
            "incompleteModules": report.incomplete_modules,
            "missingFields": report.missing_fields,
        });
        let messages = [LlmMessage::system(prompt), LlmMessage::user(pretty(&request))];

        let response = match self.client.call(provider, &messages, &self.options) {
            Ok(response) => response,
            Err(e) => {
                doc.record_completion(error_record(provider, &e.to_string()));
                return Err(e.into());
            }
        };

        let candidate = match extract_structure(&response.content) {
            Ok(candidate) => candidate,
            Err(e) => {
                doc.record_completion(CompletionRecord {
                    provider,
                    status: CompletionStatus::Failed,
                    content: Some(response.content),
                    extracted_json: None,
                    error_message: Some(e.to_string()),
                    timestamp: now(),
                });
                return Err(e.into());
            }
        };

        let validation = validate_structure(&candidate);
        let status = if validation.valid {
            merge_candidate(doc, &candidate);
            CompletionStatus::Success
        } else {
            CompletionStatus::Failed
        };

        doc.record_completion(CompletionRecord {
            provider,
            status,
            content: Some(response.content),
            extracted_json: Some(candidate),
            error_message: None,
            timestamp: now(),
        });
        Ok(status)
    }
}

/// The document fields a provider is asked to work on (logs excluded)
fn document_body(doc: &StructureDocument) -> Value {
    json!({
        "title": doc.title,
        "description": doc.description,
        "modules": doc.modules,
        "content": doc.content,
    })
}

/// Overwrite the document's structural fields from a validated candidate.
/// Fields absent from the candidate keep their current value.
fn merge_candidate(doc: &mut StructureDocument, candidate: &Value) {
    if let Some(title) = candidate.get("title").and_then(|v| v.as_str()) {
        if !title.trim().is_empty() {
            doc.title = title.to_string();
        }
    }
    if let Some(description) = candidate.get("description").and_then(|v| v.as_str()) {
        if !description.trim().is_empty() {
            doc.description = description.to_string();
        }
    }
    if let Some(modules) = candidate.get("modules") {
        let parsed = crate::models::module::modules_from_value(modules);
        if !parsed.is_empty() {
            doc.modules = parsed;
        }
    }
    if let Some(content) = candidate.get("content").and_then(|v| v.as_object()) {
        if !content.is_empty() {
            doc.content = Some(content.clone());
        }
    }
    doc.touch();
}

fn error_record(provider: Provider, message: &str) -> CompletionRecord {
    CompletionRecord {
        provider,
        status: CompletionStatus::Error,
        content: None,
        extracted_json: None,
        error_message: Some(message.to_string()),
        timestamp: now(),
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
