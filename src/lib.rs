// appstruct - extraction, validation and completeness engine for
// LLM-generated app structure documents
//
// The crate turns unreliable free-text provider output into validated
// structure documents: `extraction` recovers a JSON candidate, `validation`
// checks it against the module schema, `analysis` classifies how complete
// the resulting document is, and `pipeline` ties the three together around
// an `LlmClient` implementation supplied by the caller.

// Module declarations
pub mod analysis;
pub mod extraction;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod storage;
pub mod validation;

// Re-export the main surface so callers rarely need the module paths
pub use analysis::{analyze_completeness, quality_score, CompletenessReport};
pub use extraction::{extract_structure, ExtractionError, KeyRepairer, TextToJSONExtractor};
pub use llm::{CallOptions, LlmClient, LlmMessage, LlmResponse, ProviderError};
pub use models::{
    CompletenessState, Module, ModuleKind, ModulePayload, Provider, StructureDocument,
};
pub use pipeline::{EngineError, StructureEngine};
pub use prompts::PromptResolver;
pub use validation::{validate_module, validate_structure, ValidationReport};
