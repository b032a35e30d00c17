//! The analysis pipeline: model output in, validated records out.

pub mod context;
pub mod extract;
pub mod normalize;
mod orchestrator;

pub use context::{patient_context, ContextBuilder, NO_HISTORY};
pub use extract::{extract_json_object, sentinel, try_extract_json_object, ExtractError};
pub use normalize::{conforms, normalize, RecordSchema};
pub use orchestrator::AnalysisService;
