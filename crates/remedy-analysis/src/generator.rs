//! Suggestion generator collaborator
//!
//! The generator is an opaque, possibly slow, possibly failing text
//! service (typically an LLM). Nothing beyond a root-cause string and a
//! severity hint is assumed about its output; see
//! [`AnalysisReport::parse`](crate::AnalysisReport::parse).

use crate::error::GeneratorError;
use crate::report::AnalysisReport;

/// Text service that explains failures and proposes remediations
#[async_trait::async_trait]
pub trait SuggestionGenerator: Send + Sync + std::fmt::Debug {
    /// Analyze a failure described by `prompt`
    async fn analyze_error(&self, prompt: &str) -> Result<String, GeneratorError>;

    /// Produce remediation text for a prior analysis
    async fn generate_remediation(&self, analysis: &AnalysisReport) -> Result<String, GeneratorError>;
}
