//! Narrative generation for drug interaction reports.
//!
//! Renders the consolidated report into an analysis prompt and sends it to a
//! chat-completions provider, failing over to a messages-API provider.

pub mod prompts;
pub mod providers;
pub mod synthesis;

pub use prompts::*;
pub use providers::{AnthropicProvider, NarrativeProvider, OpenAiProvider, ProviderError, ProviderResult};
pub use synthesis::*;
