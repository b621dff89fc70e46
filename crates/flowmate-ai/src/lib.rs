pub mod ai_provider;
pub mod error;
pub mod http;
pub mod llm_oracle;
pub mod mock;
pub mod oracle;
pub mod prompts;
pub mod providers;

pub use ai_provider::{create_provider, AiProviderTrait, GenerateOptions};
pub use error::OracleError;
pub use llm_oracle::LlmOracle;
pub use mock::MockOracle;
pub use oracle::{create_oracle, Oracle, PlannedStep, TaskProfile, Verdict};
