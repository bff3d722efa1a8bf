pub mod error;
pub mod message;
pub mod tools;
pub mod traits;
pub mod types;

pub use error::OpenCliError;
pub use message::{ChatMessage, Role};
pub use tools::{ToolCallRequest, ToolDefinition};
pub use traits::{LlmProvider, LlmRequest, LlmResponse};
pub use types::{ApprovalMode, RiskClass, RiskOrigin, RiskTag};
