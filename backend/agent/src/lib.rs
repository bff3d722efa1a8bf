//! OpenCLI Agent
//!
//! The conversation loop of the command line assistant: history window,
//! system prompt, console abstraction and tool dispatching.

pub mod agent_loop;
pub mod console;
pub mod history;
pub mod system_prompt;
pub mod tool_dispatcher;

pub use agent_loop::{AssistantLoop, LoopConfig, LoopState, StepResult, TurnOutcome, USER_PROMPT};
pub use console::{Console, ScriptedConsole, StdConsole};
pub use history::ConversationHistory;
pub use system_prompt::PromptBuilder;
pub use tool_dispatcher::ToolDispatcher;
