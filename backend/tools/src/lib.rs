pub mod command_runner;
pub mod directory;
pub mod invocation;

pub use command_runner::{CommandRunner, ExecResult, RunnerConfig};
pub use directory::DirectoryContext;
pub use invocation::{definitions, ToolInvocation, CUR_DIR_TOOL, EXE_TOOL};
