//! System prompt for the command line assistant.

use opencli_core::ApprovalMode;

pub struct PromptBuilder;

impl PromptBuilder {
    /// The system message that opens every session.
    pub fn build(os_description: &str, approval: ApprovalMode) -> String {
        let mut rules = vec![
            "You'll be provided with functions to execute commands on the system and to get or \
             set the current directory. Commands run in that directory."
                .to_string(),
            "Commands are started directly, not through a shell. To use pipes, redirection or \
             shell builtins, run the shell itself (for example bash -c or powershell -Command)."
                .to_string(),
            "If you believe a command will change the system, you must ask for the user's approval \
             before executing it. Set changesSystem accordingly on every exe call."
                .to_string(),
            "Before executing a command, briefly explain what it does and why you are running it."
                .to_string(),
            "Avoid being prosaic with things like \"Let me know how you'd like to proceed next.\""
                .to_string(),
        ];
        if approval != ApprovalMode::Advisory {
            rules.push(format!(
                "The user must confirm some commands before they run ({} approval). \
                 If a command was declined, do not retry it without asking.",
                approval
            ));
        }

        format!(
            "You are a helpful assistant of the user working with a shell in {os_description}. \
             Help the user issue commands in powershell, cmd, bash, etc.; for example execute \
             programs, check whether a program is installed or run shell commands.\n\n{}",
            rules
                .iter()
                .map(|r| format!("- {r}"))
                .collect::<Vec<_>>()
                .join("\n")
        )
    }

    /// Human-readable description of the host, e.g. `linux (unix, x86_64)`.
    pub fn os_description() -> String {
        use std::env::consts::{ARCH, FAMILY, OS};
        format!("{OS} ({FAMILY}, {ARCH})")
    }
}
