//! Terminal output utilities: ANSI formatting and formatted notes.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// The greeting printed once at startup.
pub fn banner(version: &str, color: bool) -> String {
    let lines = [
        "Welcome to the OpenCLI Assistant!".to_string(),
        "This is a command line assistant that can execute commands on your system.".to_string(),
        format!("Version: {version}"),
    ];
    if color {
        format!(
            "{CYAN}{BOLD}{}{RESET}\n{}\n{DIM}{}{RESET}\n",
            lines[0], lines[1], lines[2]
        )
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip ANSI escape codes from a string.
    fn strip_ansi(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                // Skip until 'm'
                for next in chars.by_ref() {
                    if next == 'm' {
                        break;
                    }
                }
            } else {
                result.push(c);
            }
        }
        result
    }

    #[test]
    fn strips_ansi() {
        let colored = format!("{RED}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn banner_text_is_the_same_with_or_without_color() {
        let plain = banner("0.1.0", false);
        assert_eq!(
            plain,
            "Welcome to the OpenCLI Assistant!\n\
             This is a command line assistant that can execute commands on your system.\n\
             Version: 0.1.0\n"
        );
        assert_eq!(strip_ansi(&banner("0.1.0", true)), plain);
    }
}
