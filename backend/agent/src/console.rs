//! The user's side of the conversation: prompts, lines in, lines out.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

#[async_trait]
pub trait Console: Send {
    /// Show `prompt` and wait for one line of input. `None` means end of input.
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    fn write_line(&mut self, line: &str);

    /// Ask a yes/no question. Only `y` or `yes` approves; end of input declines.
    async fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.read_line(question).await?;
        Ok(matches!(
            answer.map(|a| a.trim().to_ascii_lowercase()).as_deref(),
            Some("y") | Some("yes")
        ))
    }
}

/// Console on the process's stdin/stdout.
///
/// Stdin is read on a dedicated OS thread so an abandoned read never holds up
/// runtime shutdown.
pub struct StdConsole {
    lines: mpsc::Receiver<io::Result<String>>,
}

impl StdConsole {
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let mut stdin = io::stdin().lock();
                loop {
                    let mut buf = Vec::new();
                    let line = match stdin.read_until(b'\n', &mut buf) {
                        Ok(0) => break,
                        Ok(_) => Ok(decode_line(&buf)),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => Err(e),
                    };
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
                debug!("stdin closed");
            })?;
        Ok(Self { lines: rx })
    }
}

/// One raw input line as text, without its line ending. Bytes that are not
/// valid UTF-8 become U+FFFD.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        self.lines.recv().await.transpose()
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Console fed from a fixed list of answers that records everything shown.
/// Runs out into end of input.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Prompts and written lines, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|l| l.contains(needle))
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.transcript.push(prompt.to_string());
        Ok(self.inputs.pop_front())
    }

    fn write_line(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }
}
