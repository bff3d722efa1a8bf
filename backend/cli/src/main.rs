mod config;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use opencli_agent::{
    AssistantLoop, Console, LoopConfig, PromptBuilder, StdConsole, ToolDispatcher,
};
use opencli_config::{
    config_dir, config_file_path, find_api_key, load_and_prepare, persist_for_session,
    prompted_api_key, redacted_config, validate, AssistantConfig, Credential,
};
use opencli_core::ApprovalMode;
use opencli_logging::init_logger;
use opencli_providers::OpenAiProvider;
use opencli_tools::{CommandRunner, DirectoryContext, RunnerConfig};

use config::CliOverrides;
use terminal_output::{banner, note_error, supports_color};

#[derive(Parser)]
#[command(name = "opencli")]
#[command(about = "An AI assistant that runs commands on your system")]
#[command(version)]
struct Cli {
    /// Config file to load instead of <config dir>/config.yaml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model to ask, e.g. o3-mini
    #[arg(short, long)]
    model: Option<String>,

    /// How many non-system messages each request carries
    #[arg(long)]
    history_limit: Option<usize>,

    /// When to confirm commands: advisory, declared or always
    #[arg(long)]
    approval: Option<ApprovalMode>,

    /// Print the effective configuration with secrets masked, then exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dir = config_dir();
    let config_path = cli.config.clone().unwrap_or_else(|| config_file_path(&dir));

    let config = load_and_prepare(&config_path).await?;
    let config = CliOverrides {
        model: cli.model,
        history_limit: cli.history_limit,
        approval: cli.approval,
    }
    .apply(config);

    if cli.print_config {
        validate(&config).into_result()?;
        print!("{}", serde_yaml::to_string(&redacted_config(&config)?)?);
        return Ok(());
    }

    init_logger(config.log_dir(&dir), config.log_level())?;
    validate(&config).into_result()?;
    info!(path = %config_path.display(), model = %config.model(), approval = %config.approval(), "Configuration loaded");

    print!("{}", banner(env!("CARGO_PKG_VERSION"), supports_color()));
    println!();

    let mut console = StdConsole::spawn().context("Failed to start reading stdin")?;
    let credential = acquire_credential(&config, &mut console).await?;

    let mut assistant = build_assistant(&config, credential)?;
    console.write_line(
        "Hello! I'm your command line assistant. How can I help you today? (CTRL+C to quit)",
    );

    // Dropping the loop on Ctrl+C also drops any running command, which kills it.
    tokio::select! {
        result = assistant.run(&mut console) => result?,
        _ = tokio::signal::ctrl_c() => {
            println!();
            info!("Interrupted; shutting down");
        }
    }
    Ok(())
}

/// Config key, then environment, then ask once on the console.
async fn acquire_credential(
    config: &AssistantConfig,
    console: &mut dyn Console,
) -> Result<Credential> {
    let var = config.api_key_env();
    if let Some(credential) = find_api_key(config, |name| std::env::var(name).ok()) {
        info!(source = ?credential.source, "Using API key");
        return Ok(credential);
    }

    console.write_line(&format!("{var} is not set."));
    let typed = console.read_line("Please enter your OpenAI key: ").await?;
    let credential = prompted_api_key(typed)?;
    persist_for_session(var, &credential);
    Ok(credential)
}

fn build_assistant(config: &AssistantConfig, credential: Credential) -> Result<AssistantLoop> {
    let provider = Arc::new(OpenAiProvider::new(credential.api_key).with_base_url(config.base_url()));

    let runner = CommandRunner::new(RunnerConfig {
        timeout_secs: config.command_timeout_secs(),
        max_output_bytes: config.max_output_bytes(),
    });
    let directory = DirectoryContext::from_process()?;
    let approval = config.approval();
    let dispatcher = ToolDispatcher::new(runner, directory, approval);

    let system_prompt = PromptBuilder::build(&PromptBuilder::os_description(), approval);
    let loop_config = LoopConfig {
        model: config.model().to_string(),
        history_limit: config.history_limit(),
        max_tool_steps: config.max_tool_steps(),
        backend_timeout: config.backend_timeout(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };

    Ok(AssistantLoop::new(provider, dispatcher, system_prompt, loop_config))
}
