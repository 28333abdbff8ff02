//! Roster CLI
//!
//! Run role agent commands, plan and run multi-agent workflows, and extract
//! records from saved model replies.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use roster_agents::records::{schema_by_name, SCHEMAS};
use roster_agents::{
    create_backend, help_command, Agent, AgentConfig, ModelConfig, PersonaRegistry, ReplayBackend,
    Role, RoleAgent, SharedBackend,
};
use roster_core::{scan_text, CommandContext, Record};
use roster_runtime::{Crew, CrewConfig};

#[derive(Parser)]
#[command(name = "roster")]
#[command(author, version, about = "Roster: role agents with structured markdown replies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

/// Model and persona selection shared by every command that calls a model
#[derive(Args)]
struct ModelArgs {
    /// LLM model to use
    #[arg(short, long, default_value = "claude-sonnet-4-20250514")]
    model: String,

    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_key: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenRouter API key (or set OPENROUTER_API_KEY env var)
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    openrouter_key: Option<String>,

    /// Use OpenAI instead of Anthropic
    #[arg(long)]
    openai: bool,

    /// Use OpenRouter instead of Anthropic
    #[arg(long)]
    openrouter: bool,

    /// Use a local OpenAI-compatible server at this base URL
    #[arg(long, value_name = "URL")]
    local: Option<String>,

    /// Answer every prompt with the contents of this file instead of a model
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Directory of persona TOML files overriding the built-in ones
    #[arg(long, value_name = "DIR")]
    personas: Option<PathBuf>,

    /// Maximum tokens per model reply
    #[arg(long, default_value = "4096")]
    max_tokens: u16,

    /// Language the agents answer in
    #[arg(long, default_value = "English")]
    language: String,

    /// Timeout for a single model call in seconds
    #[arg(long, default_value = "120")]
    call_timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command on one agent
    Run {
        /// Agent role (analyst, architect, dev, pm, qa, sm, ux, master, orchestrator)
        #[arg(short, long)]
        agent: String,

        /// Command name, e.g. create-prd
        #[arg(short, long)]
        command: String,

        /// Free text input for the command
        #[arg(short, long, default_value = "")]
        input: String,

        /// Command option as key=value (repeatable)
        #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
        options: Vec<(String, String)>,

        /// Write the result to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// List agents and their commands
    Commands {
        /// Only this agent
        #[arg(short, long)]
        agent: Option<String>,
    },

    /// Extract records from a saved reply without calling a model
    Extract {
        /// Record schema name, e.g. risk or test-case
        #[arg(short, long)]
        schema: String,

        /// File holding the markdown reply
        file: PathBuf,
    },

    /// Plan a workflow with the orchestrator and run it through the crew
    Workflow {
        /// Goal for the workflow
        #[arg(short, long)]
        input: String,

        /// Maximum runtime in seconds (0 = unlimited)
        #[arg(long, default_value = "600")]
        timeout: u64,

        /// Output file for the report (default: workflow_<timestamp>.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the run as JSON instead of markdown
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            agent,
            command,
            input,
            options,
            output,
            json,
            model,
        } => run_command(&agent, &command, input, options, output, json, &model).await,
        Commands::Commands { agent } => list_commands(agent.as_deref()),
        Commands::Extract { schema, file } => extract_records(&schema, &file),
        Commands::Workflow {
            input,
            timeout,
            output,
            json,
            model,
        } => run_workflow(&input, timeout, output, json, &model).await,
    }
}

/// Parse a `key=value` option
fn parse_option(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("option key is empty in '{}'", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_role(name: &str) -> Result<Role> {
    name.parse::<Role>().map_err(anyhow::Error::msg)
}

fn build_backend(args: &ModelArgs) -> Result<SharedBackend> {
    if let Some(path) = &args.replay {
        let reply = fs::read_to_string(path)
            .with_context(|| format!("reading replay file {}", path.display()))?;
        info!("Replaying saved reply from {}", path.display());
        return Ok(Arc::new(ReplayBackend::new(reply)));
    }

    let config = model_config(args)?;
    info!("Provider: {} | Model: {}", config.provider, config.model);
    Ok(create_backend(config)?)
}

fn model_config(args: &ModelArgs) -> Result<ModelConfig> {
    // Anthropic is the default provider
    let config = if let Some(url) = &args.local {
        ModelConfig::local(url, &args.model)
    } else if args.openrouter {
        let key = args.openrouter_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("OpenRouter API key required. Set OPENROUTER_API_KEY or use --openrouter-key")
        })?;
        ModelConfig::openrouter(key, &args.model)
    } else if args.openai {
        let key = args.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("OpenAI API key required. Set OPENAI_API_KEY or use --api-key")
        })?;
        ModelConfig::openai(key, &args.model)
    } else {
        let key = args.anthropic_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("Anthropic API key required. Set ANTHROPIC_API_KEY or use --anthropic-key")
        })?;
        ModelConfig::anthropic(key, &args.model)
    };

    Ok(config.with_max_tokens(args.max_tokens))
}

fn load_personas(args: &ModelArgs) -> Result<PersonaRegistry> {
    let mut personas = PersonaRegistry::embedded();
    if let Some(dir) = &args.personas {
        let loaded = personas
            .merge_dir(dir)
            .with_context(|| format!("loading personas from {}", dir.display()))?;
        info!("Loaded {} personas from {}", loaded, dir.display());
    }
    Ok(personas)
}

fn agent_config(args: &ModelArgs) -> AgentConfig {
    AgentConfig::default()
        .with_timeout(Duration::from_secs(args.call_timeout))
        .with_language(&args.language)
}

fn write_or_print(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("📄 Saved to: {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

async fn run_command(
    agent: &str,
    command: &str,
    input: String,
    options: Vec<(String, String)>,
    output: Option<PathBuf>,
    json: bool,
    model: &ModelArgs,
) -> Result<()> {
    let role = parse_role(agent)?;
    let backend = build_backend(model)?;
    let personas = load_personas(model)?;

    let config = agent_config(model).with_id(&format!("{}-1", role));
    let agent = Agent::with_persona(role, config, backend, personas.for_role(role));

    let mut context = CommandContext::new(input);
    for (key, value) in options {
        context = context.with_option(&key, value);
    }

    info!("Running {} {}", role, command);
    let response = agent.execute_command(command, context).await;

    let text = if json {
        serde_json::to_string_pretty(&response)?
    } else {
        response
            .output
            .clone()
            .or_else(|| response.error.clone())
            .unwrap_or_default()
    };
    write_or_print(&text, output.as_deref())?;

    if !response.success {
        anyhow::bail!(
            "{} {} failed: {}",
            role,
            command,
            response.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn list_commands(agent: Option<&str>) -> Result<()> {
    let roles = match agent {
        Some(name) => vec![parse_role(name)?],
        None => Role::ALL.to_vec(),
    };

    for role in roles {
        println!("{} ({})", role.title(), role);
        for info in role.commands().with(help_command()).list() {
            match &info.template {
                Some(template) => println!("  {:<22} {} [{}]", info.name, info.description, template),
                None => println!("  {:<22} {}", info.name, info.description),
            }
        }
        println!();
    }
    Ok(())
}

fn extract_records(schema: &str, file: &Path) -> Result<()> {
    let schema = schema_by_name(schema).with_context(|| {
        let names: Vec<&str> = SCHEMAS.iter().map(|(name, _)| *name).collect();
        format!("available schemas: {}", names.join(", "))
    })?;
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;

    let records: Vec<serde_json::Value> = scan_text(&text, &schema).iter().map(Record::to_json).collect();
    info!("Extracted {} {} records", records.len(), schema.keyword);

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn run_workflow(
    goal: &str,
    timeout: u64,
    output: Option<PathBuf>,
    json: bool,
    model: &ModelArgs,
) -> Result<()> {
    println!("🧭 Roster workflow\n");
    println!("🎯 Goal: {}", goal);
    println!("⏱️  Timeout: {}s\n", timeout);

    let crew = Crew::new(CrewConfig {
        backend: build_backend(model)?,
        agent_config: agent_config(model),
        personas: load_personas(model)?,
        max_runtime: Duration::from_secs(timeout),
    });

    let plan = crew.plan(goal).await.context("planning the workflow")?;
    if plan.steps.is_empty() {
        anyhow::bail!("the orchestrator returned a plan with no steps");
    }
    for warning in &plan.warnings {
        warn!("Plan: {}", warning);
    }

    println!("📋 Plan: {} steps in {} stages", plan.steps.len(), plan.stages().len());
    for step in &plan.steps {
        println!("   {} {} -> {} {}", step.id, step.title, step.agent, step.command);
    }
    println!();

    let run = crew.run_workflow(&plan, &CommandContext::new(goal)).await;

    let report = if json {
        serde_json::to_string_pretty(&run)?
    } else {
        run.to_markdown()
    };
    let output_path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        let ext = if json { "json" } else { "md" };
        PathBuf::from(format!("workflow_{}.{}", timestamp, ext))
    });
    fs::write(&output_path, &report)
        .with_context(|| format!("writing {}", output_path.display()))?;

    if run.completed {
        println!("✅ Workflow complete: {}/{} steps succeeded", run.succeeded(), run.steps.len());
    } else {
        println!(
            "⚠️  Workflow stopped: {}",
            run.stopped.as_deref().unwrap_or("not every step ran")
        );
        println!("   Try increasing --timeout.");
    }
    println!("📄 Report saved to: {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("team_size = 4").unwrap(),
            ("team_size".to_string(), "4".to_string())
        );
        assert_eq!(
            parse_option("focus=a=b").unwrap(),
            ("focus".to_string(), "a=b".to_string())
        );
        assert!(parse_option("novalue").is_err());
        assert!(parse_option("=x").is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "roster", "run", "--agent", "pm", "--command", "create-prd", "--input", "todo app",
            "--option", "team_size=3", "--replay", "reply.md",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                agent,
                command,
                options,
                model,
                ..
            } => {
                assert_eq!(agent, "pm");
                assert_eq!(command, "create-prd");
                assert_eq!(options, vec![("team_size".to_string(), "3".to_string())]);
                assert_eq!(model.replay, Some(PathBuf::from("reply.md")));
                assert_eq!(model.max_tokens, 4096);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_max_tokens_reaches_model_config() {
        let cli = Cli::try_parse_from([
            "roster", "workflow", "--input", "ship it", "--local", "http://localhost:11434/v1",
            "--max-tokens", "512",
        ])
        .unwrap();

        let Commands::Workflow { model, .. } = cli.command else {
            panic!("expected workflow");
        };
        let config = model_config(&model).unwrap();
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:11434/v1"));
    }

    #[test]
    fn test_unknown_role_is_error() {
        assert!(parse_role("wizard").is_err());
        assert_eq!(parse_role("Scrum Master").unwrap(), Role::Sm);
    }
}
