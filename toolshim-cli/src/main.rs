//! Toolshim CLI - inspect and run configured external tools

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use toolshim_core::prelude::*;

#[derive(Parser)]
#[command(name = "toolshim")]
#[command(about = "Run external executables as schema-validated tools", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON); defaults to toolshim.toml
    #[arg(short, long, global = true, env = "TOOLSHIM_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured tools
    List,
    /// Print the input schema of one tool, or descriptors for all of them
    Schema {
        /// Tool name
        tool: Option<String>,
        /// Wrap as OpenAI function tools
        #[arg(long)]
        openai: bool,
    },
    /// Show usage for a tool
    Help {
        /// Tool name
        tool: String,
    },
    /// Print the command line a given input would produce
    Args {
        /// Tool name
        tool: String,
        /// Input JSON object
        input: String,
    },
    /// Run a tool
    Exec {
        /// Tool name
        tool: String,
        /// Input JSON object, or `-` to read it from stdin
        #[arg(default_value = "{}")]
        input: String,
        /// Deadline for the run, e.g. `5s` or `250ms`
        #[arg(short, long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so tool output on stdout stays clean
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            println!("toolshim {}", env!("CARGO_PKG_VERSION"));
            println!("toolshim-core {}", toolshim_core::VERSION);
        }
        Commands::List => {
            let registry = load_config(cli.config.as_deref())?.build_registry()?;
            for descriptor in registry.function_descriptors() {
                println!("{}\t{}", descriptor.name, descriptor.description);
            }
        }
        Commands::Schema { tool, openai } => {
            let registry = load_config(cli.config.as_deref())?.build_registry()?;
            let descriptors = match tool {
                Some(name) => {
                    let tool = registry
                        .get(&name)
                        .ok_or_else(|| anyhow!("unknown tool {name:?}"))?;
                    vec![tool.function_descriptor()]
                }
                None => registry.function_descriptors(),
            };
            let value = if openai {
                serde_json::Value::Array(descriptors.iter().map(|d| d.to_openai_tool()).collect())
            } else if descriptors.len() == 1 {
                descriptors[0].parameters.clone()
            } else {
                serde_json::to_value(&descriptors)?
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::Help { tool } => {
            let config = load_config(cli.config.as_deref())?;
            print!("{}", find_tool(&config, &tool)?.help());
        }
        Commands::Args { tool, input } => {
            let config = load_config(cli.config.as_deref())?;
            let tool = find_tool(&config, &tool)?;
            let mut argv = vec![tool.spec().command.display().to_string()];
            argv.extend(tool.build_args(&input)?);
            println!("{}", serde_json::to_string(&argv)?);
        }
        Commands::Exec {
            tool,
            input,
            timeout,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let tool = find_tool(&config, &tool)?;
            let input = if input == "-" {
                let mut buf = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut buf)
                    .await
                    .context("reading input from stdin")?;
                buf
            } else {
                input
            };

            let ctx = ToolContext::new().with_timeout(timeout.unwrap_or(config.default_timeout));
            let token = ctx.cancellation.clone();
            let ctrl_c = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            });

            let result = tool.execute(&ctx, &input).await;
            ctrl_c.abort();

            match result {
                Ok(output) => print!("{output}"),
                Err(ExternalToolError::Execution(err)) => {
                    eprint!("{}", err.detail());
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ToolshimConfig> {
    let config = match path {
        Some(path) => ToolshimConfig::from_file(path),
        None => ToolshimConfig::load(),
    };
    config.context("loading configuration")
}

fn find_tool(config: &ToolshimConfig, name: &str) -> Result<ExternalTool> {
    let spec = config
        .external_tools
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| anyhow!("unknown tool {name:?}"))?;
    Ok(ExternalTool::new(spec)?)
}
