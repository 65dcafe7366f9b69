use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use kubegate_mcp_server::check::{build_validator, check_request, evaluate};
use kubegate_mcp_server::config::ServerConfig;
use kubegate_mcp_server::logging;

const ALLOWED: i32 = 0;
const DENIED: i32 = 1;
const CONFIG_ERROR: i32 = 2;

#[derive(Parser)]
#[command(
    name = "kubegate",
    version,
    about = "Policy gates and fail-closed credential resolution for Kubernetes MCP tools"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate one operation against the configured policy
    Check(CheckArgs),
    /// Load and validate a configuration, then print the effective settings
    Validate(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// YAML configuration file; defaults plus KUBEGATE_* variables when omitted
    #[arg(long, short = 'c', env = "KUBEGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[arg(long)]
    operation: String,

    #[arg(long)]
    resource: String,

    /// Defaults to `default_namespace` for namespaced resources
    #[arg(long)]
    namespace: Option<String>,

    #[arg(long, default_value = "")]
    name: String,

    /// Kubeconfig context the operation would run under
    #[arg(long, default_value = "")]
    context: String,
}

fn load_config(args: &ConfigArgs) -> Result<ServerConfig> {
    match &args.config {
        Some(path) => ServerConfig::from_file(path),
        None => ServerConfig::from_env(),
    }
}

fn run_check(args: CheckArgs) -> Result<i32> {
    let config = load_config(&args.config)?;
    logging::init(&config.log_level, config.log_format);

    let validator = build_validator(&config)?;
    let request = check_request(
        &config,
        &args.operation,
        &args.resource,
        args.namespace.as_deref(),
        &args.name,
        &args.context,
    );

    let decision = evaluate(&config, &validator, &request);
    tracing::debug!(
        operation = %request.operation,
        resource = %request.resource,
        allowed = decision.allowed,
        "evaluated operation"
    );
    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(if decision.allowed { ALLOWED } else { DENIED })
}

fn run_validate(args: ConfigArgs) -> Result<i32> {
    let config = load_config(&args)?;
    build_validator(&config)?;
    println!("{}", serde_yaml::to_string(&config)?);
    Ok(ALLOWED)
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Check(args) => run_check(args),
        Command::Validate(args) => run_validate(args),
    };
    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            CONFIG_ERROR
        }
    };
    std::process::exit(code);
}
