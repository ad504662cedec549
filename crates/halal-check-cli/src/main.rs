use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use halal_check_api::{
    EngineConfig, EvaluateRequest, HalalCheckApi, RecipeRequest, API_CONTRACT_VERSION,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "hc")]
#[command(about = "Halal ingredient evaluation CLI")]
struct Cli {
    /// Knowledge Base file (.json, .yaml or .yml).
    #[arg(long, global = true, conflicts_with = "config")]
    kb: Option<PathBuf>,

    /// YAML engine config naming the Knowledge Base.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Evaluate(IngredientArgs),
    Modifiers(IngredientArgs),
    Resolve(IngredientArgs),
    Recipe(RecipeArgs),
    Kb {
        #[command(subcommand)]
        command: KbCommand,
    },
}

#[derive(Debug, Subcommand)]
enum KbCommand {
    Report,
    Fingerprint,
}

#[derive(Debug, Args)]
struct IngredientArgs {
    #[arg(long)]
    ingredient: String,
}

#[derive(Debug, Args)]
struct RecipeArgs {
    #[arg(long = "ingredient", required = true)]
    ingredients: Vec<String>,
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn init_tracing() {
    // stdout carries JSON only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn open_api(cli: &Cli) -> Result<HalalCheckApi> {
    match (&cli.kb, &cli.config) {
        (Some(kb), _) => HalalCheckApi::open(&EngineConfig::for_knowledge_base(kb.clone())),
        (None, Some(config)) => HalalCheckApi::open_config_file(config),
        (None, None) => Err(anyhow!("a knowledge base is required: pass --kb <file> or --config <file>")),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let api = open_api(&cli)?;
    match cli.command {
        Command::Evaluate(args) => {
            let result = api.evaluate(&EvaluateRequest { ingredient: args.ingredient })?;
            emit_json(serde_json::to_value(result)?)
        }
        Command::Modifiers(args) => {
            let result = api.detect_modifiers(&EvaluateRequest { ingredient: args.ingredient })?;
            emit_json(serde_json::to_value(result)?)
        }
        Command::Resolve(args) => {
            let result = api.resolve(&EvaluateRequest { ingredient: args.ingredient })?;
            emit_json(serde_json::to_value(result)?)
        }
        Command::Recipe(args) => {
            let result = api.evaluate_recipe(&RecipeRequest { ingredients: args.ingredients })?;
            emit_json(serde_json::to_value(result)?)
        }
        Command::Kb { command } => run_kb(&command, &api),
    }
}

fn run_kb(command: &KbCommand, api: &HalalCheckApi) -> Result<()> {
    match command {
        KbCommand::Report => emit_json(serde_json::to_value(api.knowledge_base_report())?),
        KbCommand::Fingerprint => emit_json(serde_json::json!({
            "fingerprint": api.fingerprint(),
            "records": api.knowledge_base().len(),
            "api_contract_version": API_CONTRACT_VERSION
        })),
    }
}
