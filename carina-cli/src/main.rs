mod manifest;
mod state;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use carina_core::differ::create_plan;
use carina_core::effect::Effect;
use carina_core::interpreter::{EffectOutcome, Interpreter, InterpreterConfig};
use carina_core::plan::Plan;
use carina_core::provider::Provider;
use carina_core::resource::{Resource, ResourceId, State, Value};
use carina_core::schema::ResourceSchema;
use carina_provider_azurerm::schemas;
use carina_provider_azurerm::{AzurermProvider, StopContext};

use manifest::Manifest;
use state::{LocalState, StateFile};

#[derive(Parser)]
#[command(name = "carina")]
#[command(about = "Manage Azure App Service certificates and hostname bindings", long_about = None)]
struct Cli {
    /// Path to the state file
    #[arg(long, global = true, default_value = LocalState::DEFAULT_STATE_FILE)]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest against the resource schemas
    Validate {
        /// Path to the JSON manifest
        #[arg(default_value = "carina.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to the JSON manifest
        #[arg(default_value = "carina.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to the JSON manifest
        #[arg(default_value = "carina.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Destroy every resource tracked in state
    Destroy {
        /// Path to the JSON manifest
        #[arg(default_value = "carina.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Adopt an existing remote object into state
    Import {
        /// Resource type, e.g. app_service_custom_hostname_binding
        resource_type: String,
        /// Resource name in the manifest
        name: String,
        /// ARM resource ID of the remote object
        identifier: String,

        /// Path to the JSON manifest
        #[arg(long, default_value = "carina.json")]
        file: PathBuf,
    },
    /// Update state from the remote objects
    Refresh {
        /// Path to the JSON manifest
        #[arg(default_value = "carina.json")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let local = LocalState::with_path(&cli.state);

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file, &local).await,
        Commands::Apply { file, auto_approve } => run_apply(&file, &local, auto_approve).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, &local, auto_approve).await,
        Commands::Import {
            resource_type,
            name,
            identifier,
            file,
        } => run_import(&file, &local, ResourceId::new(resource_type, name), &identifier).await,
        Commands::Refresh { file } => run_refresh(&file, &local).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn get_schemas() -> HashMap<String, ResourceSchema> {
    let mut all_schemas = HashMap::new();
    for schema in schemas::all_schemas() {
        all_schemas.insert(schema.resource_type.clone(), schema);
    }
    all_schemas
}

fn validate_resources(resources: &[Resource]) -> Result<(), String> {
    let schemas = get_schemas();
    let mut all_errors = Vec::new();

    for resource in resources {
        match schemas.get(&resource.id.resource_type) {
            Some(schema) => {
                if let Err(errors) = schema.validate(&resource.attributes) {
                    for error in errors {
                        all_errors.push(format!("{}: {}", resource.id, error));
                    }
                }
            }
            None => all_errors.push(format!(
                "{}: unknown resource type '{}'",
                resource.id, resource.id.resource_type
            )),
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors.join("\n"))
    }
}

/// Build the provider and wire Ctrl-C to its stop context
fn get_provider(manifest: &Manifest) -> Result<AzurermProvider, String> {
    let (handle, stop) = StopContext::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "Interrupt received, cancelling in-flight requests...".yellow());
            handle.stop();
        }
    });

    AzurermProvider::from_attributes(&manifest.provider_attributes(), stop)
        .map_err(|e| describe_error(&e))
}

/// Read every tracked resource, dropping those that no longer exist
async fn refresh_states<P: Provider>(
    provider: &P,
    state_file: &mut StateFile,
) -> Result<HashMap<ResourceId, State>, String> {
    let mut current = HashMap::new();
    let priors = state_file.states().map_err(|e| e.to_string())?;
    for prior in priors.into_values() {
        let state = provider
            .read(&prior)
            .await
            .map_err(|e| format!("Failed to read state: {}", describe_error(&e)))?;
        if !state.exists {
            println!(
                "  {} {} no longer exists, removing from state",
                "!".yellow().bold(),
                prior.id
            );
        }
        state_file.record(&state);
        if state.exists {
            current.insert(state.id.clone(), state);
        }
    }
    Ok(current)
}

fn run_validate(file: &Path) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    let resources = manifest.resources();

    println!("{}", "Validating...".cyan());

    validate_resources(&resources)?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", resources.len())
            .green()
            .bold()
    );

    for resource in &resources {
        println!("  • {}", resource.id);
    }

    Ok(())
}

async fn run_plan(file: &Path, local: &LocalState) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    let resources = manifest.resources();
    validate_resources(&resources)?;

    let provider = get_provider(&manifest)?;
    let mut state_file = local.load().map_err(|e| e.to_string())?;
    let current = refresh_states(&provider, &mut state_file).await?;

    let schemas = get_schemas();
    let plan = create_plan(&resources, &current, &schemas);
    print_plan(&plan, &schemas);
    Ok(())
}

async fn run_apply(file: &Path, local: &LocalState, auto_approve: bool) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    let resources = manifest.resources();
    validate_resources(&resources)?;

    let provider = get_provider(&manifest)?;
    let mut state_file = local.load().map_err(|e| e.to_string())?;
    let current = refresh_states(&provider, &mut state_file).await?;

    let schemas = get_schemas();
    let plan = create_plan(&resources, &current, &schemas);

    if plan.is_empty() {
        local.save(&mut state_file).map_err(|e| e.to_string())?;
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan, &schemas);
    println!();

    if !auto_approve && !confirm("Do you want to perform these actions?")? {
        println!("{}", "Apply cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let (success_count, failure_count) =
        execute_plan(provider, &plan, &mut state_file, local).await?;

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            success_count, failure_count
        ))
    }
}

async fn run_destroy(file: &Path, local: &LocalState, auto_approve: bool) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    let provider = get_provider(&manifest)?;
    let mut state_file = local.load().map_err(|e| e.to_string())?;
    let current = refresh_states(&provider, &mut state_file).await?;

    let schemas = get_schemas();
    // Nothing is desired, so every tracked resource becomes a Delete
    let plan = create_plan(&[], &current, &schemas);

    if plan.is_empty() {
        local.save(&mut state_file).map_err(|e| e.to_string())?;
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.effects().len().to_string().red());
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let (success_count, failure_count) =
        execute_plan(provider, &plan, &mut state_file, local).await?;

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Destroy complete! {} resources destroyed.", success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            success_count, failure_count
        ))
    }
}

async fn run_import(
    file: &Path,
    local: &LocalState,
    id: ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    let provider = get_provider(&manifest)?;
    let mut state_file = local.load().map_err(|e| e.to_string())?;

    if state_file.find_resource(&id).is_some() {
        return Err(format!("{} is already managed in {}", id, local.path().display()));
    }

    let state = provider
        .import(&id, identifier)
        .await
        .map_err(|e| describe_error(&e))?;
    state_file.record(&state);
    local.save(&mut state_file).map_err(|e| e.to_string())?;

    println!("{}", format!("✓ Imported {}", id).green().bold());
    print_attributes(&state.attributes, get_schemas().get(&id.resource_type), "    ");
    Ok(())
}

async fn run_refresh(file: &Path, local: &LocalState) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    let provider = get_provider(&manifest)?;
    let mut state_file = local.load().map_err(|e| e.to_string())?;

    let current = refresh_states(&provider, &mut state_file).await?;
    local.save(&mut state_file).map_err(|e| e.to_string())?;

    println!(
        "{}",
        format!("✓ Refreshed {} resources.", current.len()).green().bold()
    );
    Ok(())
}

/// Run the plan, recording each outcome in state; returns (succeeded, failed)
async fn execute_plan<P: Provider>(
    provider: P,
    plan: &Plan,
    state_file: &mut StateFile,
    local: &LocalState,
) -> Result<(usize, usize), String> {
    let interpreter = Interpreter::new(provider).with_config(InterpreterConfig {
        dry_run: false,
        continue_on_error: true,
    });
    let result = interpreter.apply(plan).await;

    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(outcome) => {
                println!("  {} {}", "✓".green(), format_effect(effect));
                match outcome {
                    EffectOutcome::Created { state }
                    | EffectOutcome::Updated { state }
                    | EffectOutcome::Replaced { state } => state_file.record(state),
                    EffectOutcome::Deleted { id } => {
                        state_file.remove_resource(id);
                    }
                    EffectOutcome::Skipped { .. } => {}
                }
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), describe_error(e));
            }
        }
    }

    // Persist whatever succeeded, even when something failed
    local.save(state_file).map_err(|e| e.to_string())?;

    Ok((result.success_count, result.failure_count))
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!("  {}", "Only 'yes' will be accepted to approve.".yellow());
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    println!();

    Ok(input.trim() == "yes")
}

fn print_plan(plan: &Plan, schemas: &HashMap<String, ResourceSchema>) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    let attr_prefix = "    ";
    for effect in plan.effects() {
        let schema = schemas.get(&effect.resource_id().resource_type);
        match effect {
            Effect::Create(r) => {
                println!("  {} {}", "+".green().bold(), r.id.to_string().cyan().bold());
                print_attributes(&r.attributes, schema, attr_prefix);
            }
            Effect::Update { id, from, to } => {
                println!("  {} {}", "~".yellow().bold(), id.to_string().cyan().bold());
                print_changes(from, to, schema, attr_prefix, &[]);
            }
            Effect::Replace { from, to, forcing } => {
                println!(
                    "  {} {} {}",
                    "-/+".red().bold(),
                    to.id.to_string().cyan().bold(),
                    "(must be replaced)".red()
                );
                print_changes(from, to, schema, attr_prefix, forcing);
            }
            Effect::Delete { id, .. } => {
                println!("  {} {}", "-".red().bold(), id.to_string().cyan().bold());
            }
        }
    }

    println!();
    let summary = plan.summary();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().red(),
        summary.delete.to_string().red()
    );
}

fn print_attributes(attributes: &HashMap<String, Value>, schema: Option<&ResourceSchema>, prefix: &str) {
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    for key in keys {
        println!(
            "{}{}: {}",
            prefix,
            key,
            display_value(schema, key, &attributes[key]).green()
        );
    }
}

fn print_changes(
    from: &State,
    to: &Resource,
    schema: Option<&ResourceSchema>,
    prefix: &str,
    forcing: &[String],
) {
    for key in changed_keys(from, to, schema) {
        let old_str = from
            .attributes
            .get(&key)
            .map(|v| display_value(schema, &key, v))
            .unwrap_or_else(|| "(none)".to_string());
        let new_str = to
            .attributes
            .get(&key)
            .map(|v| display_value(schema, &key, v))
            .unwrap_or_else(|| "(none)".to_string());
        let marker = if forcing.contains(&key) {
            format!(" {}", "# forces replacement".red())
        } else {
            String::new()
        };
        println!("{}{}: {} → {}{}", prefix, key, old_str.red(), new_str.green(), marker);
    }
}

/// Non-computed attributes whose desired value differs from state
fn changed_keys(from: &State, to: &Resource, schema: Option<&ResourceSchema>) -> Vec<String> {
    let mut keys: Vec<String> = to
        .attributes
        .keys()
        .chain(from.attributes.keys())
        .filter(|k| !schema.and_then(|s| s.attributes.get(*k)).is_some_and(|a| a.computed))
        .cloned()
        .collect();
    keys.sort();
    keys.dedup();
    keys.retain(|key| match (from.attributes.get(key), to.attributes.get(key)) {
        (Some(old), Some(new)) => !schema
            .and_then(|s| s.attributes.get(key))
            .map_or(old == new, |a| a.values_equal(new, old)),
        (None, None) => false,
        _ => true,
    });
    keys
}

fn display_value(schema: Option<&ResourceSchema>, key: &str, value: &Value) -> String {
    if schema.is_some_and(|s| s.is_sensitive(key)) {
        return "(sensitive)".to_string();
    }
    format_value(value)
}

fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Create(r) => format!("Create {}", r.id),
        Effect::Update { id, .. } => format!("Update {}", id),
        Effect::Replace { to, .. } => format!("Replace {}", to.id),
        Effect::Delete { id, .. } => format!("Delete {}", id),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut strs: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            strs.sort();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

/// Error message including its cause chain
fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
