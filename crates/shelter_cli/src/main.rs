//! Operator CLI over the shelter record store.
//!
//! # Responsibility
//! - Expose record manager operations for local inspection and seeding.
//! - Print results as JSON on stdout and failures on stderr.

use chrono::Local;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use shelter_core::classify;
use shelter_core::{
    init_logging, open_db, Document, NewAnimal, RecordManager, ShelterConfig, SqliteCollection,
};
use std::error::Error;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Animal shelter record store CLI
#[derive(Parser)]
#[command(name = "shelter_cli")]
#[command(version, about = "Animal shelter record store CLI", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Collection name (overrides SHELTER_COLLECTION)
    #[arg(long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check core linkage
    Ping,
    /// Print the core version
    Version,
    /// Count records in the collection
    Count,
    /// List records matching a JSON filter
    Find {
        /// JSON object filter, e.g. '{"breed":"Newfoundland"}'
        #[arg(default_value = "{}")]
        filter: String,
    },
    /// Insert a new animal from a JSON object
    Insert { fields: String },
    /// Apply a JSON object of new values to matching records
    Update { filter: String, values: String },
    /// Delete records matching a JSON filter
    Delete {
        filter: String,
        /// Delete every match instead of the first
        #[arg(long)]
        many: bool,
    },
    /// Show derived ages and rescue categories without writing
    Classify { fields: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = ShelterConfig::from_env();
    if let Some(collection) = cli.collection {
        config.collection = collection;
    }
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    match cli.command {
        Command::Ping => println!("shelter_core ping={}", shelter_core::ping()),
        Command::Version => println!("shelter_core version={}", shelter_core::core_version()),
        Command::Classify { fields } => print_json(&classify_preview(&parse_json(&fields)?)?)?,
        command => run_store_command(&config, command)?,
    }
    Ok(())
}

fn run_store_command(config: &ShelterConfig, command: Command) -> CliResult<()> {
    let conn = open_db(&config.db_path)?;
    let manager = RecordManager::new(SqliteCollection::try_new(&conn, &config.collection)?);

    match command {
        Command::Count => {
            let count = manager.find(&json!({}))?.len();
            println!("{count}");
        }
        Command::Find { filter } => {
            let documents = manager.find(&parse_json(&filter)?)?;
            print_json(&Value::Array(
                documents.into_iter().map(Value::Object).collect(),
            ))?;
        }
        Command::Insert { fields } => {
            let outcome = manager.insert(&parse_json(&fields)?)?;
            println!("{}", outcome.message());
            if outcome.animal_id().is_none() {
                return Err("insert was not acknowledged".into());
            }
        }
        Command::Update { filter, values } => {
            let modified = manager.update(&parse_json(&filter)?, &parse_json(&values)?)?;
            println!("{modified}");
        }
        Command::Delete { filter, many } => {
            let deleted = manager.delete(&parse_json(&filter)?, many)?;
            println!("{deleted}");
        }
        Command::Ping | Command::Version | Command::Classify { .. } => {}
    }
    Ok(())
}

fn classify_preview(fields: &Value) -> CliResult<Value> {
    let document: &Document = fields
        .as_object()
        .ok_or("classify input must be a JSON object")?;
    let draft = NewAnimal::from_document(document)?.draft(Local::now().naive_local())?;
    Ok(json!({
        "age_upon_outcome": draft.age_upon_outcome,
        "age_upon_outcome_in_weeks": draft.age_upon_outcome_in_weeks,
        "rescue_type": classify::preview(&draft),
    }))
}

fn parse_json(raw: &str) -> CliResult<Value> {
    serde_json::from_str(raw).map_err(|err| format!("invalid JSON argument: {err}").into())
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
