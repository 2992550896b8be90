//! formlogic CLI: author branching forms, evaluate answers, record responses.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use formlogic_core::FormError;

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(
    name = "formlogic",
    version,
    about = "Branching forms with per-response quota evaluation"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and example form
    Init,

    /// Validate form definition JSON files
    Validate {
        /// Path to a definition file or a directory of them
        #[arg(long)]
        definition: PathBuf,
    },

    /// Evaluate answers against a definition without storing anything
    Evaluate {
        /// Definition JSON file
        #[arg(long)]
        definition: PathBuf,

        /// Answers JSON file (an array, or an object with `answers`)
        #[arg(long)]
        answers: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage stored form definitions
    Forms {
        #[command(subcommand)]
        action: FormsAction,
    },

    /// Submit a response payload
    Submit {
        /// Submission JSON file
        payload: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// List stored responses, newest first, or show one by id
    Responses {
        /// Show a single response by id instead of listing
        id: Option<String>,

        /// Only responses to this form
        #[arg(long)]
        form: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Aggregate statistics over a form's responses
    Stats {
        /// Form id
        id: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum FormsAction {
    /// Save a new definition from a JSON file
    Save { path: PathBuf },

    /// List definitions, newest first
    List {
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print one definition as JSON
    Show { id: String },

    /// Replace a definition from a JSON file
    Update { id: String, path: PathBuf },

    /// Delete a definition
    Delete { id: String },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("formlogic=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { definition } => commands::validate::execute(definition, config),
        Commands::Evaluate {
            definition,
            answers,
            format,
        } => commands::evaluate::execute(definition, answers, format, config),
        Commands::Forms { action } => match action {
            FormsAction::Save { path } => commands::forms::save(path, config).await,
            FormsAction::List { format } => commands::forms::list(format, config).await,
            FormsAction::Show { id } => commands::forms::show(id, config).await,
            FormsAction::Update { id, path } => commands::forms::update(id, path, config).await,
            FormsAction::Delete { id } => commands::forms::delete(id, config).await,
        },
        Commands::Submit { payload, format } => {
            commands::submit::execute(payload, format, config).await
        }
        Commands::Responses { id, form, format } => {
            commands::responses::execute(id, form, format, config).await
        }
        Commands::Stats { id, format } => commands::stats::execute(id, format, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        let form_error = e.downcast_ref::<FormError>();
        for detail in form_error.map(FormError::validation_errors).unwrap_or_default() {
            eprintln!("  {detail}");
        }
        process::exit(form_error.map_or(1, |fe| fe.class().exit_code()));
    }
}
