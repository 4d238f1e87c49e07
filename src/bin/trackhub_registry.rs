use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use trackhub_registry::app::App;
use trackhub_registry::config::{ConfigLoader, ResolvedConfig};
use trackhub_registry::domain::{LookupKind, Owner};
use trackhub_registry::error::HubError;
use trackhub_registry::fetch::HttpFetcher;
use trackhub_registry::output::{JsonOutput, SeedSummary};
use trackhub_registry::search::ElasticsearchClient;
use trackhub_registry::store::{Repository, SqliteStore};

#[derive(Parser)]
#[command(name = "trackhub-registry")]
#[command(about = "Ingest track hubs into the registry database and search index")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch, parse and register a hub")]
    Submit(SubmitArgs),
    #[command(about = "Delete a registered hub and its search documents")]
    Delete(DeleteArgs),
    #[command(about = "Deliver queued trackdb documents to the search index")]
    Reindex,
    #[command(about = "Seed the data type, file type and visibility tables")]
    Seed,
}

#[derive(Args)]
struct SubmitArgs {
    hub_url: String,

    #[arg(long)]
    owner_id: i64,

    #[arg(long)]
    owner_email: String,

    #[arg(long)]
    data_type: Option<String>,
}

#[derive(Args)]
struct DeleteArgs {
    hub_url: String,

    #[arg(long)]
    owner_id: i64,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<HubError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HubError) -> u8 {
    match error {
        HubError::AlreadySubmitted { .. }
        | HubError::SubmittedByOther { .. }
        | HubError::InvalidDataType { .. }
        | HubError::NotOwner { .. }
        | HubError::HubNotFound(_) => 2,
        HubError::Http { .. } | HubError::HttpStatus { .. } | HubError::InvalidHubUrl(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Seed => {
            let store = SqliteStore::open(&config.database_path)?;
            let lookups = store.seed_lookups()?;
            JsonOutput::print_seed(&SeedSummary {
                data_types: lookups.len(LookupKind::DataType),
                file_types: lookups.len(LookupKind::FileType),
                visibilities: lookups.len(LookupKind::Visibility),
            })
            .into_diagnostic()
        }
        Commands::Submit(args) => {
            let app = build_app(&config)?;
            let owner = Owner::new(args.owner_id, args.owner_email);
            let result = app.submit(&args.hub_url, args.data_type.as_deref(), &owner)?;
            JsonOutput::print_submission(&result).into_diagnostic()
        }
        Commands::Delete(args) => {
            let app = build_app(&config)?;
            let owner = Owner::new(args.owner_id, String::new());
            let result = app.delete_hub(&args.hub_url, &owner)?;
            JsonOutput::print_delete(&result).into_diagnostic()
        }
        Commands::Reindex => {
            let app = build_app(&config)?;
            let result = app.reindex()?;
            JsonOutput::print_index(&result).into_diagnostic()
        }
    }
}

fn build_app(
    config: &ResolvedConfig,
) -> Result<App<SqliteStore, HttpFetcher, ElasticsearchClient>, HubError> {
    let store = SqliteStore::open(&config.database_path)?;
    let fetcher = HttpFetcher::new(&config.http)?;
    let search = ElasticsearchClient::new(&config.search_url, &config.http)?;
    App::initialize(store, fetcher, search, config.search_index.clone())
}
