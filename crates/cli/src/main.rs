use crate::{
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use connectors::{
    source::{DirectorySource, MssqlSource, SourceReader},
    sql::{insert::ConnectionProvider, memory::MemoryProvider, mssql::MssqlProvider},
};
use engine_config::{
    ContractError, EnvManager, Settings, load_contract,
    validation::contract::check_contract,
};
use engine_processing::{DataMapper, Validator};
use engine_runtime::{Coordinator, CoordinatorConfig};
use model::MappingContract;
use std::{path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

/// Key column of the source table used for keyset pagination.
const SOURCE_KEY_COLUMN: &str = "app_id";

#[derive(Parser)]
#[command(
    name = "xmlmigrate",
    version,
    about = "Contract-driven XML to relational migration"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Log at debug level")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(code) => code.into(),
        Err(CliError::ShutdownRequested) => ExitCode::ShutdownRequested.into(),
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError.into()
        }
    }
}

/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Migrate {
            contract,
            config,
            xml_dir,
            dry_run,
            json,
        } => migrate(&contract, config.as_deref(), xml_dir.as_deref(), dry_run, json).await,

        Commands::Map {
            contract,
            xml,
            pretty,
            flatten,
        } => {
            let contract = Arc::new(load_contract(&contract)?);
            let raw = read_file(&xml).await?;
            let validator = Validator::new(contract.clone());
            let (validation, tree) = validator.validate_document(&raw, &xml.display().to_string());

            let Some(tree) = tree else {
                return Err(CliError::Rejected(validation.validation_errors.join("; ")));
            };
            if flatten {
                output::print_json(&tree.flatten(), pretty)?;
                return Ok(ExitCode::Success);
            }
            if !validation.can_process {
                return Err(CliError::Rejected(validation.validation_errors.join("; ")));
            }

            let mapper = DataMapper::new(contract)?;
            let records = mapper.map(&tree, &validation)?;
            output::print_json(&records.to_json(mapper.insertion_order()), pretty)?;
            Ok(ExitCode::Success)
        }

        Commands::CheckContract { contract } => check(&contract),

        Commands::Validate { contract, xml } => {
            let contract = Arc::new(load_contract(&contract)?);
            let raw = read_file(&xml).await?;
            let result = Validator::new(contract).validate(&raw, &xml.display().to_string());
            output::print_validation(&result)?;
            Ok(if result.can_process {
                ExitCode::Success
            } else {
                ExitCode::PartialFailure
            })
        }
    }
}

async fn migrate(
    contract_path: &Path,
    config: Option<&Path>,
    xml_dir: Option<&Path>,
    dry_run: bool,
    as_json: bool,
) -> Result<ExitCode, CliError> {
    let mut env = EnvManager::from_process();
    if env.load_optional(".env")? {
        info!("Loaded .env");
    }
    let mut settings = Settings::load(config, &env)?;
    settings.dry_run |= dry_run;

    let contract = Arc::new(load_contract(contract_path)?);
    let provider = insert_provider(&settings, &contract);

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let coordinator = Coordinator::new(
        contract.clone(),
        provider,
        CoordinatorConfig::from(&settings),
    )
    .with_cancellation(shutdown.cancel_token());

    let mut source = open_source(&settings, &contract, xml_dir).await?;
    info!(
        workers = settings.workers,
        dry_run = settings.dry_run,
        limit = ?settings.limit,
        "Starting migration"
    );
    let outcome = coordinator
        .run_source(source.as_mut(), settings.limit)
        .await?;
    output::print_summary(&outcome.summary, as_json)?;

    if shutdown.is_shutdown_requested() {
        return Err(CliError::ShutdownRequested);
    }
    Ok(if outcome.summary.failed > 0 {
        ExitCode::PartialFailure
    } else {
        ExitCode::Success
    })
}

fn insert_provider(settings: &Settings, contract: &MappingContract) -> Arc<dyn ConnectionProvider> {
    if settings.dry_run {
        Arc::new(MemoryProvider::new(contract.target_schema.clone()))
    } else {
        Arc::new(MssqlProvider::new(
            settings.connection.clone(),
            contract.target_schema.clone(),
        ))
    }
}

async fn open_source(
    settings: &Settings,
    contract: &MappingContract,
    xml_dir: Option<&Path>,
) -> Result<Box<dyn SourceReader>, CliError> {
    let source: Box<dyn SourceReader> = match xml_dir {
        Some(dir) => Box::new(
            DirectorySource::open(dir, settings.source_page_size)
                .await?
                .start_after(settings.start_after_app_id),
        ),
        None => Box::new(
            MssqlSource::open(
                &settings.connection,
                &contract.source_table,
                &contract.source_column,
                SOURCE_KEY_COLUMN,
                settings.source_page_size,
            )
            .await?
            .start_after(settings.start_after_app_id),
        ),
    };
    Ok(source)
}

fn check(path: &Path) -> Result<ExitCode, CliError> {
    match load_contract(path) {
        Ok(contract) => {
            let findings = check_contract(&contract);
            output::print_findings(&findings);
            println!(
                "Contract OK: {} mapping(s), {} warning(s)",
                contract.mappings.len(),
                findings.len()
            );
            Ok(ExitCode::Success)
        }
        Err(ContractError::Invalid(findings)) => {
            output::print_findings(&findings);
            Err(ContractError::Invalid(findings).into())
        }
        Err(err) => Err(err.into()),
    }
}

async fn read_file(path: &Path) -> Result<String, CliError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::FileRead {
            path: path.display().to_string(),
            source,
        })
}
