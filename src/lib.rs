//! `prodyn`: period-aligned production dynamics over field, fluid and
//! deposit-complex slices.
//!
//! The library half holds the engine ([`dynamics`]), its storage
//! ([`store`]), the demo seeder and the CLI plumbing used by `main.rs`.

pub mod config;
pub mod dynamics;
pub mod output;
pub mod seed;
pub mod store;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ConfigError, Settings};
use crate::dynamics::{
    AggregationRequest, AggregationResult, BucketSize, DepositComplex, DynamicsEngine,
    DynamicsError, FluidType, enum_catalog, validate_result,
};
use crate::seed::SeedPlan;
use crate::store::SqliteFactStore;

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

pub const EXIT_OK: i32 = 0;
pub const EXIT_VALIDATION: i32 = 2;
pub const EXIT_NOT_FOUND: i32 = 3;
pub const EXIT_INTERNAL: i32 = 9;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug, Clone)]
#[command(
    name = "prodyn",
    version,
    about = "Production dynamics by field, fluid and deposit complex"
)]
pub struct Cli {
    /// Machine-readable output; errors go to stderr as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Aggregate production into per-field series and a total.
    Dynamics {
        /// First day included (YYYY-MM-DD).
        #[arg(long = "from")]
        date_from: NaiveDate,
        /// Last day included (YYYY-MM-DD).
        #[arg(long = "to")]
        date_to: NaiveDate,
        /// gas | oil | condensate (Russian names accepted).
        #[arg(long, default_value = "gas")]
        fluid: FluidType,
        /// Restrict to a field id; repeatable.
        #[arg(long = "field-id")]
        field_ids: Vec<i64>,
        /// Restrict to a deposit complex; repeatable.
        #[arg(long = "complex")]
        complexes: Vec<DepositComplex>,
        /// month | quarter | year. Defaults to the configured bucket.
        #[arg(long)]
        bucket: Option<BucketSize>,
        /// SQLite database to read.
        #[arg(long, env = "PRODYN_DB")]
        db: Option<PathBuf>,
        /// Run structural checks on the result and report them.
        #[arg(long)]
        check: bool,
        /// Exit with "not found" when nothing matched.
        #[arg(long)]
        empty_is_not_found: bool,
    },
    /// List accepted fluid types, deposit complexes and bucket sizes.
    Enums,
    /// Write the deterministic demo dataset.
    Seed {
        /// SQLite database to write.
        #[arg(long, env = "PRODYN_DB")]
        db: Option<PathBuf>,
        #[arg(long, default_value_t = 2015)]
        from_year: i32,
        #[arg(long, default_value_t = 2024)]
        to_year: i32,
        /// Delete an existing database first.
        #[arg(long)]
        fresh: bool,
    },
}

#[derive(Debug, Clone)]
pub struct ParsedCli {
    pub cli: Cli,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error surfaced by the binary: exit code plus a structured payload.
#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    pub code: i32,
    pub kind: &'static str,
    pub message: String,
    pub hint: Option<String>,
    pub retryable: bool,
}

impl CliError {
    fn new(code: i32, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            kind,
            message: message.into(),
            hint: None,
            retryable: false,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self })
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CliError {}

impl From<DynamicsError> for CliError {
    fn from(err: DynamicsError) -> Self {
        match &err {
            DynamicsError::Validation(_) | DynamicsError::InvalidAmount { .. } => {
                CliError::new(EXIT_VALIDATION, "validation", err.to_string())
            }
            DynamicsError::NotFound(_) => CliError::new(EXIT_NOT_FOUND, "not_found", err.to_string())
                .with_hint("widen the date range or drop a filter"),
            DynamicsError::Storage(_) => {
                let mut e = CliError::new(EXIT_INTERNAL, "storage", err.to_string());
                e.retryable = true;
                e
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let code = match err {
            ConfigError::Read(_) | ConfigError::NoConfigDir | ConfigError::Serialize(_) => {
                EXIT_INTERNAL
            }
            ConfigError::Parse(_) | ConfigError::Invalid { .. } => EXIT_VALIDATION,
        };
        CliError::new(code, "config", err.to_string())
    }
}

fn internal(kind: &'static str, err: impl std::fmt::Display) -> CliError {
    CliError::new(EXIT_INTERNAL, kind, err.to_string())
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse `raw_args` (including the program name).
///
/// `--help` and `--version` come back as an error with code 0 whose message
/// is the text to print on stdout.
pub fn parse_cli(raw_args: Vec<String>) -> Result<ParsedCli, CliError> {
    match Cli::try_parse_from(raw_args) {
        Ok(cli) => Ok(ParsedCli { cli }),
        Err(err) => {
            use clap::error::ErrorKind;
            match err.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    Err(CliError::new(EXIT_OK, "help", err.to_string()))
                }
                _ => Err(CliError::new(EXIT_VALIDATION, "usage", err.to_string())
                    .with_hint("run `prodyn --help` for usage")),
            }
        }
    }
}

pub fn run_with_parsed(parsed: ParsedCli) -> Result<(), CliError> {
    let cli = parsed.cli;
    let settings = Settings::load()?;
    init_tracing(&settings.log_level, cli.json);
    debug!(?settings, "settings loaded");

    match cli.command {
        Commands::Dynamics {
            date_from,
            date_to,
            fluid,
            field_ids,
            complexes,
            bucket,
            db,
            check,
            empty_is_not_found,
        } => {
            let mut request = AggregationRequest::new(date_from, date_to)
                .with_fluid(fluid)
                .with_bucket(bucket.unwrap_or(settings.default_bucket));
            if !field_ids.is_empty() {
                request = request.with_field_ids(field_ids);
            }
            if !complexes.is_empty() {
                request = request.with_deposit_complexes(complexes);
            }
            let db = db_path(db, &settings)?;
            let empty_is_not_found = empty_is_not_found || settings.empty_is_not_found;
            run_dynamics(&db, &request, cli.json, check, empty_is_not_found)
        }
        Commands::Enums => {
            if cli.json {
                print_json(&serde_json::to_value(enum_catalog()).map_err(|e| internal("serialize", e))?);
            } else {
                print!("{}", output::render_enums());
            }
            Ok(())
        }
        Commands::Seed {
            db,
            from_year,
            to_year,
            fresh,
        } => {
            let db = db_path(db, &settings)?;
            run_seed(&db, SeedPlan::default().with_years(from_year, to_year), fresh, cli.json)
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let ansi = !json && std::env::var_os("NO_COLOR").is_none();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .try_init();
}

fn db_path(flag: Option<PathBuf>, settings: &Settings) -> Result<PathBuf, CliError> {
    match flag {
        Some(path) => Ok(path),
        None => Ok(settings.resolved_db_path()?),
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{value}");
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_dynamics(
    db: &Path,
    request: &AggregationRequest,
    json: bool,
    check: bool,
    empty_is_not_found: bool,
) -> Result<(), CliError> {
    if !db.exists() {
        return Err(CliError::new(
            EXIT_NOT_FOUND,
            "db_missing",
            format!("database {} does not exist", db.display()),
        )
        .with_hint("run `prodyn seed` first or pass --db"));
    }
    let store = SqliteFactStore::open(db)?;
    let result = DynamicsEngine::new().run(&store, request)?;
    if result.is_empty() && empty_is_not_found {
        let err: CliError = DynamicsError::NotFound(format!(
            "no {} production between {} and {}",
            request.fluid_type, request.date_from, request.date_to
        ))
        .into();
        if store.fact_count()? == 0 {
            return Err(err.with_hint("the database holds no production; run `prodyn seed`"));
        }
        return Err(err);
    }

    let report = check.then(|| validate_result(&result));
    emit_dynamics(&result, report.as_ref(), json)?;

    if let Some(report) = report.filter(|r| !r.all_ok()) {
        warn!(
            failures = report.checks.iter().filter(|c| !c.ok).count(),
            "result failed structural checks"
        );
        return Err(CliError::new(
            EXIT_INTERNAL,
            "check_failed",
            "result failed structural checks",
        ));
    }
    Ok(())
}

fn emit_dynamics(
    result: &AggregationResult,
    report: Option<&dynamics::ValidationReport>,
    json: bool,
) -> Result<(), CliError> {
    if json {
        let payload = match report {
            Some(report) => serde_json::json!({
                "result": result.to_json(),
                "validation": report.to_json(),
            }),
            None => result.to_json(),
        };
        print_json(&payload);
    } else {
        print!("{}", output::render_dynamics(result));
        if let Some(report) = report {
            print!("{}", output::render_report(report));
        }
    }
    Ok(())
}

fn run_seed(db: &Path, plan: SeedPlan, fresh: bool, json: bool) -> Result<(), CliError> {
    if fresh && db.exists() {
        std::fs::remove_file(db).map_err(|e| internal("io", e))?;
    }
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| internal("io", e))?;
    }

    let mut store = SqliteFactStore::open(db)?;
    if !store.fields()?.is_empty() {
        return Err(CliError::new(
            EXIT_VALIDATION,
            "already_seeded",
            format!("database {} already holds fields", db.display()),
        )
        .with_hint("pass --fresh to rebuild it"));
    }

    let summary = seed::populate(&mut store, &plan)?;
    if json {
        print_json(&serde_json::json!({
            "db": db.display().to_string(),
            "summary": summary,
        }));
    } else {
        print!("{}", output::render_seed_summary(&summary, db));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
