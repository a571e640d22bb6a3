//! sqlviz CLI - browse SQLite files and serve the chart API
//!
//! Usage:
//!   sqlviz serve [--port <port>] [--open]
//!   sqlviz init
//!   sqlviz tables <db>
//!   sqlviz schema <db> <table>
//!   sqlviz query <db> <table> [--page N] [--page-size N] [--sort col] [--desc] [--filter col=value]...
//!   sqlviz sample <db> <table> [--size N]
//!   sqlviz export <db> <table> [--filter col=value]...
//!   sqlviz templates [--category <name>]
//!
//! Examples:
//!   sqlviz query sales.db orders --sort amount --desc --filter region=east
//!   SQLVIZ_LOG=debug sqlviz serve --open

use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlviz::config::Settings;
use sqlviz::connection::DbHandle;
use sqlviz::export::export_table;
use sqlviz::query::{
    execute_query, filters_from_query, get_sample_data, get_table_schema, get_tables, Filters,
    QueryRequest,
};
use sqlviz::sql::SortDir;
use sqlviz::store::AppStore;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV_VAR: &str = "SQLVIZ_LOG";

#[derive(Parser)]
#[command(name = "sqlviz")]
#[command(about = "sqlviz - browse SQLite databases and turn tables into charts")]
#[command(version)]
struct Cli {
    /// Config file (defaults: $SQLVIZ_CONFIG, ./sqlviz.toml, user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Open the browser once listening
        #[arg(long)]
        open: bool,
    },

    /// Create the app store and seed the default templates
    Init,

    /// List the tables in a database file
    Tables {
        /// Path to the SQLite file
        db: PathBuf,
    },

    /// Show a table's declared columns
    Schema {
        db: PathBuf,
        table: String,
    },

    /// Print one page of a table as JSON
    Query {
        db: PathBuf,
        table: String,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        page_size: Option<u32>,

        /// Column to sort by
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Substring filter, `column=value` (repeatable)
        #[arg(short, long = "filter", value_name = "COLUMN=VALUE")]
        filters: Vec<String>,
    },

    /// Print random rows of a table as JSON
    Sample {
        db: PathBuf,
        table: String,

        #[arg(long)]
        size: Option<u32>,
    },

    /// Write a table as CSV to stdout
    Export {
        db: PathBuf,
        table: String,

        /// Substring filter, `column=value` (repeatable)
        #[arg(short, long = "filter", value_name = "COLUMN=VALUE")]
        filters: Vec<String>,
    },

    /// List insight templates
    Templates {
        #[arg(long)]
        category: Option<String>,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        #[cfg(feature = "server")]
        Commands::Serve { port, host, open } => cmd_serve(settings, port, host, open),
        Commands::Init => cmd_init(&settings),
        Commands::Tables { db } => cmd_tables(&db),
        Commands::Schema { db, table } => cmd_schema(&db, &table),
        Commands::Query {
            db,
            table,
            page,
            page_size,
            sort,
            desc,
            filters,
        } => {
            let mut request = QueryRequest::new(table).filters(parse_filter_args(&filters));
            if let Some(page) = page {
                request = request.page(page);
            }
            if let Some(size) = page_size {
                request = request.page_size(size);
            }
            if let Some(column) = sort {
                let dir = if desc { SortDir::Desc } else { SortDir::Asc };
                request = request.sort(column, dir);
            }
            cmd_query(&settings, &db, &request)
        }
        Commands::Sample { db, table, size } => cmd_sample(&settings, &db, &table, size),
        Commands::Export { db, table, filters } => {
            cmd_export(&settings, &db, &table, parse_filter_args(&filters))
        }
        Commands::Templates { category } => cmd_templates(&settings, category.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings, sqlviz::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

/// `column=value` arguments as substring filters; malformed ones are ignored.
fn parse_filter_args(args: &[String]) -> Filters {
    let keyed: Vec<(String, &str)> = args
        .iter()
        .filter_map(|arg| arg.split_once('='))
        .map(|(column, value)| (format!("filter[{}]", column), value))
        .collect();
    filters_from_query(keyed.iter().map(|(k, v)| (k.as_str(), *v)))
}

fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(feature = "server")]
fn cmd_serve(mut settings: Settings, port: Option<u16>, host: Option<String>, open: bool) -> CmdResult {
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(sqlviz::web::serve(settings, open))
}

fn cmd_init(settings: &Settings) -> CmdResult {
    let path = settings.app_db_path()?;
    let store = AppStore::open(&path)?;
    let seeded = store.seed_default_templates()?;
    println!("App store: {}", path.display());
    println!("Seeded {} default template(s)", seeded);
    Ok(())
}

fn cmd_tables(db: &Path) -> CmdResult {
    let handle = DbHandle::open(db)?;
    for table in get_tables(&handle.lock())? {
        println!("{}", table);
    }
    Ok(())
}

fn cmd_schema(db: &Path, table: &str) -> CmdResult {
    let handle = DbHandle::open(db)?;
    let columns = get_table_schema(&handle.lock(), table)?;
    if columns.is_empty() {
        return Err(format!("Table does not exist: {}", table).into());
    }
    for column in columns {
        println!("{}\t{}", column.name, column.declared_type);
    }
    Ok(())
}

fn cmd_query(settings: &Settings, db: &Path, request: &QueryRequest) -> CmdResult {
    let handle = DbHandle::open(db)?;
    let result = execute_query(&handle.lock(), request, &settings.limits.query_limits())?;
    print_json(&result)
}

fn cmd_sample(settings: &Settings, db: &Path, table: &str, size: Option<u32>) -> CmdResult {
    let handle = DbHandle::open(db)?;
    let rows = get_sample_data(
        &handle.lock(),
        table,
        size,
        &settings.limits.query_limits(),
    )?;
    print_json(&rows)
}

fn cmd_export(settings: &Settings, db: &Path, table: &str, filters: Filters) -> CmdResult {
    let handle = DbHandle::open(db)?;
    let csv = export_table(&handle.lock(), table, filters, settings.limits.export_rows)?;
    print!("{}", csv);
    Ok(())
}

fn cmd_templates(settings: &Settings, category: Option<&str>) -> CmdResult {
    let store = AppStore::open(&settings.app_db_path()?)?;
    store.seed_default_templates()?;
    let templates = match category {
        Some(category) => store.list_templates_by_category(category)?,
        None => store.list_templates()?,
    };
    for template in templates {
        println!(
            "{:>4}  {:<8}  {:<24}  {}",
            template.id, template.chart_type, template.name, template.category
        );
    }
    Ok(())
}
