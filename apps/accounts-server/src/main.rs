use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use db::{ConnectOpts, DbEngine, DbHandle};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use accounts::{AccountsConfig, AccountsModule};
use modkit::{with_middleware, HttpOptions};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MODULE_NAME: &str = "accounts";

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Accounts Server - clients and users over HTTP
#[derive(Parser)]
#[command(name = "accounts-server")]
#[command(about = "Accounts Server - clients and users over HTTP")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
    /// Print the schema DDL for the configured database engine
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Accounts Server starting");

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
        Commands::Schema => print_schema(&config),
    }
}

/// Everything `run` needs, resolved and validated up front.
struct Settings {
    addr: SocketAddr,
    dsn: String,
    engine: DbEngine,
    connect: ConnectOpts,
    http: HttpOptions,
    accounts: AccountsConfig,
}

fn resolve(config: &AppConfig) -> Result<Settings> {
    let raw_addr = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = raw_addr
        .parse()
        .with_context(|| format!("invalid bind address '{raw_addr}'"))?;

    let dsn = config
        .get_string("database.url")
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("database.url is not configured"))?;
    let engine = DbHandle::detect(&dsn)?;
    let dsn = if engine == DbEngine::Sqlite {
        absolutize_sqlite_dsn(&dsn, Path::new(&config.server.home_dir))?
    } else {
        dsn
    };

    let db_config = config.database.as_ref();
    let connect = ConnectOpts {
        max_conns: db_config.and_then(|d| d.max_conns),
        acquire_timeout: Some(Duration::from_secs(5)),
        sqlite_busy_timeout: db_config
            .and_then(|d| d.busy_timeout_ms)
            .map(|ms| Duration::from_millis(u64::from(ms))),
        create_sqlite_dirs: true,
        ..Default::default()
    };

    let http = HttpOptions {
        timeout: (config.server.timeout_sec > 0)
            .then(|| Duration::from_secs(config.server.timeout_sec)),
        body_limit_bytes: config.server.body_limit_bytes,
        ..Default::default()
    };

    Ok(Settings {
        addr,
        dsn,
        engine,
        connect,
        http,
        accounts: config.module_config(MODULE_NAME)?,
    })
}

async fn run_server(config: AppConfig) -> Result<()> {
    let settings = resolve(&config)?;

    tracing::info!(engine = ?settings.engine, "Connecting to database");
    let db = Arc::new(DbHandle::connect(&settings.dsn, settings.connect).await?);

    let root = CancellationToken::new();
    let signals = modkit::runtime::cancel_on_shutdown(root.clone());

    let module = AccountsModule::new(db.clone(), &settings.accounts);
    let app = with_middleware(module.router(root.clone()), &settings.http);

    let listener = tokio::net::TcpListener::bind(settings.addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.addr))?;
    tracing::info!(addr = %settings.addr, "HTTP server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(root.clone().cancelled_owned())
        .await;

    stop_signal_watcher(&root, signals).await;

    db.close().await;
    tracing::info!("Accounts Server stopped");
    served.context("HTTP server failed")
}

/// Cancels `root` (in case the server ended on its own) and waits for the watcher.
async fn stop_signal_watcher(root: &CancellationToken, watcher: JoinHandle<()>) {
    root.cancel();
    if let Err(e) = watcher.await {
        tracing::warn!(error = %e, "shutdown signal watcher did not exit cleanly");
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let settings = resolve(config)?;
    if settings.accounts.max_name_len == 0 {
        bail!("modules.accounts.max_name_len must be positive");
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Database engine: {:?}", settings.engine);
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn print_schema(config: &AppConfig) -> Result<()> {
    let settings = resolve(config)?;
    let ddl = match settings.engine {
        DbEngine::Postgres => accounts::schema::POSTGRES,
        DbEngine::Sqlite => accounts::schema::SQLITE,
        DbEngine::MySql => bail!("no schema is shipped for MySQL"),
    };
    print!("{ddl}");
    Ok(())
}
