//! boxscan: run one batch of a resumable Box folder scan.
//!
//! Usage:
//!     boxscan run finance
//!     boxscan run finance --incremental --since 2024-06-01T00:00:00Z
//!     boxscan cursor finance-full
//!
//! The batch result is printed to stdout as JSON; logs go to stderr.

mod error;

use boxscan_config::{Config, SourceConfig};
use boxscan_provider::{Authenticator, DataSource, DataSourceMetadata, TokenAuthenticator};
use boxscan_scan::{RetryPolicy, ScanOptions, ScanResult, Scanner};
use boxscan_store::{Database, Repository, ScanOrder, ScanOrderStore, ScanType};
use clap::{Args, Parser, Subcommand};
use exn::{OptionExt, ResultExt};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

use crate::error::{ErrorKind, Result};

#[derive(Parser, Debug)]
#[command(name = "boxscan", version, about = "Resumable, batched metadata scans of Box folders")]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long, global = true, env = "BOXSCAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the next batch for a configured data source
    Run(RunArgs),
    /// Print the stored cursor of a scan order
    Cursor {
        /// Scan order identifier
        order: String,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct RunArgs {
    /// Data source identifier from the configuration
    source: String,
    /// Scan order to continue (defaults to "<source>-full" or "<source>-incremental")
    #[arg(long)]
    order: Option<String>,
    /// Only report files changed since the reference time
    #[arg(long)]
    incremental: bool,
    /// Reference time for a new incremental scan order (RFC 3339)
    #[arg(long, requires = "incremental", value_parser = parse_timestamp)]
    since: Option<OffsetDateTime>,
}

impl RunArgs {
    fn scan_type(&self) -> ScanType {
        if self.incremental { ScanType::Incremental } else { ScanType::Full }
    }

    fn order_id(&self) -> String {
        self.order.clone().unwrap_or_else(|| format!("{}-{}", self.source, self.scan_type()))
    }
}

/// The outcome of one batch, and of recording the end of the sweep if the
/// batch finished it.
struct Batch {
    result: ScanResult,
    completion: Result<()>,
}

fn parse_timestamp(value: &str) -> std::result::Result<OffsetDateTime, String> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

fn data_source(id: &str, config: &SourceConfig) -> DataSource {
    DataSource {
        id: id.to_string(),
        auth_type: Some(config.auth_type.clone()),
        metadata: DataSourceMetadata {
            folder_id: config.folder_id.clone(),
        },
        credentials: json!({ "access_token": config.access_token }),
    }
}

fn scan_options(config: &Config) -> ScanOptions {
    ScanOptions {
        max_batch_size: config.scan.max_batch_size,
        rate_limit_delay: config.scan.rate_limit_delay(),
        retry: RetryPolicy::new(config.scan.max_retries, config.scan.retry_base_delay()),
    }
}

fn exit_code(result: &ScanResult) -> ExitCode {
    if result.is_error() { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

async fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Store)?;
    }
    Database::connect(&config.database).await.or_raise(|| ErrorKind::Store)
}

/// Fetch the scan order, creating it on first use.
///
/// An existing order keeps its scan type and reference time; asking for a
/// different reference time is an error.
async fn scan_order(repo: &Repository, args: &RunArgs) -> Result<ScanOrder> {
    let id = args.order_id();
    let scan_type = args.scan_type();
    if let Some(existing) = repo.get(&id).await.or_raise(|| ErrorKind::Store)? {
        if existing.scan_type != scan_type {
            tracing::warn!(scan_order = %id, stored = %existing.scan_type, "Existing scan order keeps its stored scan type");
        }
        if let Some(since) = args.since {
            let stored = existing.scanned_from.map(OffsetDateTime::unix_timestamp);
            if stored != Some(since.unix_timestamp()) {
                exn::bail!(ErrorKind::OrderConflict(id));
            }
        }
        return Ok(existing);
    }
    let mut order = ScanOrder::new(id, args.source.as_str(), scan_type);
    if let Some(since) = args.since {
        order = order.with_scanned_from(since);
    }
    repo.create(&order).await.or_raise(|| ErrorKind::Store)?;
    tracing::info!(scan_order = %order.id, scan_type = %scan_type, "Created scan order");
    Ok(order)
}

async fn record_completion(repo: &Repository, order: &ScanOrder, result: &ScanResult) -> Result<()> {
    if !result.is_completed {
        return Ok(());
    }
    let completed_at = result.stats.scan_completed_at.unwrap_or_else(OffsetDateTime::now_utc);
    repo.mark_completed(&order.id, completed_at).await.or_raise(|| ErrorKind::Store)?;
    tracing::info!(scan_order = %order.id, "Sweep completed");
    Ok(())
}

async fn run(config: &Config, repo: &Repository, authenticator: Arc<dyn Authenticator>, args: &RunArgs) -> Result<Batch> {
    let source_config = config.source(&args.source).ok_or_raise(|| ErrorKind::UnknownSource(args.source.clone()))?;
    let source = data_source(&args.source, source_config);
    let mut order = scan_order(repo, args).await?;

    let scanner = Scanner::new(authenticator, Arc::new(repo.clone())).with_options(scan_options(config));
    let result = scanner.scan(&source, &mut order).await;
    let completion = record_completion(repo, &order, &result).await;
    Ok(Batch { result, completion })
}

/// Run one batch and write its result to `out`.
///
/// The result is written before a failure to record the finished sweep is
/// reported, so the records of the last batch are never lost.
async fn run_command(
    config: &Config,
    repo: &Repository,
    authenticator: Arc<dyn Authenticator>,
    args: &RunArgs,
    out: &mut impl Write,
) -> Result<ScanResult> {
    let Batch { result, completion } = run(config, repo, authenticator, args).await?;
    let rendered = serde_json::to_string_pretty(&result).or_raise(|| ErrorKind::Output)?;
    writeln!(out, "{rendered}").or_raise(|| ErrorKind::Output)?;
    completion?;
    Ok(result)
}

async fn show_cursor(config: &Config, order_id: &str) -> Result<()> {
    let db = open_database(config).await?;
    let cursor = Repository::from(&db).load_cursor(order_id).await;
    db.close().await;
    let cursor = cursor.or_raise(|| ErrorKind::Store)?;
    let rendered = serde_json::to_string_pretty(&cursor).or_raise(|| ErrorKind::Output)?;
    println!("{rendered}");
    Ok(())
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Run(args) => {
            let db = open_database(&config).await?;
            let authenticator = Arc::new(TokenAuthenticator::new(&config.api.base_url, config.api.timeout()));
            let outcome =
                run_command(&config, &Repository::from(&db), authenticator, &args, &mut std::io::stdout()).await;
            db.close().await;
            Ok(exit_code(&outcome?))
        },
        Command::Cursor { order } => {
            show_cursor(&config, &order).await?;
            Ok(ExitCode::SUCCESS)
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match execute(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxscan_provider::backend::MockBackend;
    use boxscan_provider::{BackendHandle, StaticAuthenticator, encode_timestamp};
    use boxscan_store::ScanStatus;
    use serde_json::Value;
    use time::macros::datetime;

    fn config() -> Config {
        let mut config = Config::default();
        config.scan.max_batch_size = 100;
        config.scan.rate_limit_delay_ms = 0;
        config.scan.retry_base_delay_ms = 0;
        config.sources.insert(
            "finance".to_string(),
            SourceConfig {
                auth_type: "token".to_string(),
                folder_id: Some("5".to_string()),
                access_token: Some("abc".to_string()),
            },
        );
        config
    }

    fn args(incremental: bool, since: Option<OffsetDateTime>) -> RunArgs {
        RunArgs {
            source: "finance".to_string(),
            order: None,
            incremental,
            since,
        }
    }

    fn authenticator(backend: &Arc<MockBackend>) -> Arc<dyn Authenticator> {
        let handle: BackendHandle = backend.clone();
        Arc::new(StaticAuthenticator::new(handle))
    }

    async fn database() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    #[tokio::test]
    async fn test_run_creates_and_completes_order() {
        let (_db, repo) = database().await;
        let backend = Arc::new(MockBackend::with_files("5", 150));
        let config = config();

        let first = run(&config, &repo, authenticator(&backend), &args(false, None)).await.unwrap();
        assert!(first.completion.is_ok());
        assert_eq!(first.result.files.len(), 100);
        assert!(!first.result.is_completed);
        let order = repo.get("finance-full").await.unwrap().unwrap();
        assert_eq!(order.scan_type, ScanType::Full);
        assert_eq!(order.status, ScanStatus::Pending);
        assert!(order.completed_at.is_none());

        let second = run(&config, &repo, authenticator(&backend), &args(false, None)).await.unwrap();
        assert!(second.completion.is_ok());
        assert_eq!(second.result.files.len(), 50);
        assert!(second.result.is_completed);
        let order = repo.get("finance-full").await.unwrap().unwrap();
        assert_eq!(order.status, ScanStatus::Completed);
        let completed_at = order.completed_at.unwrap();
        let finished = second.result.stats.scan_completed_at.unwrap();
        assert_eq!(completed_at.unix_timestamp(), finished.unix_timestamp());

        // A new incremental order without a reference time starts from that sweep.
        let incremental = run(&config, &repo, authenticator(&backend), &args(true, None)).await.unwrap();
        assert!(incremental.completion.is_ok());
        let order = repo.get("finance-incremental").await.unwrap().unwrap();
        assert!(order.scanned_from.is_none());
        let requests = backend.requests().await;
        let last = requests.last().unwrap();
        assert_eq!(last.updated_since, Some(encode_timestamp(completed_at).unwrap()));
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let (_db, repo) = database().await;
        let backend = Arc::new(MockBackend::with_files("5", 1));
        let mut args = args(false, None);
        args.source = "payroll".to_string();
        let err = run(&config(), &repo, authenticator(&backend), &args).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::UnknownSource(source) if source == "payroll"));
        assert!(repo.get("payroll-full").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_batch_is_reported() {
        let (_db, repo) = database().await;
        let handle: BackendHandle = Arc::new(MockBackend::with_files("5", 10));
        let failing = Arc::new(StaticAuthenticator::new(handle).failing("token revoked"));
        let mut out = Vec::new();
        let result = run_command(&config(), &repo, failing, &args(false, None), &mut out).await.unwrap();
        assert!(result.is_error());
        let printed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["error"], "authentication failed: token revoked");
        assert!(!repo.get("finance-full").await.unwrap().unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_result_printed_when_completion_fails() {
        let (db, repo) = database().await;
        sqlx::query(
            "CREATE TRIGGER refuse_completion BEFORE UPDATE OF status ON scan_orders \
             BEGIN SELECT RAISE(ABORT, 'read-only'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let backend = Arc::new(MockBackend::with_files("5", 30));
        let mut out = Vec::new();
        let err = run_command(&config(), &repo, authenticator(&backend), &args(false, None), &mut out)
            .await
            .err()
            .unwrap();
        assert!(matches!(*err, ErrorKind::Store));
        let printed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["files"].as_array().map(Vec::len), Some(30));
        assert_eq!(printed["is_completed"], true);
        assert_eq!(repo.get("finance-full").await.unwrap().unwrap().status, ScanStatus::Pending);
    }

    #[tokio::test]
    async fn test_existing_order_keeps_reference_time() {
        let (_db, repo) = database().await;
        let backend = Arc::new(MockBackend::with_files("5", 3));
        let config = config();
        let since = datetime!(2024-06-01 00:00:00 UTC);

        run(&config, &repo, authenticator(&backend), &args(true, Some(since))).await.unwrap();
        // Same reference time, or none at all, continues the order.
        run(&config, &repo, authenticator(&backend), &args(true, Some(since))).await.unwrap();
        run(&config, &repo, authenticator(&backend), &args(true, None)).await.unwrap();

        let other = datetime!(2024-07-01 00:00:00 UTC);
        let err = run(&config, &repo, authenticator(&backend), &args(true, Some(other))).await.err().unwrap();
        assert_eq!((*err).to_string(), "scan order \"finance-incremental\" already exists with a different reference time");
        let order = repo.get("finance-incremental").await.unwrap().unwrap();
        assert_eq!(order.scanned_from, Some(since));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["boxscan", "run", "finance", "--incremental", "--since", "2024-06-01T00:00:00Z"])
            .unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.source, "finance");
                assert!(args.incremental);
                assert!(args.order.is_none());
                assert_eq!(args.since.map(OffsetDateTime::unix_timestamp), Some(1717200000));
                assert_eq!(args.order_id(), "finance-incremental");
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_since_requires_incremental() {
        assert!(Cli::try_parse_from(["boxscan", "run", "finance", "--since", "2024-06-01T00:00:00Z"]).is_err());
        assert!(Cli::try_parse_from(["boxscan", "run", "finance", "--incremental", "--since", "yesterday"]).is_err());
    }

    #[test]
    fn test_data_source_from_config() {
        let config = SourceConfig {
            auth_type: "token".to_string(),
            folder_id: Some("12345".to_string()),
            access_token: Some("abc".to_string()),
        };
        let source = data_source("finance", &config);
        assert_eq!(source.root_folder_id(), "12345");
        assert_eq!(source.credentials["access_token"], "abc");
        assert_eq!(source.auth_type.as_deref(), Some("token"));
    }
}
