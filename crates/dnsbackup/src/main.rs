// # dnsbackup - DNS zone backup
//
// Thin command-line wrapper around dnsbackup-core. It:
// 1. Parses arguments (with `DNSBACKUP_*` environment fallbacks)
// 2. Initializes logging and the runtime
// 3. Registers the built-in DNS sources
// 4. Runs one backup cycle and maps the outcome to an exit code
//
// All fetching, writing, pruning and committing lives in dnsbackup-core.
//
// ## Example
//
// ```bash
// dnsbackup ops@example.com "$CF_API_KEY" /srv/dns-backup
//
// # API token instead of a global key, commit without pushing
// dnsbackup "" "$CF_API_TOKEN" /srv/dns-backup --no-push
// ```
//
// When the target directory contains `.git`, changes are committed and
// pushed using `id_rsa` next to the executable unless `--ssh-key` says
// otherwise.

use anyhow::Result;
use clap::Parser;
use dnsbackup_core::traits::CommitOutcome;
use dnsbackup_core::{BackupConfig, BackupEngine, BackupReport, ProviderConfig, SourceRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Backup completed
/// - 1: Usage or configuration error
/// - 2: Runtime error (API, filesystem or git failure)
#[derive(Debug, Clone, Copy)]
enum BackupExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<BackupExitCode> for ExitCode {
    fn from(code: BackupExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Back up all DNS zones of an account to JSON files
#[derive(Parser, Debug)]
#[command(name = "dnsbackup", version, about)]
struct Args {
    /// Account email (empty to authenticate with an API token)
    email: String,

    /// API key, or API token when EMAIL is empty
    token: String,

    /// Directory that receives the snapshot
    dir: PathBuf,

    /// Private key used to push (defaults to id_rsa next to the executable)
    #[arg(long, env = "DNSBACKUP_SSH_KEY")]
    ssh_key: Option<PathBuf>,

    /// Never commit, even when DIR is a git repository
    #[arg(long, env = "DNSBACKUP_NO_COMMIT")]
    no_commit: bool,

    /// Commit but do not push
    #[arg(long, env = "DNSBACKUP_NO_PUSH")]
    no_push: bool,

    /// Maximum pages fetched per listing
    #[arg(long, env = "DNSBACKUP_MAX_PAGES", default_value_t = 1000)]
    max_pages: usize,

    /// Leave directories that become empty after pruning
    #[arg(long, env = "DNSBACKUP_KEEP_EMPTY_DIRS")]
    keep_empty_dirs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DNSBACKUP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// API base URL override
    #[arg(long, env = "DNSBACKUP_API_BASE_URL")]
    api_base_url: Option<String>,
}

impl Args {
    fn into_config(self) -> BackupConfig {
        let mut config = BackupConfig::new(
            ProviderConfig::Cloudflare {
                email: self.email,
                api_token: self.token,
                base_url: self.api_base_url,
            },
            self.dir,
        );
        config.fetch.max_pages = self.max_pages;
        config.snapshot.prune_empty_dirs = !self.keep_empty_dirs;
        config.vcs.enabled = !self.no_commit;
        config.vcs.push = !self.no_push;
        if let Some(key) = self.ssh_key {
            config.vcs.ssh_key = key;
        }
        config
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                BackupExitCode::ConfigError.into()
            } else {
                // --help / --version
                BackupExitCode::Success.into()
            };
        }
    };

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BackupExitCode::ConfigError.into();
    }

    let config = args.into_config();
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return BackupExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BackupExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_backup(config).await {
            Ok(report) => {
                log_report(&report);
                BackupExitCode::Success
            }
            Err(e) => {
                error!("Backup failed: {:#}", e);
                exit_code_for(&e)
            }
        }
    })
    .into()
}

/// Register sources, build the engine and run one cycle
async fn run_backup(config: BackupConfig) -> Result<BackupReport> {
    let registry = SourceRegistry::new();

    #[cfg(feature = "cloudflare")]
    dnsbackup_provider_cloudflare::register(&registry);

    info!("Available DNS sources: {:?}", registry.list_sources());

    let source = registry.create_source(&config.provider)?;
    let engine = BackupEngine::from_config(source, config)?;
    Ok(engine.run().await?)
}

fn exit_code_for(e: &anyhow::Error) -> BackupExitCode {
    match e.downcast_ref::<dnsbackup_core::Error>() {
        Some(dnsbackup_core::Error::Config(_)) => BackupExitCode::ConfigError,
        _ => BackupExitCode::RuntimeError,
    }
}

fn log_report(report: &BackupReport) {
    info!(
        "Backed up {} zone(s) with {} record(s) into {} file(s)",
        report.zones,
        report.records,
        report.written.len()
    );

    if !report.pruned.is_empty() {
        info!(
            "Pruned {} stale file(s) and {} empty director(ies)",
            report.pruned.removed_files.len(),
            report.pruned.removed_dirs.len()
        );
    }

    match &report.commit {
        Some(CommitOutcome::Committed { message, pushed }) => {
            info!("{} (pushed: {})", message, pushed)
        }
        Some(CommitOutcome::NothingToCommit) => info!("Snapshot unchanged"),
        None => {}
    }
}
