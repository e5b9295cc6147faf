mod audit;
mod cli;
mod collections;
mod config;
mod data_access;
mod error;
mod notify;
mod records;
mod reports;
mod routes;
mod seed;
mod session;
mod storage;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::rc::Rc;
use storage::{FileStorage, MemoryStorage, StorageAdapter, UnavailableStorage};

#[derive(Parser)]
#[command(name = "sitebook", about = "Construction site records for admins and site managers")]
pub struct Args {
    #[arg(short = 'c', long, help = "Run one command and exit (e.g. -c '/list projects')")]
    pub command: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SOURCE",
        env = "SITEBOOK_DATA_SOURCE",
        help = "Data source: local or remote"
    )]
    pub data_source: Option<String>,

    #[arg(
        long,
        value_name = "DIR",
        env = "SITEBOOK_STORAGE_DIR",
        help = "Persist the local store in this directory"
    )]
    pub storage_dir: Option<PathBuf>,

    #[arg(
        long,
        conflicts_with = "storage_dir",
        help = "Keep the local store in memory for this run only"
    )]
    pub memory: bool,

    #[arg(long, value_name = "STRATEGY", help = "Record id format: uuid or timestamp")]
    pub id_strategy: Option<String>,

    #[arg(long, value_name = "URL", env = "SITEBOOK_API_URL", help = "REST API base URL")]
    pub api_base_url: Option<String>,

    #[arg(long, value_name = "DIR", help = "Write an activity log to this directory")]
    pub audit_dir: Option<PathBuf>,

    #[arg(long, help = "Debug output (forces debug-level logging)")]
    pub debug: bool,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.debug);

    let mut cfg = match &args.config {
        Some(config_path) => {
            let mut cfg = config::Config::with_defaults();
            cfg.merge(config::Config::load_from(config_path)?);
            cfg
        }
        None => config::Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load config; using defaults");
            config::Config::with_defaults()
        }),
    };

    // CLI overrides
    if let Some(source) = &args.data_source {
        match config::DataSourceKind::parse(source) {
            Some(kind) => cfg.data_source = Some(kind),
            None => {
                return Err(anyhow::anyhow!(
                    "Invalid data source: {}. Use: local, remote",
                    source
                ))
            }
        }
    }
    if let Some(dir) = &args.storage_dir {
        cfg.storage.backend = Some(config::StorageBackend::File);
        cfg.storage.dir = Some(dir.clone());
    }
    if args.memory {
        cfg.storage.backend = Some(config::StorageBackend::Memory);
    }
    if let Some(strategy) = &args.id_strategy {
        match collections::IdStrategy::parse(strategy) {
            Some(ids) => cfg.storage.id_strategy = Some(ids),
            None => {
                return Err(anyhow::anyhow!(
                    "Invalid id strategy: {}. Use: uuid, timestamp",
                    strategy
                ))
            }
        }
    }
    if let Some(url) = &args.api_base_url {
        cfg.api.base_url = Some(url.clone());
    }
    if let Some(dir) = &args.audit_dir {
        cfg.audit.enabled = Some(true);
        cfg.audit.dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config error: {}", e);
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s)",
            errors.len()
        ));
    }

    if args.debug {
        tracing::debug!(
            data_source = cfg.data_source().as_str(),
            backend = ?cfg.storage.backend(),
            api = %cfg.api.base_url(),
            credentials = cfg.credentials.len(),
            "settings"
        );
    }

    let storage: Rc<dyn StorageAdapter> = match cfg.storage.backend() {
        config::StorageBackend::Memory => match cfg.storage.quota_bytes {
            Some(quota) => Rc::new(MemoryStorage::with_quota(quota)),
            None => Rc::new(MemoryStorage::new()),
        },
        config::StorageBackend::File => {
            let dir = cfg.storage.dir();
            match std::fs::create_dir_all(&dir) {
                Ok(()) => Rc::new(FileStorage::new(&dir)),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "storage directory unusable; running without storage");
                    Rc::new(UnavailableStorage::new(&e.to_string()))
                }
            }
        }
    };

    let run_id = uuid::Uuid::new_v4().to_string();
    let audit = if cfg.audit.enabled() {
        Some(audit::AuditLog::create_in(&cfg.audit.dir(), &run_id)?)
    } else {
        None
    };

    let ctx = cli::Context::new(cfg, storage, run_id, audit);
    ctx.start();

    if let Some(command) = &args.command {
        cli::run_once(&ctx, command)
    } else {
        cli::run_repl(ctx)
    }
}
