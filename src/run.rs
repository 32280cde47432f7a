//! Command execution.
//!
//! Builds the component graph — cache, services, watchers — by hand
//! (the graph is small and static) and runs the selected subcommand.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::signal;

use dnsmasq_admin::cache::{CachePolicy, ConfigCache, ConfigSnapshot};
use dnsmasq_admin::dnsmasq::{ConfError, parse_directive};
use dnsmasq_admin::service::{
    DhcpLease, ManagedConfigService, ServiceError, lease_file_path, read_leases,
};
use dnsmasq_admin::settings::{Command, ValidatedSettings};
use dnsmasq_admin::watch::spawn_cache_watchers;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Reading or resolving the config set failed.
    #[error(transparent)]
    Conf(#[from] ConfError),

    /// A service operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Could not serialize output.
    #[error("failed to render output: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading an auxiliary file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `check`/`watch` need a managed path but none resolves.
    #[error("no managed config path is resolvable; the main config needs a conf-dir")]
    NotConfigured,
}

struct App {
    cache: Arc<ConfigCache>,
    service: ManagedConfigService,
    settings: ValidatedSettings,
}

impl App {
    fn new(settings: ValidatedSettings) -> Self {
        let cache = Arc::new(ConfigCache::with_policy(
            &settings.main_config,
            &settings.managed_file_name,
            CachePolicy {
                staleness: settings.staleness,
                suppression_window: settings.suppression_window,
            },
        ));
        let service = ManagedConfigService::new(Arc::clone(&cache), &settings.hosts_file);
        Self {
            cache,
            service,
            settings,
        }
    }
}

/// Runs the selected subcommand to completion.
///
/// # Errors
///
/// Propagates config-set, service and rendering failures; the caller
/// maps them to an exit code.
pub async fn execute(settings: ValidatedSettings, command: Command) -> Result<(), RunError> {
    let app = App::new(settings);

    match command {
        Command::Init { .. } => unreachable!("init is handled before the runtime starts"),
        Command::Show { sources, json } => show(&app, sources, json).await,
        Command::Files { json } => files(&app, json).await,
        Command::Hosts { json } => hosts(&app, json).await,
        Command::Leases { json } => leases(&app, json).await,
        Command::Check => check(&app).await,
        Command::Watch => watch(&app).await,
    }
}

async fn show(app: &App, sources: bool, json: bool) -> Result<(), RunError> {
    let snapshot = app.cache.snapshot().await?;

    if json {
        let rendered = if sources {
            serde_json::to_string_pretty(&serde_json::json!({
                "effective": &snapshot.effective,
                "sources": &snapshot.sources,
            }))?
        } else {
            serde_json::to_string_pretty(&snapshot.effective)?
        };
        println!("{rendered}");
        return Ok(());
    }

    print_effective_text(&snapshot)?;
    if sources {
        print_sources_text(&snapshot);
    }
    Ok(())
}

/// Text rendering: set values only, one per line.
fn print_effective_text(snapshot: &ConfigSnapshot) -> Result<(), RunError> {
    let value = serde_json::to_value(&snapshot.effective)?;
    let serde_json::Value::Object(fields) = value else {
        return Ok(());
    };

    for (name, field) in fields {
        match field {
            serde_json::Value::Bool(true) => println!("{name}"),
            serde_json::Value::Number(n) => println!("{name} = {n}"),
            serde_json::Value::String(s) => println!("{name} = {s}"),
            serde_json::Value::Array(items) if !items.is_empty() => {
                for item in items {
                    let text = item.as_str().map_or_else(|| item.to_string(), String::from);
                    println!("{name} += {text}");
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn print_sources_text(snapshot: &ConfigSnapshot) {
    println!("\nsources:");
    for (key, source) in &snapshot.sources.single {
        let tag = if source.is_managed { " (managed)" } else { "" };
        println!("  {key}: {}:{}{tag}", source.file_name, source.line_number);
    }
    for (key, contributions) in &snapshot.sources.cumulative {
        for sourced in contributions {
            let source = &sourced.source;
            let tag = if source.is_managed { " (managed)" } else { "" };
            println!(
                "  {key} += {}: {}:{}{tag}",
                sourced.value, source.file_name, source.line_number
            );
        }
    }
}

async fn files(app: &App, json: bool) -> Result<(), RunError> {
    let snapshot = app.cache.snapshot().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.set)?);
        return Ok(());
    }

    for entry in &snapshot.set.entries {
        let source = match entry.source {
            dnsmasq_admin::dnsmasq::IncludeSource::Main => "main",
            dnsmasq_admin::dnsmasq::IncludeSource::ConfFile => "conf-file",
            dnsmasq_admin::dnsmasq::IncludeSource::ConfDir => "conf-dir",
        };
        let tag = if entry.is_managed { " (managed)" } else { "" };
        println!("{source:9} {}{tag}", entry.path.display());
    }
    Ok(())
}

async fn hosts(app: &App, json: bool) -> Result<(), RunError> {
    let entries = app.service.read_dhcp_hosts().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in entries {
        let state = if entry.is_comment { "disabled" } else { "active" };
        println!(
            "{:8} {}  {}  {}",
            state,
            entry.macs.join(","),
            entry.address.as_deref().unwrap_or("-"),
            entry.hostname.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn leases(app: &App, json: bool) -> Result<(), RunError> {
    let snapshot = app.cache.snapshot().await?;
    let path = lease_file_path(&snapshot.effective);
    let leases: Vec<DhcpLease> = read_leases(&path).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&leases)?);
        return Ok(());
    }

    for lease in leases {
        println!(
            "{}  {}  {}  expires {}",
            lease.mac,
            lease.address,
            lease.hostname.as_deref().unwrap_or("-"),
            lease.expires_at,
        );
    }
    Ok(())
}

/// Parses every managed-file line and reports syntax problems with
/// their exact position.
async fn check(app: &App) -> Result<(), RunError> {
    let snapshot = app.cache.snapshot().await?;
    let Some(managed_path) = &snapshot.set.managed_file_path else {
        return Err(RunError::NotConfigured);
    };

    let content = match tokio::fs::read_to_string(managed_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("{}: not created yet", managed_path.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut first = None;
    for (i, line) in content.lines().enumerate() {
        if let Err(error) = parse_directive(line, i + 1) {
            eprintln!("{}: {error}", managed_path.display());
            if first.is_none() {
                first = Some(error);
            }
        }
    }

    match first {
        None => {
            println!("{}: OK", managed_path.display());
            Ok(())
        }
        Some(error) => Err(ConfError::Corrupt(error).into()),
    }
}

/// Runs the cache with watchers over the config-set directories,
/// logging refreshes, until Ctrl-C.
async fn watch(app: &App) -> Result<(), RunError> {
    let snapshot = app.cache.snapshot().await?;
    tracing::info!(
        files = snapshot.set.entries.len(),
        "watching configuration set"
    );

    let dirs: BTreeSet<PathBuf> = snapshot
        .set
        .entries
        .iter()
        .filter_map(|entry| entry.path.parent().map(PathBuf::from))
        .chain(
            snapshot
                .set
                .managed_file_path
                .as_deref()
                .and_then(|p| p.parent().map(PathBuf::from)),
        )
        .collect();

    let handles = spawn_cache_watchers(
        Arc::clone(&app.cache),
        dirs.into_iter().collect(),
        app.settings.watch_interval,
    );

    let mut ticker = tokio::time::interval(app.settings.watch_interval);
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if app.cache.is_dirty().await {
                    match app.cache.snapshot().await {
                        Ok(snapshot) => tracing::info!(
                            files = snapshot.set.entries.len(),
                            dhcp_hosts = snapshot.dhcp_hosts.len(),
                            "configuration changed, snapshot refreshed"
                        ),
                        Err(error) => tracing::warn!(%error, "refresh after change failed"),
                    }
                }
            }
        }
    }

    for handle in handles {
        handle.abort();
    }
    tracing::info!("watch stopped");
    Ok(())
}
