use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};

use appident::catalog::Catalog;
use appident::dock::Dock;
use appident::registry::ExcludedAppIds;
use appident::resolver::{ApplicationResolver, PathResolver};
use appident::x11::{self, X11Context, X11IdAllocator, X11WindowSource};

#[derive(Parser)]
#[command(name = "appidentd", about = "Map processes and windows to installed applications")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a process id to its application id.
    Resolve {
        /// JSON catalog: array of {"id", "try_exec"?, "exec"?}.
        #[arg(long)]
        catalog: PathBuf,

        /// Executable search path; defaults to $PATH.
        #[arg(long)]
        search_path: Option<String>,

        pid: u32,
    },

    /// Track X11 windows and log attach/detach with their owning application.
    Watch {
        /// JSON catalog: array of {"id", "try_exec"?, "exec"?}.
        #[arg(long)]
        catalog: PathBuf,

        /// Executable search path; defaults to $PATH.
        #[arg(long)]
        search_path: Option<String>,

        /// Extra application ids never tracked (added to the shell surfaces).
        #[arg(long = "exclude-app-id")]
        exclude_app_ids: Vec<String>,

        /// Track shell surfaces too.
        #[arg(long)]
        no_default_exclusions: bool,
    },
}

fn build_resolver(catalog: &Path, search_path: Option<String>) -> Result<ApplicationResolver, String> {
    let catalog = Catalog::load(catalog).map_err(|e| e.to_string())?;
    tracing::info!(applications = catalog.len(), "catalog ready");

    let paths = match search_path {
        Some(p) => PathResolver::with_search_path(p),
        None => PathResolver::from_env(),
    };
    Ok(ApplicationResolver::new(Arc::new(catalog), paths))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    appident::logging::init(cli.verbose);

    let result = match cli.command {
        Command::Resolve {
            catalog,
            search_path,
            pid,
        } => resolve(&catalog, search_path, pid),
        Command::Watch {
            catalog,
            search_path,
            exclude_app_ids,
            no_default_exclusions,
        } => {
            let mut excluded = if no_default_exclusions {
                ExcludedAppIds::none()
            } else {
                ExcludedAppIds::default()
            };
            excluded.extend(exclude_app_ids);
            tracing::debug!(excluded = excluded.len(), "exclusions configured");
            watch(&catalog, search_path, excluded)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("appidentd: {e}");
            ExitCode::FAILURE
        }
    }
}

fn resolve(catalog: &Path, search_path: Option<String>, pid: u32) -> Result<(), String> {
    let resolver = build_resolver(catalog, search_path)?;
    let app = resolver.resolve(pid).map_err(|e| e.to_string())?;
    println!("{app}");
    Ok(())
}

fn watch(catalog: &Path, search_path: Option<String>, excluded: ExcludedAppIds) -> Result<(), String> {
    let resolver = build_resolver(catalog, search_path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("tokio runtime: {e}"))?;

    runtime.block_on(async move {
        let ctx = Arc::new(X11Context::connect().map_err(|e| e.to_string())?);
        let dock = Dock::new(
            Arc::new(X11WindowSource::new(Arc::clone(&ctx))),
            Arc::new(X11IdAllocator::new(Arc::clone(&ctx))),
            excluded,
            resolver,
        );

        sync_client_list(&ctx, &dock);

        let stop = Arc::new(AtomicBool::new(false));
        let (mut events, thread) = x11::spawn_event_thread(Arc::clone(ctx.conn()), Arc::clone(&stop))
            .map_err(|e| e.to_string())?;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) if ctx.is_client_list_change(&event) => sync_client_list(&ctx, &dock),
                    Some(_) => {}
                    None => {
                        tracing::warn!("X11 event thread exited");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupted, shutting down");
                    break;
                }
            }
        }

        stop.store(true, Ordering::Relaxed);
        drop(events);
        if thread.join().is_err() {
            tracing::error!("X11 event thread panicked");
        }
        tracing::info!(tracked = dock.registry().len(), "stopped");
        Ok::<(), String>(())
    })
}

fn sync_client_list(ctx: &X11Context, dock: &Dock) {
    match ctx.client_list() {
        Ok(windows) => dock.sync(windows.into_iter().map(x11::object_path)),
        Err(e) => tracing::warn!(error = %e, "cannot read client list"),
    }
}
