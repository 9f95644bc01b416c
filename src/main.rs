use notevault::kernel::services::adapters::{
    ensure_data_dir, JsonFileStore, LocalVaultFs, NotifyWatcher, PresetFolderPicker,
};
use notevault::kernel::services::ports::{SystemClock, WorkspaceConfig};
use notevault::kernel::{Workspace, WorkspacePorts};
use notevault::models::Node;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

mod logging;

#[derive(Debug, Default)]
struct Options {
    add: Option<PathBuf>,
    watch: bool,
}

fn parse_args() -> io::Result<Options> {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--add=") {
            options.add = Some(PathBuf::from(value));
        } else if arg == "--add" {
            let value = args.next().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "--add requires a folder")
            })?;
            options.add = Some(PathBuf::from(value));
        } else if arg == "--watch" {
            options.watch = true;
        } else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown argument `{arg}`\nusage: notevault [--add <folder>] [--watch]"),
            ));
        }
    }

    Ok(options)
}

fn print_nodes(out: &mut impl Write, nodes: &[Node], depth: usize) -> io::Result<()> {
    for node in nodes {
        let marker = if node.is_folder() { "/" } else { "" };
        writeln!(out, "{}{}{}", "  ".repeat(depth), node.name, marker)?;
        print_nodes(out, node.children(), depth + 1)?;
    }
    Ok(())
}

fn print_workspace(workspace: &Workspace) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match workspace.vaults().current_vault() {
        Some(vault) => writeln!(out, "{} ({})", vault.name, vault.path.display())?,
        None => writeln!(out, "no vault configured; add one with --add <folder>")?,
    }
    print_nodes(&mut out, workspace.tree().nodes(), 1)?;
    for error in workspace.snapshot().errors {
        writeln!(out, "error: {error}")?;
    }
    Ok(())
}

async fn run(options: Options, log_dir: Option<PathBuf>) -> io::Result<()> {
    let data_dir = ensure_data_dir()?;
    let ports = WorkspacePorts {
        fs: Arc::new(LocalVaultFs::new()),
        watcher: Arc::new(NotifyWatcher::new()),
        picker: Arc::new(PresetFolderPicker::new(options.add.clone())),
        store: Arc::new(JsonFileStore::new(data_dir)),
        clock: Arc::new(SystemClock),
    };
    let mut workspace = Workspace::new(ports, WorkspaceConfig::default());

    if let Err(e) = workspace.startup().await {
        tracing::error!(error = %e, "startup failed");
    }
    if options.add.is_some() {
        let added = workspace.add_vault().await.map_err(io::Error::other)?;
        if let Some(vault) = added {
            workspace
                .set_default_vault(&vault.id)
                .await
                .map_err(io::Error::other)?;
        }
    }

    print_workspace(&workspace)?;

    if options.watch {
        tracing::info!("watching for changes");
        if let Some(dir) = &log_dir {
            println!("watching for changes, logs in {}", dir.display());
        }
        workspace
            .run_until(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await;
        print_workspace(&workspace)?;
    } else {
        workspace.shutdown().await;
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let options = parse_args()?;
    let logging = logging::init();
    let log_dir = logging.as_ref().map(|g| g.log_dir().to_path_buf());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .or_else(|e| {
            tracing::error!(
                error = %e,
                "Failed to create multi-thread tokio runtime, falling back to current-thread"
            );
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
        })?;

    runtime.block_on(run(options, log_dir))
}
