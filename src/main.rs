use anyhow::{Context, Result};
use clap::Parser;
use shellmarks::bookmarks::BookmarkStore;
use shellmarks::commands::{self, CommandContext};
use shellmarks::platform::LocalPlatform;
use shellmarks::session::Session;
use shellmarks::store::JsonFileStore;
use std::io;
use std::path::{Path, PathBuf};

/// Bookmark-aware shell built-ins for sandboxed terminals.
#[derive(Parser, Debug)]
#[command(name = "shellmarks")]
#[command(about = "Bookmark-aware shell built-ins for sandboxed terminals", long_about = None)]
#[command(version)]
struct Args {
    /// Built-in to run (bookmark, jump, showmarks, renamemark, deletemark, ...)
    #[arg(value_name = "COMMAND")]
    command: String,

    /// Arguments handed to the built-in unchanged
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Defaults store location (default: under the user data directory)
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Log file for diagnostics (RUST_LOG controls the level)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("shellmarks: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let store_path = match args.store {
        Some(path) => path,
        None => dirs::data_dir()
            .context("could not determine the user data directory")?
            .join("shellmarks")
            .join("defaults.json"),
    };
    let store = JsonFileStore::new(store_path);
    let platform = LocalPlatform::new();
    let locations = LocalPlatform::system_locations();

    // The same sweep a host app runs at startup: drop bookmarks that no
    // longer resolve, refresh the reserved names.
    BookmarkStore::new(&store).startup_check(&platform, &platform, &locations);

    let mut argv = vec![args.command];
    argv.extend(args.args);

    let mut windows = vec![Session::new(
        Box::new(io::stdout()),
        Box::new(io::stderr()),
        Box::new(io::stdin()),
    )];
    windows[0].record(&argv.join(" "));

    let mut ctx = CommandContext {
        windows: &mut windows,
        current: 0,
        store: &store,
        shell: &platform,
        scope: &platform,
        cloud: &platform,
        locations: &locations,
    };
    match commands::dispatch(&mut ctx, &argv) {
        Some(code) => Ok(code),
        None => {
            eprintln!("shellmarks: unknown command: {}", argv[0]);
            Ok(1)
        }
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let Some(path) = log_file else {
        // No log file requested: honor RUST_LOG on stderr, quiet by default.
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init();
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("could not create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::sync::Arc::new(file))
        .init();
    Ok(())
}
