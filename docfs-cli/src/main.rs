use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docfs_core::{Config, DirectoryRestoreMap, FilePath, InputManager, Origin};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "docfs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect docset files across the docset, fallback, dependencies and template")]
struct Args {
    /// Docset root
    #[arg(long, default_value = ".")]
    docset: PathBuf,

    /// Fallback root
    #[arg(long)]
    fallback: Option<PathBuf>,

    /// Config file (defaults to docfs.toml in the docset)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory dependencies and the template were restored into
    #[arg(long)]
    restore_root: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every file of an origin
    Ls {
        #[command(flatten)]
        origin: OriginArgs,
    },
    /// Print a file
    Cat {
        path: String,
        #[command(flatten)]
        origin: OriginArgs,
        /// Read the file as of this commit
        #[arg(long)]
        commit: Option<String>,
    },
    /// Print where a file lives on disk
    Which {
        path: String,
        #[command(flatten)]
        origin: OriginArgs,
    },
    /// Print the file metadata that applies to a path, as JSON
    Meta { path: String },
}

#[derive(clap::Args, Debug)]
struct OriginArgs {
    /// Use the fallback root
    #[arg(long, conflicts_with_all = ["dependency", "template"])]
    fallback: bool,

    /// Use the named dependency
    #[arg(long, value_name = "NAME", conflicts_with = "template")]
    dependency: Option<String>,

    /// Use the template
    #[arg(long)]
    template: bool,
}

impl OriginArgs {
    fn origin(&self) -> Origin {
        if self.fallback {
            Origin::Fallback
        } else if let Some(name) = &self.dependency {
            Origin::dependency(name)
        } else if self.template {
            Origin::Template
        } else {
            Origin::Default
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(args.verbose);

    info!(
        "docfs startup: docset={:?}, fallback={:?}, command={:?}",
        args.docset, args.fallback, args.command
    );

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_docset(&args.docset)?,
    };
    let restore_root = match &args.restore_root {
        Some(root) => root.clone(),
        None => default_restore_root()?,
    };

    let mut builder = InputManager::builder(&args.docset)
        .config(config)
        .restore_map(Arc::new(DirectoryRestoreMap::new(restore_root)));
    if let Some(fallback) = &args.fallback {
        builder = builder.fallback_path(fallback);
    }
    let manager = builder.build();

    let mut stdout = io::stdout().lock();
    match args.command {
        Command::Ls { origin } => {
            for file in manager.list_files_recursive(&origin.origin())? {
                writeln!(stdout, "{}", file.path())?;
            }
        }
        Command::Cat {
            path,
            origin,
            commit,
        } => {
            let mut file = FilePath::new(&path, origin.origin());
            if let Some(commit) = commit {
                file = file.with_commit(commit);
            }
            let mut reader = manager.read_stream(&file)?;
            io::copy(&mut reader, &mut stdout).with_context(|| format!("Failed to print {file}"))?;
        }
        Command::Which { path, origin } => {
            let file = FilePath::new(&path, origin.origin());
            match manager.try_get_physical_path(&file) {
                Some(physical) => writeln!(stdout, "{}", physical.display())?,
                None if manager.exists(&file) => {
                    writeln!(stdout, "{file}: stored in git only, no physical path")?
                }
                None => writeln!(stdout, "{file}: not found")?,
            }
        }
        Command::Meta { path } => {
            let values = manager.config().file_metadata_for(&path)?;
            let json = serde_json::to_string_pretty(&values)?;
            writeln!(stdout, "{json}")?;
        }
    }

    Ok(())
}

/// `~/.docfs/git`, where restored repositories live unless told otherwise.
fn default_restore_root() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".docfs").join("git"))
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::fmt;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("DOCFS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_thread_ids(true),
        )
        .with(filter)
        .init();
}
