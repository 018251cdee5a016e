use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use a2fs::commands;
use a2fs::config::A2fsConfig;
use a2fs::Dos33Filesystem;

#[derive(Parser)]
#[command(
    name = "a2fs",
    version = env!("APP_VERSION"),
    about = "Browse and mount Apple DOS 3.3 disk images"
)]
struct Cli {
    /// Configuration file (defaults to the first config.json found)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the VTOC and the raw catalog entries
    Inspect {
        image: PathBuf,
        /// Also list each file's track/sector list sectors
        #[arg(long)]
        chains: bool,
    },
    /// List files
    Ls {
        image: PathBuf,
        /// CATALOG-style listing with lock flag, type and sector count
        #[arg(short, long)]
        long: bool,
    },
    /// Write a file's contents to stdout
    Cat {
        image: PathBuf,
        name: String,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long)]
        length: Option<usize>,
    },
    /// Copy every file into a host directory
    Extract { image: PathBuf, dest: PathBuf },
    /// Mount the image read-only (requires the `fuse` feature)
    Mount {
        image: PathBuf,
        mountpoint: PathBuf,
        #[arg(long)]
        allow_other: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        log::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => A2fsConfig::load_from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => A2fsConfig::load(),
    };
    init_logging(cli.verbose, config.log_level.as_deref());

    match cli.command {
        Command::Inspect { image, chains } => {
            let fs = open(&image)?;
            let mut out = std::io::stdout().lock();
            commands::inspect(&fs, chains, &mut out)?;
        }
        Command::Ls { image, long } => {
            let fs = open(&image)?;
            let mut out = std::io::stdout().lock();
            commands::list(&fs, long, &mut out)?;
        }
        Command::Cat {
            image,
            name,
            offset,
            length,
        } => {
            let fs = open(&image)?;
            let mut out = std::io::stdout().lock();
            commands::cat(&fs, &name, offset, length, &mut out)?;
            out.flush()?;
        }
        Command::Extract { image, dest } => {
            let fs = open(&image)?;
            let count = commands::extract(&fs, &dest)?;
            eprintln!("Extracted {count} files to {}", dest.display());
        }
        Command::Mount {
            image,
            mountpoint,
            allow_other,
        } => {
            // Reported only; the library itself is linked at build time.
            match config.resolve_fuse_library() {
                Some(lib) => log::info!("FUSE library present at {}", lib.display()),
                None => log::warn!("no FUSE library found in the configured or default locations"),
            }
            let fs = open(&image)?;
            let mut mount_config = config.mount.clone();
            mount_config.allow_other |= allow_other;
            a2fs::mount::mount(Box::new(fs), &image, &mountpoint, &mount_config)?;
        }
    }
    Ok(())
}

fn open(image: &std::path::Path) -> Result<Dos33Filesystem> {
    Dos33Filesystem::open(image).with_context(|| format!("opening {}", image.display()))
}

/// `-v` flags win over `RUST_LOG`, which wins over the configured level.
fn init_logging(verbose: u8, configured: Option<&str>) {
    let mut builder = match verbose {
        0 => {
            let default = configured.unwrap_or("warn");
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        }
        _ => {
            let level = match verbose {
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            };
            let mut builder = env_logger::Builder::new();
            builder.filter_level(level);
            builder
        }
    };
    builder.format_timestamp(None).init();
}
