//! vsnap command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use vsnap::{OpenOptions, Repository, SaveOptions, SaveOutcome, StatusReport, VersionId};

/// Snapshot a directory tree into a single line of versions
#[derive(Parser)]
#[command(name = "vsnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Working root of the repository
    #[arg(short = 'C', long = "dir", env = "VSNAP_DIR", default_value = ".")]
    dir: PathBuf,

    /// Head pointer to save onto
    #[arg(long, env = "VSNAP_BRANCH", default_value = vsnap::DEFAULT_BRANCH)]
    branch: String,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the metadata directory
    Init,
    /// Record the working tree as a new version if it changed
    Save {
        /// Message for the new version
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List new, modified and deleted files since the last save
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show versions from the head back to the first
    Log,
    /// Check that every version and tree reachable from the head exists
    Verify,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            if err.needs_recovery() {
                eprintln!("the repository needs repair before it can be saved again");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> vsnap::Result<()> {
    let options = OpenOptions {
        branch: cli.branch,
        ..Default::default()
    };

    let open = || Repository::open(&cli.dir, options.clone());
    match cli.command {
        Commands::Init => {
            let repo = Repository::init(&cli.dir, options.clone())?;
            println!("Initialised empty repository in {}", repo.meta_dir().display());
        }
        Commands::Save { message } => {
            let repo = open()?;
            match repo.save(&SaveOptions { message })? {
                SaveOutcome::Initial { version, .. } => println!("Initial save: version {}", version),
                SaveOutcome::Saved { version, .. } => println!("Saved version {}", version),
                SaveOutcome::NoChanges { .. } => println!("No changes detected!"),
            }
        }
        Commands::Status { json } => {
            let repo = open()?;
            let report = repo.status()?;
            if json {
                let text = serde_json::to_string_pretty(&report)
                    .map_err(|e| vsnap::Error::Io(e.into()))?;
                println!("{}", text);
            } else {
                print_version_info(repo.head()?);
                print_report(&report);
            }
        }
        Commands::Log => {
            let repo = open()?;
            for (id, version) in repo.history()? {
                println!("{:>6}  tree {:<6} {}", id, version.tree, version.message);
            }
        }
        Commands::Verify => {
            let repo = open()?;
            let count = repo.verify()?;
            println!("{} version(s) verified", count);
        }
    }
    Ok(())
}

fn print_version_info(head: Option<VersionId>) {
    match head {
        None => println!("Repository is new with no saved version."),
        Some(id) => println!("Current version: Version '{}'.", id),
    }
}

fn print_report(report: &StatusReport) {
    let sections = [
        ("NEW", "new", &report.new),
        ("MODIFIED", "modified", &report.modified),
        ("DELETED", "deleted", &report.deleted),
    ];
    for (title, label, paths) in sections {
        if paths.is_empty() {
            continue;
        }
        println!("{} files:", title);
        for path in paths {
            println!("\t{}: {}", label, path);
        }
    }

    if report.is_clean() {
        println!("No changes detected since last save.");
    }
}
