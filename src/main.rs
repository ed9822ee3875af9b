use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use libdef_resolver::config::Config;
use libdef_resolver::libdef::{
    LibDef, LibDefFilter, ValidationErrors, filter_libdefs, local_libdefs,
};
use libdef_resolver::mirror::{GitCli, MirrorCache, MirrorStatus};

/// Environment variable holding the log filter
const LOG_ENV: &str = "LIBDEF_LOG";

#[derive(Parser)]
#[command(name = "libdef")]
#[command(version, about = "Resolve library definitions from a definitions repository")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the naming conventions of a definitions repository
    Validate {
        /// Local repository checkout; the mirror is used when omitted
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    /// Find definitions by package name
    Search {
        term: String,
        /// Only definitions written for this checker version
        #[arg(long)]
        checker: Option<String>,
        /// Match the name exactly instead of by substring
        #[arg(long)]
        exact_name: bool,
    },
    /// Find the best definition for a package version
    Lookup {
        name: String,
        version: String,
        /// Only definitions written for this checker version
        #[arg(long)]
        checker: Option<String>,
        /// Local repository checkout; the mirror is used when omitted
        #[arg(long)]
        local: Option<PathBuf>,
    },
    /// Rebase the local mirror now
    UpdateCache,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}

async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    let cache = MirrorCache::new(&config.mirror, GitCli::new());

    match command {
        Command::Validate { repo } => validate(&cache, repo.as_deref()).await,
        Command::Search {
            term,
            checker,
            exact_name,
        } => {
            let tag = if exact_name { "exact-name" } else { "fuzzy" };
            let filter = LibDefFilter::from_tag(tag, &term, checker)?;
            let defs = filter_libdefs(&cache.libdefs(None).await?, &filter)?;
            if defs.is_empty() {
                println!("No definitions found for '{}'", term);
            }
            for def in &defs {
                print_libdef(def);
            }
            Ok(())
        }
        Command::Lookup {
            name,
            version,
            checker,
            local,
        } => {
            let filter = LibDefFilter::Exact {
                pkg_name: name.clone(),
                pkg_version_str: version.clone(),
                checker_version_str: checker,
            };
            let defs = match &local {
                Some(repo) => local_libdefs(repo, None).await?,
                None => cache.libdefs(None).await?,
            };

            let Some(best) = filter_libdefs(&defs, &filter)?.into_iter().next() else {
                bail!("No definition found for {}@{}", name, version);
            };
            print_libdef(&best);
            if local.is_none() {
                println!("revision: {}", cache.revision_label(&best).await?);
            }
            Ok(())
        }
        Command::UpdateCache => {
            match cache.update().await? {
                MirrorStatus::RebaseFailed(reason) => {
                    bail!("Unable to update the local mirror: {}", reason)
                }
                status => println!("Local mirror at {:?}: {:?}", cache.repo_dir(), status),
            }
            Ok(())
        }
    }
}

async fn validate(cache: &MirrorCache<GitCli>, repo: Option<&Path>) -> anyhow::Result<()> {
    let errors = ValidationErrors::new();
    let defs = match repo {
        Some(repo) => local_libdefs(repo, Some(&errors)).await?,
        None => cache.libdefs(Some(&errors)).await?,
    };

    if !errors.is_empty() {
        print!("{}", errors);
        bail!(
            "Found {} validation errors in {} locations",
            errors.len(),
            errors.contexts().len()
        );
    }

    println!("All {} definitions are valid", defs.len());
    Ok(())
}

fn print_libdef(def: &LibDef) {
    println!(
        "{}@{}  checker {}  {}",
        def.pkg_name,
        def.pkg_version_str,
        def.checker_version_str,
        def.path.display()
    );
}
