// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reapack::browser;
use reapack::db::models::Entry;
use reapack::index::{PackageRef, Platform};
use reapack::{Catalog, InstallOptions, Registry, Remote, RemoteIndex, VersionName};
use std::path::Path;
use tracing::{info, warn};

const DEFAULT_DB_PATH: &str = "/var/lib/reapack/registry.db";
const DEFAULT_CACHE_DIR: &str = "/var/cache/reapack";

#[derive(Parser)]
#[command(name = "reapack")]
#[command(author, version, about = "Package registry for REAPER resource repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the registry database
    Init {
        /// Database path
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// Add a remote repository
    RemoteAdd {
        /// Remote name (also the name of its cached index file)
        name: String,
        /// Index URL
        url: String,
        /// Refuse to uninstall this remote's packages
        #[arg(long)]
        protected: bool,
        /// Add the remote disabled
        #[arg(long)]
        disabled: bool,
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// List remote repositories
    RemoteList {
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// Remove a remote repository and forget its installed packages
    RemoteRemove {
        name: String,
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// Show or change preferences
    Config {
        /// Offer pre-release versions as updates
        #[arg(long)]
        pre_releases: Option<bool>,
        /// List installed packages their remote no longer publishes
        #[arg(long)]
        show_obsolete: Option<bool>,
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// List the packages of every enabled remote
    Browse {
        /// Only list installed packages
        #[arg(long)]
        installed: bool,
        /// Only list packages with an update available
        #[arg(long)]
        outdated: bool,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
        #[arg(short, long, default_value = DEFAULT_CACHE_DIR)]
        cache_dir: String,
    },
    /// Register a package version as installed
    Install {
        remote: String,
        category: String,
        package: String,
        /// Version to install (default: latest)
        #[arg(long)]
        version: Option<String>,
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
        #[arg(short, long, default_value = DEFAULT_CACHE_DIR)]
        cache_dir: String,
    },
    /// Forget an installed package and release its files
    Uninstall {
        remote: String,
        category: String,
        package: String,
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// Pin an installed package to its current version
    Pin {
        remote: String,
        category: String,
        package: String,
        /// Unpin instead
        #[arg(long)]
        off: bool,
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
    /// List the files owned by an installed package
    Files {
        remote: String,
        category: String,
        package: String,
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
}

fn open_registry(db_path: &str) -> Result<Registry> {
    let conn = reapack::db::open(db_path)?;
    Ok(Registry::with_connection(conn)?)
}

fn find_remote(registry: &Registry, name: &str) -> Result<Remote> {
    Remote::find_by_name(registry.connection(), name)?
        .ok_or_else(|| anyhow::anyhow!("Remote '{}' does not exist", name))
}

fn find_installed(registry: &Registry, remote: &str, category: &str, package: &str) -> Result<Entry> {
    Entry::find_by_identity(registry.connection(), remote, category, package)?
        .ok_or_else(|| anyhow::anyhow!("{}/{}/{} is not installed", remote, category, package))
}

fn load_index(cache_dir: &str, remote: &str) -> Result<RemoteIndex> {
    let path = Catalog::index_path(Path::new(cache_dir), remote);
    RemoteIndex::load_file(remote, &path)
        .with_context(|| format!("Failed to load index of '{}' from {}", remote, path.display()))
}

fn find_package<'a>(index: &'a RemoteIndex, category: &str, package: &str) -> Result<PackageRef<'a>> {
    index.find_package(category, package).ok_or_else(|| {
        anyhow::anyhow!("Package '{}' not found in {}/{}", package, index.name(), category)
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { db_path }) => {
            info!("Initializing registry database at: {}", db_path);
            reapack::db::init(&db_path)?;
            println!("Database initialized successfully at: {}", db_path);
            Ok(())
        }
        Some(Commands::RemoteAdd {
            name,
            url,
            protected,
            disabled,
            db_path,
        }) => {
            let registry = open_registry(&db_path)?;

            if Remote::find_by_name(registry.connection(), &name)?.is_some() {
                return Err(anyhow::anyhow!("Remote '{}' already exists", name));
            }

            let mut remote = Remote::new(name, url);
            remote.protected = protected;
            remote.enabled = !disabled;
            remote.insert(registry.connection())?;

            println!("Added remote '{}' ({})", remote.name, remote.url);
            Ok(())
        }
        Some(Commands::RemoteList { db_path }) => {
            let registry = open_registry(&db_path)?;
            let remotes = Remote::list_all(registry.connection())?;

            if remotes.is_empty() {
                println!("No remotes configured.");
            } else {
                println!("Remotes:");
                for remote in &remotes {
                    let mut flags = Vec::new();
                    if !remote.enabled {
                        flags.push("disabled");
                    }
                    if remote.protected {
                        flags.push("protected");
                    }

                    print!("  {} {}", remote.name, remote.url);
                    if !flags.is_empty() {
                        print!(" [{}]", flags.join(", "));
                    }
                    println!();
                }
                println!("\nTotal: {} remote(s)", remotes.len());
            }

            Ok(())
        }
        Some(Commands::RemoteRemove { name, db_path }) => {
            let mut registry = open_registry(&db_path)?;
            let remote = find_remote(&registry, &name)?;

            if remote.protected {
                return Err(anyhow::anyhow!("Remote '{}' is protected", name));
            }

            let forgotten = registry.forget_remote(&name)?;

            println!("Removed remote '{}'", name);
            println!("  Packages forgotten: {}", forgotten);
            Ok(())
        }
        Some(Commands::Config {
            pre_releases,
            show_obsolete,
            db_path,
        }) => {
            let registry = open_registry(&db_path)?;
            let mut options = InstallOptions::load(registry.connection())?;

            if pre_releases.is_some() || show_obsolete.is_some() {
                if let Some(value) = pre_releases {
                    options.pre_releases = value;
                }
                if let Some(value) = show_obsolete {
                    options.show_obsolete = value;
                }
                options.save(registry.connection())?;
            }

            println!("pre-releases: {}", options.pre_releases);
            println!("show-obsolete: {}", options.show_obsolete);
            Ok(())
        }
        Some(Commands::Browse {
            installed,
            outdated,
            json,
            db_path,
            cache_dir,
        }) => {
            let registry = open_registry(&db_path)?;
            let options = InstallOptions::load(registry.connection())?;

            let remotes: Vec<String> = Remote::list_enabled(registry.connection())?
                .into_iter()
                .map(|r| r.name)
                .collect();

            let mut catalog = Catalog::new();
            for (name, e) in catalog.load_dir(Path::new(&cache_dir), &remotes) {
                eprintln!("Skipping remote '{}': {}", name, e);
            }

            let entries: Vec<_> = browser::populate(&catalog, &registry, &options)?
                .into_iter()
                .filter(|e| !installed || e.is_installed())
                .filter(|e| !outdated || e.is_out_of_date())
                .collect();
            let rows: Vec<_> = entries.iter().map(|e| e.row()).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No packages found.");
            } else {
                for row in &rows {
                    println!(
                        "{:<3} {:<40} {:<20} {:<12} {:<16} {:<10} {:<16} {}",
                        row.state,
                        row.name,
                        row.category,
                        row.version,
                        row.author,
                        row.package_type,
                        row.remote,
                        row.last_update
                    );
                }
                println!("\nTotal: {} package(s)", rows.len());
            }

            Ok(())
        }
        Some(Commands::Install {
            remote,
            category,
            package,
            version,
            db_path,
            cache_dir,
        }) => {
            let mut registry = open_registry(&db_path)?;
            let options = InstallOptions::load(registry.connection())?;

            let remote = find_remote(&registry, &remote)?;
            if !remote.enabled {
                return Err(anyhow::anyhow!("Remote '{}' is disabled", remote.name));
            }

            let index = load_index(&cache_dir, &remote.name)?;
            let pkg = find_package(&index, &category, &package)?;
            let entry = registry.get_entry(pkg)?;

            let target = match version {
                Some(name) => {
                    let name = VersionName::parse(&name)?;
                    pkg.find_version(&name).ok_or_else(|| {
                        anyhow::anyhow!("{} has no version {}", pkg.name(), name)
                    })?
                }
                None => {
                    if entry.pinned {
                        return Err(anyhow::anyhow!(
                            "{} is pinned to version {}",
                            pkg.name(),
                            entry.version
                        ));
                    }
                    pkg.last_version(options.pre_releases, &entry.version)
                        .ok_or_else(|| anyhow::anyhow!("{} has no installable version", pkg.name()))?
                }
            };

            if entry.is_installed() && entry.version == *target.name() {
                info!("Reinstalling {} v{}", pkg.name(), target.name());
            }

            let host = Platform::host();
            if !target.sources().any(|s| s.platform().covers(host)) {
                warn!(
                    "No source of {} v{} is meant for {}",
                    pkg.name(),
                    target.name(),
                    host.as_str()
                );
            }

            let mut conflicts = Vec::new();
            let installed = registry.push(target, Some(&mut conflicts))?;

            if !conflicts.is_empty() {
                println!("Cannot install {} v{}:", pkg.name(), target.name());
                for path in &conflicts {
                    println!("  {} is owned by another package", path);
                }
                return Err(anyhow::anyhow!("{} file conflict(s)", conflicts.len()));
            }

            println!("Installed {} version {}", pkg.display_name(), installed.version);
            println!("  Author: {}", target.display_author());
            println!("  Files: {}", registry.get_files(&installed)?.len());
            if entry.is_installed() && entry.version != installed.version {
                println!("  Previous version: {}", entry.version);
            }

            Ok(())
        }
        Some(Commands::Uninstall {
            remote,
            category,
            package,
            db_path,
        }) => {
            let mut registry = open_registry(&db_path)?;

            if let Some(remote) = Remote::find_by_name(registry.connection(), &remote)? {
                if remote.protected {
                    return Err(anyhow::anyhow!(
                        "Packages of remote '{}' cannot be uninstalled",
                        remote.name
                    ));
                }
            }

            let entry = find_installed(&registry, &remote, &category, &package)?;
            let file_count = registry.get_files(&entry)?.len();
            registry.forget(&entry)?;

            println!("Uninstalled {} version {}", entry.package, entry.version);
            println!("  Files released: {}", file_count);
            Ok(())
        }
        Some(Commands::Pin {
            remote,
            category,
            package,
            off,
            db_path,
        }) => {
            let mut registry = open_registry(&db_path)?;
            let entry = find_installed(&registry, &remote, &category, &package)?;
            registry.set_pinned(&entry, !off)?;

            if off {
                println!("Unpinned {}", entry.package);
            } else {
                println!("Pinned {} to version {}", entry.package, entry.version);
            }
            Ok(())
        }
        Some(Commands::Files {
            remote,
            category,
            package,
            db_path,
        }) => {
            let registry = open_registry(&db_path)?;
            let entry = find_installed(&registry, &remote, &category, &package)?;
            let main = registry.get_main_file(&entry)?;

            for path in registry.get_files(&entry)? {
                if path == main {
                    println!("{} (main)", path);
                } else {
                    println!("{}", path);
                }
            }
            Ok(())
        }
        None => {
            println!("ReaPack v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'reapack --help' for usage information");
            Ok(())
        }
    }
}
