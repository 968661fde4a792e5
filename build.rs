// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "/var/lib/reapack/registry.db";
const DEFAULT_CACHE_DIR: &str = "/var/cache/reapack";

fn db_path() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .default_value(DEFAULT_DB_PATH)
        .help("Database path")
}

fn cache_dir() -> Arg {
    Arg::new("cache_dir")
        .short('c')
        .long("cache-dir")
        .value_name("DIR")
        .default_value(DEFAULT_CACHE_DIR)
        .help("Directory holding <remote>.xml index files")
}

fn package_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("remote").required(true).help("Remote name"))
        .arg(Arg::new("category").required(true).help("Category name"))
        .arg(Arg::new("package").required(true).help("Package name"))
}

fn build_cli() -> Command {
    Command::new("reapack")
        .version(env!("CARGO_PKG_VERSION"))
        .author("ReaPack Contributors")
        .about("Package registry for REAPER resource repositories")
        .subcommand_required(false)
        .subcommand(
            Command::new("init")
                .about("Initialize the registry database")
                .arg(db_path()),
        )
        .subcommand(
            Command::new("remote-add")
                .about("Add a remote repository")
                .arg(Arg::new("name").required(true).help("Remote name"))
                .arg(Arg::new("url").required(true).help("Index URL"))
                .arg(
                    Arg::new("protected")
                        .long("protected")
                        .action(ArgAction::SetTrue)
                        .help("Refuse to uninstall this remote's packages"),
                )
                .arg(
                    Arg::new("disabled")
                        .long("disabled")
                        .action(ArgAction::SetTrue)
                        .help("Add the remote disabled"),
                )
                .arg(db_path()),
        )
        .subcommand(
            Command::new("remote-list")
                .about("List remote repositories")
                .arg(db_path()),
        )
        .subcommand(
            Command::new("remote-remove")
                .about("Remove a remote repository and forget its installed packages")
                .arg(Arg::new("name").required(true).help("Remote name"))
                .arg(db_path()),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change preferences")
                .arg(
                    Arg::new("pre_releases")
                        .long("pre-releases")
                        .value_name("BOOL")
                        .help("Offer pre-release versions as updates"),
                )
                .arg(
                    Arg::new("show_obsolete")
                        .long("show-obsolete")
                        .value_name("BOOL")
                        .help("List installed packages their remote no longer publishes"),
                )
                .arg(db_path()),
        )
        .subcommand(
            Command::new("browse")
                .about("List the packages of every enabled remote")
                .arg(
                    Arg::new("installed")
                        .long("installed")
                        .action(ArgAction::SetTrue)
                        .help("Only list installed packages"),
                )
                .arg(
                    Arg::new("outdated")
                        .long("outdated")
                        .action(ArgAction::SetTrue)
                        .help("Only list packages with an update available"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print rows as JSON"),
                )
                .arg(db_path())
                .arg(cache_dir()),
        )
        .subcommand(
            package_args(Command::new("install").about("Register a package version as installed"))
                .arg(
                    Arg::new("version")
                        .long("version")
                        .value_name("VERSION")
                        .help("Version to install (default: latest)"),
                )
                .arg(db_path())
                .arg(cache_dir()),
        )
        .subcommand(
            package_args(
                Command::new("uninstall").about("Forget an installed package and release its files"),
            )
            .arg(db_path()),
        )
        .subcommand(
            package_args(Command::new("pin").about("Pin an installed package to its current version"))
                .arg(
                    Arg::new("off")
                        .long("off")
                        .action(ArgAction::SetTrue)
                        .help("Unpin instead"),
                )
                .arg(db_path()),
        )
        .subcommand(
            package_args(Command::new("files").about("List the files owned by an installed package"))
                .arg(db_path()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("reapack.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
