// tests/integration_test.rs

//! Integration tests for ReaPack
//!
//! These tests verify end-to-end functionality across modules.

use reapack::browser;
use reapack::db;
use reapack::index::{Category, Package, PackageType, Platform, RemoteIndex, Source, Version};
use reapack::{Catalog, Error, InstallOptions, Registry, Remote, VersionName};
use tempfile::{NamedTempFile, TempDir};

fn version(name: &str, files: &[&str]) -> Version {
    let mut version = Version::new(name).unwrap();
    version.set_author("cfillion");
    for file in files {
        version.add_source(Source::new(Platform::All, *file, "https://example.com/file"));
    }
    version
}

fn remote_index(packages: Vec<Package>) -> RemoteIndex {
    let mut category = Category::new("Category Name").unwrap();
    for package in packages {
        category.add_package(package);
    }
    let mut index = RemoteIndex::new("Remote Name").unwrap();
    index.add_category(category);
    index
}

fn hello(versions: &[&str]) -> RemoteIndex {
    let mut package = Package::new(PackageType::Script, "Hello").unwrap();
    package.set_description("Hello World");
    for name in versions {
        package.add_version(version(name, &["file"]));
    }
    remote_index(vec![package])
}

fn temp_db_path() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry.db").to_str().unwrap().to_string();
    (dir, path)
}

#[test]
fn test_database_lifecycle() {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();

    // Remove the temp file so init can create it
    drop(temp_file);

    assert!(db::init(&db_path).is_ok(), "Database initialization should succeed");
    assert!(std::path::Path::new(&db_path).exists());

    let conn = db::open(&db_path).unwrap();
    let foreign_keys: i32 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1, "Foreign keys should be enabled");
}

#[test]
fn test_open_missing_database() {
    let (_dir, db_path) = temp_db_path();
    assert!(matches!(db::open(&db_path), Err(Error::DatabaseNotFound(_))));
}

#[test]
fn test_get_entry_before_push() {
    let registry = Registry::open_in_memory().unwrap();
    let index = hello(&["1.0"]);
    let package = index.find_package("Category Name", "Hello").unwrap();

    let entry = registry.get_entry(package).unwrap();
    assert_eq!(entry.id, 0);
    assert!(!entry.is_installed());
    assert!(registry.get_files(&entry).unwrap().is_empty());
    assert_eq!(registry.get_main_file(&entry).unwrap(), "");
}

#[test]
fn test_push_and_upgrade() {
    let mut registry = Registry::open_in_memory().unwrap();

    let v1 = hello(&["1.0"]);
    let package = v1.find_package("Category Name", "Hello").unwrap();
    let entry = registry.push(package.version(0).unwrap(), None).unwrap();

    assert_eq!(entry.id, 1);
    assert_eq!(entry.remote, "Remote Name");
    assert_eq!(entry.category, "Category Name");
    assert_eq!(entry.package, "Hello");
    assert_eq!(entry.description, "Hello World");
    assert_eq!(entry.package_type, PackageType::Script);
    assert_eq!(entry.version, VersionName::parse("1.0").unwrap());
    assert_eq!(entry.author, "cfillion");
    assert!(!entry.pinned);
    assert_eq!(registry.get_entry(package).unwrap(), entry);

    let entries = registry.get_entries("Remote Name").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, 1);
    assert_eq!(
        entries[0].version.code(),
        VersionName::parse("1.0").unwrap().code()
    );

    // a reload of the remote publishes 2.0
    let v2 = hello(&["2.0"]);
    let package = v2.find_package("Category Name", "Hello").unwrap();
    let upgraded = registry.push(package.version(0).unwrap(), None).unwrap();

    assert_eq!(upgraded.id, 1);
    let entries = registry.get_entries("Remote Name").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].version.code(),
        VersionName::parse("2.0").unwrap().code()
    );
}

#[test]
fn test_get_files_matches_version() {
    let mut registry = Registry::open_in_memory().unwrap();

    let mut package = Package::new(PackageType::Script, "Hello").unwrap();
    package.add_version(version("1.0", &["", "lib/util.lua", "data.txt"]));
    let index = remote_index(vec![package]);

    let ver = index
        .find_package("Category Name", "Hello")
        .unwrap()
        .version(0)
        .unwrap();
    let entry = registry.push(ver, None).unwrap();

    assert_eq!(registry.get_files(&entry).unwrap(), ver.files().unwrap());
    assert_eq!(
        registry.get_main_file(&entry).unwrap(),
        "Scripts/Remote Name/Category Name/Hello"
    );
}

#[test]
fn test_no_main_file() {
    let mut registry = Registry::open_in_memory().unwrap();
    let index = hello(&["1.0"]);
    let ver = index
        .find_package("Category Name", "Hello")
        .unwrap()
        .version(0)
        .unwrap();

    let entry = registry.push(ver, None).unwrap();
    assert_eq!(registry.get_main_file(&entry).unwrap(), "");
}

#[test]
fn test_forget() {
    let mut registry = Registry::open_in_memory().unwrap();
    let index = hello(&["1.0"]);
    let package = index.find_package("Category Name", "Hello").unwrap();

    let entry = registry.push(package.version(0).unwrap(), None).unwrap();
    registry.forget(&entry).unwrap();

    assert_eq!(registry.get_entry(package).unwrap().id, 0);
    assert!(registry.get_entries("Remote Name").unwrap().is_empty());
    assert!(registry.get_files(&entry).unwrap().is_empty());
}

#[test]
fn test_file_conflict() {
    let mut registry = Registry::open_in_memory().unwrap();

    let mut hello_pkg = Package::new(PackageType::Script, "Hello").unwrap();
    hello_pkg.add_version(version("1.0", &["file"]));
    let mut duplicate = Package::new(PackageType::Script, "Duplicate Package").unwrap();
    duplicate.add_version(version("1.0", &["file", "file2"]));
    let index = remote_index(vec![hello_pkg, duplicate]);

    let hello = index.find_package("Category Name", "Hello").unwrap();
    let dup = index.find_package("Category Name", "Duplicate Package").unwrap();

    registry.push(hello.version(0).unwrap(), None).unwrap();

    match registry.push(dup.version(0).unwrap(), None) {
        Err(Error::Conflict(paths)) => {
            assert_eq!(paths, vec!["Scripts/Remote Name/Category Name/file".to_string()]);
        }
        other => panic!("expected a conflict, got {:?}", other),
    }

    let mut conflicts = Vec::new();
    let entry = registry
        .push(dup.version(0).unwrap(), Some(&mut conflicts))
        .unwrap();

    assert_eq!(entry.id, 0);
    assert_eq!(conflicts, vec!["Scripts/Remote Name/Category Name/file".to_string()]);
    assert_eq!(registry.get_entry(dup).unwrap().id, 0);
    assert_eq!(registry.get_entries("Remote Name").unwrap().len(), 1);

    // nothing was written for the rejected version
    let file2 = registry
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM files WHERE path = ?1",
            ["Scripts/Remote Name/Category Name/file2"],
            |row| row.get::<_, i64>(0),
        )
        .unwrap();
    assert_eq!(file2, 0);
}

#[test]
fn test_zero_source_version_never_observed() {
    let mut package = Package::new(PackageType::Script, "Hello").unwrap();
    assert!(!package.add_version(Version::new("2.0").unwrap()));
    assert!(package.add_version(version("1.0", &["file"])));

    let index = remote_index(vec![package]);
    let package = index.find_package("Category Name", "Hello").unwrap();

    let names: Vec<String> = package.versions().map(|v| v.name().to_string()).collect();
    assert_eq!(names, vec!["1.0"]);
    let last = package
        .last_version(true, &VersionName::default())
        .unwrap();
    assert_eq!(last.name().to_string(), "1.0");
}

#[test]
fn test_registry_persists_across_reopen() {
    let (_dir, db_path) = temp_db_path();
    let index = hello(&["1.0"]);
    let package = index.find_package("Category Name", "Hello").unwrap();

    {
        let mut registry = Registry::open(&db_path).unwrap();
        let entry = registry.push(package.version(0).unwrap(), None).unwrap();
        registry.set_pinned(&entry, true).unwrap();
    }

    let registry = Registry::open(&db_path).unwrap();
    let entry = registry.get_entry(package).unwrap();
    assert_eq!(entry.id, 1);
    assert!(entry.pinned);
    assert_eq!(entry.version.to_string(), "1.0");
    assert_eq!(
        registry.get_files(&entry).unwrap().into_iter().collect::<Vec<_>>(),
        vec!["Scripts/Remote Name/Category Name/file".to_string()]
    );
}

#[test]
fn test_remotes_and_settings_persist() {
    let (_dir, db_path) = temp_db_path();

    {
        let registry = Registry::open(&db_path).unwrap();
        let mut remote = Remote::new("ReaTeam Scripts".to_string(), "https://example.com/index.xml".to_string());
        remote.protected = true;
        remote.insert(registry.connection()).unwrap();

        let options = InstallOptions {
            pre_releases: true,
            show_obsolete: false,
        };
        options.save(registry.connection()).unwrap();
    }

    let registry = Registry::open(&db_path).unwrap();
    let remote = Remote::find_by_name(registry.connection(), "ReaTeam Scripts")
        .unwrap()
        .unwrap();
    assert!(remote.protected);
    assert!(remote.enabled);

    let options = InstallOptions::load(registry.connection()).unwrap();
    assert!(options.pre_releases);
    assert!(!options.show_obsolete);
}

#[test]
fn test_parse_and_browse() {
    let cache = TempDir::new().unwrap();
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<index version="1" name="Remote Name">
  <category name="Category Name">
    <reapack name="Hello" type="script" desc="Hello World">
      <version name="1.0" author="cfillion" time="2016-01-01T00:00:00Z">
        <source platform="all">https://example.com/hello-1.0.lua</source>
      </version>
      <version name="1.1" author="cfillion" time="2016-02-01T00:00:00Z">
        <source platform="all">https://example.com/hello-1.1.lua</source>
      </version>
    </reapack>
    <reapack name="World" type="effect">
      <version name="0.1">
        <source file="world.jsfx">https://example.com/world</source>
      </version>
    </reapack>
  </category>
</index>"#;
    std::fs::write(Catalog::index_path(cache.path(), "Remote Name"), xml).unwrap();

    let mut catalog = Catalog::new();
    let failures = catalog.load_dir(cache.path(), &["Remote Name".to_string()]);
    assert!(failures.is_empty());

    let mut registry = Registry::open_in_memory().unwrap();
    let index = catalog.get("Remote Name").unwrap();
    let hello = index.find_package("Category Name", "Hello").unwrap();
    let installed = registry.push(hello.version(0).unwrap(), None).unwrap();
    assert_eq!(
        registry.get_main_file(&installed).unwrap(),
        "Scripts/Remote Name/Category Name/Hello"
    );

    // an entry whose package the remote no longer publishes
    let gone = remote_index(vec![{
        let mut package = Package::new(PackageType::Script, "Gone").unwrap();
        package.add_version(version("1.0", &["gone.lua"]));
        package
    }]);
    registry
        .push(
            gone.find_package("Category Name", "Gone")
                .unwrap()
                .version(0)
                .unwrap(),
            None,
        )
        .unwrap();

    let options = InstallOptions {
        pre_releases: false,
        show_obsolete: true,
    };
    let entries = browser::populate(&catalog, &registry, &options).unwrap();
    assert_eq!(entries.len(), 3);

    let hello_row = entries.iter().find(|e| e.package_name() == "Hello").unwrap();
    assert!(hello_row.is_installed());
    assert!(hello_row.is_out_of_date());
    assert_eq!(hello_row.display_version(), "1.0 (1.1)");

    let world = entries.iter().find(|e| e.package_name() == "World").unwrap();
    assert!(world.is_uninstalled());

    let obsolete = entries.iter().find(|e| e.package_name() == "Gone").unwrap();
    assert!(obsolete.is_obsolete());
    assert!(obsolete.package().is_none());
    assert_eq!(obsolete.row().version, "1.0");
}

#[test]
fn test_failed_reload_keeps_cached_catalog() {
    let mut catalog = Catalog::new();
    catalog
        .load(
            "Remote Name",
            r#"<index version="1"><category name="C"><reapack name="A" type="script">
                <version name="1.0"><source>u</source></version></reapack></category></index>"#,
        )
        .unwrap();

    let result = catalog.load("Remote Name", r#"<index version="1"><category><reapack/></category></index>"#);
    assert!(matches!(result, Err(Error::Parse(_))));
    assert!(catalog.get("Remote Name").unwrap().find_package("C", "A").is_some());
}
