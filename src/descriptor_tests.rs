//! Tests for descriptor loading and the command-config accessor.

use crate::descriptor::{GithubUri, RepositoryEntry, WorkspaceDescriptor, DESCRIPTOR_FILE};
use crate::WorkspaceError;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_descriptor(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join(DESCRIPTOR_FILE);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_discover_searches_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    write_descriptor(&temp_dir, r#"{ "version": "1.0.0" }"#);
    let nested = temp_dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let (root, descriptor) = WorkspaceDescriptor::discover(&nested).unwrap();

    assert_eq!(root, temp_dir.path());
    assert_eq!(descriptor.version.to_string(), "1.0.0");
}

#[test]
fn test_discover_without_descriptor() {
    let temp_dir = TempDir::new().unwrap();

    let err = WorkspaceDescriptor::discover(temp_dir.path()).unwrap_err();

    assert!(matches!(err, WorkspaceError::ConfigNotFound { .. }));
}

#[test]
fn test_repositories_default_to_root() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, r#"{ "version": "1.0.0" }"#);

    let descriptor = WorkspaceDescriptor::load(&path).unwrap();

    assert_eq!(
        descriptor.repositories,
        vec![RepositoryEntry::Fs {
            path: ".".to_string()
        }]
    );
}

#[test]
fn test_missing_version_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, r#"{ "repositories": ["."] }"#);

    let err = WorkspaceDescriptor::load(&path).unwrap_err();

    assert!(matches!(err, WorkspaceError::ConfigParse { .. }));
    assert!(err.to_string().contains("version"));
}

#[test]
fn test_malformed_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, "{ \"version\": ");

    let err = WorkspaceDescriptor::load(&path).unwrap_err();

    assert!(matches!(err, WorkspaceError::ConfigParse { .. }));
}

#[test]
fn test_repository_entry_shapes() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(
        &temp_dir,
        r#"{
  "version": "1.0.0",
  "repositories": [
    "./repoA",
    { "origin": "fs", "path": "../shared" },
    { "origin": "github", "uri": "https://github.com/acme/widgets.git#develop" }
  ]
}"#,
    );

    let descriptor = WorkspaceDescriptor::load(&path).unwrap();

    assert_eq!(
        descriptor.repositories,
        vec![
            RepositoryEntry::Fs {
                path: "./repoA".to_string()
            },
            RepositoryEntry::Fs {
                path: "../shared".to_string()
            },
            RepositoryEntry::Github(GithubUri {
                url: "https://github.com/acme/widgets.git".to_string(),
                name: "widgets".to_string(),
                reference: Some("develop".to_string()),
            }),
        ]
    );
}

#[test]
fn test_unknown_origin_names_the_entry() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(
        &temp_dir,
        r#"{ "version": "1.0.0", "repositories": [{ "origin": "ftp", "path": "x" }] }"#,
    );

    let err = WorkspaceDescriptor::load(&path).unwrap_err();

    assert!(matches!(err, WorkspaceError::InvalidRepositoryEntry { .. }));
    assert!(err.to_string().contains("ftp"));
}

#[test]
fn test_non_string_non_object_entry() {
    let err = RepositoryEntry::from_value(&json!(42)).unwrap_err();
    assert!(matches!(err, WorkspaceError::InvalidRepositoryEntry { .. }));
}

#[test]
fn test_github_uri_parsing() {
    let uri = GithubUri::parse("https://github.com/acme/widgets.git").unwrap();
    assert_eq!(uri.name, "widgets");
    assert_eq!(uri.reference, None);
    assert_eq!(uri.to_string(), "https://github.com/acme/widgets.git");

    let uri = GithubUri::parse("https://github.com/acme/kmc-ng.git#release/v2").unwrap();
    assert_eq!(uri.name, "kmc-ng");
    assert_eq!(uri.reference.as_deref(), Some("release/v2"));

    for bad in [
        "git@github.com:acme/widgets.git",
        "https://gitlab.com/acme/widgets.git",
        "https://github.com/acme/widgets",
        "https://github.com/acme/widgets.git#dev;touch marker",
        "https://github.com/acme/widgets.git#$(id)",
        "https://github.com/acme/widgets.git#-upload-pack=x",
        "https://github.com/acme/wid gets.git",
        "https://github.com/acme/w;ls.git",
        "https://github.com/acme/...git",
    ] {
        let err = GithubUri::parse(bad).unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidRepositoryUri { .. }), "{bad}");
    }
}

#[test]
fn test_command_value_lookup() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(
        &temp_dir,
        r#"{
  "version": "1.0.0",
  "licenses": { "ignoreList": ["left-pad"] },
  "commands": { "release": { "appConfig": { "path": "src/app.json", "key": "version" } } }
}"#,
    );

    let descriptor = WorkspaceDescriptor::load(&path).unwrap();

    assert_eq!(
        descriptor.command_value("release.appConfig.path"),
        Some(&json!("src/app.json"))
    );
    assert!(descriptor.command_value("release.appConfig").unwrap().is_object());
    assert_eq!(descriptor.command_value("release.missing.key"), None);
    assert_eq!(descriptor.command_value("bookmark.main"), None);
    assert_eq!(descriptor.license_ignore_list(), ["left-pad".to_string()]);
}

#[test]
fn test_command_value_without_commands_section() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, r#"{ "version": "1.0.0" }"#);

    let descriptor = WorkspaceDescriptor::load(&path).unwrap();

    assert_eq!(descriptor.command_value("release"), None);
    assert!(descriptor.license_ignore_list().is_empty());
}

#[test]
fn test_update_merges_and_persists() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(
        &temp_dir,
        r#"{
  "version": "1.0.0",
  "commands": { "bookmark": { "stable": "abc1234" }, "release": { "key": "v" } }
}"#,
    );

    let descriptor = WorkspaceDescriptor::load(&path).unwrap();
    let updated = descriptor
        .update(&json!({ "commands": { "bookmark": { "next": "def5678" } } }))
        .unwrap();

    // The original snapshot is unchanged.
    assert_eq!(descriptor.command_value("bookmark.next"), None);

    assert_eq!(updated.command_value("bookmark.stable"), Some(&json!("abc1234")));
    assert_eq!(updated.command_value("bookmark.next"), Some(&json!("def5678")));
    assert_eq!(updated.command_value("release.key"), Some(&json!("v")));

    let reloaded = WorkspaceDescriptor::load(&path).unwrap();
    assert_eq!(reloaded.command_value("bookmark.next"), Some(&json!("def5678")));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.ends_with("}\n"));
    assert!(content.find("\"version\"").unwrap() < content.find("\"commands\"").unwrap());
}
