use crate::manifest::{BuildManifest, MANIFEST_FILE};
use crate::monorepo::ResolvedPackage;
use crate::package::PackageDescriptor;
use crate::workspace::ResolvedRepository;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn package_at(dir: &Path, name: &str) -> PackageDescriptor {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("package.json"),
        format!(r#"{{ "name": "{name}" }}"#),
    )
    .unwrap();
    PackageDescriptor::load_dir(dir).unwrap()
}

fn plain_repo(root: &Path, rel: &str) -> ResolvedRepository {
    let path = root.join(rel);
    ResolvedRepository {
        name: rel.to_string(),
        package: package_at(&path, rel),
        path,
        is_mono_repo: false,
        packages: Vec::new(),
    }
}

fn mono_repo(root: &Path, rel: &str, nested: &[&str]) -> ResolvedRepository {
    let path = root.join(rel);
    let packages = nested
        .iter()
        .map(|n| ResolvedPackage {
            name: n.to_string(),
            path: path.join(n),
            package: package_at(&path.join(n), n),
        })
        .collect();
    ResolvedRepository {
        name: rel.to_string(),
        package: package_at(&path, rel),
        path,
        is_mono_repo: true,
        packages,
    }
}

#[test]
fn test_plain_and_mono_repositories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let repos = vec![
        plain_repo(root, "repoA"),
        mono_repo(root, "mono", &["packages/a", "packages/b"]),
        plain_repo(root, "repoC"),
    ];

    let manifest = BuildManifest::from_repositories(&repos);

    let root = crate::paths::to_slash(root);
    assert_eq!(
        manifest.packages,
        vec![
            format!("{root}/repoA"),
            format!("{root}/mono/packages/a"),
            format!("{root}/mono/packages/b"),
            format!("{root}/repoC"),
        ]
    );
    assert!(!manifest.packages.contains(&format!("{root}/mono")));
}

#[test]
fn test_mono_repo_without_packages_contributes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let repos = vec![mono_repo(temp_dir.path(), "empty-mono", &[])];

    let manifest = BuildManifest::from_repositories(&repos);

    assert!(manifest.packages.is_empty());
}

#[test]
fn test_json_layout() {
    let temp_dir = TempDir::new().unwrap();
    let repos = vec![plain_repo(temp_dir.path(), "repoA")];

    let json = BuildManifest::from_repositories(&repos).to_json().unwrap();

    assert!(json.ends_with("}\n"));
    assert!(json.contains("\n  \"lerna\": \"0.0.2\""));
    let keys: Vec<String> = match serde_json::from_str::<Value>(&json).unwrap() {
        Value::Object(map) => map.keys().cloned().collect(),
        other => panic!("unexpected manifest: {other}"),
    };
    assert_eq!(keys, ["NOTICE", "lerna", "commands", "npmClient", "packages"]);
}

#[test]
fn test_write_is_idempotent() {
    let workspace = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    let repos = vec![
        plain_repo(workspace.path(), "repoA"),
        mono_repo(workspace.path(), "mono", &["packages/x"]),
    ];

    let path = BuildManifest::from_repositories(&repos)
        .write(home.path())
        .unwrap();
    let first = fs::read(&path).unwrap();

    BuildManifest::from_repositories(&repos)
        .write(home.path())
        .unwrap();
    let second = fs::read(&path).unwrap();

    assert_eq!(path, home.path().join(MANIFEST_FILE));
    assert_eq!(first, second);
}

#[test]
fn test_write_overwrites_previous_manifest() {
    let workspace = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    fs::write(home.path().join(MANIFEST_FILE), "stale content that is much longer").unwrap();

    let repos = vec![plain_repo(workspace.path(), "repoA")];
    let path = BuildManifest::from_repositories(&repos)
        .write(home.path())
        .unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["packages"].as_array().unwrap().len(), 1);
}
