//! Git backend against locally constructed repositories

use std::fs;
use std::path::Path;
use std::sync::Arc;

use uppm_core::{EngineRegistry, PartialReference, Repository};
use uppm_engine::CsupEngine;
use uppm_fs::NormalizedPath;
use uppm_repo::{set_force_synchronization, GitOptions, GitRepository};

fn engines() -> Arc<EngineRegistry> {
    let mut engines = EngineRegistry::new();
    engines.register(Arc::new(CsupEngine::default()));
    Arc::new(engines)
}

fn pack_script(name: &str, version: &str) -> String {
    format!(
        "/*\nuppm 0.1 {{\n    name: {name}\n    version: \"{version}\"\n    targetApp: app\n}}\n*/\nbody\n"
    )
}

fn write_pack(root: &Path, name: &str, version: &str) {
    let dir = root.join("author").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(format!("{version}.csup")),
        pack_script(name, version),
    )
    .unwrap();
}

fn init_source_repo(path: &Path) -> git2::Repository {
    let mut options = git2::RepositoryInitOptions::new();
    options.initial_head("master");
    git2::Repository::init_opts(path, &options).unwrap()
}

fn commit_all(repo: &git2::Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = git2::Signature::now("tester", "tester@example.com").unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )
    .unwrap();
}

#[test]
fn clone_refresh_and_load() {
    let temp = tempfile::TempDir::new().unwrap();
    let source_dir = temp.path().join("source");
    let source = init_source_repo(&source_dir);
    write_pack(&source_dir, "pack", "1.0");
    commit_all(&source, "add pack 1.0");

    let url = source_dir.to_string_lossy().to_string();
    let options = GitOptions::new(NormalizedPath::new(temp.path()).join("uppm-temp"));
    let repository = GitRepository::new(&url, engines(), options);

    repository.refresh().unwrap();
    assert!(repository.ready());
    assert!(repository.synchronized());
    assert!(repository.local_checkout_folder().join(".git").exists());

    let package = repository
        .try_get_package(&PartialReference::new("pack"))
        .unwrap();
    assert_eq!(package.meta.version, "1.0");
}

#[test]
fn refresh_fetches_at_most_once_unless_forced() {
    let temp = tempfile::TempDir::new().unwrap();
    let source_dir = temp.path().join("source");
    let source = init_source_repo(&source_dir);
    write_pack(&source_dir, "pack", "1.0");
    commit_all(&source, "add pack 1.0");

    let url = source_dir.to_string_lossy().to_string();
    let options = GitOptions::new(NormalizedPath::new(temp.path()).join("uppm-temp"));
    let repository = GitRepository::new(&url, engines(), options);
    repository.refresh().unwrap();
    assert_eq!(repository.catalog().len(), 1);

    // New upstream content is invisible without a new fetch.
    write_pack(&source_dir, "pack", "2.0");
    commit_all(&source, "add pack 2.0");
    repository.refresh().unwrap();
    assert_eq!(repository.catalog().len(), 1);

    // Forcing re-synchronization picks it up.
    set_force_synchronization(true);
    let refreshed = repository.refresh();
    set_force_synchronization(false);
    refreshed.unwrap();
    assert_eq!(repository.catalog().len(), 2);
}

#[test]
fn unreachable_remote_fails_refresh_and_blocks_loading() {
    let temp = tempfile::TempDir::new().unwrap();
    let url = temp.path().join("missing").to_string_lossy().to_string();
    let options = GitOptions::new(NormalizedPath::new(temp.path()).join("uppm-temp"));
    let repository = GitRepository::new(&url, engines(), options);

    assert!(repository.refresh().is_err());
    assert!(!repository.ready());
    assert!(repository.last_refresh_error().is_some());

    let result = repository.try_get_package(&PartialReference::new("pack"));
    assert!(matches!(
        result,
        Err(uppm_core::Error::RepositoryRefreshFailed { .. })
    ));
}

#[test]
fn recognizes_remote_git_url_shape_only() {
    let temp = tempfile::TempDir::new().unwrap();
    let options = GitOptions::new(NormalizedPath::new(temp.path()));

    let remote = GitRepository::new(
        "https://example.com/packs.repo.git",
        engines(),
        options.clone(),
    );
    assert!(remote.reference_syntactically_valid());

    let local = GitRepository::new("/some/local/path", engines(), options);
    assert!(!local.reference_syntactically_valid());
}
