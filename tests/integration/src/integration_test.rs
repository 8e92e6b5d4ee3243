//! End-to-end scenarios across the I/O layer and the document store
//!
//! Each test wires a store the way a host service would: configuration file
//! -> backend -> `DocumentStore`, then drives it only through API paths.

use std::sync::Arc;
use std::thread;

use nbstore_core::{ContentKind, DocumentStore, Error, SaveModel};
use nbstore_fs::{ConfigStore, FileFormat, Notebook, StoreConfig};
use nbstore_test_utils::TestRoot;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn sample_notebook() -> Notebook {
    Notebook::from_value(json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {"kernelspec": {"name": "python3", "display_name": "Python 3"}},
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": "# Results"},
            {"cell_type": "code", "metadata": {}, "source": "print(1)", "outputs": [], "execution_count": null}
        ]
    }))
    .unwrap()
}

/// Load the store configuration from a TOML file, as a host would.
fn configured_store(root: &TestRoot, extra: &str) -> DocumentStore {
    nbstore_core::logging::init_for_tests();
    let config_dir = tempfile::TempDir::new().unwrap();
    let config_path = config_dir.path().join("store.toml");
    std::fs::write(
        &config_path,
        format!("root_dir = \"{}\"\n{}", root.root_dir(), extra),
    )
    .unwrap();
    let config: StoreConfig = ConfigStore::new().load(&config_path).unwrap();
    DocumentStore::from_config(Arc::new(root.backend()), &config).unwrap()
}

#[test]
fn test_save_then_get_notebook_in_subdirectory() {
    let root = TestRoot::with_root("/user/alice");
    let store = configured_store(&root, "");

    store.save(SaveModel::directory(), "a").unwrap();
    let saved = store
        .save(SaveModel::notebook(&sample_notebook()), "a/b.ipynb")
        .unwrap();
    let model = store.get("a/b.ipynb", true, None, None).unwrap();

    assert_eq!(saved.kind, ContentKind::Notebook);
    assert_eq!(model.kind, ContentKind::Notebook);
    assert_eq!(model.notebook(), Some(&sample_notebook()));
    assert_eq!(store.list_checkpoints("a/b.ipynb").unwrap().len(), 1);
    root.assert_file_exists("a/.ipynb_checkpoints/b-checkpoint.ipynb");
    root.assert_file_not_exists("a/.~b.ipynb");
}

#[test]
fn test_listing_hides_checkpoints_and_sidecars() {
    let root = TestRoot::new();
    let store = configured_store(&root, "");
    store
        .save(SaveModel::notebook(&sample_notebook()), "work/nb.ipynb")
        .unwrap();
    root.write("work/.~stale.ipynb", "{}");

    let listing = store.get("work", true, None, None).unwrap();
    let names: Vec<String> = listing
        .children()
        .unwrap()
        .iter()
        .map(|c| c.name.clone())
        .collect();

    assert_eq!(names, vec!["nb.ipynb".to_string()]);
}

#[test]
fn test_interrupted_write_is_repaired_on_get() {
    let root = TestRoot::new();
    let store = configured_store(&root, "");
    store
        .save(SaveModel::notebook(&sample_notebook()), "nb.ipynb")
        .unwrap();

    // What a crash between truncate and rewrite leaves behind.
    let good = root.read("nb.ipynb");
    root.write(".~nb.ipynb", &good);
    root.write("nb.ipynb", "{\"cells\": [{\"cell_t");

    let model = store.get("nb.ipynb", true, None, None).unwrap();

    assert_eq!(model.notebook(), Some(&sample_notebook()));
    root.assert_file_exists("nb.ipynb.invalid");
    root.assert_file_not_exists(".~nb.ipynb");
}

#[test]
fn test_direct_mode_surfaces_corruption() {
    let root = TestRoot::new();
    let store = configured_store(&root, "use_atomic_writing = false\n");
    root.write("nb.ipynb", "{oops");
    root.write(".~nb.ipynb", sample_notebook().to_canonical_string());

    let err = store.get("nb.ipynb", true, None, None).unwrap_err();

    assert!(matches!(
        err,
        Error::Fs(nbstore_fs::Error::UnreadableDocument { .. })
    ));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_notebook_lifecycle() {
    let root = TestRoot::new();
    let store = configured_store(&root, "checkpoint_dir = \".snapshots\"\n");

    store.save(SaveModel::directory(), "proj").unwrap();
    store
        .save(SaveModel::notebook(&sample_notebook()), "proj/draft.ipynb")
        .unwrap();
    store.rename("proj/draft.ipynb", "proj/final.ipynb").unwrap();

    root.assert_file_exists("proj/.snapshots/final-checkpoint.ipynb");
    assert_eq!(store.list_checkpoints("proj/final.ipynb").unwrap().len(), 1);

    let err = store.delete("proj").unwrap_err();
    assert!(matches!(err, Error::DirectoryNotEmpty { .. }));

    store.delete("proj/final.ipynb").unwrap();
    assert_eq!(root.list("proj"), vec![".snapshots"]);

    store.delete("proj").unwrap();
    root.assert_file_not_exists("proj");
}

#[test]
fn test_store_is_shared_across_threads() {
    let root = TestRoot::new();
    let store = Arc::new(configured_store(&root, ""));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let path = format!("threads/file-{}.txt", i);
                store
                    .save(SaveModel::file(format!("payload {}", i), FileFormat::Text), &path)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        root.list("threads"),
        vec!["file-0.txt", "file-1.txt", "file-2.txt", "file-3.txt"]
    );
    root.assert_file_contains("threads/file-2.txt", "payload 2");
}

#[test]
fn test_info_string_names_root() {
    let root = TestRoot::with_root("/user/alice");
    let store = configured_store(&root, "");

    let info = store.info_string();

    assert!(predicate::str::contains("/user/alice").eval(&info));
}
