use std::sync::Arc;

use nbstore_core::{DocumentStore, Error, SaveModel};
use nbstore_fs::{FileFormat, Notebook};
use nbstore_test_utils::TestRoot;
use pretty_assertions::assert_eq;
use serde_json::json;

fn store(root: &TestRoot) -> DocumentStore {
    DocumentStore::from_config(Arc::new(root.backend()), &root.config()).unwrap()
}

fn notebook() -> Notebook {
    Notebook::from_value(json!({"nbformat": 4, "nbformat_minor": 5, "metadata": {}, "cells": []}))
        .unwrap()
}

// -- delete -----------------------------------------------------------------

#[test]
fn test_delete_file() {
    let root = TestRoot::new();
    root.write("a.txt", "x");
    let store = store(&root);

    store.delete_file("a.txt").unwrap();

    root.assert_file_not_exists("a.txt");
}

#[test]
fn test_delete_missing() {
    let root = TestRoot::new();
    let store = store(&root);

    let err = store.delete_file("gone.txt").unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn test_delete_directory_with_content_refused() {
    let root = TestRoot::new();
    root.write("d/keep.txt", "x");
    let store = store(&root);

    let err = store.delete_file("d").unwrap_err();

    assert_eq!(err.to_string(), "Directory d not empty");
    assert_eq!(err.status_code(), 400);
    root.assert_file_exists("d/keep.txt");
}

#[test]
fn test_delete_directory_holding_only_checkpoints() {
    let root = TestRoot::new();
    root.write("d/.ipynb_checkpoints/x-checkpoint.ipynb", "{}");
    let store = store(&root);

    store.delete_file("d").unwrap();

    root.assert_file_not_exists("d");
}

#[test]
fn test_delete_empty_directory() {
    let root = TestRoot::new();
    root.mkdir("empty");
    let store = store(&root);

    store.delete_file("empty").unwrap();

    root.assert_file_not_exists("empty");
}

#[test]
fn test_delete_file_leaves_checkpoint() {
    let root = TestRoot::new();
    let store = store(&root);
    store.save(SaveModel::notebook(&notebook()), "nb.ipynb").unwrap();

    store.delete_file("nb.ipynb").unwrap();

    root.assert_file_exists(".ipynb_checkpoints/nb-checkpoint.ipynb");
}

#[test]
fn test_delete_removes_checkpoint() {
    let root = TestRoot::new();
    let store = store(&root);
    store.save(SaveModel::notebook(&notebook()), "nb.ipynb").unwrap();

    store.delete("nb.ipynb").unwrap();

    root.assert_file_not_exists("nb.ipynb");
    root.assert_file_not_exists(".ipynb_checkpoints/nb-checkpoint.ipynb");
}

#[test]
fn test_delete_permission_denied() {
    let root = TestRoot::new();
    root.write("a.txt", "x");
    let (faulty, io) = root.faulty_io();
    let store = DocumentStore::from_config(faulty.clone(), &root.config()).unwrap();
    faulty.deny(io.backend_path("a.txt"));

    let err = store.delete_file("a.txt").unwrap_err();

    assert!(err.is_permission_denied());
    root.assert_file_exists("a.txt");
}

// -- rename -----------------------------------------------------------------

#[test]
fn test_rename_file() {
    let root = TestRoot::new();
    root.write("old.txt", "data");
    let store = store(&root);

    store.rename_file("old.txt", "new.txt").unwrap();

    root.assert_file_not_exists("old.txt");
    assert_eq!(root.read_to_string("new.txt"), "data");
}

#[test]
fn test_rename_to_same_path_is_noop() {
    let root = TestRoot::new();
    root.write("a.txt", "data");
    let (faulty, _io) = root.faulty_io();
    let store = DocumentStore::from_config(faulty.clone(), &root.config()).unwrap();

    store.rename_file("/a.txt", "a.txt/").unwrap();

    assert_eq!(faulty.rename_count(), 0);
    root.assert_file_contains("a.txt", "data");
}

#[test]
fn test_rename_onto_existing_refused() {
    let root = TestRoot::new();
    root.write("a.txt", "a");
    root.write("b.txt", "b");
    let store = store(&root);

    let err = store.rename_file("a.txt", "b.txt").unwrap_err();

    assert_eq!(err.to_string(), "File already exists: b.txt");
    assert_eq!(err.status_code(), 409);
    assert_eq!(root.read_to_string("a.txt"), "a");
    assert_eq!(root.read_to_string("b.txt"), "b");
}

#[test]
fn test_rename_missing_source() {
    let root = TestRoot::new();
    let store = store(&root);

    assert!(matches!(
        store.rename_file("nothing.txt", "b.txt"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn test_rename_backend_failure_is_wrapped() {
    let root = TestRoot::new();
    root.write("a.txt", "a");
    let (faulty, _io) = root.faulty_io();
    let store = DocumentStore::from_config(faulty.clone(), &root.config()).unwrap();
    faulty.fail_renames(true);

    let err = store.rename_file("a.txt", "b.txt").unwrap_err();

    assert!(matches!(err, Error::RenameFailed { ref old, ref new, .. } if old == "a.txt" && new == "b.txt"));
    assert_eq!(err.status_code(), 500);
    root.assert_file_exists("a.txt");
}

#[test]
fn test_rename_directory() {
    let root = TestRoot::new();
    root.write("src/inner.txt", "x");
    let store = store(&root);

    store.rename_file("src", "dst").unwrap();

    root.assert_file_contains("dst/inner.txt", "x");
    root.assert_file_not_exists("src");
}

#[test]
fn test_rename_file_leaves_checkpoint_behind() {
    let root = TestRoot::new();
    let store = store(&root);
    store.save(SaveModel::notebook(&notebook()), "a.ipynb").unwrap();

    store.rename_file("a.ipynb", "b.ipynb").unwrap();

    root.assert_file_exists(".ipynb_checkpoints/a-checkpoint.ipynb");
    assert!(store.list_checkpoints("b.ipynb").unwrap().is_empty());
}

#[test]
fn test_rename_moves_checkpoint() {
    let root = TestRoot::new();
    root.mkdir("archive");
    let store = store(&root);
    store.save(SaveModel::notebook(&notebook()), "a.ipynb").unwrap();

    store.rename("a.ipynb", "archive/b.ipynb").unwrap();

    root.assert_file_exists("archive/b.ipynb");
    root.assert_file_exists("archive/.ipynb_checkpoints/b-checkpoint.ipynb");
    root.assert_file_not_exists(".ipynb_checkpoints/a-checkpoint.ipynb");
    assert_eq!(store.list_checkpoints("archive/b.ipynb").unwrap().len(), 1);
}

#[test]
fn test_checkpoint_pass_throughs() {
    let root = TestRoot::new();
    let store = store(&root);
    store
        .save(SaveModel::file("v1", FileFormat::Text), "f.txt")
        .unwrap();

    let meta = store.create_checkpoint("f.txt").unwrap();
    store
        .save(SaveModel::file("v2", FileFormat::Text), "f.txt")
        .unwrap();
    store.restore_checkpoint(&meta.id, "f.txt").unwrap();
    assert_eq!(root.read_to_string("f.txt"), "v1");

    store.delete_checkpoint(&meta.id, "f.txt").unwrap();
    assert!(store.list_checkpoints("f.txt").unwrap().is_empty());
}
