//! Property tests for the durability guarantees.

use std::io::Write;
use std::sync::Arc;

use nbstore_core::{CheckpointStore, DocumentStore, SaveModel};
use nbstore_fs::{FileFormat, Notebook};
use nbstore_test_utils::TestRoot;
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// A write that fails anywhere mid-stream leaves the previous content.
    #[test]
    fn interrupted_write_keeps_old_content(
        old in proptest::collection::vec(any::<u8>(), 0..512),
        new in proptest::collection::vec(any::<u8>(), 1..512),
        cut in any::<proptest::sample::Index>(),
    ) {
        let root = TestRoot::new();
        root.write("doc.bin", &old);
        let (faulty, io) = root.faulty_io();
        let path = io.backend_path("doc.bin");
        faulty.fail_write_after(path.clone(), cut.index(new.len()));

        let result = io.atomic_write(&path, |w| w.write_all(&new));

        prop_assert!(result.is_err());
        prop_assert_eq!(root.read("doc.bin"), old);
        prop_assert!(!root.exists(".~doc.bin"));
    }

    /// A successful write leaves the new content and no intermediate.
    #[test]
    fn completed_write_has_new_content(
        old in proptest::collection::vec(any::<u8>(), 0..512),
        new in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let root = TestRoot::new();
        root.write("doc.bin", &old);
        let io = root.io();

        io.atomic_write(&io.backend_path("doc.bin"), |w| w.write_all(&new)).unwrap();

        prop_assert_eq!(root.read("doc.bin"), new);
        prop_assert!(!root.exists(".~doc.bin"));
    }

    /// Base64 writes read back as text exactly when the bytes are UTF-8.
    #[test]
    fn untyped_read_falls_back_to_base64(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let root = TestRoot::new();
        let io = root.io();
        let path = io.backend_path("payload");

        io.write_file(&path, &encoded, Some("base64")).unwrap();
        let (content, format) = io.read_file(&path, None).unwrap();

        match std::str::from_utf8(&bytes) {
            Ok(text) => {
                prop_assert_eq!(format, FileFormat::Text);
                prop_assert_eq!(content, text);
            }
            Err(_) => {
                prop_assert_eq!(format, FileFormat::Base64);
                prop_assert_eq!(content, encoded);
            }
        }
    }

    /// Restore returns the bytes present at checkpoint time.
    #[test]
    fn checkpoint_restore_is_byte_identical(
        before in proptest::collection::vec(any::<u8>(), 0..1024),
        after in proptest::collection::vec(any::<u8>(), 0..1024),
    ) {
        let root = TestRoot::new();
        root.write("f.bin", &before);
        let checkpoints = CheckpointStore::new(Arc::new(root.io()), ".ipynb_checkpoints");

        let meta = checkpoints.create("f.bin").unwrap();
        root.write("f.bin", &after);
        checkpoints.restore(&meta.id, "f.bin").unwrap();

        prop_assert_eq!(root.read("f.bin"), before);
        prop_assert_eq!(checkpoints.list("f.bin").unwrap().len(), 1);
    }

    /// Saved notebook sources come back unchanged.
    #[test]
    fn notebook_source_round_trips(source in "\\PC{0,64}") {
        nbstore_core::logging::init_for_tests();
        let root = TestRoot::new();
        let store = DocumentStore::from_config(Arc::new(root.backend()), &root.config()).unwrap();
        let nb = Notebook::from_value(json!({
            "nbformat": 4,
            "nbformat_minor": 5,
            "metadata": {},
            "cells": [{"cell_type": "raw", "metadata": {}, "source": source}]
        }))
        .unwrap();

        store.save(SaveModel::notebook(&nb), "p.ipynb").unwrap();
        let model = store.get("p.ipynb", true, None, None).unwrap();

        prop_assert_eq!(model.notebook(), Some(&nb));
    }
}
