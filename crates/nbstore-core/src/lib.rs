//! Document and checkpoint stores for notebook-store
//!
//! This crate sits on top of `nbstore-fs` and implements the operations a
//! notebook document service calls:
//!
//! - **DocumentStore**: get, save, delete and rename documents by API path
//! - **CheckpointStore**: one overwrite-only checkpoint per document
//! - **DocumentHooks**: trust signing and validation supplied by the host
//!
//! # Architecture
//!
//! ```text
//!          document service
//!                 |
//!           DocumentStore ---- CheckpointStore
//!                 |                  |
//!                 +---- DurableIo ---+
//!                          |
//!                      FsBackend
//! ```
//!
//! Both stores share one `Arc<DurableIo>`, so every write in either of them
//! gets the same atomic-write and recovery behaviour.

pub mod checkpoints;
pub mod contents;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod model;

pub use checkpoints::{CHECKPOINT_ID, CheckpointStore};
pub use contents::DocumentStore;
pub use error::{Error, Result};
pub use hooks::{DocumentHooks, NoopHooks};
pub use model::{CheckpointMetadata, Content, ContentKind, Format, Model, SaveModel};
