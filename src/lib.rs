//! # smartfs
//!
//! One path API over local files, S3-compatible object stores and stdio,
//! dispatched by URL scheme.
//!
//! ---
//!
//! ## Quick Start
//!
//! Most users only need [`SmartFs`]. Plain paths and `file://` URLs go to
//! the local filesystem, `s3://bucket/key` goes to the configured object
//! store client and `stdio://-` is standard input or output.
//!
//! ```rust
//! use std::sync::Arc;
//! use smartfs::{MemoryObjectClient, SmartFs};
//!
//! let client = Arc::new(MemoryObjectClient::new().with_bucket("bucket"));
//! let fs = SmartFs::builder().object_client(client).build();
//!
//! let dir = tempfile::tempdir().unwrap();
//! let local = dir.path().join("report.txt");
//! let local = local.to_str().unwrap();
//!
//! fs.save_text(local, "quarterly numbers").unwrap();
//! fs.copy(local, "s3://bucket/reports/q1.txt", None).unwrap();
//! assert_eq!(fs.load_text("s3://bucket/reports/q1.txt").unwrap(), "quarterly numbers");
//!
//! let found = fs.glob(&format!("{{{local},s3://bucket/reports/*.txt}}")).unwrap();
//! assert_eq!(found, vec![local.to_string(), "s3://bucket/reports/q1.txt".to_string()]);
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`SmartFs`] | Scheme-dispatching entry point for every operation |
//! | [`Backend`] | What a storage driver implements |
//! | [`CopyRegistry`] | Copy strategies per `(source, destination)` scheme pair |
//! | [`SmartFile`] | Open file on any backend |
//! | [`CacheHandle`] | Local path standing in for a remote file |
//! | [`SmartError`] | Error type with path context |
//! | [`StatResult`] | Size, mtime and kind of a path |
//!
//! ---
//!
//! ## Backends
//!
//! | Scheme | Backend | Notes |
//! |--------|---------|-------|
//! | none, `file` | [`LocalBackend`] | `std::fs`, `walkdir`, `glob` |
//! | `s3` | [`ObjectStoreBackend`] | Over any [`ObjectClient`]; prefixes act as directories |
//! | `stdio` | [`StdioBackend`] | Only the path `-` |
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return `Result<T, SmartError>`. Errors carry the path:
//!
//! ```rust
//! use smartfs::SmartFs;
//!
//! let err = SmartFs::new().stat("gs://bucket/key").unwrap_err();
//! assert_eq!(err.to_string(), "unsupported scheme \"gs\": gs://bucket/key");
//! ```
//!
//! ---
//!
//! ## Logging
//!
//! Operations emit [`tracing`] spans and events. Install any subscriber to
//! see them; without one they cost nothing.
//!
//! ---
//!
//! ## Thread Safety
//!
//! Backends are `Send + Sync` and take `&self`. A built [`SmartFs`] can be
//! shared across threads by reference or in an `Arc`.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`StatResult`], [`FileEntry`], [`SmartConfig`]; `load_json`/`save_json` |

// Private modules
mod backends;
mod cache;
mod config;
mod copy_registry;
mod error;
mod expander;
mod ext;
mod file;
mod path;
mod resolver;
mod scheme;
mod smart;
mod sync;
mod traits;
mod transfer;
mod types;

// Public re-exports - error types
pub use error::SmartError;

// Public re-exports - core types
pub use types::{Access, FileEntry, OpenMode, StatResult, WalkEntry};

// Public re-exports - backend traits
pub use ext::BackendExt;
pub use traits::{Backend, BackendDir, BackendRead, BackendWrite, DuplexStream, EntryIter};

// Public re-exports - backends
pub use backends::{
    LocalBackend, MemoryObjectClient, ObjectClient, ObjectMeta, ObjectStoreBackend, StdioBackend,
    STDIO_PATH,
};

// Public re-exports - routing
pub use resolver::{BackendHandle, Resolver};
pub use scheme::{is_remote, scheme_of, split_scheme, BackendKind};

// Public re-exports - smart layer
pub use cache::{CacheHandle, Materialized};
pub use config::{SmartConfig, DEFAULT_BLOCK_SIZE, ENV_BLOCK_SIZE, ENV_CACHE_DIR};
pub use copy_registry::{
    same_backend_copy, stream_copy, CopyFn, CopyFuncKey, CopyRegistry, CopyRequest,
};
pub use expander::expand;
pub use file::SmartFile;
pub use path::{abspath, basename, is_absolute, normalize, parent, path_join, realpath, relpath};
pub use smart::{SmartFs, SmartFsBuilder};
