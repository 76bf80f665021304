//! "FOUT with a class" webfont loading.
//!
//! [`fout`] adds a class to a container element once a named font is
//! available, and records that fact in persistent storage so later calls can
//! apply the class immediately. The environment (storage, DOM, font
//! detection) is supplied through the traits in [`system`].

pub mod config;
pub mod error;
pub mod loader;
pub mod memory;
pub mod system;

pub use config::{FontFace, FoutOptions, ResolvedOptions, DEFAULT_TIMEOUT, STORAGE_KEY_PREFIX};
pub use error::{CoreError, DetectionError, StorageError};
pub use loader::{fout, Loading, MARKER_VALUE};
pub use system::{ClassList, FontWatcher, Persistence, Platform};
